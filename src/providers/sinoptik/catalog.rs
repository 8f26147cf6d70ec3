//! In-memory location catalog for sinoptik.bg

use std::sync::{PoisonError, RwLock};

use serde::Deserialize;

use crate::models::{Location, LocationQuery};

use super::PROVIDER_ID;

/// Locations known before any scrape has run
const DEFAULT_LOCATIONS: &str = include_str!("../../../data/sinoptik_locations.json");

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: String,
    id: String,
}

#[derive(Debug, Default)]
pub struct LocationCatalog {
    locations: RwLock<Vec<Location>>,
}

impl LocationCatalog {
    /// Catalog pre-filled with the built-in location list
    pub fn with_defaults() -> serde_json::Result<Self> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(DEFAULT_LOCATIONS)?;
        let locations = entries
            .into_iter()
            .map(|entry| Location::new(entry.id, entry.name, PROVIDER_ID))
            .collect();
        Ok(Self {
            locations: RwLock::new(locations),
        })
    }

    pub fn find(&self, query: &LocationQuery) -> Option<Location> {
        let locations = self.locations.read().unwrap_or_else(PoisonError::into_inner);
        let found = match query {
            LocationQuery::Id(id) => locations.iter().find(|l| l.id == id.trim()),
            LocationQuery::Name(name) => locations.iter().find(|l| l.matches_name(name)),
        };
        found.cloned()
    }

    pub fn all(&self) -> Vec<Location> {
        self.locations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of known locations
    pub fn count(&self) -> usize {
        self.locations
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Swap in a freshly scraped list
    pub fn replace(&self, locations: Vec<Location>) {
        *self.locations.write().unwrap_or_else(PoisonError::into_inner) = locations;
    }
}
