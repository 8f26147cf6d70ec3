//! Lenient extraction of forecast values and location links from sinoptik.bg pages.
//!
//! The pages are HTML, not XML, so the quick-xml reader runs with end-name
//! checks disabled and the extraction works on the event stream instead of
//! building a tree.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use tracing::warn;

/// Text that starts the paragraph holding the precipitation chance
pub const CHANCE_LABEL: &str = "Вероятност за валежи:";
/// Text that starts the paragraph holding the precipitation amount
pub const INTENSITY_LABEL: &str = "Количество валежи:";

const TEMPERATURE_CLASS: &str = "max-temp";
const LOCATION_LIST_CLASS: &str = "worldContent";

/// The three hourly columns of the forecast page, in document order
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HourlyColumns {
    pub temperatures: Vec<String>,
    pub chances: Vec<String>,
    pub intensities: Vec<String>,
}

impl HourlyColumns {
    /// Number of complete rows (the shortest column)
    #[must_use]
    pub fn rows(&self) -> usize {
        self.temperatures
            .len()
            .min(self.chances.len())
            .min(self.intensities.len())
    }
}

/// A location link from the location list pages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationLink {
    pub name: String,
    pub href: String,
}

impl LocationLink {
    /// Location ID: the last path segment of the link
    #[must_use]
    pub fn id(&self) -> &str {
        self.href
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Temperature,
    Chance,
    Intensity,
}

/// Text being collected until the element that opened it closes
struct Capture<T> {
    target: T,
    tag: Vec<u8>,
    depth: usize,
    text: String,
}

impl<T> Capture<T> {
    fn new(target: T, tag: &[u8]) -> Self {
        Self {
            target,
            tag: tag.to_ascii_lowercase(),
            depth: 0,
            text: String::new(),
        }
    }

    /// Track nesting; returns true when the captured element itself closes
    fn on_end(&mut self, tag: &[u8]) -> bool {
        if !tag.eq_ignore_ascii_case(&self.tag) {
            return false;
        }
        if self.depth == 0 {
            return true;
        }
        self.depth -= 1;
        false
    }

    fn on_start(&mut self, tag: &[u8]) {
        if tag.eq_ignore_ascii_case(&self.tag) {
            self.depth += 1;
        }
    }

    fn finish(self) -> (T, String) {
        (self.target, normalize_whitespace(&self.text))
    }
}

struct Paragraph {
    label: String,
    label_closed: bool,
}

fn html_reader(html: &str) -> Reader<&[u8]> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.check_comments = false;
    reader
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    element
        .html_attributes()
        .flatten()
        .find(|attr| attr.key.as_ref().eq_ignore_ascii_case(name))
        .map(|attr| String::from_utf8_lossy(&attr.value).into_owned())
}

fn has_class(element: &BytesStart<'_>, class: &str) -> bool {
    attribute(element, b"class").is_some_and(|value| value.contains(class))
}

fn is_tag(element: &BytesStart<'_>, tag: &[u8]) -> bool {
    element.name().as_ref().eq_ignore_ascii_case(tag)
}

/// Resolve the entities sinoptik pages use; unknown ones are dropped
fn resolve_entity(name: &str) -> Option<char> {
    match name {
        "nbsp" => Some(' '),
        "deg" => Some('°'),
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "minus" => Some('−'),
        _ => {
            let code = name.strip_prefix('#')?;
            let code = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Extract the hourly temperature, precipitation chance and amount columns
pub fn parse_hourly(html: &str) -> HourlyColumns {
    let mut reader = html_reader(html);
    let mut columns = HourlyColumns::default();
    let mut capture: Option<Capture<Column>> = None;
    let mut paragraph: Option<Paragraph> = None;

    loop {
        let event = match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(event) => event,
            Err(e) => {
                warn!(
                    "Stopped parsing hourly page at byte {}: {}",
                    reader.buffer_position(),
                    e
                );
                break;
            }
        };

        match event {
            Event::Start(element) => {
                let tag = element.name();
                if let Some(current) = capture.as_mut() {
                    current.on_start(tag.as_ref());
                    continue;
                }
                if let Some(p) = paragraph.as_mut() {
                    p.label_closed = true;
                    if is_tag(&element, b"b") {
                        let label = p.label.trim();
                        if label.starts_with(CHANCE_LABEL) {
                            capture = Some(Capture::new(Column::Chance, b"b"));
                        } else if label.starts_with(INTENSITY_LABEL) {
                            capture = Some(Capture::new(Column::Intensity, b"b"));
                        }
                    }
                }
                if capture.is_none() && is_tag(&element, b"span") && has_class(&element, TEMPERATURE_CLASS) {
                    capture = Some(Capture::new(Column::Temperature, b"span"));
                } else if is_tag(&element, b"p") {
                    paragraph = Some(Paragraph {
                        label: String::new(),
                        label_closed: false,
                    });
                }
            }
            Event::End(element) => {
                let tag = element.name();
                if let Some(current) = capture.as_mut() {
                    if current.on_end(tag.as_ref()) {
                        if let Some(done) = capture.take() {
                            let (column, text) = done.finish();
                            match column {
                                Column::Temperature => columns.temperatures.push(text),
                                Column::Chance => columns.chances.push(text),
                                Column::Intensity => columns.intensities.push(text),
                            }
                        }
                    }
                    continue;
                }
                if tag.as_ref().eq_ignore_ascii_case(b"p") {
                    paragraph = None;
                }
            }
            Event::Text(text) => {
                let text = String::from_utf8_lossy(&text);
                push_text(&mut capture, &mut paragraph, &text);
            }
            Event::CData(text) => {
                let text = String::from_utf8_lossy(&text);
                push_text(&mut capture, &mut paragraph, &text);
            }
            Event::GeneralRef(entity) => {
                let name = String::from_utf8_lossy(&entity);
                if let Some(c) = resolve_entity(&name) {
                    push_text(&mut capture, &mut paragraph, c.encode_utf8(&mut [0; 4]));
                }
            }
            _ => {}
        }
    }

    columns
}

fn push_text(capture: &mut Option<Capture<Column>>, paragraph: &mut Option<Paragraph>, text: &str) {
    if let Some(current) = capture.as_mut() {
        current.text.push_str(text);
    } else if let Some(p) = paragraph.as_mut() {
        if !p.label_closed {
            p.label.push_str(text);
        }
    }
}

/// Extract every location link inside the `worldContent` block of a location list page
pub fn parse_location_links(html: &str) -> Vec<LocationLink> {
    let mut reader = html_reader(html);
    let mut links = Vec::new();
    let mut list_depth = 0usize;
    let mut anchor: Option<Capture<String>> = None;

    loop {
        let event = match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(event) => event,
            Err(e) => {
                warn!(
                    "Stopped parsing location list at byte {}: {}",
                    reader.buffer_position(),
                    e
                );
                break;
            }
        };

        match event {
            Event::Start(element) => {
                if is_tag(&element, b"div") {
                    if list_depth > 0 {
                        list_depth += 1;
                    } else if has_class(&element, LOCATION_LIST_CLASS) {
                        list_depth = 1;
                    }
                } else if list_depth > 0 && anchor.is_none() && is_tag(&element, b"a") {
                    if let Some(href) = attribute(&element, b"href") {
                        anchor = Some(Capture::new(href, b"a"));
                    }
                }
            }
            Event::End(element) => {
                let tag = element.name();
                if tag.as_ref().eq_ignore_ascii_case(b"a") {
                    if let Some(done) = anchor.take() {
                        let (href, name) = done.finish();
                        if !name.is_empty() && !href.trim().is_empty() {
                            links.push(LocationLink {
                                name,
                                href: href.trim().to_string(),
                            });
                        }
                    }
                } else if tag.as_ref().eq_ignore_ascii_case(b"div") && list_depth > 0 {
                    list_depth -= 1;
                }
            }
            Event::Text(text) => {
                if let Some(current) = anchor.as_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&text));
                }
            }
            Event::GeneralRef(entity) => {
                if let Some(current) = anchor.as_mut() {
                    if let Some(c) = resolve_entity(&String::from_utf8_lossy(&entity)) {
                        current.text.push(c);
                    }
                }
            }
            _ => {}
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const HOURLY_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>Велико Търново - почасова прогноза</title></head>
<body>
<div class="hourly">
  <div class="wfHourly">
    <span class="time">18:00</span>
    <span class="temp max-temp">2&deg;</span>
    <p>Вероятност за валежи: <b>17%</b></p>
    <p>Количество валежи: <b>0.0 mm</b></p>
    <p>Вятър: <b>2 m/s</b></p>
    <br>
  </div>
  <div class="wfHourly">
    <span class="time">19:00</span>
    <span class="temp max-temp">1°</span>
    <p>Вероятност за валежи: <b>23%</b></p>
    <p>Количество валежи: <b>0.2&nbsp;mm</b></p>
  </div>
  <div class="wfHourly">
    <span class="time">20:00</span>
    <span class="temp max-temp">&minus;1°</span>
    <p>Вероятност за валежи: <b>40%</b></p>
    <p>Количество валежи: <b>1.1 mm</b></p>
  </div>
</div>
</body>
</html>"#;

    const LOCATION_PAGE: &str = r#"<div class="letters"><a href="http://sinoptik.bg/locations/europe/bulgaria/А">А</a></div>
<div class="worldContent">
    <div class="worldCol">
        <ul>
            <li>
                <a href="http://sinoptik.bg/avren-bulgaria-100733587">
                Аврен</a>
            </li>
            <li><a href="http://sinoptik.bg/aytos-bulgaria-100733579">Айтос</a></li>
        </ul>
    </div>
    <div class="worldCol">
        <ul>
            <li><a href="http://sinoptik.bg/veliko-turnovo-bulgaria-100725993/">Велико Търново</a></li>
        </ul>
    </div>
</div>
<div class="footer"><a href="http://sinoptik.bg/about">За нас</a></div>"#;

    #[test]
    fn test_parse_hourly_columns() {
        let columns = parse_hourly(HOURLY_PAGE);
        assert_eq!(columns.temperatures, vec!["2°", "1°", "−1°"]);
        assert_eq!(columns.chances, vec!["17%", "23%", "40%"]);
        assert_eq!(columns.intensities, vec!["0.0 mm", "0.2 mm", "1.1 mm"]);
        assert_eq!(columns.rows(), 3);
    }

    #[test]
    fn test_parse_hourly_ignores_unrelated_paragraphs() {
        let html = r#"<p>Вятър: <b>2 m/s</b></p><p>Някакъв текст <b>Вероятност за валежи:</b> <b>9%</b></p>"#;
        let columns = parse_hourly(html);
        assert!(columns.chances.is_empty());
        assert_eq!(columns.rows(), 0);
    }

    #[test]
    fn test_parse_hourly_nested_temperature_markup() {
        let html = r#"<span class="max-temp">12<span class="unit">°</span></span>"#;
        let columns = parse_hourly(html);
        assert_eq!(columns.temperatures, vec!["12°"]);
    }

    #[test]
    fn test_parse_hourly_empty_page() {
        assert_eq!(parse_hourly("<html><body></body></html>"), HourlyColumns::default());
    }

    #[test]
    fn test_parse_location_links() {
        let links = parse_location_links(LOCATION_PAGE);
        let names: Vec<&str> = links.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Аврен", "Айтос", "Велико Търново"]);
        assert_eq!(links[0].id(), "avren-bulgaria-100733587");
        assert_eq!(links[2].id(), "veliko-turnovo-bulgaria-100725993");
    }

    #[test]
    fn test_parse_location_links_outside_list_are_ignored() {
        let links = parse_location_links(r#"<div><a href="/x">X</a></div>"#);
        assert!(links.is_empty());
    }

    #[rstest]
    #[case("nbsp", Some(' '))]
    #[case("deg", Some('°'))]
    #[case("#176", Some('°'))]
    #[case("#xB0", Some('°'))]
    #[case("bogus", None)]
    fn test_resolve_entity(#[case] name: &str, #[case] expected: Option<char>) {
        assert_eq!(resolve_entity(name), expected);
    }
}
