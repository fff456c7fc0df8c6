//! XML processing utilities.
//!
//! Rendered pages are streamed through `quick_xml` with every well-formedness
//! check disabled, so HTML that is not strict XML passes through unchanged.

use quick_xml::{Reader, Writer, escape::unescape, events::BytesStart};
use std::io::Cursor;

pub type XmlWriter = Writer<Cursor<Vec<u8>>>;

/// HTML elements that never have a closing tag.
const VOID_ELEMENTS: &[&[u8]] = &[
    b"area", b"base", b"br", b"col", b"embed", b"hr", b"img", b"input", b"link", b"meta",
    b"param", b"source", b"track", b"wbr",
];

/// HTML elements whose content is text, never markup.
const RAW_TEXT_ELEMENTS: &[&[u8]] = &[b"script", b"style", b"textarea", b"title"];

// ============================================================================
// XML Reader Creation
// ============================================================================

/// Create a configured XML reader from content bytes
#[inline]
pub fn create_xml_reader(content: &[u8]) -> Reader<&[u8]> {
    let mut reader = Reader::from_reader(content);
    reader.config_mut().trim_text(false);
    reader.config_mut().enable_all_checks(false);
    reader
}

/// Create a writer with room for `capacity` bytes.
#[inline]
pub fn create_xml_writer(capacity: usize) -> XmlWriter {
    Writer::new(Cursor::new(Vec::with_capacity(capacity)))
}

// ============================================================================
// Element Helpers
// ============================================================================

/// Whether `name` is an HTML void element (case-insensitive).
pub fn is_void(name: &[u8]) -> bool {
    VOID_ELEMENTS.iter().any(|void| void.eq_ignore_ascii_case(name))
}

/// Whether `name` is an element whose content is not parsed as markup
/// (case-insensitive).
pub fn is_raw_text(name: &[u8]) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|raw| raw.eq_ignore_ascii_case(name))
}

/// Unescaped value of attribute `name`. Unquoted HTML values are accepted.
pub fn attr_value(elem: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    elem.html_attributes()
        .flatten()
        .find(|attr| attr.key.as_ref().eq_ignore_ascii_case(name))
        .map(|attr| {
            let raw = String::from_utf8_lossy(&attr.value);
            unescape(&raw).map(|v| v.into_owned()).unwrap_or_else(|_| raw.into_owned())
        })
}

/// Whether the `class` attribute contains `token` as a whole word.
pub fn has_class(elem: &BytesStart<'_>, token: &str) -> bool {
    attr_value(elem, b"class").is_some_and(|class| class.split_ascii_whitespace().any(|c| c == token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quick_xml::events::Event;

    fn first_start(html: &str) -> BytesStart<'static> {
        let mut reader = create_xml_reader(html.as_bytes());
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) | Event::Empty(e) => return e.into_owned(),
                Event::Eof => panic!("no element"),
                _ => {}
            }
        }
    }

    #[test]
    fn test_attr_value() {
        let elem = first_start(r#"<div id="block-a" class="x">"#);
        assert_eq!(attr_value(&elem, b"id").as_deref(), Some("block-a"));
        assert_eq!(attr_value(&elem, b"ID").as_deref(), Some("block-a"));
        assert_eq!(attr_value(&elem, b"title"), None);
    }

    #[test]
    fn test_attr_value_unquoted_and_escaped() {
        let elem = first_start(r#"<div id=plain title="a &amp; b">"#);
        assert_eq!(attr_value(&elem, b"id").as_deref(), Some("plain"));
        assert_eq!(attr_value(&elem, b"title").as_deref(), Some("a & b"));
    }

    #[test]
    fn test_has_class_token() {
        let elem = first_start(r#"<section class="region block  block-menu">"#);
        assert!(has_class(&elem, "block"));
        assert!(has_class(&elem, "block-menu"));
        assert!(!has_class(&elem, "bloc"));

        let elem = first_start(r#"<div class="blockquote">"#);
        assert!(!has_class(&elem, "block"));
    }

    #[test]
    fn test_is_void() {
        assert!(is_void(b"br"));
        assert!(is_void(b"IMG"));
        assert!(!is_void(b"div"));
    }

    #[test]
    fn test_is_raw_text() {
        assert!(is_raw_text(b"script"));
        assert!(is_raw_text(b"STYLE"));
        assert!(!is_raw_text(b"div"));
    }
}
