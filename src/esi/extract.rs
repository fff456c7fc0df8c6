//! Fragment extraction.
//!
//! A single streaming pass over the rendered page:
//!
//! ```text
//! <div class="block" id="block-alpha">…</div>
//!        │
//!        ├─▶ captured subtree ──▶ ExtractedFragment { id: "alpha", markup }
//!        └─▶ <div class="esi-include"><!--#include virtual="/esi/block/alpha" --></div>
//! ```
//!
//! Each candidate subtree is copied out of the input before its placeholder
//! is written, so the document is never mutated while being walked.
//! Elements whose id is in `strip_ids` are dropped with their subtree.

use crate::config::SiteConfig;
use crate::error::{GenerateError, Result};
use crate::esi::{
    id,
    store::{FragmentStore, PutOutcome},
};
use crate::utils::xml::{
    XmlWriter, attr_value, create_xml_reader, create_xml_writer, has_class, is_raw_text, is_void,
};
use crate::vlog;
use quick_xml::{
    Reader,
    escape::escape,
    events::{BytesEnd, BytesStart, BytesText, Event},
};
use regex::Regex;
use std::{borrow::Cow, string::FromUtf8Error, sync::OnceLock};
use thiserror::Error;

/// Class of the element replacing an extracted fragment.
pub const PLACEHOLDER_CLASS: &str = "esi-include";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("malformed markup at byte {position}")]
    Parse {
        position: u64,
        #[source]
        source: quick_xml::Error,
    },

    #[error("failed to write markup")]
    Xml(#[from] quick_xml::Error),

    #[error("failed to write markup")]
    Write(#[from] std::io::Error),

    #[error("markup is not valid UTF-8")]
    Utf8(#[from] FromUtf8Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFragment {
    pub id: String,
    pub markup: String,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    /// Page markup with placeholders in place of fragments.
    pub markup: String,
    /// Fragments in document order.
    pub fragments: Vec<ExtractedFragment>,
}

enum Action {
    Keep,
    Strip,
    Extract(String),
}

pub struct FragmentExtractor {
    marker_class: String,
    id_prefix: String,
    strip_ids: Vec<String>,
    esi_directory: String,
}

impl FragmentExtractor {
    pub fn new(config: &SiteConfig) -> Self {
        Self {
            marker_class: config.esi.marker_class.clone(),
            id_prefix: config.esi.id_prefix.clone(),
            strip_ids: config.generator.strip_ids.clone(),
            esi_directory: config.esi.directory.trim_matches('/').to_owned(),
        }
    }

    /// Split `html` into page markup and fragments.
    ///
    /// `fragmentable` decides whether a derived id may be extracted; it is
    /// asked about both the normalized and the final id.
    pub fn extract(
        &self,
        html: &str,
        page_path: &str,
        fragmentable: impl Fn(&str) -> bool,
    ) -> Result<Extraction, ExtractError> {
        let mut reader = create_xml_reader(html.as_bytes());
        let mut writer = create_xml_writer(html.len());
        let mut fragments = Vec::new();

        loop {
            match read(&mut reader)? {
                Event::Start(elem) => {
                    let action = self.classify(&elem, page_path, &fragmentable);
                    let captured = match &action {
                        Action::Keep => None,
                        _ => {
                            let mut lookahead = reader.clone();
                            let markup = capture_subtree(&mut lookahead, &elem)?;
                            if markup.is_some() {
                                reader = lookahead;
                            } else {
                                vlog!("esi"; "unterminated <{}> on {page_path}, left inline", name_of(&elem));
                            }
                            markup
                        }
                    };
                    match (action, captured) {
                        (Action::Strip, Some(_)) => {}
                        (Action::Extract(id), Some(markup)) => {
                            self.write_placeholder(&mut writer, &id)?;
                            fragments.push(ExtractedFragment { id, markup });
                        }
                        _ => {
                            let raw = is_raw_text(elem.name().as_ref());
                            let name = elem.name().as_ref().to_vec();
                            writer.write_event(Event::Start(elem))?;
                            if raw {
                                copy_raw_text(&mut reader, &name, &mut writer)?;
                            }
                        }
                    }
                }
                Event::Empty(elem) => match self.classify(&elem, page_path, &fragmentable) {
                    Action::Keep => writer.write_event(Event::Empty(elem))?,
                    Action::Strip => {}
                    Action::Extract(id) => {
                        let markup = capture_empty(&elem)?;
                        self.write_placeholder(&mut writer, &id)?;
                        fragments.push(ExtractedFragment { id, markup });
                    }
                },
                Event::Eof => break,
                event => writer.write_event(event)?,
            }
        }

        let markup = String::from_utf8(writer.into_inner().into_inner())?;
        Ok(Extraction {
            markup: restore_directives(&markup).into_owned(),
            fragments,
        })
    }

    /// Extract fragments from `html`, persist them and return the page markup.
    pub fn inject(
        &self,
        html: &str,
        page_path: &str,
        store: &FragmentStore,
        overwrite: bool,
    ) -> Result<String> {
        let extraction = self
            .extract(html, page_path, |id| store.is_fragmentable(id))
            .map_err(|source| GenerateError::Extract {
                path: page_path.to_owned(),
                source,
            })?;

        for fragment in &extraction.fragments {
            if store.put(&fragment.id, &fragment.markup, overwrite)? == PutOutcome::Written {
                vlog!("esi"; "{}", fragment.id);
            }
        }
        Ok(extraction.markup)
    }

    fn directive_body(&self, fragment_id: &str) -> String {
        let url = format!("/{}/{}", self.esi_directory, fragment_id);
        format!("#include virtual=\"{}\" ", escape(&url))
    }

    fn classify(
        &self,
        elem: &BytesStart<'_>,
        page_path: &str,
        fragmentable: &impl Fn(&str) -> bool,
    ) -> Action {
        let Some(element_id) = attr_value(elem, b"id") else {
            return Action::Keep;
        };
        if self.strip_ids.iter().any(|strip| *strip == element_id) {
            return Action::Strip;
        }
        if !has_class(elem, &self.marker_class) {
            return Action::Keep;
        }
        let Some(derived) = id::derive(&element_id, &self.id_prefix, page_path) else {
            return Action::Keep;
        };
        if !fragmentable(&derived.normalized) || !fragmentable(&derived.id) {
            return Action::Keep;
        }
        Action::Extract(derived.id)
    }

    fn write_placeholder(&self, writer: &mut XmlWriter, fragment_id: &str) -> Result<(), ExtractError> {
        let mut div = BytesStart::new("div");
        div.push_attribute(("class", PLACEHOLDER_CLASS));
        writer.write_event(Event::Start(div))?;
        writer.write_event(Event::Comment(BytesText::from_escaped(
            self.directive_body(fragment_id),
        )))?;
        writer.write_event(Event::End(BytesEnd::new("div")))?;
        Ok(())
    }
}

// ============================================================================
// Subtree Capture
// ============================================================================

fn read<'a>(reader: &mut Reader<&'a [u8]>) -> Result<Event<'a>, ExtractError> {
    match reader.read_event() {
        Ok(event) => Ok(event),
        Err(source) => Err(ExtractError::Parse {
            position: reader.error_position(),
            source,
        }),
    }
}

/// Copy `elem` and everything up to its matching end tag.
///
/// Only elements named like `elem` (case-insensitive) open and close levels,
/// so HTML's implied end tags inside the subtree (`<li>a<li>b`) do not shift
/// the boundary. Raw-text elements are copied without looking at their
/// content. Returns `None` when the document ends before the element closes.
fn capture_subtree(
    reader: &mut Reader<&[u8]>,
    elem: &BytesStart<'_>,
) -> Result<Option<String>, ExtractError> {
    let mut capture = create_xml_writer(256);
    capture.write_event(Event::Start(elem.borrow()))?;

    let name = elem.name().as_ref().to_ascii_lowercase();
    if is_void(&name) {
        return Ok(Some(into_string(capture)?));
    }
    if is_raw_text(&name) {
        if !copy_raw_text(reader, &name, &mut capture)? {
            return Ok(None);
        }
        return Ok(Some(into_string(capture)?));
    }

    let mut depth = 1usize;
    loop {
        let event = read(reader)?;
        let raw = match &event {
            Event::Eof => return Ok(None),
            Event::Start(e) if e.name().as_ref().eq_ignore_ascii_case(&name) => {
                depth += 1;
                None
            }
            Event::End(e) if e.name().as_ref().eq_ignore_ascii_case(&name) => {
                depth -= 1;
                None
            }
            Event::Start(e) if is_raw_text(e.name().as_ref()) => Some(e.name().as_ref().to_vec()),
            _ => None,
        };
        capture.write_event(event)?;
        if let Some(inner) = raw {
            if !copy_raw_text(reader, &inner, &mut capture)? {
                return Ok(None);
            }
        } else if depth == 0 {
            return Ok(Some(into_string(capture)?));
        }
    }
}

/// Copy the content of a raw-text element and its end tag into `writer`.
///
/// Returns `false` when the document ends first.
fn copy_raw_text(
    reader: &mut Reader<&[u8]>,
    name: &[u8],
    writer: &mut XmlWriter,
) -> Result<bool, ExtractError> {
    loop {
        let event = read(reader)?;
        let closes = match &event {
            Event::Eof => return Ok(false),
            Event::End(e) => e.name().as_ref().eq_ignore_ascii_case(name),
            _ => false,
        };
        writer.write_event(event)?;
        if closes {
            return Ok(true);
        }
    }
}

fn into_string(writer: XmlWriter) -> Result<String, ExtractError> {
    Ok(String::from_utf8(writer.into_inner().into_inner())?)
}

fn name_of(elem: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(elem.name().as_ref()).into_owned()
}

fn capture_empty(elem: &BytesStart<'_>) -> Result<String, ExtractError> {
    let mut capture = create_xml_writer(64);
    capture.write_event(Event::Empty(elem.borrow()))?;
    into_string(capture)
}

// ============================================================================
// Directive Restoration
// ============================================================================

/// Turn entity-escaped include directives back into literal comments.
///
/// Directives written by the extractor are already literal; this repairs
/// directives that reached the page as escaped text.
pub fn restore_directives(markup: &str) -> Cow<'_, str> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"&lt;!--#include\s+virtual=(?:"|&quot;)([^"&]*)(?:"|&quot;)\s*--&gt;"#)
            .unwrap()
    });
    re.replace_all(markup, r#"<!--#include virtual="$1" -->"#)
}

// ============================================================================
// Tests
// ============================================================================
