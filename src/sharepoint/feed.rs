//! Atom feed parsing
//!
//! SharePoint's REST endpoint answers with an Atom/OData XML feed. Each result
//! row is an `entry` element and field values live in `d:<Field>` elements
//! under `entry/content/m:properties`. The parser keeps only what the bridge
//! reads: the entries and the text content of every `d:` element.

use crate::error::{BridgeError, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Element that delimits one result row
pub const ENTRY_TAG: &str = "entry";

/// Namespace prefix of SharePoint data service fields
pub const FIELD_PREFIX: &str = "d:";

/// How field values are matched to entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldLookup {
    /// Index into every `d:<Field>` element of the document by entry
    /// position. An entry missing a field shifts the values of all later
    /// entries.
    #[default]
    Positional,
    /// Look the field up inside the entry itself
    EntryScoped,
}

/// Parsed response document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtomDocument {
    /// Text of every `d:` element, keyed by qualified name, in document order
    fields: HashMap<String, Vec<String>>,
    /// First value of each `d:` element inside each entry
    entries: Vec<HashMap<String, String>>,
}

impl AtomDocument {
    /// Number of `entry` elements
    pub fn count_entries(&self) -> usize {
        self.entries.len()
    }

    /// Value of `field` for the entry at `index`, document-wide positional lookup
    pub fn field_value(&self, field: &str, index: usize) -> Option<&str> {
        self.fields
            .get(&qualified(field))
            .and_then(|values| values.get(index))
            .map(String::as_str)
    }

    /// Value of `field` inside the entry at `index`
    pub fn scoped_field_value(&self, field: &str, index: usize) -> Option<&str> {
        self.entries
            .get(index)
            .and_then(|entry| entry.get(&qualified(field)))
            .map(String::as_str)
    }

    pub fn value(&self, field: &str, index: usize, lookup: FieldLookup) -> Option<&str> {
        match lookup {
            FieldLookup::Positional => self.field_value(field, index),
            FieldLookup::EntryScoped => self.scoped_field_value(field, index),
        }
    }
}

fn qualified(field: &str) -> String {
    format!("{}{}", FIELD_PREFIX, field)
}

/// Turns a response body into an [`AtomDocument`]
pub trait FeedParser: Send + Sync {
    fn parse(&self, body: &str) -> Result<AtomDocument>;
}

/// quick-xml backed feed parser
#[derive(Debug, Clone, Copy, Default)]
pub struct AtomFeedParser;

impl FeedParser for AtomFeedParser {
    fn parse(&self, body: &str) -> Result<AtomDocument> {
        parse_feed(body)
    }
}

/// An element still waiting for its end tag
struct OpenElement {
    name: String,
    text: String,
    entry: Option<usize>,
    /// Position in the document-wide value list, for `d:` elements
    slot: Option<usize>,
}

struct FeedBuilder {
    document: AtomDocument,
    open: Vec<OpenElement>,
    seen_root: bool,
}

impl FeedBuilder {
    fn new() -> Self {
        Self {
            document: AtomDocument::default(),
            open: Vec::new(),
            seen_root: false,
        }
    }

    fn start(&mut self, element: &BytesStart<'_>) -> Result<()> {
        let name = xml_name(element.name().as_ref(), "element")?;
        check_attributes(element)?;

        if self.open.is_empty() {
            if self.seen_root {
                return Err(xml_error(format!(
                    "content after the root element: <{}>",
                    name
                )));
            }
            self.seen_root = true;
        }

        let entry = if name == ENTRY_TAG {
            self.document.entries.push(HashMap::new());
            Some(self.document.entries.len() - 1)
        } else {
            self.open.last().and_then(|parent| parent.entry)
        };

        // Reserve the slot at the start tag so nested fields keep document order
        let slot = if name.starts_with(FIELD_PREFIX) {
            let values = self.document.fields.entry(name.clone()).or_default();
            values.push(String::new());
            Some(values.len() - 1)
        } else {
            None
        };

        self.open.push(OpenElement {
            name,
            text: String::new(),
            entry,
            slot,
        });
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        let element = self
            .open
            .pop()
            .ok_or_else(|| xml_error("end tag without a matching start tag"))?;

        if let Some(parent) = self.open.last_mut() {
            parent.text.push_str(&element.text);
        }

        if let Some(slot) = element.slot {
            if let Some(value) = self
                .document
                .fields
                .get_mut(&element.name)
                .and_then(|values| values.get_mut(slot))
            {
                value.clone_from(&element.text);
            }

            if let Some(entry) = element.entry.and_then(|i| self.document.entries.get_mut(i)) {
                entry.entry(element.name).or_insert(element.text);
            }
        }
        Ok(())
    }

    fn text(&mut self, text: &str) -> Result<()> {
        match self.open.last_mut() {
            Some(element) => {
                element.text.push_str(text);
                Ok(())
            }
            None if text.trim().is_empty() => Ok(()),
            None => Err(xml_error("text outside the root element")),
        }
    }

    fn finish(self) -> Result<AtomDocument> {
        if let Some(element) = self.open.last() {
            return Err(xml_error(format!(
                "unexpected end of document, <{}> is not closed",
                element.name
            )));
        }
        if !self.seen_root {
            return Err(xml_error("document has no root element"));
        }
        Ok(self.document)
    }
}

/// Parse an Atom feed body
pub fn parse_feed(body: &str) -> Result<AtomDocument> {
    let mut reader = Reader::from_str(body.trim_start_matches('\u{feff}'));
    let mut builder = FeedBuilder::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            xml_error(format!("error at position {}: {}", reader.buffer_position(), e))
        })?;

        match event {
            Event::Start(element) => builder.start(&element)?,
            Event::Empty(element) => {
                builder.start(&element)?;
                builder.end()?;
            }
            Event::End(_) => builder.end()?,
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| xml_error(format!("invalid text content: {}", e)))?;
                builder.text(&text)?;
            }
            Event::CData(data) => {
                let data = data.into_inner();
                let text = std::str::from_utf8(&data)
                    .map_err(|e| xml_error(format!("invalid CDATA content: {}", e)))?;
                builder.text(text)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let document = builder.finish()?;
    tracing::debug!("Parsed feed with {} entries", document.count_entries());
    Ok(document)
}

/// Decode a tag or attribute name and check it is a well-formed XML name
fn xml_name(raw: &[u8], kind: &str) -> Result<String> {
    let name = std::str::from_utf8(raw)
        .map_err(|e| xml_error(format!("invalid {} name: {}", kind, e)))?;

    let mut chars = name.chars();
    let well_formed = match chars.next() {
        Some(first) => is_name_start(first) && chars.all(is_name_char),
        None => false,
    };
    if !well_formed {
        return Err(xml_error(format!("invalid {} name '{}'", kind, name)));
    }
    Ok(name.to_string())
}

fn is_name_start(c: char) -> bool {
    c == ':' || c == '_' || c.is_ascii_alphabetic() || (!c.is_ascii() && c.is_alphabetic())
}

fn is_name_char(c: char) -> bool {
    is_name_start(c)
        || c.is_ascii_digit()
        || matches!(c, '-' | '.' | '\u{b7}')
        || (!c.is_ascii() && c.is_alphanumeric())
}

/// Attributes must be `name="value"` pairs, unique per element
fn check_attributes(element: &BytesStart<'_>) -> Result<()> {
    for attribute in element.attributes() {
        let attribute =
            attribute.map_err(|e| xml_error(format!("malformed attribute: {}", e)))?;
        xml_name(attribute.key.as_ref(), "attribute")?;
        attribute
            .unescape_value()
            .map_err(|e| xml_error(format!("invalid attribute value: {}", e)))?;
    }
    Ok(())
}

fn xml_error(detail: impl Into<String>) -> BridgeError {
    let detail = detail.into();
    tracing::error!("Full XML Error: {}", detail);
    BridgeError::XmlParse { detail }
}
