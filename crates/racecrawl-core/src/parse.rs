//! Result page XML parsing.
//!
//! The service answers in dhtmlx-grid XML:
//! `<rows total_count="3857"><row id="1"><cell class="grid_pos">1</cell>...`.
//! A cell's field name comes from its `class` attribute (else `id`, else
//! empty) with the `grid_` prefix removed; values are trimmed text.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("malformed attribute: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),
    #[error("total_count is not an integer: {0:?}")]
    BadTotal(String),
}

/// One parsed result row: named fields in source order.
///
/// Field order matters to consumers that echo the row (the sink picks its
/// own column order, but diagnostics print fields as the service sent them).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultRecord {
    fields: Vec<(String, String)>,
}

impl ResultRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.push((name.into(), value.into()));
    }

    /// First value stored under `name`, if any.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Parse one page of result XML into records, in source order.
pub fn parse(xml: &[u8]) -> Result<Vec<ResultRecord>, ParseError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    let mut records = Vec::new();
    let mut current: Option<ResultRecord> = None;
    let mut cell_name: Option<String> = None;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) => match e.name().as_ref() {
                b"row" => {
                    let mut record = ResultRecord::new();
                    if let Some(id) = attr_value(e, b"id")? {
                        record.push("id", id);
                    }
                    current = Some(record);
                }
                b"cell" if current.is_some() => {
                    cell_name = Some(cell_field_name(e)?);
                    text.clear();
                }
                _ => {}
            },
            Event::Empty(ref e) => match e.name().as_ref() {
                b"row" => {
                    let mut record = ResultRecord::new();
                    if let Some(id) = attr_value(e, b"id")? {
                        record.push("id", id);
                    }
                    records.push(record);
                }
                b"cell" => {
                    if let Some(record) = current.as_mut() {
                        record.push(cell_field_name(e)?, "");
                    }
                }
                _ => {}
            },
            Event::Text(ref e) => {
                if cell_name.is_some() {
                    text.push_str(&e.unescape()?);
                }
            }
            Event::CData(ref e) => {
                if cell_name.is_some() {
                    if let Ok(t) = String::from_utf8(e.to_vec()) {
                        text.push_str(&t);
                    }
                }
            }
            Event::End(ref e) => match e.name().as_ref() {
                b"cell" => {
                    if let (Some(record), Some(name)) = (current.as_mut(), cell_name.take()) {
                        record.push(name, text.trim());
                    }
                }
                b"row" => {
                    if let Some(record) = current.take() {
                        records.push(record);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(records)
}

/// Total result count from the `<rows total_count=..>` attribute, None if absent.
pub fn extract_total(xml: &[u8]) -> Result<Option<u64>, ParseError> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(ref e) | Event::Empty(ref e) if e.name().as_ref() == b"rows" => {
                return match attr_value(e, b"total_count")? {
                    Some(v) => v
                        .trim()
                        .parse::<u64>()
                        .map(Some)
                        .map_err(|_| ParseError::BadTotal(v)),
                    None => Ok(None),
                };
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
        buf.clear();
    }
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>, ParseError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Field name for a cell: `class` attribute, else `id`, else empty, with
/// any `grid_` prefix removed.
fn cell_field_name(e: &BytesStart<'_>) -> Result<String, ParseError> {
    let mut class_attr = None;
    let mut id_attr = None;
    for attr in e.attributes() {
        let attr = attr?;
        match attr.key.as_ref() {
            b"class" => class_attr = Some(attr.unescape_value()?.into_owned()),
            b"id" => id_attr = Some(attr.unescape_value()?.into_owned()),
            _ => {}
        }
    }
    let name = class_attr.or(id_attr).unwrap_or_default();
    Ok(name.replace("grid_", ""))
}
