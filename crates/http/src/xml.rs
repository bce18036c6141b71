//! Listing response decoding
//!
//! The usage API answers a list action with a document like:
//!
//! ```xml
//! <?xml version="1.0" encoding="ISO-8859-1"?>
//! <list>
//!   <file type="file" name="123/a.txt" size="12" md5="..." mtime="1260000000"/>
//!   <file type="dir" name="123/sub" mtime="1260000000"/>
//!   <resume start="/123/sub"/>
//! </list>
//! ```
//!
//! Bodies declared as ISO-8859-1 are transcoded to UTF-8 before parsing.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use encoding_rs::WINDOWS_1252;
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::{Deserialize, Deserializer};

use ns_core::{FileEntry, ListResult};

/// Errors that can occur while decoding a listing body
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The XML declaration names a charset other than UTF-8 or ISO-8859-1
    #[error("unsupported charset: {0:?}")]
    UnsupportedCharset(String),

    /// The body is not valid UTF-8
    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// An error from the underlying quick-xml reader
    #[error("XML processing error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The document does not match the listing shape
    #[error("{0}")]
    Deserialize(#[from] quick_xml::de::DeError),
}

#[derive(Debug, Deserialize)]
struct ListDocument {
    #[serde(rename = "file", default)]
    files: Vec<FileElement>,

    #[serde(default)]
    resume: Option<ResumeElement>,
}

#[derive(Debug, Deserialize)]
struct FileElement {
    #[serde(rename = "@type", default)]
    kind: String,
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@size", default, deserialize_with = "empty_as_zero")]
    size: u64,
    #[serde(rename = "@md5", default)]
    md5: String,
    #[serde(rename = "@mtime", default, deserialize_with = "empty_as_zero")]
    mtime: i64,
}

#[derive(Debug, Deserialize)]
struct ResumeElement {
    #[serde(rename = "@start", default)]
    start: String,
}

/// Numeric attribute where an empty value means zero
fn empty_as_zero<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr + Default,
    T::Err: fmt::Display,
{
    let value = String::deserialize(deserializer)?;
    let value = value.trim();
    if value.is_empty() {
        return Ok(T::default());
    }
    value.parse().map_err(serde::de::Error::custom)
}

impl From<FileElement> for FileEntry {
    fn from(file: FileElement) -> Self {
        FileEntry {
            kind: file.kind.into(),
            name: file.name,
            size: file.size,
            md5: file.md5,
            mtime: file.mtime,
        }
    }
}

/// Decode a listing response body
pub fn decode_listing(body: &[u8]) -> Result<ListResult, DecodeError> {
    let text = to_utf8(body)?;
    let document: ListDocument = quick_xml::de::from_str(&text)?;

    Ok(ListResult {
        entries: document.files.into_iter().map(FileEntry::from).collect(),
        resume: document.resume.map(|r| r.start).unwrap_or_default(),
    })
}

/// Convert the body to UTF-8 according to its XML declaration
fn to_utf8(body: &[u8]) -> Result<Cow<'_, str>, DecodeError> {
    match declared_encoding(body)? {
        None => Ok(Cow::Borrowed(std::str::from_utf8(body)?)),
        Some(label) if label.eq_ignore_ascii_case("utf-8") => {
            Ok(Cow::Borrowed(std::str::from_utf8(body)?))
        }
        // Windows-1252 is a superset of ISO-8859-1.
        Some(label) if label.eq_ignore_ascii_case("iso-8859-1") => {
            Ok(WINDOWS_1252.decode_without_bom_handling(body).0)
        }
        Some(label) => Err(DecodeError::UnsupportedCharset(label)),
    }
}

/// Encoding named in the XML declaration, if there is one
fn declared_encoding(body: &[u8]) -> Result<Option<String>, DecodeError> {
    let mut reader = Reader::from_reader(body);

    match reader.read_event()? {
        Event::Decl(decl) => match decl.encoding() {
            Some(encoding) => {
                let encoding = encoding.map_err(quick_xml::Error::from)?;
                Ok(Some(String::from_utf8_lossy(&encoding).into_owned()))
            }
            None => Ok(None),
        },
        _ => Ok(None),
    }
}
