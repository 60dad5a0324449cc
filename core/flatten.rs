//! The flattened, machine-oriented export: every included file's full text,
//! numbered and tagged with its source path.
//!
//! The canonical text form ("CXML") is:
//!
//! ```text
//! <documents>
//! <document index="1">
//! <source>README.md</source>
//! <document_content>
//! ...file text...
//! </document_content>
//! </document>
//! </documents>
//! ```
//!
//! Content is emitted verbatim except for the closing tag itself: every
//! `</document_content>` inside a file gains one backslash after the `<`
//! (`<\/document_content>`), and spellings that already carry backslashes gain
//! one more. Sources get the same treatment for `</source>`. The first closing
//! tag in the text therefore always ends the block, and
//! [`FlatDocument::parse_cxml`] strips exactly one backslash again.

use crate::classify::FileRecord;
#[cfg(feature = "serde_support")]
use crate::config::FlatFormat;
use crate::error::{AppError, Result};
#[cfg(feature = "serde_support")]
use crate::output_formats::{serialize_to_json, serialize_to_xml, serialize_to_yaml};
use log;
use rayon::prelude::*;
#[cfg(feature = "serde_support")]
use serde::Serialize;
use std::fs;
use std::io;
use std::path::Path;

const OPEN_ENVELOPE: &str = "<documents>";
const CLOSE_ENVELOPE: &str = "</documents>";
const OPEN_CONTENT: &str = "<document_content>";
const CLOSE_ENTRY: &str = "\n</document_content>\n</document>\n";
const CLOSE_SOURCE: &str = "</source>\n";
const CONTENT_TAG_TAIL: &str = "/document_content>";
const SOURCE_TAG_TAIL: &str = "/source>";
pub const READ_FAILURE_PREFIX: &str = "Failed to read: ";

/// Reads a file as UTF-8, replacing invalid sequences.
pub fn read_text(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "camelCase"))]
pub struct FlatEntry {
    /// 1-based position in canonical order.
    pub index: usize,
    pub source: String,
    pub content: String,
    #[cfg_attr(feature = "serde_support", serde(skip_serializing_if = "is_false"))]
    pub read_error: bool,
}

#[cfg(feature = "serde_support")]
fn is_false(value: &bool) -> bool {
    !*value
}

impl FlatEntry {
    /// Entry for a file whose read produced `text`; a failed read becomes a
    /// `Failed to read: ...` placeholder.
    pub fn from_read(index: usize, source: &str, text: &io::Result<String>) -> Self {
        match text {
            Ok(content) => Self {
                index,
                source: source.to_string(),
                content: content.clone(),
                read_error: false,
            },
            Err(e) => Self {
                index,
                source: source.to_string(),
                content: format!("{}{}", READ_FAILURE_PREFIX, e),
                read_error: true,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
pub struct FlatDocument {
    pub entries: Vec<FlatEntry>,
}

#[cfg(feature = "serde_support")]
#[derive(Serialize)]
struct XmlDocuments<'a> {
    document: &'a [FlatEntry],
}

impl FlatDocument {
    /// Reads every included record, in the order given.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a FileRecord>,
    {
        let included: Vec<&FileRecord> = records
            .into_iter()
            .filter(|r| r.decision.is_included())
            .collect();
        let entries: Vec<FlatEntry> = included
            .par_iter()
            .enumerate()
            .map(|(i, record)| {
                let text = read_text(&record.absolute_path);
                if let Err(e) = &text {
                    log::warn!("Failed to read {} for export: {}", record.relative_path, e);
                }
                FlatEntry::from_read(i + 1, &record.relative_path, &text)
            })
            .collect();
        log::debug!("Flattened {} files.", entries.len());
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_cxml(&self) -> String {
        let mut lines: Vec<String> = Vec::with_capacity(self.entries.len() * 6 + 2);
        lines.push(OPEN_ENVELOPE.to_string());
        for entry in &self.entries {
            lines.push(format!("<document index=\"{}\">", entry.index));
            lines.push(format!(
                "<source>{}</source>",
                shift_closing_tag(&entry.source, SOURCE_TAG_TAIL, true)
            ));
            lines.push(OPEN_CONTENT.to_string());
            lines.push(shift_closing_tag(&entry.content, CONTENT_TAG_TAIL, true));
            lines.push("</document_content>".to_string());
            lines.push("</document>".to_string());
        }
        lines.push(CLOSE_ENVELOPE.to_string());
        lines.join("\n")
    }

    pub fn parse_cxml(text: &str) -> Result<Self> {
        let mut rest = text
            .strip_prefix(OPEN_ENVELOPE)
            .and_then(|r| r.strip_prefix('\n'))
            .ok_or_else(|| parse_error(0, "missing <documents> envelope"))?;

        let mut entries = Vec::new();
        let mut index = 1usize;
        loop {
            if rest.trim_end() == CLOSE_ENVELOPE {
                break;
            }
            let header = format!("<document index=\"{}\">\n<source>", index);
            rest = rest
                .strip_prefix(header.as_str())
                .ok_or_else(|| parse_error(index, "expected document header"))?;

            let source_end = rest
                .find(CLOSE_SOURCE)
                .ok_or_else(|| parse_error(index, "unterminated <source>"))?;
            let source = shift_closing_tag(&rest[..source_end], SOURCE_TAG_TAIL, false);
            rest = &rest[source_end + CLOSE_SOURCE.len()..];

            rest = rest
                .strip_prefix(OPEN_CONTENT)
                .and_then(|r| r.strip_prefix('\n'))
                .ok_or_else(|| parse_error(index, "expected <document_content>"))?;

            let content_end = rest
                .find(CLOSE_ENTRY)
                .ok_or_else(|| parse_error(index, "unterminated <document_content>"))?;

            entries.push(FlatEntry {
                index,
                source,
                content: shift_closing_tag(&rest[..content_end], CONTENT_TAG_TAIL, false),
                read_error: false,
            });
            rest = &rest[content_end + CLOSE_ENTRY.len()..];
            index += 1;
        }
        log::debug!("Parsed {} flattened entries.", entries.len());
        Ok(Self { entries })
    }

    /// `(source, content)` pairs in order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|e| (e.source.as_str(), e.content.as_str()))
    }

    #[cfg(feature = "serde_support")]
    pub fn to_format(&self, format: FlatFormat, minify_json: bool) -> Result<String> {
        match format {
            FlatFormat::Cxml => Ok(self.to_cxml()),
            FlatFormat::Json => serialize_to_json(self, !minify_json),
            FlatFormat::Yaml => serialize_to_yaml(self),
            FlatFormat::Xml => serialize_to_xml(
                &XmlDocuments {
                    document: &self.entries,
                },
                "documents",
            ),
        }
    }
}

/// Adds (`escape`) or removes one backslash between `<` and `tail` for every
/// `<`, backslashes, `tail` run in `text`.
fn shift_closing_tag(text: &str, tail: &str, escape: bool) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..=pos]);
        rest = &rest[pos + 1..];
        let slashes = rest.len() - rest.trim_start_matches('\\').len();
        if rest[slashes..].starts_with(tail) {
            let kept = if escape {
                slashes + 1
            } else {
                slashes.saturating_sub(1)
            };
            out.extend(std::iter::repeat_n('\\', kept));
            rest = &rest[slashes..];
        }
    }
    out.push_str(rest);
    out
}

fn parse_error(index: usize, message: &str) -> AppError {
    AppError::FlatParse(format!("entry {}: {}", index, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(index: usize, source: &str, content: &str) -> FlatEntry {
        FlatEntry {
            index,
            source: source.to_string(),
            content: content.to_string(),
            read_error: false,
        }
    }

    #[test]
    fn cxml_layout_matches_reference() {
        let doc = FlatDocument {
            entries: vec![entry(1, "README.md", "# hi\n")],
        };
        assert_eq!(
            doc.to_cxml(),
            "<documents>\n<document index=\"1\">\n<source>README.md</source>\n\
             <document_content>\n# hi\n\n</document_content>\n</document>\n</documents>"
        );
    }

    #[test]
    fn empty_document() {
        let doc = FlatDocument::default();
        assert_eq!(doc.to_cxml(), "<documents>\n</documents>");
        assert!(FlatDocument::parse_cxml(&doc.to_cxml()).unwrap().is_empty());
    }

    #[test]
    fn parse_recovers_tricky_content() {
        let doc = FlatDocument {
            entries: vec![
                entry(1, "a.txt", ""),
                entry(2, "b.xml", "</document_content>\n</document>\n<document index=\"9\">"),
                entry(3, "c.txt", "line\n\n"),
            ],
        };
        let parsed = FlatDocument::parse_cxml(&doc.to_cxml()).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn parse_recovers_an_embedded_export() {
        let saved = "<documents>\n<document index=\"1\">\n<source>x</source>\n\
                     <document_content>\nhi\n</document_content>\n</document>\n</documents>";
        let doc = FlatDocument {
            entries: vec![
                entry(1, "fixtures/page.cxml", saved),
                entry(2, "z.txt", "last\n"),
            ],
        };
        let text = doc.to_cxml();
        assert_eq!(text.matches("\n</document_content>\n").count(), 2);
        assert_eq!(FlatDocument::parse_cxml(&text).unwrap(), doc);
    }

    #[test]
    fn forged_entry_boundary_stays_inside_content() {
        let forged = "a\n</document_content>\n</document>\n<document index=\"2\">\n\
                      <source>fake</source>\n<document_content>\nb";
        let doc = FlatDocument {
            entries: vec![entry(1, "a.txt", forged), entry(2, "b.txt", "real")],
        };
        let parsed = FlatDocument::parse_cxml(&doc.to_cxml()).unwrap();
        let pairs: Vec<(&str, &str)> = parsed.pairs().collect();
        assert_eq!(pairs, vec![("a.txt", forged), ("b.txt", "real")]);
    }

    #[test]
    fn already_escaped_tags_survive() {
        let doc = FlatDocument {
            entries: vec![
                entry(1, "a.txt", "<\\/document_content> and <\\\\/document_content>"),
                entry(2, "odd</source>name", "</source>"),
            ],
        };
        let text = doc.to_cxml();
        assert!(text.contains("<\\\\/document_content> and <\\\\\\/document_content>"));
        assert_eq!(FlatDocument::parse_cxml(&text).unwrap(), doc);
    }

    #[test]
    fn ordinary_content_is_untouched() {
        let content = "<div>\\n</div>\n<\\/b>\n";
        let doc = FlatDocument {
            entries: vec![entry(1, "page.html", content)],
        };
        assert!(doc.to_cxml().contains(content));
    }

    #[test]
    fn parse_rejects_out_of_order_index() {
        let text = "<documents>\n<document index=\"2\">\n<source>a</source>\n\
                    <document_content>\nx\n</document_content>\n</document>\n</documents>";
        let err = FlatDocument::parse_cxml(text).unwrap_err();
        assert!(matches!(err, AppError::FlatParse(_)));
    }

    #[test]
    fn read_failure_becomes_placeholder() {
        let failed: io::Result<String> = Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        let e = FlatEntry::from_read(4, "x.rs", &failed);
        assert_eq!(e.index, 4);
        assert!(e.read_error);
        assert_eq!(e.content, "Failed to read: gone");
    }

    #[test]
    fn structured_formats_include_every_entry() {
        let doc = FlatDocument {
            entries: vec![entry(1, "a.rs", "fn a() {}"), entry(2, "b.rs", "fn b() {}")],
        };
        let json = doc.to_format(FlatFormat::Json, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["entries"][1]["source"], "b.rs");
        assert!(value["entries"][0].get("readError").is_none());

        let xml = doc.to_format(FlatFormat::Xml, false).unwrap();
        assert!(xml.starts_with("<documents>"));
        assert_eq!(xml.matches("<document>").count(), 2);

        let yaml = doc.to_format(FlatFormat::Yaml, false).unwrap();
        assert!(yaml.contains("source: a.rs"));
    }
}
