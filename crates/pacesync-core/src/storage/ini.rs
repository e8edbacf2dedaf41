//! INI parsing
//!
//! Parses the simulator's pacenote and car configuration files into a
//! section → key → value mapping. The dialect follows what the game
//! plugins write and what the devices expect back:
//!
//! - blank lines and lines starting with `;` or `#` are ignored
//! - `[name]` opens a section; repeated headers merge into one section
//! - `key = value` splits on the first `=`; both sides are trimmed
//! - quoted values are taken verbatim, unquoted values stop at an
//!   unescaped `;` or `#`
//! - a bare `key` is stored as `"true"`
//! - keys before the first header live at the top level; a section named
//!   like one of them is discarded together with its keys, so the earlier
//!   top-level value wins

use std::collections::BTreeMap;

use serde::Serialize;

use super::error::IniError;

/// Key → value pairs of a single section
pub type IniSection = BTreeMap<String, String>;

/// Parsed INI document
///
/// Serializes as one JSON object: top-level keys map to strings and each
/// section maps to an object of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IniDocument {
    #[serde(flatten)]
    root: IniSection,
    #[serde(flatten)]
    sections: BTreeMap<String, IniSection>,
}

impl IniDocument {
    /// Parse INI text
    pub fn parse(text: &str) -> Result<Self, IniError> {
        let mut doc = Self::default();
        let mut current: Option<String> = None;
        let mut shadowed = false;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let line = raw.trim();

            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }

            if let Some(rest) = line.strip_prefix('[') {
                let Some(end) = rest.find(']') else {
                    return Err(IniError::UnterminatedSection { line: line_no });
                };
                let name = rest[..end].trim().to_string();
                shadowed = doc.root.contains_key(&name);
                if !shadowed {
                    doc.sections.entry(name.clone()).or_default();
                }
                current = Some(name);
                continue;
            }

            let (key, value) = match line.split_once('=') {
                Some((key, value)) => (key.trim(), parse_value(value.trim())),
                None => (line, "true".to_string()),
            };

            if key.is_empty() {
                return Err(IniError::EmptyKey { line: line_no });
            }
            if shadowed {
                continue;
            }

            let target = match &current {
                Some(name) => doc.sections.entry(name.clone()).or_default(),
                None => &mut doc.root,
            };
            target.insert(key.to_string(), value);
        }

        Ok(doc)
    }

    /// Look up a value inside a section
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }

    /// Get a section by name
    pub fn section(&self, name: &str) -> Option<&IniSection> {
        self.sections.get(name)
    }

    /// Keys defined before the first section header
    pub fn root(&self) -> &IniSection {
        &self.root
    }

    /// Number of sections
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
}

/// Unquote a value or strip its inline comment
fn parse_value(raw: &str) -> String {
    let bytes = raw.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        if (first == b'"' || first == b'\'') && bytes[bytes.len() - 1] == first {
            return raw[1..raw.len() - 1].to_string();
        }
    }

    let mut value = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some(&next) if matches!(next, '\\' | ';' | '#') => {
                    value.push(next);
                    chars.next();
                }
                _ => value.push(c),
            },
            ';' | '#' => break,
            _ => value.push(c),
        }
    }

    value.trim().to_string()
}
