use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use roxmltree::{Document, Node};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StringTableError {
    #[error("failed to read string table {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed XML in {path} at line {line}, column {column}: {message}")]
    Malformed {
        path: PathBuf,
        line: u32,
        column: u32,
        message: String,
    },
    #[error("{path}: root element must be <Strings>, found <{found}>")]
    InvalidRoot { path: PathBuf, found: String },
    #[error("{path}:{line}: unexpected element <{found}>; only <String> is allowed")]
    UnknownElement {
        path: PathBuf,
        line: u32,
        found: String,
    },
    #[error("{path}:{line}: <String> is missing a non-empty key attribute")]
    MissingKey { path: PathBuf, line: u32 },
    #[error("{path}:{line}: duplicate string key '{key}'")]
    DuplicateKey {
        path: PathBuf,
        line: u32,
        key: String,
    },
}

/// Localized strings for one language, parsed from
/// `<Strings lang="en"><String key="...">text</String></Strings>`.
#[derive(Debug, Clone, Default)]
pub struct StringTable {
    lang: String,
    entries: HashMap<String, String>,
}

impl StringTable {
    pub fn load(path: &Path) -> Result<Self, StringTableError> {
        let raw = fs::read_to_string(path).map_err(|source| StringTableError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let table = Self::parse(path, &raw)?;
        info!(
            path = %path.display(),
            lang = table.lang.as_str(),
            entries = table.entries.len(),
            "string_table_loaded"
        );
        Ok(table)
    }

    pub fn parse(path: &Path, raw: &str) -> Result<Self, StringTableError> {
        let doc = Document::parse(raw).map_err(|error| StringTableError::Malformed {
            path: path.to_path_buf(),
            line: error.pos().row,
            column: error.pos().col,
            message: error.to_string(),
        })?;

        let root = doc.root_element();
        if root.tag_name().name() != "Strings" {
            return Err(StringTableError::InvalidRoot {
                path: path.to_path_buf(),
                found: root.tag_name().name().to_string(),
            });
        }

        let mut entries = HashMap::new();
        for child in root.children().filter(Node::is_element) {
            let line = doc.text_pos_at(child.range().start).row;
            if child.tag_name().name() != "String" {
                return Err(StringTableError::UnknownElement {
                    path: path.to_path_buf(),
                    line,
                    found: child.tag_name().name().to_string(),
                });
            }
            let key = child
                .attribute("key")
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .ok_or_else(|| StringTableError::MissingKey {
                    path: path.to_path_buf(),
                    line,
                })?;
            let text = child.text().map(str::trim).unwrap_or_default().to_string();
            if entries.insert(key.to_string(), text).is_some() {
                return Err(StringTableError::DuplicateKey {
                    path: path.to_path_buf(),
                    line,
                    key: key.to_string(),
                });
            }
        }

        Ok(Self {
            lang: root.attribute("lang").unwrap_or_default().to_string(),
            entries,
        })
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn parse(raw: &str) -> Result<StringTable, StringTableError> {
        StringTable::parse(Path::new("test.xml"), raw)
    }

    #[test]
    fn parses_keys_and_trims_text() {
        let table = parse(
            r#"<Strings lang="en">
                 <String key="npc.hello">  Hello there!  </String>
                 <String key="empty"></String>
               </Strings>"#,
        )
        .expect("parse");
        assert_eq!(table.lang(), "en");
        assert_eq!(table.get("npc.hello"), Some("Hello there!"));
        assert_eq!(table.get("empty"), Some(""));
        assert_eq!(table.get("missing"), None);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn rejects_wrong_root() {
        let err = parse("<Defs/>").expect_err("root");
        assert!(matches!(err, StringTableError::InvalidRoot { found, .. } if found == "Defs"));
    }

    #[test]
    fn rejects_duplicate_keys_with_line() {
        let err = parse("<Strings>\n<String key=\"a\">1</String>\n<String key=\"a\">2</String>\n</Strings>")
            .expect_err("duplicate");
        assert!(matches!(err, StringTableError::DuplicateKey { line: 3, .. }));
    }

    #[test]
    fn rejects_missing_key_and_unknown_elements() {
        assert!(matches!(
            parse("<Strings><String>x</String></Strings>"),
            Err(StringTableError::MissingKey { .. })
        ));
        assert!(matches!(
            parse("<Strings><Text key=\"a\"/></Strings>"),
            Err(StringTableError::UnknownElement { .. })
        ));
    }

    #[test]
    fn malformed_xml_reports_position() {
        let err = parse("<Strings><String key=\"a\">").expect_err("malformed");
        assert!(matches!(err, StringTableError::Malformed { line: 1, .. }));
    }

    #[test]
    fn load_reads_from_disk() {
        let temp = TempDir::new().expect("tempdir");
        let path = temp.path().join("en.xml");
        fs::write(&path, r#"<Strings lang="en"><String key="k">v</String></Strings>"#)
            .expect("write");
        let table = StringTable::load(&path).expect("load");
        assert_eq!(table.get("k"), Some("v"));

        let missing = StringTable::load(&temp.path().join("fr.xml")).expect_err("missing");
        assert!(matches!(missing, StringTableError::Read { .. }));
    }
}
