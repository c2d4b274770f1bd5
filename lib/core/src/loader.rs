//! Definitions-file loading
//!
//! Parses a line-oriented definitions source into an [`AttributeCatalog`].
//! The record layout is collaborator-defined, so the per-line convention is a
//! pluggable [`RecordParser`] strategy; [`ColumnarParser`] implements the
//! whitespace-columnar layout of content-attribute definition files.
//!
//! Malformed or duplicate records are skipped individually and reported as
//! diagnostics; loading succeeds with a partial catalog. Zero valid records
//! is an error.

use std::fs::File;
use std::io::{BufRead, BufReader, Cursor};
use std::path::Path;

use ahash::AHashSet;

use crate::catalog::{AttributeCandidate, AttributeCatalog, DataType};
use crate::{Error, Result};

/// Outcome of parsing one line of a definitions source
#[derive(Debug, Clone)]
pub enum Parsed {
    /// Structural line (blank, comment, section header): not a record
    Skip,
    Record(AttributeCandidate),
    Malformed(String),
}

/// Per-line record layout strategy
pub trait RecordParser {
    fn parse(&self, line: &str) -> Parsed;
}

/// Whitespace-columnar record layout
///
/// Skips blank lines, `//` comments, `[section]` headers and the `name ...`
/// column-header row. The first whitespace-delimited token is the attribute
/// key; the remainder splits on runs of two or more whitespace characters
/// into columns, with the data type in column 0 and the unit in column 6
/// (`*` meaning no unit).
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnarParser;

const UNIT_COLUMN: usize = 6;

impl RecordParser for ColumnarParser {
    fn parse(&self, line: &str) -> Parsed {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with("//") || stripped.starts_with('[') {
            return Parsed::Skip;
        }
        if stripped.to_ascii_lowercase().starts_with("name") {
            return Parsed::Skip;
        }

        let Some(split_at) = stripped.find(char::is_whitespace) else {
            return Parsed::Malformed(format!(
                "record '{stripped}' has no definition columns"
            ));
        };
        let name = &stripped[..split_at];
        let remainder = stripped[split_at..].trim_start();

        let columns = split_columns(remainder);
        let mut candidate = AttributeCandidate::new(name);
        if let Some(dtype) = columns.first() {
            candidate = candidate.with_data_type(DataType::parse(dtype));
        }
        if let Some(unit) = columns
            .get(UNIT_COLUMN)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty() && *s != "*")
        {
            candidate = candidate.with_unit(unit);
        }

        Parsed::Record(candidate)
    }
}

/// Split on runs of two or more whitespace characters; single spaces stay
/// within a column
fn split_columns(s: &str) -> Vec<String> {
    let mut columns = Vec::new();
    let mut current = String::new();
    let mut whitespace_run = 0usize;

    for ch in s.chars() {
        if ch.is_whitespace() {
            whitespace_run += 1;
            continue;
        }
        if whitespace_run >= 2 && !current.is_empty() {
            columns.push(std::mem::take(&mut current));
        } else if whitespace_run == 1 && !current.is_empty() {
            current.push(' ');
        }
        whitespace_run = 0;
        current.push(ch);
    }
    if !current.is_empty() {
        columns.push(current);
    }

    columns
}

/// A skipped record, reported rather than logged so callers own the policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line number in the source
    pub line: usize,
    pub message: String,
}

/// Result of loading a definitions source: the catalog plus per-record
/// diagnostics for everything that was skipped
#[derive(Debug)]
pub struct LoadReport {
    pub catalog: AttributeCatalog,
    pub diagnostics: Vec<Diagnostic>,
}

/// Parses a definitions source into an immutable catalog
///
/// The loader performs no caching; embedding caches keyed by catalog
/// identity are the similarity layer's concern.
#[derive(Debug, Clone, Default)]
pub struct CatalogLoader<P = ColumnarParser> {
    parser: P,
}

impl CatalogLoader<ColumnarParser> {
    /// Loader for the whitespace-columnar definitions layout
    pub fn columnar() -> Self {
        Self {
            parser: ColumnarParser,
        }
    }
}

impl<P: RecordParser> CatalogLoader<P> {
    pub fn new(parser: P) -> Self {
        Self { parser }
    }

    pub fn load_path(&self, path: &Path) -> Result<LoadReport> {
        let file = File::open(path)?;
        self.load_reader(BufReader::new(file)).map_err(|e| match e {
            Error::EmptyCatalog(_) => Error::EmptyCatalog(path.display().to_string()),
            other => other,
        })
    }

    pub fn load_str(&self, text: &str) -> Result<LoadReport> {
        self.load_reader(Cursor::new(text))
    }

    pub fn load_reader<R: BufRead>(&self, reader: R) -> Result<LoadReport> {
        let mut candidates = Vec::new();
        let mut diagnostics = Vec::new();
        let mut seen: AHashSet<String> = AHashSet::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            match self.parser.parse(&line) {
                Parsed::Skip => {}
                Parsed::Malformed(message) => diagnostics.push(Diagnostic {
                    line: idx + 1,
                    message,
                }),
                Parsed::Record(candidate) => {
                    if seen.insert(candidate.key.clone()) {
                        candidates.push(candidate);
                    } else {
                        diagnostics.push(Diagnostic {
                            line: idx + 1,
                            message: format!(
                                "duplicate key '{}' dropped, first occurrence wins",
                                candidate.key
                            ),
                        });
                    }
                }
            }
        }

        if candidates.is_empty() {
            return Err(Error::EmptyCatalog(
                "definitions source produced no valid records".to_string(),
            ));
        }
        let catalog = AttributeCatalog::new(candidates)?;

        Ok(LoadReport {
            catalog,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const DEFINITIONS: &str = "\
// Content attribute definitions
[General]
Name                  Type       D1    D2    D3    Order  Justify    Unit      Precision
AREA                  FLOAT      2     1     0     3      RIGHT      mm2       0.01
AREA_NET              FLOAT      2     1     0     3      RIGHT      mm2       0.01
WEIGHT                FLOAT      2     1     0     3      RIGHT      kg        0.01
PROFILE               CHARACTER  0     0     0     1      LEFT       *         *
CLASS_ATTR            INTEGER    0     0     0     1      LEFT       *         *
";

    #[test]
    fn test_loads_columnar_definitions() {
        let report = CatalogLoader::columnar().load_str(DEFINITIONS).unwrap();
        assert_eq!(report.catalog.len(), 5);
        assert!(report.diagnostics.is_empty());

        let area = &report.catalog.candidates()[0];
        assert_eq!(area.key, "AREA");
        assert_eq!(area.data_type, Some(DataType::Float));
        assert_eq!(area.unit.as_deref(), Some("mm2"));

        let profile = report.catalog.exact_match("profile").unwrap();
        assert_eq!(profile.data_type, Some(DataType::Character));
        assert_eq!(profile.unit, None, "'*' means no unit");
    }

    #[test]
    fn test_partial_catalog_with_malformed_lines() {
        let mut source = String::new();
        for i in 0..4 {
            source.push_str(&format!("ATTR_{i}              FLOAT      2     1     0     3      RIGHT      mm       0.01\n"));
        }
        source.push_str("DANGLING\n");
        for i in 4..8 {
            source.push_str(&format!("ATTR_{i}              FLOAT      2     1     0     3      RIGHT      mm       0.01\n"));
        }
        source.push_str("LONELY\n");

        let report = CatalogLoader::columnar().load_str(&source).unwrap();
        assert_eq!(report.catalog.len(), 8);
        assert_eq!(report.diagnostics.len(), 2);
        assert_eq!(report.diagnostics[0].line, 5);
        assert_eq!(report.diagnostics[1].line, 10);
    }

    #[test]
    fn test_duplicate_key_reported() {
        let source = "\
AREA                  FLOAT      2     1     0     3      RIGHT      mm2      0.01
AREA                  INTEGER    0     0     0     1      LEFT       *        *
";
        let report = CatalogLoader::columnar().load_str(source).unwrap();
        assert_eq!(report.catalog.len(), 1);
        assert_eq!(report.diagnostics.len(), 1);
        assert!(report.diagnostics[0].message.contains("duplicate key 'AREA'"));
        assert_eq!(
            report.catalog.candidates()[0].data_type,
            Some(DataType::Float),
            "first occurrence wins"
        );
    }

    #[test]
    fn test_zero_valid_records_is_an_error() {
        let source = "// nothing here\n[Section]\n";
        assert!(matches!(
            CatalogLoader::columnar().load_str(source),
            Err(Error::EmptyCatalog(_))
        ));
    }

    #[test]
    fn test_load_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(DEFINITIONS.as_bytes()).unwrap();
        let report = CatalogLoader::columnar().load_path(file.path()).unwrap();
        assert_eq!(report.catalog.len(), 5);
    }

    #[test]
    fn test_missing_file_error_includes_path() {
        let err = CatalogLoader::columnar()
            .load_path(Path::new("/nonexistent/attributes.lis"))
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_split_columns_keeps_single_spaces() {
        let columns = split_columns("FLOAT  some unit  2");
        assert_eq!(columns, vec!["FLOAT", "some unit", "2"]);
    }
}
