//! Source table loaders
//!
//! Loaders produce a `RawTable` from CSV bytes. The file loader tries a list of
//! paths in order and returns the first that reads, so a published export can
//! be backed by a local copy.

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::TrendError;
use crate::schema::RawTable;

/// Trait for anything that can produce the raw measurement table
pub trait TableSource {
    /// Stable identifier, used as the cache key
    fn id(&self) -> String;

    /// Read the whole table
    fn load(&self) -> Result<RawTable, TrendError>;
}

impl<T: TableSource + ?Sized> TableSource for &T {
    fn id(&self) -> String {
        (**self).id()
    }

    fn load(&self) -> Result<RawTable, TrendError> {
        (**self).load()
    }
}

/// Parse CSV with a header row from any reader.
///
/// Header names are trimmed; data cells are kept verbatim so person names group
/// by exact string. Rows may be ragged; short rows read as empty cells.
pub fn parse_csv<R: Read>(reader: R) -> Result<RawTable, TrendError> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(|e| TrendError::LoadError(format!("failed to read CSV header: {e}")))?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();

    if headers.iter().all(|h| h.is_empty()) {
        return Err(TrendError::LoadError("CSV has no header row".to_string()));
    }

    let mut rows = Vec::new();
    for (line_num, result) in rdr.records().enumerate() {
        let record = result
            .map_err(|e| TrendError::LoadError(format!("failed to parse CSV row {}: {e}", line_num + 2)))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    debug!(columns = headers.len(), rows = rows.len(), "parsed CSV table");
    Ok(RawTable::new(headers, rows))
}

/// In-memory CSV source
#[derive(Debug, Clone)]
pub struct CsvReaderSource {
    id: String,
    data: Vec<u8>,
}

impl CsvReaderSource {
    pub fn new(id: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            data: data.into(),
        }
    }

    /// Drain a reader (stdin, a socket body) into a source
    pub fn from_reader<R: Read>(id: impl Into<String>, mut reader: R) -> Result<Self, TrendError> {
        let mut data = Vec::new();
        reader
            .read_to_end(&mut data)
            .map_err(|e| TrendError::LoadError(format!("failed to read input: {e}")))?;
        Ok(Self::new(id, data))
    }
}

impl TableSource for CsvReaderSource {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn load(&self) -> Result<RawTable, TrendError> {
        parse_csv(self.data.as_slice())
    }
}

/// CSV file source with ordered fallbacks
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    paths: Vec<PathBuf>,
}

impl CsvFileSource {
    /// Source reading a single file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            paths: vec![path.into()],
        }
    }

    /// Source trying `paths` in order
    pub fn with_fallbacks(paths: Vec<PathBuf>) -> Result<Self, TrendError> {
        if paths.is_empty() {
            return Err(TrendError::ConfigError("no source paths configured".to_string()));
        }
        Ok(Self { paths })
    }

    /// Add another path to try after the existing ones
    pub fn fallback(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths.push(path.into());
        self
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    fn load_path(path: &Path) -> Result<RawTable, TrendError> {
        let file = File::open(path).map_err(|e| TrendError::LoadError(e.to_string()))?;
        parse_csv(file)
    }
}

impl TableSource for CsvFileSource {
    fn id(&self) -> String {
        self.paths
            .first()
            .map(|p| p.display().to_string())
            .unwrap_or_default()
    }

    fn load(&self) -> Result<RawTable, TrendError> {
        let mut failures = Vec::new();

        for path in &self.paths {
            match Self::load_path(path) {
                Ok(table) => return Ok(table),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "source load failed, trying next");
                    failures.push(format!("{}: {e}", path.display()));
                }
            }
        }

        Err(TrendError::LoadError(failures.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_parse_csv_trims_headers_and_pads() {
        let table = parse_csv("a, b ,c\n1, 2\n3,4,5\n".as_bytes()).unwrap();
        assert_eq!(table.headers(), &["a", "b", "c"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.cell(0, 1), " 2");
        assert_eq!(table.cell(0, 2), "");
        assert_eq!(table.cell(1, 2), "5");
    }

    #[test]
    fn test_person_cells_keep_surrounding_spaces() {
        let table = parse_csv("name,kg\nTaro,70\nTaro ,71\n".as_bytes()).unwrap();
        assert_eq!(table.cell(0, 0), "Taro");
        assert_eq!(table.cell(1, 0), "Taro ");
    }

    #[test]
    fn test_parse_csv_quoted_cells() {
        let table = parse_csv("name,note\n\"Sato, Ken\",\"a \"\"b\"\"\"\n".as_bytes()).unwrap();
        assert_eq!(table.cell(0, 0), "Sato, Ken");
        assert_eq!(table.cell(0, 1), "a \"b\"");
    }

    #[test]
    fn test_empty_input_is_load_error() {
        let err = parse_csv("".as_bytes()).unwrap_err();
        assert!(matches!(err, TrendError::LoadError(_)));
    }

    #[test]
    fn test_file_source_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.csv");
        let present = dir.path().join("present.csv");
        let mut file = File::create(&present).unwrap();
        writeln!(file, "x,y\n1,2").unwrap();

        let source = CsvFileSource::new(&missing).fallback(&present);
        assert_eq!(source.id(), missing.display().to_string());

        let table = source.load().unwrap();
        assert_eq!(table.headers(), &["x", "y"]);
        assert_eq!(table.cell(0, 1), "2");
    }

    #[test]
    fn test_file_source_all_fail() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvFileSource::with_fallbacks(vec![
            dir.path().join("a.csv"),
            dir.path().join("b.csv"),
        ])
        .unwrap();

        let err = source.load().unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, TrendError::LoadError(_)));
        assert!(message.contains("a.csv"));
        assert!(message.contains("b.csv"));
    }

    #[test]
    fn test_no_paths_is_config_error() {
        assert!(matches!(
            CsvFileSource::with_fallbacks(Vec::new()),
            Err(TrendError::ConfigError(_))
        ));
    }

    #[test]
    fn test_reader_source_round_trip() {
        let source = CsvReaderSource::from_reader("stdin", "h\nv\n".as_bytes()).unwrap();
        assert_eq!(source.id(), "stdin");
        assert_eq!(source.load().unwrap().cell(0, 0), "v");
    }
}
