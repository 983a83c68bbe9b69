//! Delimited source file reader
//!
//! Opens a CSV file with a header row and yields each data row as a
//! [`RawRecord`] in file order. A row that fails to parse is reported as a
//! row-local error; a read failure on the file itself ends the stream.

use csv::{ReaderBuilder, StringRecord, StringRecordsIntoIter, Trim};
use relay_common::record::RawRecord;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ProducerError, Result};

/// One parsed data row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRow {
    /// 1-based line number in the source file
    pub line: u64,
    pub record: RawRecord,
}

/// An opened source file, headers already read
pub struct CsvSource {
    path: PathBuf,
    headers: Vec<String>,
    reader: csv::Reader<File>,
}

impl CsvSource {
    /// Open `path` and read its header row.
    ///
    /// Fails with [`ProducerError::SourceUnavailable`] when the file is
    /// missing, unreadable, or has no readable header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let unavailable = |source| ProducerError::SourceUnavailable {
            path: path.clone(),
            source,
        };

        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::Headers)
            .from_path(&path)
            .map_err(unavailable)?;

        let headers: Vec<String> = reader
            .headers()
            .map_err(unavailable)?
            .iter()
            .map(str::to_string)
            .collect();

        debug!(path = %path.display(), columns = ?headers, "Source opened");

        Ok(Self {
            path,
            headers,
            reader,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Consume the source into an iterator over its data rows
    pub fn rows(self) -> SourceRows {
        SourceRows {
            path: self.path,
            headers: self.headers,
            records: self.reader.into_records(),
            finished: false,
        }
    }
}

/// Iterator over data rows; see [`CsvSource::rows`]
pub struct SourceRows {
    path: PathBuf,
    headers: Vec<String>,
    records: StringRecordsIntoIter<File>,
    finished: bool,
}

impl SourceRows {
    fn to_row(&self, record: &StringRecord) -> SourceRow {
        let line = record.position().map_or(0, |p| p.line());
        let fields = self
            .headers
            .iter()
            .zip(record.iter())
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect();

        SourceRow {
            line,
            record: RawRecord::new(fields),
        }
    }
}

impl Iterator for SourceRows {
    type Item = Result<SourceRow>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.records.next()? {
            Ok(record) => Some(Ok(self.to_row(&record))),
            Err(source) if matches!(source.kind(), csv::ErrorKind::Io(_)) => {
                self.finished = true;
                Some(Err(ProducerError::SourceUnavailable {
                    path: self.path.clone(),
                    source,
                }))
            },
            Err(source) => {
                let line = source.position().map_or(0, |p| p.line());
                Some(Err(ProducerError::MalformedRow { line, source }))
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_rows_follow_file_order_with_line_numbers() {
        let file = csv_file("name, age ,location\nAlice,30,NYC\nBob,,\n");
        let source = CsvSource::open(file.path()).unwrap();
        assert_eq!(source.headers(), ["name", "age", "location"]);

        let rows: Vec<SourceRow> = source.rows().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[0].record.get("name"), Some("Alice"));
        assert_eq!(rows[0].record.get("age"), Some("30"));
        assert_eq!(rows[1].line, 3);
        assert_eq!(rows[1].record.get("location"), Some(""));
    }

    #[test]
    fn test_missing_file_is_source_unavailable() {
        let err = CsvSource::open("/definitely/not/here.csv").err().unwrap();
        assert!(matches!(err, ProducerError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("/definitely/not/here.csv"));
    }

    #[test]
    fn test_ragged_row_is_row_local() {
        let file = csv_file("name,age,location\nAlice,30,NYC\nBroken,1\nCarol,41,LA\n");
        let rows: Vec<_> = CsvSource::open(file.path()).unwrap().rows().collect();

        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_ok());
        let err = rows[1].as_ref().unwrap_err();
        assert!(err.is_row_local());
        assert_eq!(rows[2].as_ref().unwrap().record.get("name"), Some("Carol"));
    }
}
