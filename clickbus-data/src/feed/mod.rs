//! CSV feeds for the municipality and order import passes.
//!
//! A [`Feed`] yields one [`FeedRow`] per data line. Rows that cannot be
//! decoded are yielded as errors carrying their line number so the importer
//! can record them and move on; only an unreadable file stops iteration.

mod records;

use std::{io::Read, marker::PhantomData};

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::fs_utf8;
use csv::{ErrorKind, Position, ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use thiserror::Error;

pub use records::{FieldError, MunicipalityRecord, OrderRecord};

use crate::fs::open_feed_file;

/// Errors raised while reading a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed file could not be opened.
    #[error("failed to open feed {path}")]
    Open {
        /// Feed location.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The header line could not be read.
    #[error("failed to read header of {source_name}")]
    Headers {
        /// Feed location or label.
        source_name: String,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },
    /// A record could not be read from the underlying stream.
    #[error("failed to read record at line {line}")]
    Read {
        /// 1-based line number in the file.
        line: u64,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },
    /// A record was read but did not match the expected columns.
    #[error("failed to decode record at line {line}")]
    Decode {
        /// 1-based line number in the file.
        line: u64,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },
}

/// One data line of a feed.
#[derive(Debug)]
pub struct FeedRow<T> {
    /// 1-based line number in the file, counting the header.
    pub line: u64,
    /// The decoded record, or why it could not be decoded.
    pub record: Result<T, FeedError>,
}

/// Iterator over the records of a CSV feed with a header line.
///
/// Headers and fields are trimmed. Extra columns are ignored and missing
/// columns decode as their serde default.
pub struct Feed<T, R = fs_utf8::File> {
    reader: csv::Reader<R>,
    headers: StringRecord,
    finished: bool,
    record: PhantomData<fn() -> T>,
}

impl<T> Feed<T> {
    /// Open the feed stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Open`] when the file cannot be opened and
    /// [`FeedError::Headers`] when its first line cannot be read.
    pub fn open(path: &Utf8Path) -> Result<Self, FeedError> {
        let file = open_feed_file(path).map_err(|source| FeedError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file, path.as_str())
    }
}

impl<T, R: Read> Feed<T, R> {
    /// Read a feed from any byte stream; `source_name` labels errors.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Headers`] when the header line cannot be read.
    pub fn from_reader(reader: R, source_name: &str) -> Result<Self, FeedError> {
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);
        let headers = reader
            .headers()
            .map_err(|source| FeedError::Headers {
                source_name: source_name.to_owned(),
                source,
            })?
            .clone();
        Ok(Self {
            reader,
            headers,
            finished: false,
            record: PhantomData,
        })
    }
}

impl<T, R> std::fmt::Debug for Feed<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Feed")
            .field("headers", &self.headers)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl<T: DeserializeOwned, R: Read> Iterator for Feed<T, R> {
    type Item = FeedRow<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let mut raw = StringRecord::new();
        match self.reader.read_record(&mut raw) {
            Ok(false) => {
                self.finished = true;
                None
            }
            Ok(true) => {
                let line = raw.position().map_or(0, Position::line);
                let record = raw
                    .deserialize(Some(&self.headers))
                    .map_err(|source| FeedError::Decode { line, source });
                Some(FeedRow { line, record })
            }
            Err(source) => {
                let line = source.position().map_or(0, Position::line);
                // Invalid UTF-8 spoils one record; anything else spoils the stream.
                if !matches!(source.kind(), ErrorKind::Utf8 { .. }) {
                    self.finished = true;
                }
                Some(FeedRow {
                    line,
                    record: Err(FeedError::Read { line, source }),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn municipality_feed(contents: &str) -> Feed<MunicipalityRecord, &[u8]> {
        Feed::from_reader(contents.as_bytes(), "inline").expect("headers should parse")
    }

    #[rstest]
    fn yields_records_with_line_numbers() {
        let rows: Vec<_> =
            municipality_feed("COD,NOME,UF\n3304557,Rio de Janeiro,RJ\n3550308,São Paulo,SP\n")
                .collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[1].line, 3);
        let second = rows[1].record.as_ref().expect("second row decodes");
        assert_eq!(second.code, 3_550_308);
        assert_eq!(second.name, "São Paulo");
    }

    #[rstest]
    fn undecodable_rows_do_not_stop_iteration() {
        let rows: Vec<_> =
            municipality_feed("COD,NOME,UF\nabc,Nowhere,RJ\n3509502,Campinas,SP\n").collect();

        assert!(matches!(
            rows[0].record,
            Err(FeedError::Decode { line: 2, .. })
        ));
        assert_eq!(
            rows[1].record.as_ref().expect("valid row decodes").name,
            "Campinas"
        );
    }

    #[rstest]
    fn invalid_utf8_skips_only_its_row() {
        let bytes: &[u8] = b"COD,NOME,UF\n3304557,Rio\xff,RJ\n3550308,S\xc3\xa3o Paulo,SP\n";
        let rows: Vec<_> = Feed::<MunicipalityRecord, &[u8]>::from_reader(bytes, "inline")
            .expect("headers should parse")
            .collect();

        assert_eq!(rows.len(), 2);
        assert!(matches!(
            rows[0].record,
            Err(FeedError::Read { line: 2, .. })
        ));
        assert_eq!(rows[1].line, 3);
        let next = rows[1].record.as_ref().expect("row after the bad bytes decodes");
        assert_eq!(next.code, 3_550_308);
        assert_eq!(next.name, "São Paulo");
    }

    #[rstest]
    fn trims_headers_and_fields() {
        let rows: Vec<_> =
            municipality_feed(" COD , NOME , UF \n 3509502 , Campinas , SP \n").collect();

        let record = rows[0].record.as_ref().expect("row decodes");
        assert_eq!(record.name, "Campinas");
        assert_eq!(record.uf, "SP");
    }

    #[rstest]
    fn empty_input_yields_nothing() {
        assert_eq!(municipality_feed("").count(), 0);
    }

    #[rstest]
    fn open_reports_missing_file() {
        let err = Feed::<MunicipalityRecord>::open(Utf8Path::new("/definitely/missing.csv"))
            .expect_err("missing file should fail");

        assert!(matches!(err, FeedError::Open { .. }));
    }
}
