//! Record sources.
//!
//! A [`RecordProvider`] yields bets in file order. `Ok(None)` means the
//! source is exhausted; any `Err` is fatal for the session.
//!
//! # Example
//!
//! ```
//! use bet_client::provider::{CsvRecordProvider, RecordProvider};
//!
//! let data = "Santiago Lionel,Lorca,30904465,1999-03-17,7574\n";
//! let mut provider = CsvRecordProvider::from_reader("1", data.as_bytes());
//!
//! let bet = provider.next_record().unwrap().unwrap();
//! assert_eq!(bet.document, "30904465");
//! assert!(provider.next_record().unwrap().is_none());
//! ```

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::codec::BetRecord;
use crate::error::{ClientError, Result};

/// Number of columns in an agency CSV row.
pub const CSV_COLUMNS: usize = 5;

/// Ordered, finite source of bets.
pub trait RecordProvider {
    /// Next record, or `None` once the source is exhausted.
    fn next_record(&mut self) -> Result<Option<BetRecord>>;
}

impl RecordProvider for std::vec::IntoIter<BetRecord> {
    fn next_record(&mut self) -> Result<Option<BetRecord>> {
        Ok(self.next())
    }
}

impl<P: RecordProvider + ?Sized> RecordProvider for Box<P> {
    fn next_record(&mut self) -> Result<Option<BetRecord>> {
        (**self).next_record()
    }
}

/// In-memory provider over an already loaded record list.
pub fn from_records(records: Vec<BetRecord>) -> std::vec::IntoIter<BetRecord> {
    records.into_iter()
}

/// Reads headerless agency CSV rows:
/// `first_name,last_name,document,birthdate,number`.
///
/// The agency field of every record is the client identifier.
pub struct CsvRecordProvider<R> {
    reader: csv::Reader<R>,
    agency: String,
    record: csv::StringRecord,
}

impl CsvRecordProvider<File> {
    /// Open an agency CSV file.
    pub fn open<P: AsRef<Path>>(agency: impl Into<String>, path: P) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        Ok(Self::with_reader(agency, reader))
    }
}

impl<R: Read> CsvRecordProvider<R> {
    /// Wrap any reader holding agency CSV rows.
    pub fn from_reader(agency: impl Into<String>, reader: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);
        Self::with_reader(agency, reader)
    }

    fn with_reader(agency: impl Into<String>, reader: csv::Reader<R>) -> Self {
        Self {
            reader,
            agency: agency.into(),
            record: csv::StringRecord::new(),
        }
    }
}

impl<R: Read> RecordProvider for CsvRecordProvider<R> {
    fn next_record(&mut self) -> Result<Option<BetRecord>> {
        if !self.reader.read_record(&mut self.record)? {
            return Ok(None);
        }
        if self.record.len() != CSV_COLUMNS {
            let line = self.record.position().map_or(0, |p| p.line());
            return Err(ClientError::Format(format!(
                "line {line}: expected {CSV_COLUMNS} columns, found {}",
                self.record.len()
            )));
        }
        let field = |i: usize| self.record.get(i).unwrap_or_default().to_string();
        Ok(Some(BetRecord::new(
            self.agency.clone(),
            field(0),
            field(1),
            field(2),
            field(3),
            field(4),
        )))
    }
}
