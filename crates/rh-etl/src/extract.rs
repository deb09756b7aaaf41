//! Streaming extraction of delimited, optionally gzip-compressed sources
//!
//! An [`Extractor`] yields chunks of typed [`Record`]s. Rows with the wrong
//! field count or undecodable bytes are counted as malformed and skipped;
//! typed fields that do not parse are coerced to `Absent`. Opening the same
//! file again restarts the sequence.

use crate::error::ExtractError;
use csv::{ByteRecord, ReaderBuilder};
use flate2::read::MultiGzDecoder;
use rh_core::{Record, RecordShape, Value};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;

/// Extraction knobs
#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// Records per chunk
    pub chunk_rows: usize,
    /// Stop after this many data rows
    pub limit: Option<u64>,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            chunk_rows: 10_000,
            limit: None,
        }
    }
}

/// Counters for one pass over a source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractStats {
    /// Data rows read, malformed ones included
    pub rows_read: u64,
    /// Rows skipped as malformed
    pub malformed: u64,
    /// Typed fields coerced to absent
    pub coerced: u64,
}

/// Lazy reader over one source file
pub struct Extractor {
    reader: csv::Reader<Box<dyn Read + Send>>,
    shape: Arc<RecordShape>,
    options: ExtractOptions,
    label: String,
    buf: ByteRecord,
    stats: ExtractStats,
    done: bool,
}

impl std::fmt::Debug for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Extractor")
            .field("label", &self.label)
            .field("stats", &self.stats)
            .field("done", &self.done)
            .finish()
    }
}

impl Extractor {
    /// Open a source file and validate its header.
    ///
    /// Paths ending in `.gz` are decompressed as (possibly multi-member)
    /// gzip streams.
    pub fn open(
        path: &Path,
        shape: Arc<RecordShape>,
        options: ExtractOptions,
    ) -> Result<Self, ExtractError> {
        let label = path.display().to_string();
        if !path.is_file() {
            return Err(ExtractError::NotFound { path: label });
        }
        let file = File::open(path).map_err(|e| ExtractError::Read {
            path: label.clone(),
            message: e.to_string(),
        })?;

        let is_gzip = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("gz"))
            .unwrap_or(false);
        let reader: Box<dyn Read + Send> = if is_gzip {
            Box::new(MultiGzDecoder::new(BufReader::with_capacity(1 << 20, file)))
        } else {
            Box::new(BufReader::with_capacity(1 << 20, file))
        };

        Self::from_reader(reader, &label, shape, options)
    }

    /// Wrap an already-decoded byte stream and validate its header
    pub fn from_reader(
        reader: Box<dyn Read + Send>,
        label: &str,
        shape: Arc<RecordShape>,
        options: ExtractOptions,
    ) -> Result<Self, ExtractError> {
        let reader = ReaderBuilder::new()
            .delimiter(shape.delimiter())
            .has_headers(false)
            .quoting(false)
            .flexible(true)
            .trim(csv::Trim::None)
            .from_reader(reader);

        let mut extractor = Self {
            reader,
            shape,
            options,
            label: label.to_string(),
            buf: ByteRecord::new(),
            stats: ExtractStats::default(),
            done: false,
        };
        extractor.check_header()?;
        Ok(extractor)
    }

    fn read_error(&self, err: csv::Error) -> ExtractError {
        ExtractError::Read {
            path: self.label.clone(),
            message: err.to_string(),
        }
    }

    fn check_header(&mut self) -> Result<(), ExtractError> {
        let mut header = ByteRecord::new();
        let found = match self.reader.read_byte_record(&mut header) {
            Ok(true) => header
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect::<Vec<_>>(),
            Ok(false) => Vec::new(),
            Err(e) => return Err(self.read_error(e)),
        };

        let expected: Vec<&str> = self.shape.names().collect();
        if found.iter().map(String::as_str).ne(expected.iter().copied()) {
            return Err(ExtractError::HeaderMismatch {
                path: self.label.clone(),
                expected: expected.join(", "),
                found: found.join(", "),
            });
        }
        Ok(())
    }

    fn limit_reached(&self) -> bool {
        self.options
            .limit
            .is_some_and(|limit| self.stats.rows_read >= limit)
    }

    /// Next chunk of at most `chunk_rows` records, or `None` at the end
    pub fn next_chunk(&mut self) -> Result<Option<Vec<Record>>, ExtractError> {
        let capacity = self.options.chunk_rows.max(1);
        let mut chunk = Vec::with_capacity(capacity.min(65_536));

        while chunk.len() < capacity && !self.done {
            if self.limit_reached() {
                self.done = true;
                break;
            }
            match self.reader.read_byte_record(&mut self.buf) {
                Ok(true) => {}
                Ok(false) => {
                    self.done = true;
                    break;
                }
                Err(e) => {
                    self.done = true;
                    return Err(self.read_error(e));
                }
            }

            self.stats.rows_read += 1;
            let line = self.stats.rows_read;
            if let Some(record) = self.decode(line) {
                chunk.push(record);
            }
        }

        if chunk.is_empty() && self.done {
            Ok(None)
        } else {
            Ok(Some(chunk))
        }
    }

    fn decode(&mut self, line: u64) -> Option<Record> {
        if self.buf.len() != self.shape.len() {
            self.stats.malformed += 1;
            log::debug!(
                "{}: row {} has {} fields, expected {}",
                self.label,
                line,
                self.buf.len(),
                self.shape.len()
            );
            return None;
        }

        let mut values = Vec::with_capacity(self.shape.len());
        for (position, raw) in self.buf.iter().enumerate() {
            let Ok(text) = std::str::from_utf8(raw) else {
                self.stats.malformed += 1;
                log::debug!("{}: row {} is not valid UTF-8", self.label, line);
                return None;
            };
            match self.shape.decode_field(position, text) {
                Ok(value) => values.push(value),
                Err(e) => {
                    self.stats.coerced += 1;
                    log::debug!(
                        "{}: row {} column '{}': {}, using NULL",
                        self.label,
                        line,
                        self.shape.columns()[position].name,
                        e
                    );
                    values.push(Value::Absent);
                }
            }
        }

        Some(Record::new(Arc::clone(&self.shape), values, line))
    }

    pub fn stats(&self) -> ExtractStats {
        self.stats
    }

    pub fn shape(&self) -> &Arc<RecordShape> {
        &self.shape
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Open a source and validate its header without reading any data rows
pub fn preflight(path: &Path, shape: Arc<RecordShape>) -> Result<(), ExtractError> {
    Extractor::open(path, shape, ExtractOptions::default()).map(|_| ())
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
