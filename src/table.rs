//! Email table input and classified table output.
//!
//! Input is a headed CSV with at least a subject and a sender column; every
//! other column is carried through untouched. Output appends `important`,
//! `reason` and `confidence` (and optionally `raw_reply`) aligned by row.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use serde_json::{Map, Value};

use crate::classify::Classification;

/// Columns appended to every output row.
pub const RESULT_COLUMNS: [&str; 3] = ["important", "reason", "confidence"];

/// Column holding the unparsed model reply when raw output is kept.
pub const RAW_REPLY_COLUMN: &str = "raw_reply";

/// Errors reading or writing email tables.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// File open/create failure.
    #[error("failed to access {path}: {source}")]
    Io {
        /// Offending path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
    /// CSV header could not be read.
    #[error("failed to read CSV header: {0}")]
    Header(csv::Error),
    /// A data row could not be read (including ragged rows).
    #[error("CSV parse error at row {row}: {source}")]
    Row {
        /// 1-based data row number.
        row: usize,
        /// Underlying error.
        source: csv::Error,
    },
    /// A required column is absent from the header.
    #[error("missing column '{column}' (available: {available})")]
    MissingColumn {
        /// Requested header.
        column: String,
        /// Comma-joined headers that were found.
        available: String,
    },
    /// An input header would collide with an appended result column.
    #[error("input column '{column}' clashes with a result column; rename it first")]
    ReservedColumn {
        /// Clashing header.
        column: String,
    },
    /// Result count does not match row count.
    #[error("{results} results for {rows} rows")]
    LengthMismatch {
        /// Number of table rows.
        rows: usize,
        /// Number of results supplied.
        results: usize,
    },
    /// CSV write failure.
    #[error("failed to write CSV: {0}")]
    Write(#[from] csv::Error),
    /// JSON Lines write failure.
    #[error("failed to write JSON Lines: {0}")]
    Json(#[from] serde_json::Error),
    /// Generic output stream failure.
    #[error("failed to write output: {0}")]
    Output(#[from] std::io::Error),
}

/// One email row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailRecord {
    /// Subject line.
    pub subject: String,
    /// Sender address or display name.
    pub sender: String,
    /// Every cell of the source row, in header order.
    pub fields: Vec<String>,
}

/// Loaded email rows plus their header.
#[derive(Debug, Clone, Default)]
pub struct EmailTable {
    headers: Vec<String>,
    records: Vec<EmailRecord>,
}

fn reject_reserved(headers: &[String]) -> Result<(), TableError> {
    match headers
        .iter()
        .find(|h| RESULT_COLUMNS.contains(&h.as_str()) || h.as_str() == RAW_REPLY_COLUMN)
    {
        Some(column) => Err(TableError::ReservedColumn {
            column: column.clone(),
        }),
        None => Ok(()),
    }
}

fn find_column(headers: &[String], wanted: &str) -> Result<usize, TableError> {
    headers
        .iter()
        .position(|h| h == wanted)
        .or_else(|| headers.iter().position(|h| h.eq_ignore_ascii_case(wanted)))
        .ok_or_else(|| TableError::MissingColumn {
            column: wanted.to_owned(),
            available: headers.join(", "),
        })
}

impl EmailTable {
    /// Read a headed CSV from any reader.
    ///
    /// Header lookup tries an exact match first, then ASCII case-insensitive.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] for a missing subject/sender column, a header
    /// named like a result column, or a malformed or ragged row.
    pub fn from_reader<R: Read>(
        reader: R,
        subject_column: &str,
        sender_column: &str,
    ) -> Result<Self, TableError> {
        let mut csv = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(reader);

        let headers: Vec<String> = csv
            .headers()
            .map_err(TableError::Header)?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_owned())
            .collect();

        reject_reserved(&headers)?;
        let subject_idx = find_column(&headers, subject_column)?;
        let sender_idx = find_column(&headers, sender_column)?;

        let mut records = Vec::new();
        for (i, result) in csv.records().enumerate() {
            let record = result.map_err(|source| TableError::Row {
                row: i.saturating_add(1),
                source,
            })?;
            let fields: Vec<String> = record.iter().map(str::to_owned).collect();
            records.push(EmailRecord {
                subject: fields.get(subject_idx).cloned().unwrap_or_default(),
                sender: fields.get(sender_idx).cloned().unwrap_or_default(),
                fields,
            });
        }

        Ok(Self { headers, records })
    }

    /// Read a headed CSV file.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Io`] if the file cannot be opened, otherwise as
    /// [`EmailTable::from_reader`].
    pub fn from_csv_path(
        path: &Path,
        subject_column: &str,
        sender_column: &str,
    ) -> Result<Self, TableError> {
        let file = File::open(path).map_err(|source| TableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file, subject_column, sender_column)
    }

    /// Build a table directly from records (headers `Subject`, `Sender`).
    pub fn from_records(records: Vec<(String, String)>) -> Self {
        let records = records
            .into_iter()
            .map(|(subject, sender)| EmailRecord {
                fields: vec![subject.clone(), sender.clone()],
                subject,
                sender,
            })
            .collect();
        Self {
            headers: vec!["Subject".to_owned(), "Sender".to_owned()],
            records,
        }
    }

    /// Source header row.
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// All rows in file order.
    pub fn records(&self) -> &[EmailRecord] {
        &self.records
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Attach one result per row.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::LengthMismatch`] unless `results` (and
    /// `raw_replies`, when given) have exactly one entry per row.
    pub fn with_results(
        self,
        results: Vec<Option<Classification>>,
        raw_replies: Option<Vec<Option<String>>>,
    ) -> Result<ClassifiedTable, TableError> {
        let rows = self.len();
        if results.len() != rows {
            return Err(TableError::LengthMismatch {
                rows,
                results: results.len(),
            });
        }
        if let Some(raw) = &raw_replies {
            if raw.len() != rows {
                return Err(TableError::LengthMismatch {
                    rows,
                    results: raw.len(),
                });
            }
        }
        Ok(ClassifiedTable {
            table: self,
            results,
            raw_replies,
        })
    }
}

/// Output file flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Comma-separated values; absent results become empty cells.
    Csv,
    /// One JSON object per line; absent results become `null`.
    JsonLines,
}

impl OutputFormat {
    /// Pick a format from a file extension (`.jsonl`/`.ndjson` → JSON Lines).
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("jsonl") || ext.eq_ignore_ascii_case("ndjson") => {
                Self::JsonLines
            }
            _ => Self::Csv,
        }
    }
}

/// An email table merged with its classification results.
#[derive(Debug, Clone)]
pub struct ClassifiedTable {
    table: EmailTable,
    results: Vec<Option<Classification>>,
    raw_replies: Option<Vec<Option<String>>>,
}

impl ClassifiedTable {
    /// The source table.
    pub fn table(&self) -> &EmailTable {
        &self.table
    }

    /// One result per row; `None` where the reply could not be parsed.
    pub fn results(&self) -> &[Option<Classification>] {
        &self.results
    }

    /// Raw model replies, if kept; `None` per row where the call failed.
    pub fn raw_replies(&self) -> Option<&[Option<String>]> {
        self.raw_replies.as_deref()
    }

    /// Number of rows with a parsed result.
    pub fn parsed_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_some()).count()
    }

    fn output_headers(&self) -> Vec<&str> {
        let mut headers: Vec<&str> = self.table.headers.iter().map(String::as_str).collect();
        headers.extend(RESULT_COLUMNS);
        if self.raw_replies.is_some() {
            headers.push(RAW_REPLY_COLUMN);
        }
        headers
    }

    fn raw_at(&self, row: usize) -> Option<&str> {
        self.raw_replies
            .as_ref()
            .and_then(|raw| raw.get(row))
            .and_then(|r| r.as_deref())
    }

    /// Write the merged table as CSV.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] on any write failure.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), TableError> {
        let mut csv = csv::WriterBuilder::new().from_writer(writer);
        csv.write_record(self.output_headers())?;

        for (row, (record, result)) in self.table.records.iter().zip(&self.results).enumerate() {
            let mut cells: Vec<&str> = record.fields.iter().map(String::as_str).collect();
            match result {
                Some(c) => cells.extend([
                    c.important.as_str(),
                    c.reason.as_str(),
                    c.confidence.as_str(),
                ]),
                None => cells.extend(["", "", ""]),
            }
            if self.raw_replies.is_some() {
                cells.push(self.raw_at(row).unwrap_or(""));
            }
            csv.write_record(&cells)?;
        }

        csv.flush()?;
        Ok(())
    }

    /// Write the merged table as JSON Lines.
    ///
    /// # Errors
    ///
    /// Returns [`TableError`] on any write failure.
    pub fn write_jsonl<W: Write>(&self, mut writer: W) -> Result<(), TableError> {
        for (row, (record, result)) in self.table.records.iter().zip(&self.results).enumerate() {
            let mut object = Map::new();
            for (header, value) in self.table.headers.iter().zip(&record.fields) {
                object.insert(header.clone(), Value::String(value.clone()));
            }
            let values: [Option<&str>; 3] = match result {
                Some(c) => [
                    Some(c.important.as_str()),
                    Some(c.reason.as_str()),
                    Some(c.confidence.as_str()),
                ],
                None => [None; 3],
            };
            for (column, value) in RESULT_COLUMNS.iter().zip(values) {
                object.insert(
                    (*column).to_owned(),
                    value.map_or(Value::Null, |v| Value::String(v.to_owned())),
                );
            }
            if self.raw_replies.is_some() {
                object.insert(
                    RAW_REPLY_COLUMN.to_owned(),
                    self.raw_at(row)
                        .map_or(Value::Null, |v| Value::String(v.to_owned())),
                );
            }
            serde_json::to_writer(&mut writer, &Value::Object(object))?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }

    /// Write to `path`, choosing the format from its extension.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::Io`] if the file cannot be created, otherwise
    /// any write failure.
    pub fn write_path(&self, path: &Path) -> Result<(), TableError> {
        let file = File::create(path).map_err(|source| TableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let writer = BufWriter::new(file);
        match OutputFormat::from_path(path) {
            OutputFormat::Csv => self.write_csv(writer),
            OutputFormat::JsonLines => self.write_jsonl(writer),
        }
    }
}
