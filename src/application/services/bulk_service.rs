//! Bulk shortening from CSV files and single CSV lines.
//!
//! Input files carry a `URI,QR` header (any of `,` `;` tab `|` as delimiter)
//! and one `<url><delim><0|1>` row per target. Output rows report the short
//! link, the QR link, an error message and the validation status of each row.

use futures::{StreamExt, stream};
use serde_json::json;
use std::sync::Arc;

use super::short_url_service::{CreateShortUrlData, ShortUrlService};
use crate::domain::entities::{SafetyStatus, ShortUrl};
use crate::error::AppError;
use crate::utils::csv_format::{detect_delimiter, first_line, write_record};

pub const NO_URL: &str = "no_url";
pub const NO_QR: &str = "no_qr";
pub const NO_ERROR: &str = "no_error";

const OUTPUT_HEADER: [&str; 5] = ["URI", "short_URI", "QR", "message", "validation_status"];

/// Result of processing an uploaded CSV file.
#[derive(Debug, Clone)]
pub struct BulkCsvOutput {
    /// Output CSV, using the delimiter detected in the input.
    pub content: String,
    /// Short link of the first successfully processed row.
    pub first_short_url: Option<String>,
    pub total: usize,
    pub failed: usize,
}

/// Outcome of a single input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkRow {
    pub uri: String,
    pub short_url: Option<String>,
    pub qr_url: Option<String>,
    pub error: Option<String>,
    pub status: &'static str,
}

impl BulkRow {
    fn fields(&self) -> [&str; 5] {
        [
            &self.uri,
            self.short_url.as_deref().unwrap_or(NO_URL),
            self.qr_url.as_deref().unwrap_or(NO_QR),
            self.error.as_deref().unwrap_or(NO_ERROR),
            self.status,
        ]
    }
}

fn status_label(short_url: &ShortUrl) -> &'static str {
    match short_url.safety() {
        SafetyStatus::Pending => "pending_validation",
        SafetyStatus::Safe => "safe",
        SafetyStatus::Unsafe => "unsafe",
    }
}

/// Service shortening many URLs at once through [`ShortUrlService`].
pub struct BulkService {
    short_urls: Arc<ShortUrlService>,
    concurrency: usize,
}

impl BulkService {
    pub fn new(short_urls: Arc<ShortUrlService>, concurrency: usize) -> Self {
        Self {
            short_urls,
            concurrency: concurrency.max(1),
        }
    }

    /// Processes an uploaded CSV file.
    ///
    /// Rows are shortened concurrently; output order matches input order. A row
    /// that fails to shorten is reported in the output, it does not fail the file.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] if the file is not UTF-8, the header is not
    /// exactly `URI`,`QR`, or any row does not have exactly two fields.
    pub async fn process_csv(
        &self,
        content: &[u8],
        ip: Option<String>,
    ) -> Result<BulkCsvOutput, AppError> {
        let text = std::str::from_utf8(content)
            .map_err(|_| csv_rejected("File is not valid UTF-8", json!({})))?;
        let text = text.trim_start_matches('\u{feff}');

        let delimiter = detect_delimiter(first_line(text));
        let rows = parse_rows(text, delimiter)?;

        let results: Vec<BulkRow> = stream::iter(rows)
            .map(|(uri, qr)| {
                let data = CreateShortUrlData {
                    ip: ip.clone(),
                    sponsor: None,
                };
                async move { self.shorten_row(uri, qr == "1", data).await }
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut content = String::new();
        push_record(&mut content, &OUTPUT_HEADER, delimiter)?;
        for row in &results {
            push_record(&mut content, &row.fields(), delimiter)?;
        }

        let failed = results.iter().filter(|r| r.error.is_some()).count();
        tracing::info!(total = results.len(), failed, "Bulk CSV processed");

        Ok(BulkCsvOutput {
            content,
            first_short_url: results.iter().find_map(|r| r.short_url.clone()),
            total: results.len(),
            failed,
        })
    }

    /// Processes one CSV line, as received over the fast-bulk socket.
    ///
    /// Returns `None` for blank lines and for the `URI<delim>QR` header line;
    /// otherwise a comma separated result row.
    pub async fn process_line(&self, line: &str, ip: Option<String>) -> Option<String> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return None;
        }

        let delimiter = detect_delimiter(line);
        if line.starts_with(&format!("URI{}QR", delimiter as char)) {
            return None;
        }

        let row = match parse_line(line, delimiter) {
            Ok((uri, qr)) => {
                let data = CreateShortUrlData { ip, sponsor: None };
                self.shorten_row(uri, qr == "1", data).await
            }
            Err(message) => BulkRow {
                uri: line.to_string(),
                short_url: None,
                qr_url: None,
                error: Some(message),
                status: "not_processed",
            },
        };

        match write_record(&row.fields(), b',') {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::error!(error = %e, "Failed to encode bulk result");
                None
            }
        }
    }

    async fn shorten_row(&self, uri: String, qr_request: bool, data: CreateShortUrlData) -> BulkRow {
        match self.short_urls.create(&uri, qr_request, data).await {
            Ok(short_url) => {
                let links = self.short_urls.links();
                BulkRow {
                    short_url: Some(links.link(&short_url.hash)),
                    qr_url: qr_request.then(|| links.qr_link(&short_url.hash)),
                    error: None,
                    status: status_label(&short_url),
                    uri,
                }
            }
            Err(e) => {
                tracing::debug!(uri = %uri, error = %e, "Bulk row failed");
                BulkRow {
                    uri,
                    short_url: None,
                    qr_url: None,
                    error: Some(e.to_string()),
                    status: "not_processed",
                }
            }
        }
    }
}

fn csv_rejected(message: &str, details: serde_json::Value) -> AppError {
    AppError::bad_request(format!("CSV could not be processed: {message}"), details)
}

fn reader(text: &str, delimiter: u8) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes())
}

/// Line number (1-based) of the first blank line followed by more data.
///
/// The csv reader skips blank lines, so they have to be found on the raw text.
fn interior_blank_line(text: &str) -> Option<usize> {
    let lines: Vec<&str> = text.lines().collect();
    let last = lines.iter().rposition(|l| !l.trim().is_empty())?;
    lines[..last]
        .iter()
        .position(|l| l.trim().is_empty())
        .map(|i| i + 1)
}

/// Validates the header and returns `(uri, qr)` for every data row.
///
/// The header must match `URI`,`QR` exactly; data fields are trimmed.
fn parse_rows(text: &str, delimiter: u8) -> Result<Vec<(String, String)>, AppError> {
    if let Some(line) = interior_blank_line(text) {
        return Err(csv_rejected("blank row before end of file", json!({ "line": line })));
    }

    let mut records = reader(text, delimiter).into_records();

    let header = match records.next() {
        Some(Ok(header)) => header,
        Some(Err(e)) => return Err(csv_rejected("malformed header", json!({ "reason": e.to_string() }))),
        None => return Err(csv_rejected("file is empty", json!({}))),
    };
    if header.len() != 2 || &header[0] != "URI" || &header[1] != "QR" {
        return Err(csv_rejected(
            "header must be URI,QR",
            json!({ "header": header.iter().collect::<Vec<_>>() }),
        ));
    }

    let mut rows = Vec::new();
    for (index, record) in records.enumerate() {
        let line = index + 2;
        let mut record = record.map_err(|e| {
            csv_rejected("malformed row", json!({ "line": line, "reason": e.to_string() }))
        })?;
        record.trim();

        if record.len() != 2 {
            return Err(csv_rejected(
                "every row must have exactly two fields",
                json!({ "line": line, "fields": record.len() }),
            ));
        }

        rows.push((record[0].to_string(), record[1].to_string()));
    }

    Ok(rows)
}

fn parse_line(line: &str, delimiter: u8) -> Result<(String, String), String> {
    let mut record = match reader(line, delimiter).records().next() {
        Some(Ok(record)) => record,
        Some(Err(e)) => return Err(format!("Malformed line: {e}")),
        None => return Err("Empty line".to_string()),
    };
    record.trim();

    if record.len() != 2 {
        return Err(format!("Expected 2 fields, found {}", record.len()));
    }
    Ok((record[0].to_string(), record[1].to_string()))
}

fn push_record(out: &mut String, fields: &[&str], delimiter: u8) -> Result<(), AppError> {
    let record = write_record(fields, delimiter).map_err(|e| {
        AppError::internal("Failed to write CSV output", json!({ "reason": e.to_string() }))
    })?;
    out.push_str(&record);
    out.push('\n');
    Ok(())
}
