//! CSV Data Loader Module
//! Fetches CSV content from a URL or file path and parses it with Polars.

use polars::prelude::*;
use reqwest::blocking::Client;
use reqwest::header::USER_AGENT;
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{AnalysisError, Result};

/// Rows sampled for schema inference.
pub const INFER_SCHEMA_ROWS: usize = 10_000;

/// HTTP request timeout for remote sources.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

const CLIENT_AGENT: &str = concat!("incident-analysis/", env!("CARGO_PKG_VERSION"));

/// Loads CSV sources into DataFrames.
pub struct DataLoader {
    client: Client,
}

impl DataLoader {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AnalysisError::Fetch {
                source_name: "http client".to_string(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }

    /// Fetch and parse a CSV source (`http(s)://` URL or local path).
    ///
    /// Columns keep header order and rows keep source order.
    pub fn load_csv(&self, source: &str) -> Result<DataFrame> {
        let bytes = self.fetch(source)?;
        let df = Self::parse_csv(source, bytes)?;
        info!(
            source,
            rows = df.height(),
            columns = df.width(),
            "loaded table"
        );
        Ok(df)
    }

    /// Parse in-memory CSV content.
    ///
    /// Rows must all have the header's field count.
    pub fn parse_csv(source: &str, bytes: Vec<u8>) -> Result<DataFrame> {
        Self::validate_shape(source, &bytes)?;

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
            .into_reader_with_file_handle(Cursor::new(bytes))
            .finish()
            .map_err(|e| AnalysisError::Parse {
                source_name: source.to_string(),
                message: e.to_string(),
            })
    }

    fn fetch(&self, source: &str) -> Result<Vec<u8>> {
        if is_remote(source) {
            debug!(url = source, "fetching remote source");
            let fetch_error = |message: String| AnalysisError::Fetch {
                source_name: source.to_string(),
                message,
            };
            let response = self
                .client
                .get(source)
                .header(USER_AGENT, CLIENT_AGENT)
                .send()
                .and_then(|r| r.error_for_status())
                .map_err(|e| fetch_error(e.to_string()))?;
            let body = response.bytes().map_err(|e| fetch_error(e.to_string()))?;
            Ok(body.to_vec())
        } else {
            debug!(path = source, "reading local source");
            std::fs::read(Path::new(source)).map_err(|e| AnalysisError::Fetch {
                source_name: source.to_string(),
                message: e.to_string(),
            })
        }
    }

    fn validate_shape(source: &str, bytes: &[u8]) -> Result<()> {
        let parse_error = |message: String| AnalysisError::Parse {
            source_name: source.to_string(),
            message,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(false)
            .from_reader(bytes);
        let width = reader
            .byte_headers()
            .map_err(|e| parse_error(e.to_string()))?
            .len();
        if width == 0 {
            return Err(parse_error("missing header row".to_string()));
        }
        for record in reader.byte_records() {
            record.map_err(|e| parse_error(e.to_string()))?;
        }
        Ok(())
    }
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}
