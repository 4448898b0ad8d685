//! Spreadsheet-shaped storage behind the directory and the exit log.
//!
//! A workbook is a set of named worksheets. Readers see a worksheet as a
//! header row plus data rows; writers may only append rows.

pub mod credentials;
pub mod google;
pub mod sqlite;

use crate::config::{AppConfig, Backend};

#[derive(Debug, thiserror::Error)]
pub enum WorkbookError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("credentials unavailable: {0}")]
    Credentials(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),
    #[error("worksheet not found: {0}")]
    WorksheetNotFound(String),
    #[error("worksheet {sheet} has no column {column}")]
    MissingColumn { sheet: String, column: String },
    #[error("http request failed (status {status:?}): {message}")]
    Http { status: Option<u16>, message: String },
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("malformed data: {0}")]
    Malformed(String),
}

/// A worksheet read in full, with "all records" normalisation applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Worksheet {
    pub title: String,
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Worksheet {
    /// First row is the header; data rows are padded (or cut) to the header
    /// width and fully blank rows are dropped.
    pub fn from_values(title: &str, values: Vec<Vec<String>>) -> Self {
        let mut it = values.into_iter();
        let header: Vec<String> = it
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|h| h.trim().to_string())
            .collect();
        let width = header.len();
        let rows = it
            .filter(|r| r.iter().any(|c| !c.trim().is_empty()))
            .map(|mut r| {
                r.resize(width, String::new());
                r
            })
            .collect();
        Self {
            title: title.to_string(),
            header,
            rows,
        }
    }

    pub fn column(&self, name: &str) -> Result<usize, WorkbookError> {
        self.header
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| WorkbookError::MissingColumn {
                sheet: self.title.clone(),
                column: name.to_string(),
            })
    }
}

pub trait Workbook {
    fn backend(&self) -> &'static str;

    fn read_worksheet(&self, title: &str) -> Result<Worksheet, WorkbookError>;

    /// Appends one row after the last non-empty row. Never rewrites
    /// existing rows.
    fn append_row(&self, title: &str, row: &[String]) -> Result<(), WorkbookError>;
}

/// Opens the configured backend. For Google this loads credentials and
/// builds the HTTP client; no request is made until the first read.
pub fn open(config: &AppConfig) -> Result<Box<dyn Workbook>, WorkbookError> {
    match config.backend {
        Backend::Google => {
            let (key, source) = credentials::ServiceAccountKey::load(
                &config.credentials.env_var,
                &config.credentials.file,
            )?;
            tracing::info!(
                source = %source,
                client_email = %key.client_email,
                "loaded service account credentials"
            );
            let sheets = google::GoogleSheets::connect(
                key,
                &config.sheets.spreadsheet,
                config.sheets.spreadsheet_id.clone(),
                config.http_timeout(),
            )?;
            Ok(Box::new(sheets))
        }
        Backend::Sqlite => {
            let book = sqlite::SqliteWorkbook::open(&config.sqlite.path, &config.sheets)?;
            Ok(Box::new(book))
        }
    }
}
