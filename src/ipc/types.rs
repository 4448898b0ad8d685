use chrono::NaiveDateTime;
use serde::Deserialize;
use std::time::Instant;

use crate::config::AppConfig;
use crate::directory::{self, DirectoryCache, Fetched};
use crate::identity::{self, IdentityStore};
use crate::workbook::{self, Workbook, WorkbookError};

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Process-wide state. The workbook handle is created on first use and kept;
/// the directory cache only ever swaps whole snapshots.
pub struct AppState {
    pub config: AppConfig,
    pub account: String,
    pub identity: IdentityStore,
    pub directory: DirectoryCache,
    pub workbook: Option<Box<dyn Workbook>>,
    pub fixed_now: Option<NaiveDateTime>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let fixed_now = match config.fixed_now() {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring fixed_now");
                None
            }
        };
        Self {
            account: identity::local_account(),
            identity: IdentityStore::new(config.identity_dir()),
            directory: DirectoryCache::new(config.cache_ttl()),
            workbook: None,
            fixed_now,
            config,
        }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.fixed_now
            .unwrap_or_else(|| chrono::Local::now().naive_local())
    }

    /// Identity key for the session described by `params.session`.
    pub fn identity_key(&self, params: &serde_json::Value) -> String {
        let session = params
            .get("session")
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        identity::identity_key(&self.account, &session)
    }

    pub fn tables(&mut self) -> Fetched {
        let config = &self.config;
        let slot = &mut self.workbook;
        self.directory.fetch_tables(Instant::now(), || {
            let book = ensure_workbook(slot, config)?;
            directory::load_tables(book, &config.sheets)
        })
    }

    pub fn workbook(&mut self) -> Result<&dyn Workbook, WorkbookError> {
        ensure_workbook(&mut self.workbook, &self.config)
    }
}

fn ensure_workbook<'a>(
    slot: &'a mut Option<Box<dyn Workbook>>,
    config: &AppConfig,
) -> Result<&'a dyn Workbook, WorkbookError> {
    if slot.is_none() {
        let book = workbook::open(config)?;
        tracing::info!(backend = book.backend(), "workbook ready");
        *slot = Some(book);
    }
    slot.as_deref()
        .ok_or_else(|| WorkbookError::Config("workbook unavailable".to_string()))
}
