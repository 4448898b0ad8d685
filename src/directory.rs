//! Timetable and roster snapshot.
//!
//! Both tables are read in full and kept as one immutable snapshot. A
//! snapshot younger than the configured bound is reused; otherwise it is
//! replaced wholesale. Failed loads are never cached.

use crate::config::SheetsConfig;
use crate::schedule::TimetableRow;
use crate::workbook::{Workbook, WorkbookError, Worksheet};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

const COL_TEACHER: &str = "Docente";
const COL_GROUP: &str = "Grupo";
const COL_START: &str = "Inicio";
const COL_END: &str = "Fin";
const COL_STUDENT: &str = "Alumno";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterRow {
    pub group: String,
    pub student: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tables {
    pub timetable: Vec<TimetableRow>,
    pub roster: Vec<RosterRow>,
}

impl Tables {
    /// Distinct teacher names in first-seen order.
    pub fn teachers(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for row in &self.timetable {
            if !row.teacher.is_empty() && !out.contains(&row.teacher) {
                out.push(row.teacher.clone());
            }
        }
        out
    }

    pub fn has_teacher(&self, name: &str) -> bool {
        !name.is_empty() && self.timetable.iter().any(|r| r.teacher == name)
    }

    pub fn roster_for(&self, group: &str) -> Vec<RosterRow> {
        self.roster
            .iter()
            .filter(|r| r.group == group)
            .cloned()
            .collect()
    }

    /// Checklist names for `group` in sheet order. A name listed twice is
    /// shown once, so one checked box is one log row.
    pub fn students_in(&self, group: &str) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for row in self.roster.iter().filter(|r| r.group == group) {
            if !row.student.is_empty() && !out.contains(&row.student) {
                out.push(row.student.clone());
            }
        }
        out
    }
}

fn cell(row: &[String], idx: usize) -> String {
    row.get(idx).map(|c| c.trim().to_string()).unwrap_or_default()
}

pub fn timetable_from(ws: &Worksheet) -> Result<Vec<TimetableRow>, WorkbookError> {
    let teacher = ws.column(COL_TEACHER)?;
    let group = ws.column(COL_GROUP)?;
    let start = ws.column(COL_START)?;
    let end = ws.column(COL_END)?;
    Ok(ws
        .rows
        .iter()
        .map(|r| TimetableRow {
            teacher: cell(r, teacher),
            group: cell(r, group),
            start: cell(r, start),
            end: cell(r, end),
        })
        .collect())
}

pub fn roster_from(ws: &Worksheet) -> Result<Vec<RosterRow>, WorkbookError> {
    let group = ws.column(COL_GROUP)?;
    let student = ws.column(COL_STUDENT)?;
    Ok(ws
        .rows
        .iter()
        .map(|r| RosterRow {
            group: cell(r, group),
            student: cell(r, student),
        })
        .collect())
}

pub fn load_tables(book: &dyn Workbook, sheets: &SheetsConfig) -> Result<Tables, WorkbookError> {
    let timetable = timetable_from(&book.read_worksheet(&sheets.timetable)?)?;
    let roster = roster_from(&book.read_worksheet(&sheets.roster)?)?;
    Ok(Tables { timetable, roster })
}

/// Result of asking for the tables. `unavailable` carries the reason when
/// the tables could not be loaded; `tables` is then empty.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub tables: Arc<Tables>,
    pub unavailable: Option<String>,
}

impl Fetched {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            tables: Arc::new(Tables::default()),
            unavailable: Some(reason.into()),
        }
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    fetched_at: Instant,
    tables: Arc<Tables>,
}

#[derive(Debug)]
pub struct DirectoryCache {
    ttl: Duration,
    snapshot: Option<Snapshot>,
}

/// A snapshot of `age` may be reused under bound `ttl`. A zero bound
/// disables reuse.
pub fn is_fresh(age: Duration, ttl: Duration) -> bool {
    !ttl.is_zero() && age < ttl
}

impl DirectoryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            snapshot: None,
        }
    }

    pub fn invalidate(&mut self) {
        self.snapshot = None;
    }

    /// Reuses the cached snapshot when fresh at `now`; otherwise runs `load`
    /// and, on success, replaces the snapshot.
    pub fn fetch_tables<F>(&mut self, now: Instant, load: F) -> Fetched
    where
        F: FnOnce() -> Result<Tables, WorkbookError>,
    {
        if let Some(snap) = &self.snapshot {
            if is_fresh(now.saturating_duration_since(snap.fetched_at), self.ttl) {
                tracing::debug!("directory cache hit");
                return Fetched {
                    tables: Arc::clone(&snap.tables),
                    unavailable: None,
                };
            }
        }

        match load() {
            Ok(tables) => {
                tracing::info!(
                    timetable_rows = tables.timetable.len(),
                    roster_rows = tables.roster.len(),
                    "directory loaded"
                );
                let tables = Arc::new(tables);
                self.snapshot = Some(Snapshot {
                    fetched_at: now,
                    tables: Arc::clone(&tables),
                });
                Fetched {
                    tables,
                    unavailable: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "directory unavailable");
                Fetched::unavailable(e.to_string())
            }
        }
    }
}
