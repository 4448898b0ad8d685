use super::{Workbook, WorkbookError, Worksheet};
use crate::config::SheetsConfig;
use rusqlite::{Connection, OptionalExtension};
use std::path::{Path, PathBuf};

pub const ROSTER_HEADER: &[&str] = &["Grupo", "Alumno"];
pub const TIMETABLE_HEADER: &[&str] = &["Docente", "Grupo", "Inicio", "Fin"];
pub const LOG_HEADER: &[&str] = &["Fecha", "Hora", "Docente", "Alumno", "Grupo"];

/// A workbook kept in a local SQLite file. Each row is stored as a JSON
/// array of cell strings; row 1 of a worksheet is its header.
pub struct SqliteWorkbook {
    conn: Connection,
    path: PathBuf,
}

impl SqliteWorkbook {
    pub fn open(path: &Path, sheets: &SheetsConfig) -> Result<Self, WorkbookError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                WorkbookError::Config(format!(
                    "failed to create directory {}: {}",
                    parent.to_string_lossy(),
                    e
                ))
            })?;
        }
        let conn = Connection::open(path)?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS worksheets(
                title TEXT PRIMARY KEY
            )",
            [],
        )?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS worksheet_rows(
                title TEXT NOT NULL,
                row_no INTEGER NOT NULL,
                cells TEXT NOT NULL,
                PRIMARY KEY(title, row_no),
                FOREIGN KEY(title) REFERENCES worksheets(title)
            )",
            [],
        )?;

        let book = Self {
            conn,
            path: path.to_path_buf(),
        };
        book.add_worksheet(&sheets.roster, ROSTER_HEADER)?;
        book.add_worksheet(&sheets.timetable, TIMETABLE_HEADER)?;
        book.add_worksheet(&sheets.log, LOG_HEADER)?;
        tracing::info!(path = %book.path.to_string_lossy(), "opened sqlite workbook");
        Ok(book)
    }

    /// Creates `title` with `header` as its first row. An existing worksheet
    /// is left untouched.
    pub fn add_worksheet(&self, title: &str, header: &[&str]) -> Result<(), WorkbookError> {
        let created = self
            .conn
            .execute("INSERT OR IGNORE INTO worksheets(title) VALUES(?)", [title])?;
        if created > 0 && !header.is_empty() {
            let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
            self.append_row(title, &header)?;
        }
        Ok(())
    }

    fn worksheet_exists(&self, title: &str) -> Result<bool, WorkbookError> {
        Ok(self
            .conn
            .query_row("SELECT 1 FROM worksheets WHERE title = ?", [title], |r| {
                r.get::<_, i64>(0)
            })
            .optional()?
            .is_some())
    }
}

impl Workbook for SqliteWorkbook {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    fn read_worksheet(&self, title: &str) -> Result<Worksheet, WorkbookError> {
        if !self.worksheet_exists(title)? {
            return Err(WorkbookError::WorksheetNotFound(title.to_string()));
        }
        let mut stmt = self
            .conn
            .prepare("SELECT cells FROM worksheet_rows WHERE title = ? ORDER BY row_no")?;
        let raw = stmt
            .query_map([title], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        let mut values = Vec::with_capacity(raw.len());
        for cells in raw {
            let row: Vec<String> = serde_json::from_str(&cells)
                .map_err(|e| WorkbookError::Malformed(format!("row in {title}: {e}")))?;
            values.push(row);
        }
        Ok(Worksheet::from_values(title, values))
    }

    fn append_row(&self, title: &str, row: &[String]) -> Result<(), WorkbookError> {
        if !self.worksheet_exists(title)? {
            return Err(WorkbookError::WorksheetNotFound(title.to_string()));
        }
        let cells =
            serde_json::to_string(row).map_err(|e| WorkbookError::Malformed(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO worksheet_rows(title, row_no, cells)
             VALUES(?1, (SELECT COALESCE(MAX(row_no), 0) + 1 FROM worksheet_rows WHERE title = ?1), ?2)",
            (title, &cells),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_dir(prefix: &str) -> PathBuf {
        let p = std::env::temp_dir().join(format!(
            "{}-{}",
            prefix,
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .expect("clock")
                .as_nanos()
        ));
        std::fs::create_dir_all(&p).expect("create temp dir");
        p
    }

    #[test]
    fn open_creates_default_worksheets_with_headers() {
        let dir = temp_dir("salidas-sqlite-open");
        let book = SqliteWorkbook::open(&dir.join("book.sqlite3"), &SheetsConfig::default())
            .expect("open workbook");
        let log = book.read_worksheet("Registro").expect("read log");
        assert_eq!(log.header, LOG_HEADER);
        assert!(log.rows.is_empty());

        // Re-opening must not duplicate headers.
        drop(book);
        let book = SqliteWorkbook::open(&dir.join("book.sqlite3"), &SheetsConfig::default())
            .expect("reopen workbook");
        let roster = book.read_worksheet("Alumnos").expect("read roster");
        assert_eq!(roster.header, ROSTER_HEADER);
        assert!(roster.rows.is_empty());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn appends_keep_insertion_order() {
        let dir = temp_dir("salidas-sqlite-append");
        let book = SqliteWorkbook::open(&dir.join("book.sqlite3"), &SheetsConfig::default())
            .expect("open workbook");
        for student in ["Beto", "Carla", "Beto"] {
            let row: Vec<String> = ["2024-01-10", "08:31:05", "Ana", student, "G1"]
                .iter()
                .map(|c| c.to_string())
                .collect();
            book.append_row("Registro", &row).expect("append");
        }
        let log = book.read_worksheet("Registro").expect("read log");
        let students: Vec<&str> = log.rows.iter().map(|r| r[3].as_str()).collect();
        assert_eq!(students, vec!["Beto", "Carla", "Beto"]);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn unknown_worksheet_is_reported() {
        let dir = temp_dir("salidas-sqlite-missing");
        let book = SqliteWorkbook::open(&dir.join("book.sqlite3"), &SheetsConfig::default())
            .expect("open workbook");
        assert!(matches!(
            book.read_worksheet("Asistencia"),
            Err(WorkbookError::WorksheetNotFound(_))
        ));
        assert!(matches!(
            book.append_row("Asistencia", &["x".to_string()]),
            Err(WorkbookError::WorksheetNotFound(_))
        ));
        let _ = std::fs::remove_dir_all(dir);
    }
}
