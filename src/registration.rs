use crate::workbook::{Workbook, WorkbookError};
use chrono::NaiveDateTime;

/// One exit as written to the log worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationRecord {
    pub date: String,
    pub time: String,
    pub teacher: String,
    pub student: String,
    pub group: String,
}

impl RegistrationRecord {
    pub fn new(at: NaiveDateTime, teacher: &str, student: &str, group: &str) -> Self {
        Self {
            date: at.format("%Y-%m-%d").to_string(),
            time: at.format("%H:%M:%S").to_string(),
            teacher: teacher.to_string(),
            student: student.to_string(),
            group: group.to_string(),
        }
    }

    /// Column order of the log: date, time, teacher, student, group.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.date.clone(),
            self.time.clone(),
            self.teacher.clone(),
            self.student.clone(),
            self.group.clone(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOutcome {
    pub appended: usize,
    pub requested: usize,
}

/// An append failed. Rows before it stay in the log.
#[derive(Debug, thiserror::Error)]
#[error("appended {appended} of {requested} rows: {source}")]
pub struct SubmitError {
    pub appended: usize,
    pub requested: usize,
    #[source]
    pub source: WorkbookError,
}

/// Appends one record per student, in the given order, all stamped with `at`.
/// Stops at the first failed append; duplicates are written as given.
pub fn submit(
    log: &dyn Workbook,
    worksheet: &str,
    teacher: &str,
    group: &str,
    students: &[String],
    at: NaiveDateTime,
) -> Result<SubmitOutcome, SubmitError> {
    let requested = students.len();
    for (appended, student) in students.iter().enumerate() {
        let record = RegistrationRecord::new(at, teacher, student, group);
        if let Err(source) = log.append_row(worksheet, &record.to_row()) {
            tracing::error!(
                teacher,
                group,
                appended,
                requested,
                error = %source,
                "exit registration stopped"
            );
            return Err(SubmitError {
                appended,
                requested,
                source,
            });
        }
    }
    tracing::info!(teacher, group, appended = requested, "exits registered");
    Ok(SubmitOutcome {
        appended: requested,
        requested,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workbook::memory::MemoryWorkbook;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 10)
            .and_then(|d| d.and_hms_opt(h, m, s))
            .expect("valid instant")
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn log_book() -> MemoryWorkbook {
        MemoryWorkbook::default().with_sheet(
            "Registro",
            &[&["Fecha", "Hora", "Docente", "Alumno", "Grupo"]],
        )
    }

    #[test]
    fn single_student_writes_expected_row() {
        let book = log_book();
        let out = submit(&book, "Registro", "Ana", "G1", &names(&["Beto"]), at(8, 31, 5))
            .expect("submit");
        assert_eq!(out, SubmitOutcome { appended: 1, requested: 1 });
        let rows = book.rows("Registro");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], vec!["2024-01-10", "08:31:05", "Ana", "Beto", "G1"]);
    }

    #[test]
    fn rows_follow_selection_order_with_one_timestamp() {
        let book = log_book();
        let students = names(&["Carla", "Beto", "Carla"]);
        submit(&book, "Registro", "Ana", "G1", &students, at(9, 0, 0)).expect("submit");
        let rows = book.rows("Registro");
        let written: Vec<&str> = rows[1..].iter().map(|r| r[3].as_str()).collect();
        assert_eq!(written, vec!["Carla", "Beto", "Carla"]);
        assert!(rows[1..].iter().all(|r| r[0] == "2024-01-10" && r[1] == "09:00:00"));
    }

    #[test]
    fn empty_selection_writes_nothing() {
        let book = log_book();
        let out = submit(&book, "Registro", "Ana", "G1", &[], at(8, 31, 5)).expect("submit");
        assert_eq!(out, SubmitOutcome { appended: 0, requested: 0 });
        assert_eq!(book.appends.get(), 0);
        assert_eq!(book.rows("Registro").len(), 1);
    }

    #[test]
    fn partial_failure_keeps_earlier_rows() {
        let book = MemoryWorkbook {
            fail_appends_after: Some(2),
            ..log_book()
        };
        let err = submit(
            &book,
            "Registro",
            "Ana",
            "G1",
            &names(&["Beto", "Carla", "Dana", "Eva"]),
            at(8, 31, 5),
        )
        .expect_err("third append fails");
        assert_eq!(err.appended, 2);
        assert_eq!(err.requested, 4);
        assert_eq!(book.rows("Registro").len(), 3);
    }

    #[test]
    fn missing_log_worksheet_fails_before_any_row() {
        let book = MemoryWorkbook::default();
        let err = submit(&book, "Registro", "Ana", "G1", &names(&["Beto"]), at(8, 31, 5))
            .expect_err("no worksheet");
        assert_eq!(err.appended, 0);
        assert!(matches!(err.source, WorkbookError::WorksheetNotFound(_)));
    }
}
