//! The exit-registration form as a pure function of its inputs.
//!
//! Every interaction re-renders the whole page from the stored identity, the
//! table snapshot, the current instant and any feedback produced by the
//! action that triggered the render. Checkboxes always come back cleared.

use crate::directory::{RosterRow, Tables};
use crate::registration::{SubmitError, SubmitOutcome};
use crate::schedule::{self, TimetableRow};
use chrono::NaiveDateTime;
use serde::Serialize;

pub const TITLE: &str = "Registro de Salidas al Baño";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StudentEntry {
    pub name: String,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebugPanel {
    pub schedule: TimetableRow,
    pub roster: Vec<RosterRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "camelCase")]
pub enum View {
    SelectTeacher {
        teachers: Vec<String>,
    },
    NoClass {
        teacher: String,
    },
    Roster {
        teacher: String,
        group: String,
        students: Vec<StudentEntry>,
        #[serde(skip_serializing_if = "Option::is_none")]
        debug: Option<DebugPanel>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page {
    pub title: &'static str,
    pub notices: Vec<Notice>,
    #[serde(flatten)]
    pub view: View,
}

impl Page {
    pub fn can_submit(&self) -> bool {
        matches!(&self.view, View::Roster { students, .. } if !students.is_empty())
    }
}

pub struct PageInput<'a> {
    pub identity: Option<&'a str>,
    pub tables: &'a Tables,
    pub now: NaiveDateTime,
    pub show_debug: bool,
}

/// A stored identity only counts when the timetable still lists it.
pub fn resolved_teacher<'a>(identity: Option<&'a str>, tables: &Tables) -> Option<&'a str> {
    identity.filter(|t| tables.has_teacher(t))
}

fn current_user(teacher: &str) -> Notice {
    Notice::info(format!("Usuario actual: {teacher}"))
}

pub fn render(input: &PageInput<'_>, mut notices: Vec<Notice>) -> Page {
    let Some(teacher) = resolved_teacher(input.identity, input.tables) else {
        return Page {
            title: TITLE,
            notices,
            view: View::SelectTeacher {
                teachers: input.tables.teachers(),
            },
        };
    };

    let Some(row) = schedule::active_row(teacher, &input.tables.timetable, input.now.time())
    else {
        notices.push(Notice::warning("No hay clase programada en este horario"));
        notices.push(current_user(teacher));
        return Page {
            title: TITLE,
            notices,
            view: View::NoClass {
                teacher: teacher.to_string(),
            },
        };
    };

    let students: Vec<StudentEntry> = input
        .tables
        .students_in(&row.group)
        .into_iter()
        .map(|name| StudentEntry {
            name,
            checked: false,
        })
        .collect();
    if students.is_empty() {
        notices.push(Notice::warning("No hay alumnos registrados en este grupo"));
    }
    notices.push(current_user(teacher));
    let debug = input.show_debug.then(|| DebugPanel {
        schedule: row.clone(),
        roster: input.tables.roster_for(&row.group),
    });

    Page {
        title: TITLE,
        notices,
        view: View::Roster {
            teacher: teacher.to_string(),
            group: row.group.clone(),
            students,
            debug,
        },
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// Checked students in roster display order.
    pub ordered: Vec<String>,
    /// Requested names that are not on the roster.
    pub unknown: Vec<String>,
}

/// Each checked name yields at most one entry, even when the roster lists
/// it more than once.
pub fn select_students(roster: &[String], requested: &[String]) -> Selection {
    let requested: Vec<&str> = requested.iter().map(|s| s.trim()).collect();
    let mut ordered: Vec<String> = Vec::new();
    for name in roster {
        if requested.contains(&name.as_str()) && !ordered.contains(name) {
            ordered.push(name.clone());
        }
    }
    let mut unknown: Vec<String> = Vec::new();
    for name in requested {
        if !name.is_empty() && !roster.iter().any(|r| r == name) && !unknown.iter().any(|u| u == name)
        {
            unknown.push(name.to_string());
        }
    }
    Selection { ordered, unknown }
}

pub fn submission_notices(result: &Result<SubmitOutcome, SubmitError>) -> Vec<Notice> {
    match result {
        Ok(out) => vec![Notice::success(format!("Registrados {} alumnos", out.appended))],
        Err(e) => vec![Notice::error(format!(
            "Se registraron {} de {} alumnos antes del error: {}",
            e.appended, e.requested, e.source
        ))],
    }
}
