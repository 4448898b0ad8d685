use chrono::NaiveTime;
use serde::Serialize;

/// One "Horarios" row: a teacher teaches `group` between `start` and `end`.
///
/// Times are kept as the raw "HH:MM" cell text so a malformed cell only
/// disqualifies its own row when resolving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimetableRow {
    pub teacher: String,
    pub group: String,
    pub start: String,
    pub end: String,
}

pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

/// Returns the group `teacher` is scheduled with at `now`, if any.
pub fn active_group<'a>(teacher: &str, rows: &'a [TimetableRow], now: NaiveTime) -> Option<&'a str> {
    active_row(teacher, rows, now).map(|row| row.group.as_str())
}

/// First row (in source order) for `teacher` whose interval contains `now`.
///
/// Bounds are inclusive. A class ending "10:00" covers 10:00:00 but not
/// 10:00:01.
pub fn active_row<'a>(
    teacher: &str,
    rows: &'a [TimetableRow],
    now: NaiveTime,
) -> Option<&'a TimetableRow> {
    rows.iter()
        .filter(|row| row.teacher == teacher)
        .find(|row| row_contains(row, now))
}

fn row_contains(row: &TimetableRow, now: NaiveTime) -> bool {
    let (Some(start), Some(end)) = (parse_clock(&row.start), parse_clock(&row.end)) else {
        tracing::warn!(
            teacher = %row.teacher,
            group = %row.group,
            start = %row.start,
            end = %row.end,
            "skipping timetable row with malformed time"
        );
        return false;
    };
    start <= now && now <= end
}
