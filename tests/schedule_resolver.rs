#[path = "../src/schedule.rs"]
mod schedule;

use chrono::NaiveTime;
use schedule::{active_group, active_row, parse_clock, TimetableRow};

fn row(teacher: &str, group: &str, start: &str, end: &str) -> TimetableRow {
    TimetableRow {
        teacher: teacher.to_string(),
        group: group.to_string(),
        start: start.to_string(),
        end: end.to_string(),
    }
}

fn hm(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).expect("valid time")
}

#[test]
fn inside_interval_returns_group() {
    let rows = vec![row("Ana", "G1", "08:00", "09:00")];
    assert_eq!(active_group("Ana", &rows, hm(8, 30)), Some("G1"));
}

#[test]
fn both_bounds_are_inclusive() {
    let rows = vec![row("Ana", "G1", "08:00", "09:00")];
    assert_eq!(active_group("Ana", &rows, hm(8, 0)), Some("G1"));
    assert_eq!(active_group("Ana", &rows, hm(9, 0)), Some("G1"));
    let just_after_end = NaiveTime::from_hms_opt(9, 0, 45).expect("valid time");
    assert_eq!(active_group("Ana", &rows, just_after_end), None);
    let just_before_start = NaiveTime::from_hms_opt(7, 59, 59).expect("valid time");
    assert_eq!(active_group("Ana", &rows, just_before_start), None);
    assert_eq!(active_group("Ana", &rows, hm(9, 1)), None);
    assert_eq!(active_group("Ana", &rows, hm(7, 59)), None);
}

#[test]
fn gap_between_classes_is_no_class() {
    let rows = vec![
        row("Ana", "G1", "08:00", "09:00"),
        row("Ana", "G2", "10:00", "11:00"),
    ];
    assert_eq!(active_group("Ana", &rows, hm(9, 30)), None);
    assert_eq!(active_group("Ana", &rows, hm(12, 0)), None);
    assert_eq!(active_group("Ana", &rows, hm(10, 15)), Some("G2"));
}

#[test]
fn other_teachers_rows_are_ignored() {
    let rows = vec![row("Luis", "G7", "08:00", "09:00")];
    assert_eq!(active_group("Ana", &rows, hm(8, 30)), None);
}

#[test]
fn malformed_rows_never_match() {
    let rows = vec![
        row("Ana", "G0", "8h", "09:00"),
        row("Ana", "G1", "08:00", ""),
        row("Ana", "G2", "08:00", "09:00"),
    ];
    assert_eq!(active_group("Ana", &rows, hm(8, 30)), Some("G2"));
    assert!(parse_clock("25:00").is_none());
    assert!(parse_clock("08:00:00").is_none());
    assert_eq!(parse_clock(" 07:45 "), Some(hm(7, 45)));
}

#[test]
fn overlapping_rows_pick_first_in_source_order() {
    let rows = vec![
        row("Ana", "G1", "08:00", "10:00"),
        row("Ana", "G2", "09:00", "11:00"),
    ];
    let hit = active_row("Ana", &rows, hm(9, 30)).expect("a match");
    assert_eq!(hit.group, "G1");
}
