use crate::ipc::handlers::page::{build_page, respond, stored_identity};
use crate::ipc::helpers::get_required_str_list;
use crate::ipc::types::{AppState, Request};
use crate::page::{self, Notice};
use crate::registration;
use crate::schedule;

fn handle_exits_submit(state: &mut AppState, req: &Request) -> serde_json::Value {
    let requested = match get_required_str_list(&req.params, "students") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let key = state.identity_key(&req.params);
    let fetched = state.tables();
    let tables = &fetched.tables;
    let now = state.now();

    let identity = stored_identity(state, &key);
    let Some(teacher) = page::resolved_teacher(identity.as_deref(), tables) else {
        let notices = vec![Notice::error(
            "Seleccione su nombre antes de registrar salidas",
        )];
        return respond(req, &build_page(state, &key, &fetched, notices));
    };
    let Some(group) = schedule::active_group(teacher, &tables.timetable, now.time()) else {
        let notices = vec![Notice::error(
            "No hay clase en curso; no se registró ninguna salida",
        )];
        return respond(req, &build_page(state, &key, &fetched, notices));
    };

    let selection = page::select_students(&tables.students_in(group), &requested);
    let mut notices = Vec::new();
    if !selection.unknown.is_empty() {
        notices.push(Notice::warning(format!(
            "Se ignoraron alumnos fuera del grupo {}: {}",
            group,
            selection.unknown.join(", ")
        )));
    }

    // An empty selection never touches the log.
    let result = if selection.ordered.is_empty() {
        Ok(registration::SubmitOutcome {
            appended: 0,
            requested: 0,
        })
    } else {
        let log_sheet = state.config.sheets.log.clone();
        match state.workbook() {
            Ok(book) => registration::submit(
                book,
                &log_sheet,
                teacher,
                group,
                &selection.ordered,
                now,
            ),
            Err(source) => Err(registration::SubmitError {
                appended: 0,
                requested: selection.ordered.len(),
                source,
            }),
        }
    };
    notices.extend(page::submission_notices(&result));

    respond(req, &build_page(state, &key, &fetched, notices))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "exits.submit" => Some(handle_exits_submit(state, req)),
        _ => None,
    }
}
