use crate::ipc::handlers::page::{build_page, respond};
use crate::ipc::helpers::get_required_str;
use crate::ipc::types::{AppState, Request};
use crate::page::Notice;

fn handle_identity_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let teacher = match get_required_str(&req.params, "teacher") {
        Ok(v) => v.trim().to_string(),
        Err(e) => return e.response(&req.id),
    };
    let key = state.identity_key(&req.params);
    let fetched = state.tables();

    let mut notices = Vec::new();
    if !fetched.tables.has_teacher(&teacher) {
        // Only names offered by the timetable can be stored.
        notices.push(Notice::error(format!(
            "\"{teacher}\" no aparece en el horario"
        )));
    } else if let Err(e) = state.identity.save(&key, &teacher) {
        tracing::error!(key = %key, error = %e, "cannot save identity");
        notices.push(Notice::error(format!(
            "No se pudo guardar la preferencia: {e}"
        )));
    }

    respond(req, &build_page(state, &key, &fetched, notices))
}

fn handle_identity_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let key = state.identity_key(&req.params);
    let mut notices = Vec::new();
    if let Err(e) = state.identity.clear(&key) {
        tracing::error!(key = %key, error = %e, "cannot clear identity");
        notices.push(Notice::error(format!(
            "No se pudo cambiar de usuario: {e}"
        )));
    }
    let fetched = state.tables();
    respond(req, &build_page(state, &key, &fetched, notices))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "identity.select" => Some(handle_identity_select(state, req)),
        "identity.clear" => Some(handle_identity_clear(state, req)),
        _ => None,
    }
}
