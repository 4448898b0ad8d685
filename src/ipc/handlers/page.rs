use crate::directory::Fetched;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::page::{self, Notice, Page, PageInput};
use serde_json::json;

pub fn stored_identity(state: &AppState, key: &str) -> Option<String> {
    match state.identity.load(key) {
        Ok(v) => v,
        Err(e) => {
            // An unreadable identity file behaves like no identity.
            tracing::warn!(key, error = %e, "cannot read identity");
            None
        }
    }
}

/// Renders the page for `key`. A "data unavailable" condition is always
/// reported first, ahead of the action's own feedback.
pub fn build_page(state: &AppState, key: &str, fetched: &Fetched, mut notices: Vec<Notice>) -> Page {
    if let Some(reason) = &fetched.unavailable {
        notices.insert(
            0,
            Notice::error(format!("No se pudieron cargar los datos: {reason}")),
        );
    }
    let identity = stored_identity(state, key);
    page::render(
        &PageInput {
            identity: identity.as_deref(),
            tables: &fetched.tables,
            now: state.now(),
            show_debug: state.config.show_debug,
        },
        notices,
    )
}

pub fn respond(req: &Request, page: &Page) -> serde_json::Value {
    match serde_json::to_value(page) {
        Ok(view) => ok(
            &req.id,
            json!({ "view": view, "canSubmit": page.can_submit() }),
        ),
        Err(e) => err(&req.id, "render_failed", e.to_string(), None),
    }
}

fn handle_page_render(state: &mut AppState, req: &Request) -> serde_json::Value {
    let key = state.identity_key(&req.params);
    let fetched = state.tables();
    let page = build_page(state, &key, &fetched, Vec::new());
    respond(req, &page)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "page.render" => Some(handle_page_render(state, req)),
        _ => None,
    }
}
