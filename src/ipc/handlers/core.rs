use crate::config::Backend;
use crate::ipc::error::ok;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let backend = match state.config.backend {
        Backend::Google => "google",
        Backend::Sqlite => "sqlite",
    };
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "backend": backend,
            "workbookReady": state.workbook.is_some(),
        }),
    )
}

fn handle_directory_refresh(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.directory.invalidate();
    tracing::info!("directory cache invalidated");
    ok(&req.id, json!({ "invalidated": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "directory.refresh" => Some(handle_directory_refresh(state, req)),
        _ => None,
    }
}
