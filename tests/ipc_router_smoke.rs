use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
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

fn spawn_sidecar(workspace: &Path) -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let config = workspace.join("config.toml");
    std::fs::write(
        &config,
        format!(
            "backend = \"sqlite\"\nidentity_dir = '{}'\n[sqlite]\npath = '{}'\n",
            workspace.join("ids").to_string_lossy(),
            workspace.join("book.sqlite3").to_string_lossy(),
        ),
    )
    .expect("write config");

    let exe = env!("CARGO_BIN_EXE_salidasd");
    let mut child = Command::new(exe)
        .env("SALIDAS_CONFIG", &config)
        .env_remove("SALIDAS_FIXED_NOW")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn salidasd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    assert!(!line.trim().is_empty(), "empty response for {}", method);
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    if value.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let code = value
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|v| v.as_str())
            .unwrap_or("unknown");
        assert_ne!(
            code, "not_implemented",
            "unexpected unknown method for {}",
            method
        );
    }
    value
}

#[test]
fn router_dispatch_smoke_covers_handler_families() {
    let workspace = temp_dir("salidas-router-smoke");
    let (mut child, mut stdin, mut reader) = spawn_sidecar(&workspace);
    let session = json!({ "kiosk": "smoke" });

    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health["ok"], true);

    // A fresh workbook has headers only, so nobody can be selected yet.
    let page = request(
        &mut stdin,
        &mut reader,
        "2",
        "page.render",
        json!({ "session": session }),
    );
    assert_eq!(page["result"]["view"]["step"], "selectTeacher");
    assert_eq!(page["result"]["view"]["teachers"], json!([]));

    let select = request(
        &mut stdin,
        &mut reader,
        "3",
        "identity.select",
        json!({ "session": session, "teacher": "Nadie" }),
    );
    assert_eq!(select["result"]["view"]["notices"][0]["level"], "error");

    let missing = request(
        &mut stdin,
        &mut reader,
        "4",
        "identity.select",
        json!({ "session": session }),
    );
    assert_eq!(missing["error"]["code"], "bad_params");

    let clear = request(
        &mut stdin,
        &mut reader,
        "5",
        "identity.clear",
        json!({ "session": session }),
    );
    assert_eq!(clear["ok"], true);

    let submit = request(
        &mut stdin,
        &mut reader,
        "6",
        "exits.submit",
        json!({ "session": session, "students": [] }),
    );
    assert_eq!(submit["result"]["canSubmit"], false);

    let refresh = request(&mut stdin, &mut reader, "7", "directory.refresh", json!({}));
    assert_eq!(refresh["result"]["invalidated"], true);

    let health = request(&mut stdin, &mut reader, "8", "health", json!({}));
    assert_eq!(health["result"]["workbookReady"], true);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
