//! Custom assertions and tool stand-ins for integration tests

use std::path::{Path, PathBuf};

use serde_json::Value;

/// Assert that output is valid JSON and return parsed value
pub fn assert_valid_json(output: &str, context: &str) -> Value {
    serde_json::from_str(output).unwrap_or_else(|e| {
        panic!(
            "Expected valid JSON ({}): {}\nOutput:\n{}",
            context, e, output
        )
    })
}

/// Messages of every diagnostic published for `uri` in a JSON publication
pub fn messages_for(json: &Value, uri: &str) -> Vec<String> {
    json["files"]
        .as_array()
        .into_iter()
        .flatten()
        .filter(|f| f["uri"].as_str() == Some(uri))
        .flat_map(|f| f["diagnostics"].as_array().cloned().unwrap_or_default())
        .filter_map(|d| d["message"].as_str().map(str::to_string))
        .collect()
}

/// Write an executable shell script, returning its path
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("Failed to write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("Failed to make script executable");
    path
}

/// A stand-in `elm` that prints `report` on stderr and fails
#[cfg(unix)]
pub fn fake_compiler(dir: &Path, report: &str) -> PathBuf {
    std::fs::write(dir.join("compiler-report.json"), report).expect("Failed to write report");
    write_script(
        dir,
        "fake-elm",
        "echo \"$@\" >> compiler-calls.log\ncat compiler-report.json >&2\nexit 1",
    )
}

/// A stand-in linter that prints `report` on stdout
#[cfg(unix)]
pub fn fake_linter(dir: &Path, report: &str) -> PathBuf {
    std::fs::write(dir.join("linter-report.json"), report).expect("Failed to write report");
    write_script(dir, "fake-review", "cat linter-report.json\nexit 1")
}
