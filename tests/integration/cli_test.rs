use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::Result;

const LEFT: &str = r#"[
    {"s": "a", "p": "p1"},
    {"s": "b", "p": "p1"},
    {"s": "c", "p": null}
]"#;

const RIGHT: &str = r#"[
    {"p": "p1", "o": "x"},
    {"p": "p2", "o": "y"}
]"#;

fn write_inputs(dir: &Path) -> Result<(String, String)> {
    let left = dir.join("left.json");
    let right = dir.join("right.json");
    fs::write(&left, LEFT)?;
    fs::write(&right, RIGHT)?;
    Ok((left.to_string_lossy().into_owned(), right.to_string_lossy().into_owned()))
}

fn rowjoin(args: &[&str]) -> Result<std::process::Output> {
    Ok(Command::new(env!("CARGO_BIN_EXE_rowjoin")).args(args).output()?)
}

#[test]
fn test_cli_inner_join_json() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let (left, right) = write_inputs(temp_dir.path())?;

    let output = rowjoin(&["join", &left, &right, "--format", "json"])?;
    assert!(output.status.success(), "CLI join failed: {}", String::from_utf8_lossy(&output.stderr));

    let rows: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout)?;
    // "c" leaves ?p unbound and so joins with both right rows
    assert_eq!(rows.len(), 4);
    assert!(rows.iter().any(|r| r["s"] == "a" && r["o"] == "x"));
    assert!(rows.iter().any(|r| r["s"] == "c" && r["o"] == "y"));
    Ok(())
}

#[test]
fn test_cli_left_join_table() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let (left, right) = write_inputs(temp_dir.path())?;

    let output = rowjoin(&["join", &right, &left, "--left-join", "--algorithm", "nested-loop"])?;
    assert!(output.status.success());

    let output_str = String::from_utf8(output.stdout)?;
    // Object keys come back sorted, so the left file's vars are ?o ?p
    assert!(output_str.contains("| ?o | ?p | ?s |"), "unexpected header: {}", output_str);
    assert!(output_str.contains("4 rows"));
    Ok(())
}

#[test]
fn test_cli_config_file_and_explain() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let (left, right) = write_inputs(temp_dir.path())?;
    let config = temp_dir.path().join("config.json");
    fs::write(&config, r#"{"algorithm": "hash", "hasher": "composite", "explain": true}"#)?;

    let output = rowjoin(&[
        "--config",
        &config.to_string_lossy(),
        "join",
        &left,
        &right,
        "--key",
        "p",
    ])?;
    assert!(output.status.success());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("probe=3"), "missing explain line: {}", stderr);
    Ok(())
}

#[test]
fn test_cli_vars() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let (_, right) = write_inputs(temp_dir.path())?;

    let output = rowjoin(&["vars", &right])?;
    assert!(output.status.success());
    let vars = String::from_utf8(output.stdout)?;
    let mut names: Vec<&str> = vars.split_whitespace().collect();
    names.sort();
    assert_eq!(names, vec!["o", "p"]);
    Ok(())
}

#[test]
fn test_cli_rejects_non_array_input() -> Result<()> {
    let temp_dir = tempfile::tempdir()?;
    let bad = temp_dir.path().join("bad.json");
    fs::write(&bad, r#"{"s": "a"}"#)?;

    let output = rowjoin(&["vars", &bad.to_string_lossy()])?;
    assert!(!output.status.success());
    Ok(())
}
