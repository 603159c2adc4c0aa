use std::io::Write;
use std::process::{Command, Output};

fn esovm() -> Command {
    Command::new(env!("CARGO_BIN_EXE_esovm"))
}

fn run(args: &[&str]) -> Output {
    esovm().args(args).env_remove("RUST_LOG").output().expect("failed to run esovm")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).into_owned()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).into_owned()
}

fn source_file(ext: &str, text: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(ext).tempfile().expect("temp file");
    file.write_all(text.as_bytes()).expect("write temp file");
    file
}

// --- Inline source ---

#[test]
fn inline_brainfuck() {
    let out = run(&["--lang", "bf", "-e", "++++++++[>++++++++<-]>+."]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "A");
}

#[test]
fn inline_befunge_prints_numbers() {
    let out = run(&["--lang", "befunge", "-e", "34*.@"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "12 ");
}

#[test]
fn inline_source_in_code_fence() {
    let out = run(&["--lang", "brainfuck", "-e", "```bf\n++++++++[>++++++++<-]>++.\n```"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "B");
}

#[test]
fn input_flag_feeds_reads() {
    let out = run(&["--lang", "bf", "--input", "ok", "-e", ",.,."]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "ok");
}

#[test]
fn seeded_befunge_is_repeatable() {
    let src = "?1.@\n2\n.\n@";
    let a = run(&["--lang", "befunge", "--seed", "9", "-e", src]);
    let b = run(&["--lang", "befunge", "--seed", "9", "-e", src]);
    assert!(a.status.success(), "stderr: {}", stderr(&a));
    assert_eq!(stdout(&a), stdout(&b));
}

// --- Files ---

#[test]
fn language_guessed_from_extension() {
    let file = source_file(".cow", "MoO MoO MoO OOM");
    let out = run(&[file.path().to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "3\n");
}

#[test]
fn unknown_extension_needs_lang() {
    let file = source_file(".txt", "++.");
    let out = run(&[file.path().to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("--lang"));

    let out = run(&["--lang", "bf", file.path().to_str().unwrap()]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
}

#[test]
fn diagnostic_names_the_file() {
    let file = source_file(".bf", "++\n+]");
    let path = file.path().to_str().unwrap().to_string();
    let out = run(&["--no-color", &path]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("error[ESO-S001]"), "got: {err}");
    assert!(err.contains(&format!("{path}:2:2")), "got: {err}");
    assert!(err.contains(" ^"), "got: {err}");
}

#[test]
fn missing_file_is_reported() {
    let out = run(&["--lang", "bf", "/definitely/not/here.bf"]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("Error reading"));
}

// --- Diagnostics ---

#[test]
fn text_diagnostic_uses_virtual_name() {
    let out = run(&["--no-color", "--lang", "befunge", "-e", "$@"]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("error[ESO-R002]"), "got: {err}");
    assert!(err.contains("<befunge>:1:1"), "got: {err}");
    assert!(!err.contains('\x1b'), "colour leaked: {err}");
}

#[test]
fn step_limit_flag() {
    let out = run(&["--no-color", "--lang", "bf", "--max-steps", "2", "-e", "+++"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("ESO-X001"));
}

#[test]
fn befunge_default_step_limit() {
    let out = run(&["--no-color", "--lang", "befunge", "-e", "1<\n@"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("100000"));
}

#[test]
fn json_success() {
    let out = run(&["--format", "json", "--lang", "befunge", "-e", "12@"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let v: serde_json::Value = serde_json::from_str(stdout(&out).trim()).expect("valid JSON");
    assert_eq!(v["ok"], true);
    assert_eq!(v["result"]["language"], "befunge");
    assert_eq!(v["result"]["state"]["values"], serde_json::json!([1, 2]));
}

#[test]
fn json_error() {
    let out = run(&["--format", "json", "--lang", "ws", "-e", "\n\n"]);
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_str(stdout(&out).trim()).expect("valid JSON");
    assert_eq!(v["ok"], false);
    assert_eq!(v["error"]["code"], "ESO-S003");
    assert_eq!(v["error"]["category"], "structural");
    assert_eq!(v["error"]["location"]["file"], "<whitespace>");
}

// --- Error registry ---

#[test]
fn explain_known_code() {
    let out = run(&["--explain", "eso-r002"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("ESO-R002"));
}

#[test]
fn explain_unknown_code() {
    let out = run(&["--explain", "ESO-Z999"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Unknown error code"));
}

#[test]
fn list_errors_covers_every_category() {
    let out = run(&["--list-errors"]);
    assert!(out.status.success());
    let text = stdout(&out);
    for code in ["ESO-S001", "ESO-R005", "ESO-X003", "ESO-L001"] {
        assert!(text.contains(code), "missing {code}");
    }
    assert_eq!(text.lines().count(), 14);
}

#[test]
fn no_program_is_a_usage_error() {
    let out = run(&[]);
    assert_eq!(out.status.code(), Some(2));
}
