//! Exercises the compiled binary end to end: writes a trace to a real
//! file and checks its stdout, covering the file-IO plumbing `main.rs`
//! owns that the library-level tests never touch.

use std::io::Write;
use std::process::Command;

use tempfile::NamedTempFile;

#[test]
fn binary_reads_a_trace_file_and_prints_its_report() {
    let mut file = NamedTempFile::new().expect("create temp trace file");
    writeln!(file, "begin(T1)").expect("write trace");
    writeln!(file, "W(T1,x1,101)").expect("write trace");
    writeln!(file, "end(T1)").expect("write trace");
    writeln!(file, "dump(x1)").expect("write trace");

    let output = Command::new(env!("CARGO_BIN_EXE_repcrec"))
        .arg(file.path())
        .output()
        .expect("run binary");

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).expect("utf8 stdout");
    assert!(stdout.contains("Commit: T1"));
    assert!(stdout.contains("Site 2: x1: 101"));
}

#[test]
fn binary_reports_a_missing_trace_file_without_panicking() {
    let output = Command::new(env!("CARGO_BIN_EXE_repcrec"))
        .arg("/nonexistent/path/to/trace.txt")
        .output()
        .expect("run binary");

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).expect("utf8 stderr");
    assert!(stderr.contains("could not read"));
}
