use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

const PROGRAM: &str = "\
start:  mov r1, r0, 3
loop:   sub r1, r0, 1
        nz.mov pc, r0, loop
        halt r0, r0, 0
";

/// Scratch directory unique to one test.
fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("opcasm-{}-{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn opcasm() -> Command {
    Command::cargo_bin("opcasm").unwrap()
}

#[test]
fn assembles_and_prints_listing() {
    let dir = scratch("listing");
    let src = dir.join("prog.s");
    let out = dir.join("prog.hex");
    fs::write(&src, PROGRAM).unwrap();

    opcasm()
        .arg(&src)
        .arg(&out)
        .assert()
        .success()
        .stdout(contains("0000  1001 0003             start:  mov r1, r0, 3"))
        .stdout(contains("Symbol Table:"))
        .stdout(contains("loop"));

    let hex = fs::read_to_string(&out).unwrap();
    let lines: Vec<_> = hex.lines().collect();
    assert_eq!(lines.len(), 2731);
    assert!(lines[0].starts_with("1001 0003 1a01 0001 700f 0002 1000 0000 0000"));
    assert!(lines[1..].iter().all(|l| l.split(' ').all(|w| w == "0000")));
}

#[test]
fn undefined_symbol_fails_without_output() {
    let dir = scratch("undefined");
    let src = dir.join("bad.s");
    let out = dir.join("bad.hex");
    fs::write(&src, "mov r1, r0, 1\nmov r1, r0, nowhere\n").unwrap();

    opcasm()
        .arg(&src)
        .arg(&out)
        .assert()
        .failure()
        .stderr(contains("undefined symbol at line 2"));
    assert!(!out.exists());
}

#[test]
fn unknown_instruction_fails() {
    let dir = scratch("unknown");
    let src = dir.join("bad.s");
    let out = dir.join("bad.hex");
    fs::write(&src, "jmp r1\n").unwrap();

    opcasm()
        .arg(&src)
        .arg(&out)
        .assert()
        .failure()
        .stderr(contains("unrecognized instruction jmp"));
    assert!(!out.exists());
}

#[test]
fn no_listing_and_symbols_json() {
    let dir = scratch("json");
    let src = dir.join("prog.s");
    let out = dir.join("prog.hex");
    let json = dir.join("syms.json");
    fs::write(&src, PROGRAM).unwrap();

    opcasm()
        .arg(&src)
        .arg(&out)
        .arg("--no-listing")
        .arg("--symbols-json")
        .arg(&json)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let syms: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(
        syms,
        serde_json::json!([
            { "name": "start", "value": 0 },
            { "name": "loop", "value": 2 }
        ])
    );
}

#[test]
fn config_file_and_flag_override() {
    let dir = scratch("config");
    let src = dir.join("prog.s");
    let out = dir.join("prog.hex");
    let cfg = dir.join("asm.json");
    fs::write(&src, "mov r2, r0, target\nror r1\ntarget: WORD 0x55\n").unwrap();
    fs::write(&cfg, r#"{ "sizing": "exact", "words_per_line": 8 }"#).unwrap();

    opcasm().arg(&src).arg(&out).arg("--config").arg(&cfg).assert().success();
    let hex = fs::read_to_string(&out).unwrap();
    assert_eq!(hex.lines().count(), 65536 / 8);
    assert!(hex.starts_with("1002 0003 0801 0055 0000"));

    opcasm()
        .arg(&src)
        .arg(&out)
        .arg("--config")
        .arg(&cfg)
        .arg("--sizing")
        .arg("compatible")
        .arg("--words-per-line")
        .arg("24")
        .assert()
        .success();
    let hex = fs::read_to_string(&out).unwrap();
    assert_eq!(hex.lines().count(), 2731);
    assert!(hex.starts_with("1002 0002 0801 0055 0000"));
}

#[test]
fn missing_input_reports_path() {
    let dir = scratch("missing");
    opcasm()
        .arg(dir.join("nope.s"))
        .arg(dir.join("nope.hex"))
        .assert()
        .failure()
        .stderr(contains("nope.s"));
}
