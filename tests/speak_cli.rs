#![cfg(feature = "bin-speak")]

use std::process::{Command, Output};

fn speak(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_speak"))
        .args(args)
        .output()
        .expect("run speak binary")
}

#[test]
fn wrong_argument_counts_exit_with_usage() {
    for args in [
        &[][..],
        &["hello"][..],
        &["hello", "out.wav", "extra"][..],
        &["--", "hello", "out.wav"][..],
    ] {
        let output = speak(args);
        assert_eq!(output.status.code(), Some(1), "args: {args:?}");

        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Usage: speak"), "stderr: {stderr}");
    }
}

#[test]
fn unwritable_output_reports_an_error() {
    let output = speak(&["hello", "/definitely/not/a/dir/out.wav"]);
    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("An error occurred"), "stderr: {stderr}");
}

#[test]
#[ignore = "requires espeak-ng on PATH"]
fn two_arguments_write_a_non_empty_wav() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let out = dir.path().join("hello.wav");

    let output = speak(&["Hello from the narrator.", out.to_str().expect("utf-8 path")]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Successfully generated audio"));
    assert!(std::fs::metadata(&out)?.len() > 44);
    Ok(())
}
