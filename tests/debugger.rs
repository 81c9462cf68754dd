use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::time::Duration;
use tempfile::NamedTempFile;

fn cargo_bin() -> Command {
    let mut cmd = Command::cargo_bin("bf").unwrap();
    cmd.timeout(Duration::from_secs(5))
        .env("BF_CONFIG", "/nonexistent/bf.toml")
        .env_remove("RUST_LOG");
    cmd
}

/// A config file that turns off the state dump.
fn quiet_config() -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    fs::write(file.path(), "[debugger]\nshow_state = false\n").unwrap();
    file
}

fn commands(text: &str) -> NamedTempFile {
    let file = NamedTempFile::new().unwrap();
    fs::write(file.path(), text).unwrap();
    file
}

#[test]
fn steps_and_quits_from_command_file() {
    let cmds = commands("s 3\nq\n");
    cargo_bin()
        .args(["-d", "-p", "+++."])
        .arg("--dbgin")
        .arg(cmds.path())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("state: [] >>>[0]<<< []")
                .and(predicate::str::contains("state: [] >>>[3]<<< []"))
                .and(predicate::str::contains("state: +++ (.) "))
                .and(predicate::str::contains("state: step counter = 3"))
                .and(predicate::str::ends_with("Exiting...\n")),
        );
}

#[test]
fn debugger_commands_from_stdin_share_it_with_program_input() {
    // Commands and program input interleave on the same stream
    cargo_bin()
        .args(["-d", "-p", ",.", "-r", "-w"])
        .write_stdin("t\ns\n7\ns\nq\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("7;").and(predicate::str::ends_with("Exiting...\n")));
}

#[test]
fn responses_go_to_debug_output_file() {
    let config = quiet_config();
    let cmds = commands("I 16\np $\nq\n");
    let out = NamedTempFile::new().unwrap();
    cargo_bin()
        .env("BF_CONFIG", config.path())
        .args(["-d", "-p", "++++++++++++++++++++++++++++++++++++++++++."])
        .arg("--dbgin")
        .arg(cmds.path())
        .arg("--dbgout")
        .arg(out.path())
        .assert()
        .success()
        .stdout("2A;");

    let responses = fs::read_to_string(out.path()).unwrap();
    assert_eq!(responses, "Now printing integers (base 16)\nExiting...\n");
}

#[test]
fn detaching_runs_to_completion() {
    let config = quiet_config();
    let cmds = commands("e\n");
    cargo_bin()
        .env("BF_CONFIG", config.path())
        .args(["-d", "-p", "+++++++++++++[>+++++<-]>."])
        .arg("--dbgin")
        .arg(cmds.path())
        .assert()
        .success()
        .stdout("Exited debugger\nA");
}

#[test]
fn debugger_requires_debug_flag() {
    cargo_bin().args(["-p", "+", "--dbgin", "cmds.txt"]).assert().code(2);
}

#[cfg(unix)]
#[test]
fn running_out_of_commands_is_input_exhaustion() {
    let cmds = commands("t\ns\n");
    cargo_bin()
        .args(["-d", "-p", "+++"])
        .arg("--dbgin")
        .arg(cmds.path())
        .assert()
        .code(254)
        .stderr(predicate::str::contains("Read EOF"));
}
