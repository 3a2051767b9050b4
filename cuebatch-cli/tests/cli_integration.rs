use assert_cmd::Command;
use predicates::str::contains;
use std::error::Error;
use std::fs;
use tempfile::tempdir;

// Helper function to get the path to the compiled binary
fn cuebatch_cmd() -> Command {
    let mut cmd = Command::cargo_bin("cuebatch").expect("Failed to find cuebatch binary");
    // Keep the environment from leaking defaults into the tests
    for var in [
        "CUEBATCH_DIR",
        "CUEBATCH_PATTERN",
        "CUEBATCH_MAX_CONCURRENT",
        "CUEBATCH_OFFSET_MS",
        "CUEBATCH_THRESHOLD_MS",
        "CUEBATCH_DEBUG",
        "CUEBATCH_VERBOSE",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

const SAMPLE_SRT: &str = "1\n00:00:00,100 --> 00:00:01,000\nFirst\n\n\
                          2\n00:00:01,100 --> 00:00:02,000\nSecond\n\n";

#[test]
fn test_shift_writes_output_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("in.srt");
    let output = dir.path().join("out.srt");
    fs::write(&input, SAMPLE_SRT)?;

    cuebatch_cmd()
        .arg("shift")
        .arg(&input)
        .arg("-o")
        .arg(&output)
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(&output)?,
        "1\n00:00:00,000 --> 00:00:00,750\nFirst\n\n\
         2\n00:00:00,750 --> 00:00:01,750\nSecond\n\n"
    );
    Ok(())
}

#[test]
fn test_shift_to_stdout_with_custom_offset() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("in.srt");
    fs::write(&input, SAMPLE_SRT)?;

    cuebatch_cmd()
        .args(["--offset", "1000", "--threshold", "50", "shift"])
        .arg(&input)
        .assert()
        .success()
        .stdout(contains("00:00:01,100 --> 00:00:02,000"))
        .stdout(contains("00:00:02,100 --> 00:00:03,000"));
    Ok(())
}

#[test]
fn test_shift_malformed_input_fails() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("bad.srt");
    fs::write(&input, "1\n00:00:01,000 -> 00:00:02,000\nText\n")?;

    cuebatch_cmd()
        .arg("shift")
        .arg(&input)
        .assert()
        .failure()
        .stderr(contains("Malformed cue at line 2"));
    Ok(())
}

#[test]
fn test_run_missing_directory_is_fatal() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let missing = dir.path().join("nowhere");

    cuebatch_cmd()
        .arg("--dir")
        .arg(&missing)
        .args(["run", "echo {input}"])
        .assert()
        .failure()
        .stderr(contains("Failed to enumerate candidates"));
    Ok(())
}

#[test]
fn test_run_rejects_zero_jobs() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;

    cuebatch_cmd()
        .arg("--dir")
        .arg(dir.path())
        .args(["--jobs", "0", "run", "echo {input}"])
        .assert()
        .failure()
        .stderr(contains("max_concurrent must be at least 1"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_run_reports_json_summary() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    for name in ["a.mp4", "b.mp4", "skip.mkv"] {
        fs::write(dir.path().join(name), "dummy content")?;
    }

    cuebatch_cmd()
        .arg("--dir")
        .arg(dir.path())
        .args(["--json", "run", "true {input}"])
        .assert()
        .success()
        .stdout(contains("\"total\": 2"))
        .stdout(contains("\"completed\": 2"))
        .stdout(contains("\"failed\": []"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_run_prints_success_message() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.mp4"), "dummy content")?;

    cuebatch_cmd()
        .arg("--dir")
        .arg(dir.path())
        .args(["--verbose", "run", "true {input}"])
        .assert()
        .success()
        .stdout(contains("Successfully"))
        .stdout(contains("Total execution time:"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_run_failed_jobs_count_as_completed() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.mp4"), "dummy content")?;
    fs::write(dir.path().join("b.mp4"), "dummy content")?;

    cuebatch_cmd()
        .arg("--dir")
        .arg(dir.path())
        .args(["--json", "run", "false {name}"])
        .assert()
        .success()
        .stdout(contains("\"completed\": 2"))
        .stdout(contains("a.mp4"))
        .stdout(contains("b.mp4"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_run_failed_job_prints_success_summary() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    fs::write(dir.path().join("a.mp4"), "dummy content")?;

    cuebatch_cmd()
        .arg("--dir")
        .arg(dir.path())
        .args(["--verbose", "run", "false {name}"])
        .assert()
        .success()
        .stdout(contains("Successfully"))
        .stdout(contains("Total execution time:"))
        .stderr(contains("a.mp4"));
    Ok(())
}

#[test]
fn test_invalid_arguments() {
    cuebatch_cmd()
        .arg("run")
        .assert()
        .failure()
        .stderr(contains("TEMPLATE"));
}
