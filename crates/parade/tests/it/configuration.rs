use insta_cmd::assert_cmd_snapshot;

use crate::common::{TestContext, end, pass, tests, worker};

#[test]
fn test_unknown_config_key_is_an_error() {
    let context = TestContext::new();
    context.write_file("parade.toml", "[worker]\nretries = 2\n");

    let output = context
        .command()
        .arg("tests/*.test.sh")
        .output()
        .expect("Failed to run parade");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(2), "{stderr}");
    assert!(stderr.starts_with("Parade failed\n"), "{stderr}");
    assert!(stderr.contains("Cause: failed to parse `"), "{stderr}");
    assert!(output.stdout.is_empty());
}

#[test]
fn test_empty_launcher_is_an_error() {
    let context = TestContext::new();
    context.write_file("parade.toml", "[worker]\nlauncher = [\"\"]\n");

    assert_cmd_snapshot!(context.command().arg("tests/*.test.sh"), @r"
    success: false
    exit_code: 2
    ----- stdout -----

    ----- stderr -----
    Parade failed
      Cause: `worker.launcher` must name a program
    ");
}

#[test]
fn test_config_file_from_command_line() {
    let context = TestContext::with_files([(
        "tests/a.test.sh",
        worker(&[tests(1), pass(), end()]),
    )]);
    // Without the launcher in `ci.toml` the shell script would be executed directly.
    context.write_file("parade.toml", "");
    context.write_file("config/ci.toml", "[worker]\nlauncher = [\"sh\"]\n");

    assert_cmd_snapshot!(
        context
            .command()
            .args(["tests/*.test.sh", "--config-file", "config/ci.toml"]),
        @r"
    success: true
    exit_code: 0
    ----- stdout -----
    ✔ 1 passed ([TIME])

    ----- stderr -----
    "
    );
}

#[test]
fn test_config_file_from_environment() {
    let context = TestContext::with_files([(
        "tests/a.test.sh",
        worker(&[tests(1), pass(), end()]),
    )]);
    context.write_file("parade.toml", "");
    context.write_file("ci.toml", "[worker]\nlauncher = [\"sh\"]\n");

    assert_cmd_snapshot!(
        context
            .command()
            .env("PARADE_CONFIG_FILE", "ci.toml")
            .arg("tests/*.test.sh"),
        @r"
    success: true
    exit_code: 0
    ----- stdout -----
    ✔ 1 passed ([TIME])

    ----- stderr -----
    "
    );
}

#[test]
fn test_missing_config_file_is_an_error() {
    let context = TestContext::new();

    assert_cmd_snapshot!(
        context
            .command()
            .args(["tests/*.test.sh", "--config-file", "missing.toml"]),
        @r"
    success: false
    exit_code: 2
    ----- stdout -----

    ----- stderr -----
    Parade failed
      Cause: failed to read `[TEMP_DIR]/missing.toml`
      Cause: No such file or directory (os error 2)
    "
    );
}

#[test]
fn test_max_workers_runs_every_file() {
    let context = TestContext::with_files([
        ("tests/a.test.sh", worker(&[tests(1), pass(), end()])),
        ("tests/b.test.sh", worker(&[tests(2), pass(), pass(), end()])),
        ("tests/c.test.sh", worker(&[tests(1), pass(), end()])),
    ]);

    assert_cmd_snapshot!(context.command().args(["tests/*.test.sh", "-n", "1"]), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    ✔ 4 passed ([TIME])

    ----- stderr -----
    ");
}

#[test]
fn test_max_workers_from_config() {
    let context = TestContext::with_files([
        ("tests/a.test.sh", worker(&[tests(1), pass(), end()])),
        ("tests/b.test.sh", worker(&[tests(1), pass(), end()])),
    ]);
    context.write_file("parade.toml", "[worker]\nlauncher = [\"sh\"]\nmax-workers = 1\n");

    assert_cmd_snapshot!(context.command().arg("tests/*.test.sh"), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    ✔ 2 passed ([TIME])

    ----- stderr -----
    ");
}
