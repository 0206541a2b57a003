use insta_cmd::assert_cmd_snapshot;

use crate::common::{TestContext, end, pass, tests, worker};

#[test]
fn test_double_star_matches_nested_files() {
    let context = TestContext::with_files([
        ("tests/a.test.sh", worker(&[tests(1), pass(), end()])),
        ("tests/unit/b.test.sh", worker(&[tests(1), pass(), end()])),
        ("tests/unit/deep/c.test.sh", worker(&[tests(1), pass(), end()])),
        ("tests/unit/helper.sh", "exit 1\n".to_string()),
    ]);

    assert_cmd_snapshot!(context.command().arg("tests/**/*.test.sh"), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    ✔ 3 passed ([TIME])

    ----- stderr -----
    ");
}

#[test]
fn test_single_star_stays_in_one_directory() {
    let context = TestContext::with_files([
        ("tests/a.test.sh", worker(&[tests(1), pass(), end()])),
        ("tests/unit/b.test.sh", "exit 1\n".to_string()),
    ]);

    assert_cmd_snapshot!(context.command().arg("tests/*.test.sh"), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    ✔ 1 passed ([TIME])

    ----- stderr -----
    ");
}

#[test]
fn test_node_modules_are_excluded_by_default() {
    let context = TestContext::with_files([
        ("src/a.test.sh", worker(&[tests(1), pass(), end()])),
        ("node_modules/pkg/b.test.sh", "exit 1\n".to_string()),
    ]);

    assert_cmd_snapshot!(context.command().arg("**/*.test.sh"), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    ✔ 1 passed ([TIME])

    ----- stderr -----
    ");
}

#[test]
fn test_configured_excludes_replace_the_defaults() {
    let context = TestContext::with_files([
        ("tests/a.test.sh", worker(&[tests(1), pass(), end()])),
        ("tests/slow/b.test.sh", "exit 1\n".to_string()),
    ]);
    context.write_file(
        "parade.toml",
        "[discovery]\nexclude = [\"**/slow/**\"]\n\n[worker]\nlauncher = [\"sh\"]\n",
    );

    assert_cmd_snapshot!(context.command().arg("tests/**/*.test.sh"), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    ✔ 1 passed ([TIME])

    ----- stderr -----
    ");
}

#[test]
fn test_invalid_pattern_is_an_error() {
    let context = TestContext::new();

    let output = context
        .command()
        .arg("tests/[a.test.sh")
        .output()
        .expect("Failed to run parade");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(output.status.code(), Some(2), "{stderr}");
    assert!(
        stderr.starts_with("Parade failed\n  Cause: invalid pattern `tests/[a.test.sh`\n"),
        "{stderr}"
    );
    assert!(output.stdout.is_empty());
}
