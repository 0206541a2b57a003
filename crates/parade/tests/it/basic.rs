use insta_cmd::assert_cmd_snapshot;

use crate::common::{TestContext, end, fail, pass, pending, tests, worker};

#[test]
fn test_no_matching_files() {
    let context = TestContext::new();

    assert_cmd_snapshot!(context.command().arg("tests/*.test.sh"), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    ℹ No tests found

    ----- stderr -----
    ");
}

#[test]
fn test_file_without_tests() {
    let context = TestContext::with_files([("tests/empty.test.sh", worker(&[tests(0), end()]))]);

    assert_cmd_snapshot!(context.command().arg("tests/*.test.sh"), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    ℹ No tests found

    ----- stderr -----
    ");
}

#[test]
fn test_all_passing() {
    let context = TestContext::with_files([
        ("tests/a.test.sh", worker(&[tests(2), pass(), pass(), end()])),
        ("tests/b.test.sh", worker(&[tests(1), pass(), end()])),
    ]);

    assert_cmd_snapshot!(context.command().arg("tests/*.test.sh"), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    ✔ 3 passed ([TIME])

    ----- stderr -----
    ");
}

#[test]
fn test_failures_and_skips_across_files() {
    let context = TestContext::with_files([
        (
            "tests/a.test.sh",
            worker(&[tests(3), pass(), pass(), pass(), end()]),
        ),
        (
            "tests/b.test.sh",
            worker(&[
                tests(2),
                fail(
                    "adds numbers",
                    &["math", "integers"],
                    "assertion failed\nexpected 2, found 3",
                    &[("tests/math.rs", 14), ("tests/helpers.rs", 3)],
                ),
                pending("divides", &["math"]),
                end(),
            ]),
        ),
    ]);

    assert_cmd_snapshot!(context.command().arg("tests/*.test.sh"), @r"
    success: false
    exit_code: 1
    ----- stdout -----
     FAIL  adds numbers math → integers
           tests/b.test.sh

           panic: assertion failed
           expected 2, found 3
               at tests/math.rs:14
               at tests/helpers.rs:3


     SKIP  divides math
           tests/b.test.sh


    ✖ 3 passed, 1 failed, 1 skipped ([TIME])

    ----- stderr -----
    ");
}

#[test]
fn test_only_skipped_tests_succeed() {
    let context = TestContext::with_files([(
        "tests/a.test.sh",
        worker(&[tests(1), pending("later", &[]), end()]),
    )]);

    assert_cmd_snapshot!(context.command().arg("tests/*.test.sh"), @r"
    success: true
    exit_code: 0
    ----- stdout -----
     SKIP  later
           tests/a.test.sh


    ℹ 1 skipped ([TIME])

    ----- stderr -----
    ");
}

#[test]
fn test_quiet_prints_only_the_summary() {
    let context = TestContext::with_files([(
        "tests/a.test.sh",
        worker(&[tests(2), fail("breaks", &[], "boom", &[]), pass(), end()]),
    )]);

    assert_cmd_snapshot!(context.command().args(["tests/*.test.sh", "-q"]), @r"
    success: false
    exit_code: 1
    ----- stdout -----
    ✖ 1 passed, 1 failed ([TIME])

    ----- stderr -----
    ");
}

#[test]
fn test_silent_prints_nothing() {
    let context = TestContext::with_files([(
        "tests/a.test.sh",
        worker(&[tests(1), fail("breaks", &[], "boom", &[]), end()]),
    )]);

    assert_cmd_snapshot!(context.command().args(["tests/*.test.sh", "-qq"]), @r"
    success: false
    exit_code: 1
    ----- stdout -----

    ----- stderr -----
    ");
}

#[test]
fn test_untagged_worker_output_is_ignored() {
    let script = format!(
        "echo 'starting up'\necho '{{\"name\": \"pass\", \"args\": []}}'\n{}",
        worker(&[tests(1), pass(), end()])
    );
    let context = TestContext::with_files([("tests/noisy.test.sh", script)]);

    assert_cmd_snapshot!(context.command().arg("tests/*.test.sh"), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    ✔ 1 passed ([TIME])

    ----- stderr -----
    ");
}

#[test]
fn test_worker_receives_reporter_arguments() {
    let script = format!(
        "[ \"$1\" = \"--reporter\" ] && [ \"$2\" = \"message\" ] || exit 3\n{}",
        worker(&[tests(1), pass(), end()])
    );
    let context = TestContext::with_files([("tests/args.test.sh", script)]);

    assert_cmd_snapshot!(context.command().arg("tests/*.test.sh"), @r"
    success: true
    exit_code: 0
    ----- stdout -----
    ✔ 1 passed ([TIME])

    ----- stderr -----
    ");
}
