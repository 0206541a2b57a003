use std::panic::{self, AssertUnwindSafe};

use crate::capture::{RaisedError, TestScope};
use crate::suite::{Node, SuiteId, SuiteTree, TestId};

/// Receives the engine's lifecycle events, in execution order.
///
/// Suite and test-end callbacks default to doing nothing.
pub trait Listener {
    /// Called once before any test runs, with the number of declared tests.
    fn start(&mut self, total: usize);

    fn suite(&mut self, _tree: &SuiteTree, _suite: SuiteId) {}

    fn suite_end(&mut self, _tree: &SuiteTree, _suite: SuiteId) {}

    fn pass(&mut self, tree: &SuiteTree, test: TestId);

    fn fail(&mut self, tree: &SuiteTree, test: TestId, error: RaisedError);

    fn pending(&mut self, tree: &SuiteTree, test: TestId);

    fn test_end(&mut self, _tree: &SuiteTree, _test: TestId) {}

    /// Called once after every test has been reported.
    fn end(&mut self);
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunCounts {
    pub passed: usize,
    pub failed: usize,
    pub pending: usize,
}

/// Run every test in `tree` depth-first, in declaration order.
///
/// A failing test never stops its siblings.
pub fn run(tree: &SuiteTree, listener: &mut dyn Listener) -> RunCounts {
    let mut counts = RunCounts::default();

    listener.start(tree.total());
    run_suite(tree, tree.root(), listener, &mut counts);
    listener.end();

    counts
}

fn run_suite(tree: &SuiteTree, suite: SuiteId, listener: &mut dyn Listener, counts: &mut RunCounts) {
    listener.suite(tree, suite);

    for node in tree.children(suite) {
        match *node {
            Node::Suite(child) => run_suite(tree, child, listener, counts),
            Node::Test(test) => run_test(tree, test, listener, counts),
        }
    }

    listener.suite_end(tree, suite);
}

fn run_test(tree: &SuiteTree, test: TestId, listener: &mut dyn Listener, counts: &mut RunCounts) {
    let Some(body) = &tree.case(test).body else {
        counts.pending += 1;
        listener.pending(tree, test);
        return;
    };

    let outcome = {
        let _scope = TestScope::enter();
        panic::catch_unwind(AssertUnwindSafe(body))
    };

    match outcome {
        Ok(Ok(())) => {
            counts.passed += 1;
            listener.pass(tree, test);
        }
        Ok(Err(error)) => {
            counts.failed += 1;
            listener.fail(tree, test, error);
        }
        Err(payload) => {
            counts.failed += 1;
            listener.fail(tree, test, RaisedError::from_panic(payload.as_ref()));
        }
    }

    listener.test_end(tree, test);
}
