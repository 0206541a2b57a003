use std::fmt;

use parade_protocol::TestIdentity;

use crate::capture::RaisedError;

/// Handle to a suite inside a [`SuiteTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SuiteId(usize);

/// Handle to a test inside a [`SuiteTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TestId(usize);

pub(crate) type TestBody = Box<dyn Fn() -> Result<(), RaisedError>>;

/// What a test body may return.
///
/// `()` always passes. `Result<(), E>` fails with the short type name of `E`
/// as its kind and the `Display` output as its message.
pub trait TestOutcome {
    fn into_result(self) -> Result<(), RaisedError>;
}

impl TestOutcome for () {
    fn into_result(self) -> Result<(), RaisedError> {
        Ok(())
    }
}

impl<E: fmt::Display> TestOutcome for Result<(), E> {
    fn into_result(self) -> Result<(), RaisedError> {
        self.map_err(|error| RaisedError::new(short_type_name::<E>(), error.to_string()))
    }
}

/// `core::num::error::ParseIntError` becomes `ParseIntError`.
fn short_type_name<T>() -> &'static str {
    let name = std::any::type_name::<T>();
    let name = name.split('<').next().unwrap_or(name);
    name.rsplit("::").next().unwrap_or(name)
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Node {
    Suite(SuiteId),
    Test(TestId),
}

struct SuiteNode {
    title: String,
    parent: Option<SuiteId>,
    children: Vec<Node>,
}

pub(crate) struct TestCase {
    title: String,
    parent: SuiteId,
    /// `None` for tests that are declared but skipped.
    pub(crate) body: Option<TestBody>,
}

/// An arena of suites and tests.
///
/// Children refer to their parent by handle; the root suite is untitled and has
/// no parent. Tests are enumerated in declaration order.
pub struct SuiteTree {
    suites: Vec<SuiteNode>,
    tests: Vec<TestCase>,
}

impl SuiteTree {
    pub fn new() -> Self {
        Self {
            suites: vec![SuiteNode {
                title: String::new(),
                parent: None,
                children: Vec::new(),
            }],
            tests: Vec::new(),
        }
    }

    pub const fn root(&self) -> SuiteId {
        SuiteId(0)
    }

    /// Declare a nested suite.
    pub fn suite(&mut self, parent: SuiteId, title: impl Into<String>) -> SuiteId {
        let id = SuiteId(self.suites.len());
        self.suites.push(SuiteNode {
            title: title.into(),
            parent: Some(parent),
            children: Vec::new(),
        });
        self.suites[parent.0].children.push(Node::Suite(id));
        id
    }

    /// Declare a test.
    pub fn test<F, R>(&mut self, parent: SuiteId, title: impl Into<String>, body: F) -> TestId
    where
        F: Fn() -> R + 'static,
        R: TestOutcome,
    {
        self.push_test(parent, title.into(), Some(Box::new(move || body().into_result())))
    }

    /// Declare a test that is reported as pending instead of being run.
    pub fn skip(&mut self, parent: SuiteId, title: impl Into<String>) -> TestId {
        self.push_test(parent, title.into(), None)
    }

    fn push_test(&mut self, parent: SuiteId, title: String, body: Option<TestBody>) -> TestId {
        let id = TestId(self.tests.len());
        self.tests.push(TestCase {
            title,
            parent,
            body,
        });
        self.suites[parent.0].children.push(Node::Test(id));
        id
    }

    /// Number of tests, pending ones included, known before anything runs.
    pub fn total(&self) -> usize {
        self.tests.len()
    }

    pub fn suite_title(&self, suite: SuiteId) -> &str {
        &self.suites[suite.0].title
    }

    pub fn test_title(&self, test: TestId) -> &str {
        &self.tests[test.0].title
    }

    /// The test's title and the titles of its titled ancestors, outermost first.
    pub fn identity(&self, test: TestId) -> TestIdentity {
        let case = &self.tests[test.0];
        let mut path = Vec::new();
        let mut current = Some(case.parent);

        while let Some(id) = current {
            let suite = &self.suites[id.0];
            if suite.title.is_empty() {
                break;
            }
            path.push(suite.title.clone());
            current = suite.parent;
        }

        path.reverse();
        TestIdentity::new(case.title.clone(), path)
    }

    pub(crate) fn children(&self, suite: SuiteId) -> &[Node] {
        &self.suites[suite.0].children
    }

    pub(crate) fn case(&self, test: TestId) -> &TestCase {
        &self.tests[test.0]
    }
}

impl Default for SuiteTree {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SuiteTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteTree")
            .field("suites", &self.suites.len())
            .field("tests", &self.tests.len())
            .finish()
    }
}
