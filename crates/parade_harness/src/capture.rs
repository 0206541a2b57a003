//! Structured stack capture for panicking tests.
//!
//! The panic hook installed by [`install_panic_capture`] runs before the panic
//! message is formatted or the stack unwinds. While a test body is executing
//! on the current thread it stores the unresolved call-site list in a
//! thread-local slot; the engine takes it back out after `catch_unwind`
//! returns and symbol resolution happens only when a failure message is built.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::panic;
use std::sync::{LazyLock, Once};

use backtrace::Backtrace;
use parade_protocol::{CapturedError, StackFrame};
use regex::Regex;

/// Files belonging to the standard library, third-party crates, or this harness.
pub const INTERNAL_FRAME_PATTERN: &str = r"(^|[/\\])(rustc[/\\]|library[/\\](std|core|alloc|panic_unwind|panic_abort)[/\\]|\.cargo[/\\](registry|git)[/\\]|parade_harness[/\\]src[/\\])";

static INTERNAL_FRAMES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(INTERNAL_FRAME_PATTERN).expect("internal frame pattern is valid"));

static INSTALL: Once = Once::new();

thread_local! {
    static IN_TEST: Cell<bool> = const { Cell::new(false) };
    static STASH: RefCell<Option<StashedPanic>> = const { RefCell::new(None) };
}

struct StashedPanic {
    backtrace: Backtrace,
    location: Option<StackFrame>,
}

/// Install the stack-capturing panic hook. Calling this more than once is a no-op.
///
/// Panics raised outside a test body are forwarded to the previously installed hook.
pub fn install_panic_capture() {
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if !IN_TEST.with(Cell::get) {
                previous(info);
                return;
            }

            let location = info.location().map(|location| StackFrame {
                file: location.file().to_string(),
                line: location.line(),
                column: Some(location.column()),
                function: None,
            });

            STASH.with(|slot| {
                if let Ok(mut slot) = slot.try_borrow_mut() {
                    *slot = Some(StashedPanic {
                        backtrace: Backtrace::new_unresolved(),
                        location,
                    });
                }
            });
        }));
    });
}

/// Marks the current thread as running a test body until dropped.
pub(crate) struct TestScope {
    _private: (),
}

impl TestScope {
    pub(crate) fn enter() -> Self {
        STASH.with(|slot| {
            if let Ok(mut slot) = slot.try_borrow_mut() {
                slot.take();
            }
        });
        IN_TEST.with(|flag| flag.set(true));
        Self { _private: () }
    }
}

impl Drop for TestScope {
    fn drop(&mut self) {
        IN_TEST.with(|flag| flag.set(false));
    }
}

fn take_stashed() -> Option<StashedPanic> {
    STASH.with(|slot| slot.try_borrow_mut().ok().and_then(|mut slot| slot.take()))
}

/// The raw error raised by a test body, before it is made serializable.
pub struct RaisedError {
    kind: String,
    message: String,
    backtrace: Option<Backtrace>,
    location: Option<StackFrame>,
}

impl RaisedError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            backtrace: None,
            location: None,
        }
    }

    /// Build the error for a caught panic, claiming the stack stashed by the hook.
    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            "Box<dyn Any>".to_string()
        };

        let stashed = take_stashed();
        Self {
            kind: "panic".to_string(),
            message,
            location: stashed.as_ref().and_then(|stashed| stashed.location.clone()),
            backtrace: stashed.map(|stashed| stashed.backtrace),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Resolve the stashed call sites and keep only user frames.
    ///
    /// When no user frame survives (for instance without debug info) the panic
    /// location stands in for the stack, unless it is internal too.
    pub fn into_captured(self, filter: &FrameFilter) -> CapturedError {
        let mut stack = self
            .backtrace
            .map(|mut backtrace| {
                backtrace.resolve();
                filter.apply(resolve_frames(&backtrace))
            })
            .unwrap_or_default();

        if stack.is_empty() {
            stack.extend(self.location.filter(|location| !filter.is_internal(location)));
        }

        CapturedError {
            kind: self.kind,
            message: self.message,
            stack,
        }
    }
}

impl fmt::Debug for RaisedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RaisedError")
            .field("kind", &self.kind)
            .field("message", &self.message)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

fn resolve_frames(backtrace: &Backtrace) -> Vec<StackFrame> {
    backtrace
        .frames()
        .iter()
        .flat_map(backtrace::BacktraceFrame::symbols)
        .filter_map(|symbol| {
            Some(StackFrame {
                file: symbol.filename()?.to_string_lossy().into_owned(),
                line: symbol.lineno()?,
                column: symbol.colno(),
                function: symbol.name().map(|name| format!("{name:#}")),
            })
        })
        .collect()
}

/// Decides which frames belong to the runtime rather than to the code under test.
#[derive(Debug, Clone)]
pub struct FrameFilter {
    internal: Regex,
}

impl FrameFilter {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            internal: Regex::new(pattern)?,
        })
    }

    pub fn is_internal(&self, frame: &StackFrame) -> bool {
        self.internal.is_match(&frame.file)
    }

    /// Drop internal frames, keeping the remaining ones in order.
    pub fn apply(&self, mut frames: Vec<StackFrame>) -> Vec<StackFrame> {
        frames.retain(|frame| !self.is_internal(frame));
        frames
    }
}

impl Default for FrameFilter {
    fn default() -> Self {
        Self {
            internal: INTERNAL_FRAMES.clone(),
        }
    }
}
