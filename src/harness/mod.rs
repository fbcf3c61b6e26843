//! Test execution harness.
//!
//! [`T`] offers the familiar `log` / `error` / `fatal` / `skip` surface for checks
//! that run inside a regular binary instead of a test binary. Aborts are explicit
//! values: [`T::fatal`], [`T::fail_now`], [`T::skip`] and [`T::skip_now`] return
//! `Err(Abort)` and the body propagates them with `?`, so nothing after the call
//! site runs. Any other panic escaping a body is caught by the driver and recorded
//! as a distinct panicked outcome.
//!
//! ```
//! use e2e_monitor::harness::{self, TestResult, T};
//!
//! fn check_homepage(t: &T) -> TestResult {
//!     t.log("fetching homepage");
//!     let status = 200;
//!     if status != 200 {
//!         return t.fatal(format_args!("unexpected status {}", status));
//!     }
//!     Ok(())
//! }
//!
//! let t = harness::run("Homepage", check_homepage);
//! assert!(!t.failed());
//! ```

pub(crate) mod decorate;

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe, Location};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

/// Outcome of a test body: `Ok` when it ran to completion, `Err` when it aborted.
pub type TestResult = Result<(), Abort>;

/// The two controlled early exits a test body can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Abort {
    /// Raised by `fail_now` / `fatal`. The test is marked failed.
    Failed,
    /// Raised by `skip_now` / `skip`. The test is marked skipped, not failed.
    Skipped,
}

impl fmt::Display for Abort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed => write!(f, "failnow"),
            Self::Skipped => write!(f, "skipnow"),
        }
    }
}

/// Mutable per-run state, guarded by the context lock.
#[derive(Default)]
struct State {
    failed: bool,
    skipped: bool,
    panicked: bool,
    output: Vec<u8>,
    sub_tests: Vec<T>,
    helpers: HashSet<decorate::HelperKey>,
}

/// A single test's context: failure and skip flags, the accumulated log and the
/// subtests run from it.
///
/// All methods take `&self`; the state sits behind a lock so a running test can
/// be observed (for example by a live output request) while it is still logging.
pub struct T {
    name: String,
    boundary: decorate::Boundary,
    state: RwLock<State>,
}

impl T {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            boundary: boundary(),
            state: RwLock::new(State::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Name of this test.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn emit(&self, caller: &'static Location<'static>, message: &str) {
        let site = {
            let state = self.read();
            decorate::attribute(caller, &state.helpers, &self.boundary)
        };
        let entry = decorate::format_entry(&site, message);
        self.write().output.extend_from_slice(entry.as_bytes());
    }

    /// Append a line to the test log.
    #[track_caller]
    pub fn log(&self, message: impl fmt::Display) {
        self.emit(Location::caller(), &message.to_string());
    }

    /// Mark the test failed, then log. Execution continues.
    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.fail();
        self.emit(Location::caller(), &message.to_string());
    }

    /// Log, then abort the test as failed.
    #[track_caller]
    pub fn fatal(&self, message: impl fmt::Display) -> TestResult {
        self.emit(Location::caller(), &message.to_string());
        self.fail_now()
    }

    /// Log, then abort the test as skipped.
    #[track_caller]
    pub fn skip(&self, message: impl fmt::Display) -> TestResult {
        self.emit(Location::caller(), &message.to_string());
        self.skip_now()
    }

    /// Mark the test failed without stopping it.
    pub fn fail(&self) {
        self.write().failed = true;
    }

    /// Mark the test failed and abort it.
    pub fn fail_now(&self) -> TestResult {
        self.fail();
        Err(Abort::Failed)
    }

    /// Mark the test skipped and abort it. Earlier failures are kept.
    pub fn skip_now(&self) -> TestResult {
        self.write().skipped = true;
        Err(Abort::Skipped)
    }

    pub fn failed(&self) -> bool {
        self.read().failed
    }

    pub fn skipped(&self) -> bool {
        self.read().skipped
    }

    /// Whether the body escaped with a panic rather than returning.
    pub fn panicked(&self) -> bool {
        self.read().panicked
    }

    /// Mark the calling function as a helper: log lines emitted from inside it are
    /// attributed to its caller instead. Applies to this context only.
    ///
    /// Attribution needs symbolized stack frames (debug info). Without them log
    /// lines fall back to the location of the logging call. Functions annotated
    /// with `#[track_caller]` get caller attribution without calling this.
    #[track_caller]
    pub fn helper(&self) {
        let caller = Location::caller();
        match decorate::function_at(caller) {
            Some(function) => {
                self.write().helpers.insert(function);
            }
            None => debug!(
                test = %self.name,
                location = %caller,
                "could not resolve helper frame"
            ),
        }
    }

    /// Run `body` as a subtest. The parent fails if the subtest fails; the
    /// subtest's log gains a `- parent/child` header. Returns whether the subtest
    /// passed.
    pub fn run<F>(&self, name: &str, body: F) -> bool
    where
        F: FnOnce(&T) -> TestResult,
    {
        let child = T::new(name);
        drive(&child, Box::new(body));

        let failed = child.failed();
        if failed {
            self.fail();
        }

        {
            let mut state = child.write();
            let mut output = format!("- {}/{}\n", self.name, name).into_bytes();
            output.append(&mut state.output);
            state.output = output;
        }

        self.write().sub_tests.push(child);
        !failed
    }

    /// The log accumulated by this test alone, without subtest output or the
    /// terminal status line.
    pub fn raw_output(&self) -> Vec<u8> {
        self.read().output.clone()
    }

    /// Rendered output: this test's log, the output of every failed subtest each
    /// followed by a blank line, then `skipped`, `FAIL` or `PASS`.
    ///
    /// Rendering does not modify the context, so repeated calls are identical.
    pub fn output(&self) -> Vec<u8> {
        let state = self.read();
        let mut out = state.output.clone();
        for sub in state.sub_tests.iter().filter(|sub| sub.failed()) {
            out.extend_from_slice(&sub.output());
            out.push(b'\n');
        }

        let status: &[u8] = if state.skipped {
            b"skipped\n"
        } else if state.failed {
            b"FAIL\n"
        } else {
            b"PASS\n"
        };
        out.extend_from_slice(status);
        out
    }

    fn record_panic(&self, payload: &(dyn Any + Send)) {
        let message = panic_message(payload);
        warn!(test = %self.name, panic = %message, "test body panicked");

        let entry =
            decorate::format_entry(&decorate::Site::unknown(), &format!("panicked: {}", message));
        let mut state = self.write();
        state.failed = true;
        state.panicked = true;
        state.output.extend_from_slice(entry.as_bytes());
    }
}

impl fmt::Debug for T {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.read();
        f.debug_struct("T")
            .field("name", &self.name)
            .field("failed", &state.failed)
            .field("skipped", &state.skipped)
            .field("panicked", &state.panicked)
            .field("sub_tests", &state.sub_tests.len())
            .finish()
    }
}

/// Run `body` against a fresh context and return the context once it finishes,
/// whether it completed, aborted or panicked.
pub fn run<F>(name: &str, body: F) -> T
where
    F: FnOnce(&T) -> TestResult,
{
    let t = T::new(name);
    drive(&t, Box::new(body));
    t
}

/// A test body as handed to the driver.
pub(crate) type Body<'a> = Box<dyn FnOnce(&T) -> TestResult + 'a>;

/// Run `body` against `t` and record how it ended.
pub(crate) fn drive(t: &T, body: Body<'_>) {
    match panic::catch_unwind(AssertUnwindSafe(move || enter(t, body))) {
        Ok(Ok(())) => {}
        Ok(Err(Abort::Failed)) => t.fail(),
        Ok(Err(Abort::Skipped)) => t.write().skipped = true,
        Err(payload) => t.record_panic(payload.as_ref()),
    }
}

/// The only caller of test bodies. Stack walks for log attribution stop at this
/// frame, matched by address so inlined symbols without paths still count.
#[inline(never)]
fn enter(t: &T, body: Body<'_>) -> TestResult {
    body(t)
}

fn boundary() -> decorate::Boundary {
    let entry: fn(&T, Body<'_>) -> TestResult = enter;
    decorate::Boundary::new(std::any::type_name_of_val(&enter), entry as usize)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Log with formatting: `logf!(t, "got {}", value)`.
#[macro_export]
macro_rules! logf {
    ($t:expr, $($arg:tt)*) => {
        $t.log(::std::format_args!($($arg)*))
    };
}

/// Mark failed and log with formatting. Execution continues.
#[macro_export]
macro_rules! errorf {
    ($t:expr, $($arg:tt)*) => {
        $t.error(::std::format_args!($($arg)*))
    };
}

/// Log with formatting, then abort as failed. Evaluates to a [`TestResult`].
#[macro_export]
macro_rules! fatalf {
    ($t:expr, $($arg:tt)*) => {
        $t.fatal(::std::format_args!($($arg)*))
    };
}

/// Log with formatting, then abort as skipped. Evaluates to a [`TestResult`].
#[macro_export]
macro_rules! skipf {
    ($t:expr, $($arg:tt)*) => {
        $t.skip(::std::format_args!($($arg)*))
    };
}
