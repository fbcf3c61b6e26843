//! Call-site attribution and log line formatting.
//!
//! Every logging primitive on [`T`](super::T) is `#[track_caller]`, so the
//! location of the call inside the test body is always known. That location is
//! the attribution unless the context has registered helper functions, in which
//! case the live call stack is walked outward past any helper frames.
//!
//! Symbols of inlined functions often resolve to bare names without a module
//! path, so frames are identified by the start address of the physical frame
//! holding them, plus name and file.

use std::collections::HashSet;
use std::panic::Location;
use std::path::{Path, PathBuf};

/// Placeholder file used when a frame carries no source information.
const UNKNOWN_FILE: &str = "???";

/// A resolved `file:line` attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Site {
    pub file: String,
    pub line: u32,
}

impl Site {
    pub(crate) fn unknown() -> Self {
        Self {
            file: UNKNOWN_FILE.to_string(),
            line: 1,
        }
    }

    fn from_location(location: &Location<'_>) -> Self {
        Self {
            file: basename(location.file()).to_string(),
            line: location.line(),
        }
    }

    fn from_frame(frame: &Frame) -> Self {
        match (&frame.file, frame.line) {
            (Some(file), Some(line)) => Self {
                file: basename(&file.to_string_lossy()).to_string(),
                line,
            },
            _ => Self::unknown(),
        }
    }
}

/// One resolved symbol of the captured call stack, innermost first.
#[derive(Debug)]
struct Frame {
    /// Start address of the physical frame. Shared by every symbol inlined into it.
    address: usize,
    function: String,
    file: Option<PathBuf>,
    line: Option<u32>,
}

/// Identity of a function registered as a helper.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct HelperKey {
    address: usize,
    function: String,
    file: Option<PathBuf>,
}

/// The frame that invokes test bodies. A walk never goes past it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Boundary {
    name: &'static str,
    address: usize,
}

impl Boundary {
    pub(crate) fn new(name: &'static str, address: usize) -> Self {
        Self { name, address }
    }

    fn contains(&self, frame: &Frame) -> bool {
        frame.address == self.address || is_runner(&frame.function, self.name)
    }
}

impl Frame {
    fn key(&self) -> HelperKey {
        HelperKey {
            address: self.address,
            function: self.function.clone(),
            file: self.file.clone(),
        }
    }

    /// Whether this frame is the one executing the call recorded in `location`.
    fn is_at(&self, location: &Location<'_>) -> bool {
        match (&self.file, self.line) {
            (Some(file), Some(line)) => {
                line == location.line() && file.ends_with(Path::new(location.file()))
            }
            _ => false,
        }
    }
}

/// Capture and resolve the current call stack.
///
/// Inlined functions resolve to several symbols for one instruction pointer; they
/// are flattened in innermost-first order so the walk sees them as frames.
#[inline(never)]
fn capture() -> Vec<Frame> {
    let trace = backtrace::Backtrace::new();
    trace
        .frames()
        .iter()
        .flat_map(|frame| {
            let address = frame.symbol_address() as usize;
            frame.symbols().iter().map(move |symbol| Frame {
                address,
                function: symbol
                    .name()
                    .map(|name| format!("{:#}", name))
                    .unwrap_or_default(),
                file: symbol.filename().map(Path::to_path_buf),
                line: symbol.lineno(),
            })
        })
        .collect()
}

/// Whether `function` is the driver entry point or a closure defined inside it.
fn is_runner(function: &str, runner: &str) -> bool {
    function
        .strip_prefix(runner)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
}

/// Standard library frames between a body and the driver (`Fn::call` adapters,
/// boxed closure calls). Never attributed.
fn is_call_shim(frame: &Frame) -> bool {
    const PREFIXES: [&str; 6] = ["core::", "std::", "alloc::", "<core::", "<alloc::", "<&"];
    PREFIXES
        .iter()
        .any(|prefix| frame.function.starts_with(prefix))
        || frame.file.as_deref().is_some_and(is_std_source)
}

/// Whether `path` points into the standard library sources shipped with rustc.
fn is_std_source(path: &Path) -> bool {
    if path.starts_with("/rustc") {
        return true;
    }
    let components: Vec<_> = path.components().map(|c| c.as_os_str()).collect();
    components.windows(2).any(|pair| {
        pair[0] == "library" && (pair[1] == "core" || pair[1] == "std" || pair[1] == "alloc")
    })
}

/// Identity of the function containing the call at `location`, if the stack
/// can be resolved.
pub(crate) fn function_at(location: &Location<'_>) -> Option<HelperKey> {
    capture()
        .into_iter()
        .find(|frame| frame.is_at(location))
        .filter(|frame| frame.address != 0 || !frame.function.is_empty())
        .map(|frame| frame.key())
}

/// Attribute a log call made at `caller`.
///
/// With no helpers registered the caller location is used as is. Otherwise the
/// stack is walked from the frame holding the log call, skipping helper frames,
/// until a non-helper frame is found or the driver entry point is reached, in
/// which case the frame just inside it wins.
pub(crate) fn attribute(
    caller: &Location<'_>,
    helpers: &HashSet<HelperKey>,
    boundary: &Boundary,
) -> Site {
    if helpers.is_empty() {
        return Site::from_location(caller);
    }

    let frames = capture();
    let Some(start) = frames.iter().position(|frame| frame.is_at(caller)) else {
        return Site::from_location(caller);
    };

    let mut previous = &frames[start];
    for frame in &frames[start..] {
        if boundary.contains(frame) {
            return Site::from_frame(previous);
        }
        if is_call_shim(frame) {
            continue;
        }
        if !helpers.contains(&frame.key()) {
            return Site::from_frame(frame);
        }
        previous = frame;
    }

    Site::from_location(caller)
}

/// Render one log entry: a leading tab, the `file:line: ` prefix, continuation
/// lines indented by an extra tab, and exactly one trailing newline.
pub(crate) fn format_entry(site: &Site, message: &str) -> String {
    let mut lines: Vec<&str> = message.split('\n').collect();
    if lines.len() > 1 && lines.last() == Some(&"") {
        lines.pop();
    }

    let mut buf = format!("\t{}:{}: ", site.file, site.line);
    for (i, line) in lines.iter().enumerate() {
        if i > 0 {
            buf.push_str("\n\t\t");
        }
        buf.push_str(line);
    }
    buf.push('\n');
    buf
}

/// Truncate a path at its last separator, accepting both `/` and `\`.
fn basename(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(index) => &path[index + 1..],
        None => path,
    }
}
