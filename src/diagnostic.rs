//! Non-fatal diagnostics and the scoped interceptor that judges them.
//!
//! Code running inside a probe (or anything it calls) reports soft problems
//! with [`trigger`] or one of the helpers ([`deprecated`], [`notice`],
//! [`warning`], [`error`]). What happens next depends on whether an
//! interceptor is installed on the current thread:
//!
//! - **No interceptor**: the diagnostic is forwarded to `tracing` at a level
//!   matching its severity and execution continues.
//! - **Interceptor installed**: the interceptor returns a [`Disposition`].
//!   [`Disposition::Continue`] resumes the caller; [`Disposition::Abort`]
//!   unwinds the stack with an [`Aborted`] payload, so no further code after
//!   the trigger site runs. Whoever installed the interceptor is expected to
//!   catch that unwind with [`std::panic::catch_unwind`].
//!
//! Interceptors are installed with [`intercept`], which returns an
//! [`InterceptGuard`]. Dropping the guard restores whatever interceptor was
//! active before, including while unwinding, so an aborted probe can never
//! leave its interceptor behind for unrelated work on the same thread.

use std::{
    cell::RefCell,
    fmt,
    marker::PhantomData,
    panic::{self, Location},
    rc::Rc,
};

/// Severity tier of a [`Diagnostic`], lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// "This behaviour is outdated". Never fatal to a probe.
    Deprecated,
    Notice,
    Warning,
    Error,
}

impl Severity {
    /// Whether this tier is exempt from aborting a probe.
    pub fn is_deprecation(self) -> bool {
        matches!(self, Self::Deprecated)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Deprecated => "deprecated",
            Self::Notice => "notice",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// A soft problem reported while some operation was running.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{severity}: {message} at {file}:{line}")]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    /// Source file of the trigger site.
    pub file: &'static str,
    /// Source line of the trigger site.
    pub line: u32,
}

impl Diagnostic {
    #[track_caller]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        let location = Location::caller();
        Self {
            severity,
            message: message.into(),
            file: location.file(),
            line: location.line(),
        }
    }
}

/// What an interceptor decided to do with a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// The diagnostic has been dealt with; the trigger site keeps running.
    Continue,
    /// Stop the running operation by unwinding with an [`Aborted`] payload.
    Abort,
}

/// Unwind payload raised when an interceptor answers [`Disposition::Abort`].
#[derive(Debug)]
pub struct Aborted(pub Diagnostic);

type Interceptor = Rc<dyn Fn(&Diagnostic) -> Disposition>;

thread_local! {
    static INTERCEPTOR: RefCell<Option<Interceptor>> = const { RefCell::new(None) };
}

/// Report a diagnostic from the calling site.
///
/// Returns normally unless the active interceptor aborts, in which case the
/// stack unwinds with [`Aborted`] (without invoking the panic hook).
///
/// Two cases return normally despite an abort:
///
/// - The thread is already unwinding (e.g. a `Drop` impl reporting during a
///   panic). A second unwind would abort the process, so the diagnostic is
///   forwarded to `tracing` and the in-flight panic carries on.
/// - The caller catches the [`Aborted`] unwind itself. Code past that
///   `catch_unwind` keeps running; interceptors that need to know about the
///   abort regardless must remember it themselves, as the probe invoker does.
#[track_caller]
pub fn trigger(severity: Severity, message: impl Into<String>) {
    let diagnostic = Diagnostic::new(severity, message);

    // Clone out of the cell so the interceptor may itself trigger or
    // install a nested interceptor.
    let interceptor = INTERCEPTOR.with(|cell| cell.borrow().clone());
    let Some(interceptor) = interceptor else {
        forward_to_tracing(&diagnostic);
        return;
    };

    match interceptor(&diagnostic) {
        Disposition::Continue => {}
        Disposition::Abort if std::thread::panicking() => forward_to_tracing(&diagnostic),
        Disposition::Abort => panic::resume_unwind(Box::new(Aborted(diagnostic))),
    }
}

#[track_caller]
pub fn deprecated(message: impl Into<String>) {
    trigger(Severity::Deprecated, message);
}

#[track_caller]
pub fn notice(message: impl Into<String>) {
    trigger(Severity::Notice, message);
}

#[track_caller]
pub fn warning(message: impl Into<String>) {
    trigger(Severity::Warning, message);
}

#[track_caller]
pub fn error(message: impl Into<String>) {
    trigger(Severity::Error, message);
}

fn forward_to_tracing(d: &Diagnostic) {
    match d.severity {
        Severity::Deprecated | Severity::Notice => {
            tracing::info!(severity = %d.severity, file = d.file, line = d.line, "{}", d.message)
        }
        Severity::Warning => {
            tracing::warn!(severity = %d.severity, file = d.file, line = d.line, "{}", d.message)
        }
        Severity::Error => {
            tracing::error!(severity = %d.severity, file = d.file, line = d.line, "{}", d.message)
        }
    }
}

/// Install `interceptor` on the current thread until the guard is dropped.
pub fn intercept<F>(interceptor: F) -> InterceptGuard
where
    F: Fn(&Diagnostic) -> Disposition + 'static,
{
    let previous = INTERCEPTOR.with(|cell| cell.borrow_mut().replace(Rc::new(interceptor)));
    InterceptGuard {
        previous,
        _thread_bound: PhantomData,
    }
}

/// Whether an interceptor is currently installed on this thread.
pub fn is_intercepted() -> bool {
    INTERCEPTOR.with(|cell| cell.borrow().is_some())
}

/// Restores the previously installed interceptor (or none) on drop.
///
/// Not `Send`: the guard must be dropped on the thread that installed it.
#[must_use = "the interceptor is removed as soon as the guard is dropped"]
pub struct InterceptGuard {
    previous: Option<Interceptor>,
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for InterceptGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        // `try_with` so a guard dropped during thread teardown is harmless.
        let _ = INTERCEPTOR.try_with(|cell| *cell.borrow_mut() = previous);
    }
}

impl fmt::Debug for InterceptGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptGuard")
            .field("has_previous", &self.previous.is_some())
            .finish()
    }
}
