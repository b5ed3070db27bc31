//! Runs a probe exactly once and captures what it produced.

use std::{
    cell::RefCell,
    panic::{self, AssertUnwindSafe},
    rc::Rc,
    sync::Arc,
};

use crate::{
    diagnostic::{self, Diagnostic, Disposition},
    error::Fault,
    logger::{LogContext, LogLevel, PingLogger},
};

use super::{Outcome, Probe};

/// Call `probe` once, under a diagnostic interceptor.
///
/// Deprecation-class diagnostics are logged at `notice` through `logger` as
/// they occur and the probe keeps running. Any other diagnostic aborts the
/// probe on the spot and comes back as [`Fault::PromotedDiagnostic`], even
/// if the probe caught the unwind and returned on its own. A panic that was
/// already unwinding when a diagnostic arrived stays [`Fault::Severe`]. The
/// interceptor is removed before this function returns, whichever way the
/// probe ended.
pub fn invoke(probe: Option<&Probe>, logger: &Arc<dyn PingLogger>) -> Outcome {
    let Some(probe) = probe else {
        return Ok(());
    };

    let promoted: Rc<RefCell<Option<Diagnostic>>> = Rc::default();
    let sink = Arc::clone(logger);
    let first = Rc::clone(&promoted);
    let _guard = diagnostic::intercept(move |d| {
        if d.severity.is_deprecation() {
            sink.log(LogLevel::Notice, &d.message, &LogContext::default());
            Disposition::Continue
        } else {
            first.borrow_mut().get_or_insert_with(|| d.clone());
            Disposition::Abort
        }
    });

    let result = panic::catch_unwind(AssertUnwindSafe(|| probe()));
    let swallowed = promoted.borrow_mut().take();
    match (result, swallowed) {
        (Err(payload), _) => Err(Fault::from_panic(payload)),
        (Ok(_), Some(d)) => Err(Fault::PromotedDiagnostic(d)),
        (Ok(Ok(())), None) => Ok(()),
        (Ok(Err(err)), None) => Err(Fault::from(err)),
    }
}
