//! Ctrl-C handling for `apply`
//!
//! The first SIGINT cancels the run: the executor finishes the step in
//! flight and skips the rest. The handler then restores the default action,
//! so a second SIGINT terminates immediately.

use declarative::CancelToken;
use std::sync::OnceLock;

static CANCEL: OnceLock<CancelToken> = OnceLock::new();

extern "C" fn on_sigint(_signal: libc::c_int) {
    if let Some(token) = CANCEL.get() {
        token.cancel();
    }
    // SAFETY: signal() is async-signal-safe and SIG_DFL is always valid
    unsafe {
        libc::signal(libc::SIGINT, libc::SIG_DFL);
    }
}

/// Route SIGINT to `token`; later calls keep the first token
pub fn cancel_on_interrupt(token: &CancelToken) {
    if CANCEL.set(token.clone()).is_err() {
        log::debug!("interrupt handler already installed");
        return;
    }
    let handler: extern "C" fn(libc::c_int) = on_sigint;
    // SAFETY: the handler only performs an atomic store and calls signal()
    unsafe {
        libc::signal(libc::SIGINT, handler as libc::sighandler_t);
    }
}
