//! Panic containment for exported symbols.
//!
//! Unwinding out of an `extern "system"` / `extern "C"` function aborts the
//! host process, so every exported entry point runs its body through
//! [`contain`].

use std::panic::{catch_unwind, AssertUnwindSafe};

/// Value an exported function returns when its body panicked.
pub trait OnPanic {
    fn on_panic() -> Self;
}

impl OnPanic for () {
    fn on_panic() -> Self {}
}

impl<T> OnPanic for *mut T {
    fn on_panic() -> Self {
        std::ptr::null_mut()
    }
}

impl<T> OnPanic for *const T {
    fn on_panic() -> Self {
        std::ptr::null()
    }
}

impl OnPanic for i32 {
    fn on_panic() -> Self {
        -1
    }
}

impl OnPanic for u8 {
    fn on_panic() -> Self {
        0
    }
}

/// Run `f`, returning `None` (and logging) if it panicked.
pub fn contain<R>(symbol: &str, f: impl FnOnce() -> R) -> Option<R> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(payload) => {
            let msg = panic_message(payload.as_ref());
            tracing::error!(symbol, panic = %msg, "panic contained at native boundary");
            None
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_passes_through() {
        assert_eq!(contain("ok", || 7), Some(7));
    }

    #[test]
    fn panic_becomes_none() {
        let out = contain("boom", || -> *mut u8 { panic!("boom") });
        assert!(out.is_none());
        assert!(out.unwrap_or_else(OnPanic::on_panic).is_null());
        assert_eq!(<i32 as OnPanic>::on_panic(), -1);
    }
}
