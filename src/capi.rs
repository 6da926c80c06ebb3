//! C ABI for hosts that are not a JVM (P/Invoke, ctypes, plain C).
//!
//! Failures are reported as a null return plus a per-thread last-error slot,
//! read with `edgeframe_last_error` / `edgeframe_last_error_code`.

use std::cell::RefCell;
use std::ffi::{c_char, CString};
use std::ptr;

use crate::boundary::contain;
use crate::error::FrameError;
use crate::filter::process_frame;

/// No error recorded on this thread.
pub const EDGEFRAME_OK: i32 = 0;
/// Malformed geometry or input region.
pub const EDGEFRAME_INVALID_ARGUMENT: i32 = 1;
/// Output buffer could not be reserved.
pub const EDGEFRAME_ALLOCATION_FAILURE: i32 = 2;
/// A panic was contained inside the library.
pub const EDGEFRAME_INTERNAL: i32 = -1;

struct LastError {
    code: i32,
    message: CString,
}

thread_local! {
    static LAST_ERROR: RefCell<Option<LastError>> = const { RefCell::new(None) };
}

fn clear_error_flag() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

fn set_last_error(code: i32, message: &str) {
    // Interior NULs would truncate the message on the C side anyway.
    let message = CString::new(message.replace('\0', " ")).unwrap_or_default();
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(LastError { code, message }));
}

fn record(err: &FrameError) {
    tracing::warn!(error = %err, "edgeframe_process_frame failed");
    set_last_error(err.code(), &err.to_string());
}

/// Filter one grayscale frame.
///
/// Returns a newly allocated buffer of `width * height * 4` RGBA bytes and
/// writes its length to `out_len`, or returns null and records the error.
/// Release the buffer with [`edgeframe_buffer_free`].
///
/// # Safety
/// `gray` must point to `gray_len` readable bytes that stay valid and
/// unmodified for the duration of the call. `out_len` must be null or point
/// to writable memory for one `usize`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn edgeframe_process_frame(
    width: i32,
    height: i32,
    gray: *const u8,
    gray_len: usize,
    row_stride: i32,
    out_len: *mut usize,
) -> *mut u8 {
    clear_error_flag();
    if !out_len.is_null() {
        unsafe { *out_len = 0 };
    }
    if gray.is_null() {
        record(&FrameError::InvalidArgument("input pointer is null".to_string()));
        return ptr::null_mut();
    }

    let input = unsafe { std::slice::from_raw_parts(gray, gray_len) };
    let outcome = contain("edgeframe_process_frame", || process_frame(width, height, input, row_stride));

    match outcome {
        Some(Ok(rgba)) => {
            let boxed = rgba.into_boxed_slice();
            let len = boxed.len();
            if !out_len.is_null() {
                unsafe { *out_len = len };
            }
            Box::into_raw(boxed) as *mut u8
        }
        Some(Err(err)) => {
            record(&err);
            ptr::null_mut()
        }
        None => {
            set_last_error(EDGEFRAME_INTERNAL, "internal error: panic while processing frame");
            ptr::null_mut()
        }
    }
}

/// Release a buffer returned by [`edgeframe_process_frame`]. Null is ignored.
///
/// # Safety
/// `buf` and `len` must be exactly a pointer/length pair returned by
/// `edgeframe_process_frame`, not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn edgeframe_buffer_free(buf: *mut u8, len: usize) {
    if buf.is_null() {
        return;
    }
    let slice = ptr::slice_from_raw_parts_mut(buf, len);
    drop(unsafe { Box::from_raw(slice) });
}

/// Message of the last failure on the calling thread, or null.
///
/// The pointer stays valid until the next `edgeframe_*` call on this thread.
#[unsafe(no_mangle)]
pub extern "C" fn edgeframe_last_error() -> *const c_char {
    LAST_ERROR.with(|slot| match slot.borrow().as_ref() {
        Some(err) => err.message.as_ptr(),
        None => ptr::null(),
    })
}

/// Code of the last failure on the calling thread, [`EDGEFRAME_OK`] if none.
#[unsafe(no_mangle)]
pub extern "C" fn edgeframe_last_error_code() -> i32 {
    LAST_ERROR.with(|slot| slot.borrow().as_ref().map_or(EDGEFRAME_OK, |err| err.code))
}

#[cfg(test)]
mod tests {
    use std::ffi::CStr;

    use super::*;

    #[test]
    fn success_returns_owned_buffer() {
        let gray = [0u8; 16];
        let mut len = 0usize;
        let out = unsafe { edgeframe_process_frame(4, 4, gray.as_ptr(), gray.len(), 4, &mut len) };
        assert!(!out.is_null());
        assert_eq!(len, 64);
        assert_eq!(edgeframe_last_error_code(), EDGEFRAME_OK);
        assert!(edgeframe_last_error().is_null());

        let bytes = unsafe { std::slice::from_raw_parts(out, len) };
        assert!(bytes.iter().all(|&b| b == 0));
        unsafe { edgeframe_buffer_free(out, len) };
    }

    #[test]
    fn stride_below_width_sets_invalid_argument() {
        let gray = [0u8; 16];
        let mut len = 99usize;
        let out = unsafe { edgeframe_process_frame(4, 4, gray.as_ptr(), gray.len(), 3, &mut len) };
        assert!(out.is_null());
        assert_eq!(len, 0);
        assert_eq!(edgeframe_last_error_code(), EDGEFRAME_INVALID_ARGUMENT);

        let msg = unsafe { CStr::from_ptr(edgeframe_last_error()) };
        assert!(msg.to_string_lossy().contains("stride"));
    }

    #[test]
    fn null_input_is_rejected() {
        let out = unsafe { edgeframe_process_frame(4, 4, ptr::null(), 16, 4, ptr::null_mut()) };
        assert!(out.is_null());
        assert_eq!(edgeframe_last_error_code(), EDGEFRAME_INVALID_ARGUMENT);
    }

    #[test]
    fn success_clears_previous_error() {
        let gray = [0u8; 16];
        let out = unsafe { edgeframe_process_frame(4, 4, gray.as_ptr(), 15, 4, ptr::null_mut()) };
        assert!(out.is_null());
        assert_eq!(edgeframe_last_error_code(), EDGEFRAME_INVALID_ARGUMENT);

        let out = unsafe { edgeframe_process_frame(4, 4, gray.as_ptr(), 16, 4, ptr::null_mut()) };
        assert!(!out.is_null());
        assert_eq!(edgeframe_last_error_code(), EDGEFRAME_OK);
        unsafe { edgeframe_buffer_free(out, 64) };
    }

    #[test]
    fn codes_match_frame_errors() {
        assert_eq!(FrameError::InvalidArgument(String::new()).code(), EDGEFRAME_INVALID_ARGUMENT);
        assert_eq!(FrameError::AllocationFailure { bytes: 1 }.code(), EDGEFRAME_ALLOCATION_FAILURE);
    }

    #[test]
    fn freeing_null_is_a_no_op() {
        unsafe { edgeframe_buffer_free(ptr::null_mut(), 0) };
    }
}
