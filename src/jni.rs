//! JNI entry points for the Android host.
//!
//! Kotlin side:
//!
//! ```kotlin
//! external fun processFrame(width: Int, height: Int, grayBytes: ByteArray, rowStride: Int): ByteArray?
//! ```
//!
//! The gray array is pinned for the duration of the call and released without
//! copy-back. Failures return `null` with a pending Java exception.

use std::ffi::c_void;
use std::ptr;

use ::jni::objects::{JByteArray, JObject, ReleaseMode};
use ::jni::sys::{jbyteArray, jint, JNI_VERSION_1_6};
use ::jni::JNIEnv;
use thiserror::Error;

use crate::boundary::contain;
use crate::error::FrameError;
use crate::filter::FrameEdgeFilter;
use crate::frame::{FrameGeometry, GrayFrame};
use crate::jni_export;
use crate::stats::FrameTimer;

/// Java class whose `native` method is implemented here.
pub const HOST_CLASS: &str = "com.example.myapplication.MainActivity";

const ILLEGAL_ARGUMENT: &str = "java/lang/IllegalArgumentException";
const OUT_OF_MEMORY: &str = "java/lang/OutOfMemoryError";
const RUNTIME_EXCEPTION: &str = "java/lang/RuntimeException";

#[derive(Debug, Error)]
enum BridgeError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("jni call failed: {0}")]
    Jni(#[from] ::jni::errors::Error),
}

impl BridgeError {
    fn exception_class(&self) -> &'static str {
        match self {
            BridgeError::Frame(FrameError::InvalidArgument(_)) => ILLEGAL_ARGUMENT,
            BridgeError::Frame(FrameError::AllocationFailure { .. }) => OUT_OF_MEMORY,
            BridgeError::Jni(_) => RUNTIME_EXCEPTION,
        }
    }
}

/// `MainActivity.processFrame(width, height, grayBytes, rowStride)`.
///
/// Returns a new `byte[]` of `width * height * 4` RGBA bytes, or null with
/// an `IllegalArgumentException` or `OutOfMemoryError` pending. A panic is
/// caught by the exported forwarder, which throws `RuntimeException`.
#[jni_export(class = "com.example.myapplication.MainActivity", method = "processFrame")]
pub fn process_frame<'local>(
    mut env: JNIEnv<'local>,
    _this: JObject<'local>,
    width: jint,
    height: jint,
    gray_bytes: JByteArray<'local>,
    row_stride: jint,
) -> jbyteArray {
    let timer = FrameTimer::start();

    match marshal(&mut env, width, height, &gray_bytes, row_stride) {
        Ok(array) => {
            tracing::debug!(
                width,
                height,
                row_stride,
                elapsed_ms = timer.elapsed().as_secs_f64() * 1000.0,
                "processFrame"
            );
            array.into_raw()
        }
        Err(err) => {
            tracing::warn!(width, height, row_stride, error = %err, "processFrame failed");
            raise(&mut env, err.exception_class(), &err.to_string());
            ptr::null_mut()
        }
    }
}

/// Largest `byte[]` a JVM can hand out; `jsize` is a signed 32-bit length.
const MAX_JAVA_ARRAY_LEN: usize = i32::MAX as usize;

/// The RGBA result must fit in a single Java array.
fn check_output_fits(geometry: &FrameGeometry) -> Result<(), FrameError> {
    let bytes = geometry.output_len();
    if bytes > MAX_JAVA_ARRAY_LEN {
        return Err(FrameError::AllocationFailure { bytes });
    }
    Ok(())
}

fn marshal<'local>(
    env: &mut JNIEnv<'local>,
    width: jint,
    height: jint,
    gray_bytes: &JByteArray<'_>,
    row_stride: jint,
) -> Result<JByteArray<'local>, BridgeError> {
    // Geometry first: nothing is pinned or read for a malformed call.
    let geometry = FrameGeometry::from_raw(width, height, row_stride)?;
    check_output_fits(&geometry)?;

    if gray_bytes.is_null() {
        return Err(FrameError::InvalidArgument("grayBytes is null".to_string()).into());
    }
    let available = usize::try_from(env.get_array_length(gray_bytes)?).unwrap_or(0);
    if available < geometry.required_input_len() {
        return Err(FrameError::InvalidArgument(format!(
            "grayBytes holds {available} bytes, {}x{} at stride {} needs {}",
            geometry.width(),
            geometry.height(),
            geometry.row_stride(),
            geometry.required_input_len()
        ))
        .into());
    }

    let rgba = {
        // SAFETY: the array is a live local reference for this call and is not
        // touched through any other path while pinned; NoCopyBack releases it
        // with JNI_ABORT, so the Java copy is never written.
        let pinned = unsafe { env.get_array_elements(gray_bytes, ReleaseMode::NoCopyBack)? };
        let gray: &[u8] = bytemuck::cast_slice(&pinned[..]);
        let frame = GrayFrame::new(gray, geometry)?;
        FrameEdgeFilter::new().process(&frame)?
    };

    let out_len = rgba.as_bytes().len();
    env.byte_array_from_slice(rgba.as_bytes()).map_err(|err| {
        tracing::warn!(bytes = out_len, error = %err, "NewByteArray failed");
        BridgeError::Frame(FrameError::AllocationFailure { bytes: out_len })
    })
}

/// Throw `class` unless the VM already has an exception pending (for example
/// the `OutOfMemoryError` raised by a failed `NewByteArray`).
fn raise(env: &mut JNIEnv<'_>, class: &str, msg: &str) {
    if env.exception_check().unwrap_or(false) {
        return;
    }
    if let Err(err) = env.throw_new(class, msg) {
        tracing::error!(class, error = %err, "could not throw Java exception");
    }
}

/// Throws the `RuntimeException` for a panic caught by a `#[jni_export]`
/// forwarder.
#[doc(hidden)]
pub fn throw_panic(env: &mut JNIEnv<'_>, symbol: &str) {
    raise(env, RUNTIME_EXCEPTION, &format!("panic in native {symbol}"));
}

/// Called by the VM on `System.loadLibrary`.
#[allow(non_snake_case)]
#[unsafe(no_mangle)]
pub extern "system" fn JNI_OnLoad(_vm: *mut ::jni::sys::JavaVM, _reserved: *mut c_void) -> jint {
    contain("JNI_OnLoad", || {
        crate::logging::init();
        tracing::info!(class = HOST_CLASS, "edgeframe native library loaded");
    });
    JNI_VERSION_1_6
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_up_to_jsize_max_is_accepted() {
        // 256999 * 2089 * 4 == i32::MAX - 3
        let geometry = FrameGeometry::new(256_999, 2089, 256_999).unwrap();
        assert_eq!(geometry.output_len(), 2_147_483_644);
        assert!(check_output_fits(&geometry).is_ok());
    }

    #[test]
    fn output_past_jsize_max_is_refused() {
        let geometry = FrameGeometry::new(256_999, 2090, 256_999).unwrap();
        assert!(matches!(
            check_output_fits(&geometry),
            Err(FrameError::AllocationFailure { bytes }) if bytes == geometry.output_len()
        ));

        // Input fits a Java array, output would wrap a jsize.
        let square = FrameGeometry::from_raw(23_171, 23_171, 23_171).unwrap();
        assert!(square.required_input_len() <= MAX_JAVA_ARRAY_LEN);
        assert!(check_output_fits(&square).is_err());
    }

    #[test]
    fn errors_map_to_java_exceptions() {
        let invalid = BridgeError::from(FrameError::InvalidArgument("x".to_string()));
        assert_eq!(invalid.exception_class(), ILLEGAL_ARGUMENT);
        let oom = BridgeError::from(FrameError::AllocationFailure { bytes: 1 });
        assert_eq!(oom.exception_class(), OUT_OF_MEMORY);
    }
}
