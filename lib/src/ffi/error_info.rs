//! Error objects returned through the `error` out-parameter.

use super::boundary::{destroy_c_string, ffi_call, out_param};
use super::{take, with_object, Handle};
use crate::error::{ErrorKind, FeaturizerError};
use std::ffi::CString;
use std::os::raw::c_char;

/// Message and kind of a failed call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    message: String,
    kind: ErrorKind,
}

impl ErrorInfo {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl From<&FeaturizerError> for ErrorInfo {
    fn from(err: &FeaturizerError) -> Self {
        Self {
            message: err.to_string(),
            kind: err.kind(),
        }
    }
}

/// Copies the error message into a new caller-owned C string.
///
/// # Safety
/// `output` and `error` must be null or valid for writes. The string must be
/// released with [`featurizers_destroy_error_info_string`].
#[no_mangle]
pub unsafe extern "C" fn featurizers_get_error_info_string(
    error_info: Handle,
    output: *mut *const c_char,
    error: *mut Handle,
) -> bool {
    ffi_call("featurizers_get_error_info_string", error, || {
        let output = out_param(output, "output")?;
        let message = with_object(error_info, |info: &mut ErrorInfo| Ok(info.message.clone()))?;
        // interior NULs cannot cross the boundary
        let message = CString::new(message.replace('\0', " "))
            .map_err(|e| FeaturizerError::invalid_state(e.to_string()))?;
        *output = message.into_raw();
        Ok(())
    })
}

/// Releases a string from [`featurizers_get_error_info_string`].
///
/// # Safety
/// `string` must come from [`featurizers_get_error_info_string`] and not have
/// been released yet.
#[no_mangle]
pub unsafe extern "C" fn featurizers_destroy_error_info_string(
    string: *const c_char,
    error: *mut Handle,
) -> bool {
    ffi_call("featurizers_destroy_error_info_string", error, || {
        destroy_c_string(string as *mut c_char, "string")
    })
}

/// Writes the [`ErrorKind`] code of an error info.
///
/// # Safety
/// `output` and `error` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn featurizers_get_error_info_kind(
    error_info: Handle,
    output: *mut u8,
    error: *mut Handle,
) -> bool {
    ffi_call("featurizers_get_error_info_kind", error, || {
        let output = out_param(output, "output")?;
        *output = with_object(error_info, |info: &mut ErrorInfo| Ok(info.kind as u8))?;
        Ok(())
    })
}

/// Destroys an error info handle.
///
/// # Safety
/// `error` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn featurizers_destroy_error_info(error_info: Handle, error: *mut Handle) -> bool {
    ffi_call("featurizers_destroy_error_info", error, || {
        take::<ErrorInfo>(error_info).map(drop)
    })
}
