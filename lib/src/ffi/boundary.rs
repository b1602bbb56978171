//! Argument checking, panic containment and buffer ownership transfer.

use super::error_info::ErrorInfo;
use super::{insert, Handle, NULL_HANDLE};
use crate::error::{FeaturizerError, Result};
use std::any::Any;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{self, AssertUnwindSafe};

/// Runs `body` as one exported call.
///
/// A null `error` returns `false` without running anything. Otherwise
/// `*error` is cleared, and an `Err` or a panic from `body` is stored as a
/// new ErrorInfo handle.
///
/// # Safety
/// `error` must be null or valid for writes.
pub(crate) unsafe fn ffi_call<F>(function: &'static str, error: *mut Handle, body: F) -> bool
where
    F: FnOnce() -> Result<()>,
{
    if error.is_null() {
        return false;
    }
    *error = NULL_HANDLE;

    let outcome = match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(result) => result,
        Err(payload) => Err(FeaturizerError::invalid_state(format!(
            "panic in {}: {}",
            function,
            panic_message(payload.as_ref())
        ))),
    };

    match outcome {
        Ok(()) => true,
        Err(err) => {
            tracing::warn!(function, kind = ?err.kind(), error = %err, "featurizer call failed");
            match insert(ErrorInfo::from(&err)) {
                Ok(handle) => *error = handle,
                Err(nested) => {
                    tracing::warn!(function, error = %nested, "could not allocate error info")
                }
            }
            false
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

fn null_argument(name: &str) -> FeaturizerError {
    FeaturizerError::invalid_argument(format!("'{}' is null", name))
}

/// Borrows a required out-parameter.
///
/// # Safety
/// `ptr` must be null or valid for writes for `'a`.
pub(crate) unsafe fn out_param<'a, T>(ptr: *mut T, name: &str) -> Result<&'a mut T> {
    ptr.as_mut().ok_or_else(|| null_argument(name))
}

/// Borrows an input buffer.
///
/// `(null, 0)` is an empty slice; `(null, n > 0)` and `(non-null, 0)` are
/// rejected.
///
/// # Safety
/// A non-null `ptr` must be valid for reads of `len` elements for `'a`.
pub(crate) unsafe fn slice_arg<'a, T>(ptr: *const T, len: usize, name: &str) -> Result<&'a [T]> {
    match (ptr.is_null(), len) {
        (true, 0) => Ok(&[]),
        (true, _) => Err(null_argument(name)),
        (false, 0) => Err(FeaturizerError::invalid_argument(format!(
            "'{}' items is 0",
            name
        ))),
        (false, _) => Ok(std::slice::from_raw_parts(ptr, len)),
    }
}

/// Borrows a required NUL-terminated UTF-8 string.
///
/// # Safety
/// A non-null `ptr` must point to a NUL-terminated string valid for `'a`.
pub(crate) unsafe fn str_arg<'a>(ptr: *const c_char, name: &str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(null_argument(name));
    }
    CStr::from_ptr(ptr).to_str().map_err(|e| {
        FeaturizerError::invalid_argument(format!("'{}' is not valid UTF-8: {}", name, e))
    })
}

/// Reads a grain passed as `count` C strings.
///
/// # Safety
/// Same as [`slice_arg`] and [`str_arg`] for the array and every element.
pub(crate) unsafe fn grain_arg(ptr: *const *const c_char, count: usize, name: &str) -> Result<Vec<String>> {
    let parts = slice_arg(ptr, count, name)?;
    if parts.is_empty() {
        return Err(FeaturizerError::invalid_argument(format!("'{}' is empty", name)));
    }
    parts
        .iter()
        .map(|part| str_arg(*part, name).map(str::to_string))
        .collect()
}

/// Copies `values` into a caller-owned buffer. Empty input yields `(null, 0)`.
pub(crate) fn into_raw_buffer<T: Copy>(values: &[T]) -> Result<(*mut T, usize)> {
    if values.is_empty() {
        return Ok((std::ptr::null_mut(), 0));
    }
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(values.len())?;
    buffer.extend_from_slice(values);
    let len = buffer.len();
    let ptr = Box::into_raw(buffer.into_boxed_slice()) as *mut T;
    Ok((ptr, len))
}

/// Frees a buffer produced by [`into_raw_buffer`].
///
/// # Safety
/// `(ptr, len)` must come from [`into_raw_buffer`] and not have been freed.
pub(crate) unsafe fn destroy_raw_buffer<T>(ptr: *mut T, len: usize, name: &str) -> Result<()> {
    match (ptr.is_null(), len) {
        (true, 0) => Ok(()),
        (true, _) => Err(null_argument(name)),
        (false, 0) => Err(FeaturizerError::invalid_argument(format!(
            "'{}' items is 0",
            name
        ))),
        (false, _) => {
            drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(ptr, len)));
            Ok(())
        }
    }
}

/// Caller-owned rows: an array of row pointers plus an array of row lengths.
pub(crate) struct RawRows {
    pub rows: *mut *mut f64,
    pub lens: *mut usize,
    pub count: usize,
}

/// Transfers `rows` to the caller.
pub(crate) fn into_raw_rows(rows: &[Vec<f64>]) -> Result<RawRows> {
    into_raw_rows_with(rows, into_raw_buffer::<usize>)
}

/// Frees row buffers that were never handed out.
fn release_rows(pointers: &[*mut f64], lens: &[usize]) {
    for (ptr, len) in pointers.iter().zip(lens) {
        // SAFETY: produced by into_raw_buffer and not yet given to the caller
        let _ = unsafe { destroy_raw_buffer(*ptr, *len, "row") };
    }
}

fn into_raw_rows_with<F>(rows: &[Vec<f64>], transfer_lens: F) -> Result<RawRows>
where
    F: FnOnce(&[usize]) -> Result<(*mut usize, usize)>,
{
    let mut pointers: Vec<*mut f64> = Vec::new();
    pointers.try_reserve_exact(rows.len())?;
    let mut lens: Vec<usize> = Vec::new();
    lens.try_reserve_exact(rows.len())?;

    for row in rows {
        match into_raw_buffer(row) {
            Ok((ptr, len)) => {
                pointers.push(ptr);
                lens.push(len);
            }
            Err(err) => {
                release_rows(&pointers, &lens);
                return Err(err);
            }
        }
    }

    let (rows_ptr, count) = match into_raw_buffer(&pointers) {
        Ok(buffer) => buffer,
        Err(err) => {
            release_rows(&pointers, &lens);
            return Err(err);
        }
    };
    let lens_ptr = match transfer_lens(&lens) {
        Ok((ptr, _)) => ptr,
        Err(err) => {
            release_rows(&pointers, &lens);
            // SAFETY: rows_ptr was produced just above from `pointers`
            let _ = unsafe { destroy_raw_buffer(rows_ptr, count, "rows") };
            return Err(err);
        }
    };
    Ok(RawRows {
        rows: rows_ptr,
        lens: lens_ptr,
        count,
    })
}

/// Frees rows produced by [`into_raw_rows`].
///
/// # Safety
/// The arguments must come from one [`into_raw_rows`] call.
pub(crate) unsafe fn destroy_raw_rows(rows: *mut *mut f64, lens: *mut usize, count: usize) -> Result<()> {
    if rows.is_null() != lens.is_null() {
        return Err(FeaturizerError::invalid_argument(
            "'rows' and 'row_lens' must both be null or both be set",
        ));
    }
    let pointers = slice_arg(rows as *const *mut f64, count, "rows")?;
    let row_lens = slice_arg(lens as *const usize, count, "row_lens")?;
    for (ptr, len) in pointers.iter().zip(row_lens) {
        destroy_raw_buffer(*ptr, *len, "row")?;
    }
    destroy_raw_buffer(rows, count, "rows")?;
    destroy_raw_buffer(lens, count, "row_lens")
}

/// Hands `value` to the caller as a C string.
pub(crate) fn into_c_string(value: String) -> Result<*mut c_char> {
    CString::new(value)
        .map(CString::into_raw)
        .map_err(|e| FeaturizerError::invalid_state(format!("string contains NUL: {}", e)))
}

/// Frees a string produced by [`into_c_string`].
///
/// # Safety
/// `ptr` must come from [`into_c_string`] and not have been freed.
pub(crate) unsafe fn destroy_c_string(ptr: *mut c_char, name: &str) -> Result<()> {
    if ptr.is_null() {
        return Err(null_argument(name));
    }
    drop(CString::from_raw(ptr));
    Ok(())
}
