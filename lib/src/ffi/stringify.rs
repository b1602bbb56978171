//! Stringify ABI family. Inputs are `f32`; outputs are caller-owned C
//! strings.

use super::boundary::{destroy_c_string, destroy_raw_buffer, ffi_call, into_c_string, into_raw_buffer, out_param, slice_arg};
use super::common::{self, estimator_lifecycle};
use super::Handle;
use crate::featurizers::{StringAccumulator, StringConfig, StringTransformer};
use std::os::raw::c_char;

type Accumulator = StringAccumulator<f32>;
type Transformer = StringTransformer<f32>;

estimator_lifecycle! {
    accumulator: Accumulator,
    transformer: Transformer,
    destroy_estimator: stringify_destroy_estimator,
    get_state: stringify_get_state,
    is_training_complete: stringify_is_training_complete,
    on_data_completed: stringify_on_data_completed,
    complete_training: stringify_complete_training,
    create_transformer_from_estimator: stringify_create_transformer_from_estimator,
    create_transformer_from_saved_data: stringify_create_transformer_from_saved_data,
    destroy_transformer: stringify_destroy_transformer,
    create_transformer_save_data: stringify_create_transformer_save_data,
}

/// # Safety
/// `estimator` and `error` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn stringify_create_estimator(
    empty_string_for_nulls: bool,
    estimator: *mut Handle,
    error: *mut Handle,
) -> bool {
    common::create_estimator(
        "stringify_create_estimator",
        || Accumulator::new(StringConfig { empty_string_for_nulls }),
        estimator,
        error,
    )
}

/// Always fails once training has begun: this estimator needs no data.
///
/// # Safety
/// `fit_result` and `error` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn stringify_fit(handle: Handle, input: f32, fit_result: *mut u8, error: *mut Handle) -> bool {
    ffi_call("stringify_fit", error, || {
        let fit_result = out_param(fit_result, "fit_result")?;
        *fit_result = common::fit_records::<Accumulator>(handle, &[input])? as u8;
        Ok(())
    })
}

/// # Safety
/// `inputs` must be valid for reads of `items` values.
#[no_mangle]
pub unsafe extern "C" fn stringify_fit_buffer(
    handle: Handle,
    inputs: *const f32,
    items: usize,
    fit_result: *mut u8,
    error: *mut Handle,
) -> bool {
    ffi_call("stringify_fit_buffer", error, || {
        let fit_result = out_param(fit_result, "fit_result")?;
        let inputs = slice_arg(inputs, items, "inputs")?;
        *fit_result = common::fit_records::<Accumulator>(handle, inputs)? as u8;
        Ok(())
    })
}

/// Writes a new C string. Release it with
/// [`stringify_destroy_transformed_data`].
///
/// # Safety
/// `output` and `error` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn stringify_transform(
    handle: Handle,
    input: f32,
    output: *mut *mut c_char,
    error: *mut Handle,
) -> bool {
    ffi_call("stringify_transform", error, || {
        let output = out_param(output, "output")?;
        let text = common::transform_record::<Transformer>(handle, &input)?;
        *output = into_c_string(text)?;
        Ok(())
    })
}

/// Ends the stream. The result is always empty.
///
/// # Safety
/// The out pointers must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn stringify_flush(
    handle: Handle,
    output: *mut *mut *mut c_char,
    output_items: *mut usize,
    error: *mut Handle,
) -> bool {
    ffi_call("stringify_flush", error, || {
        let output = out_param(output, "output")?;
        let output_items = out_param(output_items, "output_items")?;
        let flushed = common::flush_transformer::<Transformer>(handle)?;
        let mut strings: Vec<*mut c_char> = Vec::new();
        strings.try_reserve_exact(flushed.len())?;
        for text in flushed {
            strings.push(into_c_string(text)?);
        }
        let (ptr, len) = into_raw_buffer(&strings)?;
        *output = ptr;
        *output_items = len;
        Ok(())
    })
}

/// # Safety
/// `data` must come from [`stringify_transform`].
#[no_mangle]
pub unsafe extern "C" fn stringify_destroy_transformed_data(data: *mut c_char, error: *mut Handle) -> bool {
    ffi_call("stringify_destroy_transformed_data", error, || destroy_c_string(data, "data"))
}

/// # Safety
/// `(data, items)` must come from [`stringify_flush`].
#[no_mangle]
pub unsafe extern "C" fn stringify_destroy_flushed_data(
    data: *mut *mut c_char,
    items: usize,
    error: *mut Handle,
) -> bool {
    ffi_call("stringify_destroy_flushed_data", error, || {
        for string in slice_arg(data as *const *mut c_char, items, "data")? {
            destroy_c_string(*string, "data")?;
        }
        destroy_raw_buffer(data, items, "data")
    })
}
