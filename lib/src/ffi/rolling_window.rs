//! Rolling-window ABI family.
//!
//! Records are a grain (`count` C strings) plus an `f64` value. `transform`
//! returns one row of `horizon` values; `flush` returns a set of rows.

use super::boundary::{
    destroy_raw_buffer, destroy_raw_rows, ffi_call, grain_arg, into_raw_buffer, into_raw_rows, out_param,
    slice_arg,
};
use super::common::{self, estimator_lifecycle};
use super::Handle;
use crate::featurizers::{RollingWindowAccumulator, RollingWindowConfig};
use crate::window::{Aggregation, GrainedValue, WindowTransformer};
use std::os::raw::c_char;

estimator_lifecycle! {
    accumulator: RollingWindowAccumulator,
    transformer: WindowTransformer,
    destroy_estimator: rolling_window_destroy_estimator,
    get_state: rolling_window_get_state,
    is_training_complete: rolling_window_is_training_complete,
    on_data_completed: rolling_window_on_data_completed,
    complete_training: rolling_window_complete_training,
    create_transformer_from_estimator: rolling_window_create_transformer_from_estimator,
    create_transformer_from_saved_data: rolling_window_create_transformer_from_saved_data,
    destroy_transformer: rolling_window_destroy_transformer,
    create_transformer_save_data: rolling_window_create_transformer_save_data,
}

/// Creates an estimator. `aggregation` is 1 (mean), 2 (min) or 3 (max).
///
/// # Safety
/// `estimator` and `error` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn rolling_window_create_estimator(
    aggregation: u8,
    horizon: u32,
    min_window_size: u32,
    max_window_size: u32,
    estimator: *mut Handle,
    error: *mut Handle,
) -> bool {
    common::create_estimator(
        "rolling_window_create_estimator",
        || {
            RollingWindowAccumulator::new(RollingWindowConfig {
                aggregation: Aggregation::from_code(aggregation)?,
                horizon,
                min_window_size,
                max_window_size,
            })
        },
        estimator,
        error,
    )
}

/// # Safety
/// `grain` must point to `grain_items` NUL-terminated strings; `fit_result`
/// and `error` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn rolling_window_fit(
    handle: Handle,
    grain: *const *const c_char,
    grain_items: usize,
    value: f64,
    fit_result: *mut u8,
    error: *mut Handle,
) -> bool {
    ffi_call("rolling_window_fit", error, || {
        let fit_result = out_param(fit_result, "fit_result")?;
        let record = (grain_arg(grain, grain_items, "grain")?, value);
        *fit_result = common::fit_records::<RollingWindowAccumulator>(handle, &[record])? as u8;
        Ok(())
    })
}

/// Fits `items` records given as parallel arrays of grains, grain lengths
/// and values.
///
/// # Safety
/// Each array must hold `items` elements; every grain must point to its
/// length's worth of NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn rolling_window_fit_buffer(
    handle: Handle,
    grains: *const *const *const c_char,
    grain_items: *const usize,
    values: *const f64,
    items: usize,
    fit_result: *mut u8,
    error: *mut Handle,
) -> bool {
    ffi_call("rolling_window_fit_buffer", error, || {
        let fit_result = out_param(fit_result, "fit_result")?;
        let grains = slice_arg(grains, items, "grains")?;
        let grain_items = slice_arg(grain_items, items, "grain_items")?;
        let values = slice_arg(values, items, "values")?;

        let mut records: Vec<GrainedValue> = Vec::new();
        records.try_reserve_exact(items)?;
        for ((grain, count), value) in grains.iter().zip(grain_items).zip(values) {
            records.push((grain_arg(*grain, *count, "grain")?, *value));
        }
        *fit_result = common::fit_records::<RollingWindowAccumulator>(handle, &records)? as u8;
        Ok(())
    })
}

/// Writes one row of `horizon` values to `output` / `output_items`.
///
/// # Safety
/// `grain` must point to `grain_items` NUL-terminated strings; the out
/// pointers must be null or valid for writes. Release the row with
/// [`rolling_window_destroy_transformed_data`].
#[no_mangle]
pub unsafe extern "C" fn rolling_window_transform(
    handle: Handle,
    grain: *const *const c_char,
    grain_items: usize,
    value: f64,
    output: *mut *mut f64,
    output_items: *mut usize,
    error: *mut Handle,
) -> bool {
    ffi_call("rolling_window_transform", error, || {
        let output = out_param(output, "output")?;
        let output_items = out_param(output_items, "output_items")?;
        let record = (grain_arg(grain, grain_items, "grain")?, value);
        let row = common::transform_record::<WindowTransformer>(handle, &record)?;
        let (ptr, len) = into_raw_buffer(&row)?;
        *output = ptr;
        *output_items = len;
        Ok(())
    })
}

/// Ends the stream. Release the rows with
/// [`rolling_window_destroy_transformed_rows`].
///
/// # Safety
/// The out pointers must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn rolling_window_flush(
    handle: Handle,
    rows: *mut *mut *mut f64,
    row_items: *mut *mut usize,
    items: *mut usize,
    error: *mut Handle,
) -> bool {
    ffi_call("rolling_window_flush", error, || {
        let rows = out_param(rows, "rows")?;
        let row_items = out_param(row_items, "row_items")?;
        let items = out_param(items, "items")?;
        let flushed = common::flush_transformer::<WindowTransformer>(handle)?;
        let raw = into_raw_rows(&flushed)?;
        *rows = raw.rows;
        *row_items = raw.lens;
        *items = raw.count;
        Ok(())
    })
}

/// # Safety
/// `(data, items)` must come from [`rolling_window_transform`].
#[no_mangle]
pub unsafe extern "C" fn rolling_window_destroy_transformed_data(
    data: *mut f64,
    items: usize,
    error: *mut Handle,
) -> bool {
    ffi_call("rolling_window_destroy_transformed_data", error, || {
        destroy_raw_buffer(data, items, "data")
    })
}

/// # Safety
/// The arguments must come from one [`rolling_window_flush`] call.
#[no_mangle]
pub unsafe extern "C" fn rolling_window_destroy_transformed_rows(
    rows: *mut *mut f64,
    row_items: *mut usize,
    items: usize,
    error: *mut Handle,
) -> bool {
    ffi_call("rolling_window_destroy_transformed_rows", error, || {
        destroy_raw_rows(rows, row_items, items)
    })
}
