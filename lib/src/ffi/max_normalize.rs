//! Max-normalize ABI family. Records are rows of `f64`; `NaN` is null.

use super::boundary::{
    destroy_raw_buffer, destroy_raw_rows, ffi_call, into_raw_buffer, into_raw_rows, out_param, slice_arg,
};
use super::common::{self, estimator_lifecycle};
use super::Handle;
use crate::featurizers::max_normalize::Row;
use crate::featurizers::{max_normalize_accumulator, MaxNormalizeAccumulator, MaxNormalizeConfig, MaxNormalizeTransformer};

estimator_lifecycle! {
    accumulator: MaxNormalizeAccumulator,
    transformer: MaxNormalizeTransformer,
    destroy_estimator: max_normalize_destroy_estimator,
    get_state: max_normalize_get_state,
    is_training_complete: max_normalize_is_training_complete,
    on_data_completed: max_normalize_on_data_completed,
    complete_training: max_normalize_complete_training,
    create_transformer_from_estimator: max_normalize_create_transformer_from_estimator,
    create_transformer_from_saved_data: max_normalize_create_transformer_from_saved_data,
    destroy_transformer: max_normalize_destroy_transformer,
    create_transformer_save_data: max_normalize_create_transformer_save_data,
}

/// Creates an estimator. `max_training_items == 0` means no limit.
///
/// # Safety
/// `estimator` and `error` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn max_normalize_create_estimator(
    max_training_items: usize,
    estimator: *mut Handle,
    error: *mut Handle,
) -> bool {
    common::create_estimator(
        "max_normalize_create_estimator",
        || {
            max_normalize_accumulator(MaxNormalizeConfig {
                max_training_items: (max_training_items != 0).then_some(max_training_items),
            })
        },
        estimator,
        error,
    )
}

/// # Safety
/// `row` must be valid for reads of `row_items` values; `fit_result` and
/// `error` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn max_normalize_fit(
    handle: Handle,
    row: *const f64,
    row_items: usize,
    fit_result: *mut u8,
    error: *mut Handle,
) -> bool {
    ffi_call("max_normalize_fit", error, || {
        let fit_result = out_param(fit_result, "fit_result")?;
        let row = slice_arg(row, row_items, "row")?.to_vec();
        *fit_result = common::fit_records::<MaxNormalizeAccumulator>(handle, &[row])? as u8;
        Ok(())
    })
}

/// Fits `items` rows given as parallel arrays of row pointers and lengths.
///
/// # Safety
/// `rows` and `row_items` must hold `items` elements, and each row must be
/// valid for reads of its length.
#[no_mangle]
pub unsafe extern "C" fn max_normalize_fit_buffer(
    handle: Handle,
    rows: *const *const f64,
    row_items: *const usize,
    items: usize,
    fit_result: *mut u8,
    error: *mut Handle,
) -> bool {
    ffi_call("max_normalize_fit_buffer", error, || {
        let fit_result = out_param(fit_result, "fit_result")?;
        let rows = slice_arg(rows, items, "rows")?;
        let row_items = slice_arg(row_items, items, "row_items")?;

        let mut records: Vec<Row> = Vec::new();
        records.try_reserve_exact(items)?;
        for (row, len) in rows.iter().zip(row_items) {
            records.push(slice_arg(*row, *len, "row")?.to_vec());
        }
        *fit_result = common::fit_records::<MaxNormalizeAccumulator>(handle, &records)? as u8;
        Ok(())
    })
}

/// Writes the scaled row. Release it with
/// [`max_normalize_destroy_transformed_data`].
///
/// # Safety
/// `row` must be valid for reads of `row_items` values; the out pointers
/// must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn max_normalize_transform(
    handle: Handle,
    row: *const f64,
    row_items: usize,
    output: *mut *mut f64,
    output_items: *mut usize,
    error: *mut Handle,
) -> bool {
    ffi_call("max_normalize_transform", error, || {
        let output = out_param(output, "output")?;
        let output_items = out_param(output_items, "output_items")?;
        let row = slice_arg(row, row_items, "row")?.to_vec();
        let scaled = common::transform_record::<MaxNormalizeTransformer>(handle, &row)?;
        let (ptr, len) = into_raw_buffer(&scaled)?;
        *output = ptr;
        *output_items = len;
        Ok(())
    })
}

/// Ends the stream. Release the rows with
/// [`max_normalize_destroy_transformed_rows`].
///
/// # Safety
/// The out pointers must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn max_normalize_flush(
    handle: Handle,
    rows: *mut *mut *mut f64,
    row_items: *mut *mut usize,
    items: *mut usize,
    error: *mut Handle,
) -> bool {
    ffi_call("max_normalize_flush", error, || {
        let rows = out_param(rows, "rows")?;
        let row_items = out_param(row_items, "row_items")?;
        let items = out_param(items, "items")?;
        let flushed = common::flush_transformer::<MaxNormalizeTransformer>(handle)?;
        let raw = into_raw_rows(&flushed)?;
        *rows = raw.rows;
        *row_items = raw.lens;
        *items = raw.count;
        Ok(())
    })
}

/// # Safety
/// `(data, items)` must come from [`max_normalize_transform`].
#[no_mangle]
pub unsafe extern "C" fn max_normalize_destroy_transformed_data(
    data: *mut f64,
    items: usize,
    error: *mut Handle,
) -> bool {
    ffi_call("max_normalize_destroy_transformed_data", error, || {
        destroy_raw_buffer(data, items, "data")
    })
}

/// # Safety
/// The arguments must come from one [`max_normalize_flush`] call.
#[no_mangle]
pub unsafe extern "C" fn max_normalize_destroy_transformed_rows(
    rows: *mut *mut f64,
    row_items: *mut usize,
    items: usize,
    error: *mut Handle,
) -> bool {
    ffi_call("max_normalize_destroy_transformed_rows", error, || {
        destroy_raw_rows(rows, row_items, items)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ffi::error_info::tests::consume_error;
    use crate::ffi::NULL_HANDLE;

    fn transform(transformer: Handle, row: &[f64]) -> Vec<f64> {
        let mut error = NULL_HANDLE;
        let mut data: *mut f64 = std::ptr::null_mut();
        let mut items = 0usize;
        unsafe {
            assert!(max_normalize_transform(
                transformer,
                row.as_ptr(),
                row.len(),
                &mut data,
                &mut items,
                &mut error
            ));
            let out = std::slice::from_raw_parts(data, items).to_vec();
            assert!(max_normalize_destroy_transformed_data(data, items, &mut error));
            out
        }
    }

    #[test]
    fn test_scenario_through_abi() {
        let row = [7.9, 4.37, 6.0, 10.0];
        let mut error = NULL_HANDLE;
        let mut estimator = NULL_HANDLE;
        let mut transformer = NULL_HANDLE;
        let mut fit_result = 0u8;
        let mut complete = true;
        unsafe {
            assert!(max_normalize_create_estimator(0, &mut estimator, &mut error));
            assert!(max_normalize_fit(estimator, row.as_ptr(), row.len(), &mut fit_result, &mut error));
            assert_eq!(fit_result, 2);
            assert!(max_normalize_is_training_complete(estimator, &mut complete, &mut error));
            assert!(!complete);
            assert!(max_normalize_on_data_completed(estimator, &mut error));
            assert!(max_normalize_complete_training(estimator, &mut error));
            assert!(max_normalize_create_transformer_from_estimator(
                estimator,
                &mut transformer,
                &mut error
            ));
            assert!(max_normalize_destroy_estimator(estimator, &mut error));
        }

        let scaled = transform(transformer, &row);
        for (actual, expected) in scaled.iter().zip([0.79, 0.437, 0.6, 1.0]) {
            assert!((actual - expected).abs() < 1e-9);
        }
        unsafe {
            assert!(max_normalize_destroy_transformer(transformer, &mut error));
        }
    }

    #[test]
    fn test_fit_buffer_uses_every_row() {
        let first = [1.0, -2.0];
        let second = [-8.0];
        let rows = [first.as_ptr(), second.as_ptr()];
        let lens = [2usize, 1];
        let mut error = NULL_HANDLE;
        let mut estimator = NULL_HANDLE;
        let mut transformer = NULL_HANDLE;
        let mut fit_result = 0u8;
        unsafe {
            assert!(max_normalize_create_estimator(0, &mut estimator, &mut error));
            assert!(max_normalize_fit_buffer(
                estimator,
                rows.as_ptr(),
                lens.as_ptr(),
                2,
                &mut fit_result,
                &mut error
            ));
            assert!(max_normalize_complete_training(estimator, &mut error));
            assert!(max_normalize_create_transformer_from_estimator(
                estimator,
                &mut transformer,
                &mut error
            ));
            assert!(max_normalize_destroy_estimator(estimator, &mut error));
        }
        assert_eq!(transform(transformer, &[4.0]), vec![0.5]);
        unsafe {
            assert!(max_normalize_destroy_transformer(transformer, &mut error));
        }
    }

    #[test]
    fn test_complete_without_data_is_invalid_state() {
        let mut error = NULL_HANDLE;
        let mut estimator = NULL_HANDLE;
        unsafe {
            assert!(max_normalize_create_estimator(0, &mut estimator, &mut error));
            assert!(!max_normalize_complete_training(estimator, &mut error));
        }
        assert_eq!(consume_error(error).0, ErrorKind::InvalidState);
        unsafe {
            assert!(max_normalize_destroy_estimator(estimator, &mut error));
        }
    }

    #[test]
    fn test_empty_fit_buffer_is_invalid_argument() {
        let mut error = NULL_HANDLE;
        let mut estimator = NULL_HANDLE;
        let mut fit_result = 0u8;
        unsafe {
            assert!(max_normalize_create_estimator(0, &mut estimator, &mut error));
            assert!(!max_normalize_fit_buffer(
                estimator,
                std::ptr::null(),
                std::ptr::null(),
                0,
                &mut fit_result,
                &mut error
            ));
        }
        assert_eq!(consume_error(error).0, ErrorKind::InvalidArgument);
        unsafe {
            assert!(max_normalize_destroy_estimator(estimator, &mut error));
        }
    }
}
