//! Numericalize ABI family. Inputs are C strings; outputs are `f64` indexes,
//! `NaN` for values not seen in training.

use super::boundary::{destroy_raw_buffer, ffi_call, into_raw_buffer, out_param, slice_arg, str_arg};
use super::common::{self, estimator_lifecycle};
use super::Handle;
use crate::featurizers::{NumericalizeAccumulator, NumericalizeConfig, NumericalizeTransformer};
use std::os::raw::c_char;

type Accumulator = NumericalizeAccumulator<String>;
type Transformer = NumericalizeTransformer<String>;

estimator_lifecycle! {
    accumulator: Accumulator,
    transformer: Transformer,
    destroy_estimator: numericalize_destroy_estimator,
    get_state: numericalize_get_state,
    is_training_complete: numericalize_is_training_complete,
    on_data_completed: numericalize_on_data_completed,
    complete_training: numericalize_complete_training,
    create_transformer_from_estimator: numericalize_create_transformer_from_estimator,
    create_transformer_from_saved_data: numericalize_create_transformer_from_saved_data,
    destroy_transformer: numericalize_destroy_transformer,
    create_transformer_save_data: numericalize_create_transformer_save_data,
}

/// Creates an estimator. `max_training_items == 0` means no limit.
///
/// # Safety
/// `estimator` and `error` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn numericalize_create_estimator(
    max_training_items: usize,
    estimator: *mut Handle,
    error: *mut Handle,
) -> bool {
    common::create_estimator(
        "numericalize_create_estimator",
        || {
            Accumulator::new(NumericalizeConfig {
                max_training_items: (max_training_items != 0).then_some(max_training_items),
            })
        },
        estimator,
        error,
    )
}

/// # Safety
/// `input` must be a NUL-terminated string; `fit_result` and `error` must
/// be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn numericalize_fit(
    handle: Handle,
    input: *const c_char,
    fit_result: *mut u8,
    error: *mut Handle,
) -> bool {
    ffi_call("numericalize_fit", error, || {
        let fit_result = out_param(fit_result, "fit_result")?;
        let input = str_arg(input, "input")?.to_string();
        *fit_result = common::fit_records::<Accumulator>(handle, &[input])? as u8;
        Ok(())
    })
}

/// # Safety
/// `inputs` must hold `items` NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn numericalize_fit_buffer(
    handle: Handle,
    inputs: *const *const c_char,
    items: usize,
    fit_result: *mut u8,
    error: *mut Handle,
) -> bool {
    ffi_call("numericalize_fit_buffer", error, || {
        let fit_result = out_param(fit_result, "fit_result")?;
        let inputs = slice_arg(inputs, items, "inputs")?;
        let mut records: Vec<String> = Vec::new();
        records.try_reserve_exact(items)?;
        for input in inputs {
            records.push(str_arg(*input, "input")?.to_string());
        }
        *fit_result = common::fit_records::<Accumulator>(handle, &records)? as u8;
        Ok(())
    })
}

/// # Safety
/// `input` must be a NUL-terminated string; `output` and `error` must be
/// null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn numericalize_transform(
    handle: Handle,
    input: *const c_char,
    output: *mut f64,
    error: *mut Handle,
) -> bool {
    ffi_call("numericalize_transform", error, || {
        let output = out_param(output, "output")?;
        let input = str_arg(input, "input")?.to_string();
        let index = common::transform_record::<Transformer>(handle, &input)?;
        *output = index.map_or(f64::NAN, f64::from);
        Ok(())
    })
}

/// Ends the stream. Every value was already emitted, so the result is
/// always empty; release it with [`numericalize_destroy_transformed_data`].
///
/// # Safety
/// The out pointers must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn numericalize_flush(
    handle: Handle,
    output: *mut *mut f64,
    output_items: *mut usize,
    error: *mut Handle,
) -> bool {
    ffi_call("numericalize_flush", error, || {
        let output = out_param(output, "output")?;
        let output_items = out_param(output_items, "output_items")?;
        let flushed: Vec<f64> = common::flush_transformer::<Transformer>(handle)?
            .into_iter()
            .map(|index| index.map_or(f64::NAN, f64::from))
            .collect();
        let (ptr, len) = into_raw_buffer(&flushed)?;
        *output = ptr;
        *output_items = len;
        Ok(())
    })
}

/// # Safety
/// `(data, items)` must come from [`numericalize_flush`].
#[no_mangle]
pub unsafe extern "C" fn numericalize_destroy_transformed_data(
    data: *mut f64,
    items: usize,
    error: *mut Handle,
) -> bool {
    ffi_call("numericalize_destroy_transformed_data", error, || {
        destroy_raw_buffer(data, items, "data")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::ffi::error_info::tests::consume_error;
    use crate::ffi::NULL_HANDLE;
    use std::ffi::CString;

    fn trained(values: &[&str]) -> Handle {
        let owned: Vec<CString> = values.iter().map(|v| CString::new(*v).unwrap()).collect();
        let ptrs: Vec<*const c_char> = owned.iter().map(|v| v.as_ptr()).collect();
        let mut error = NULL_HANDLE;
        let mut estimator = NULL_HANDLE;
        let mut transformer = NULL_HANDLE;
        let mut fit_result = 0u8;
        unsafe {
            assert!(numericalize_create_estimator(0, &mut estimator, &mut error));
            assert!(numericalize_fit_buffer(
                estimator,
                ptrs.as_ptr(),
                ptrs.len(),
                &mut fit_result,
                &mut error
            ));
            assert!(numericalize_complete_training(estimator, &mut error));
            assert!(numericalize_create_transformer_from_estimator(
                estimator,
                &mut transformer,
                &mut error
            ));
            assert!(numericalize_destroy_estimator(estimator, &mut error));
        }
        transformer
    }

    fn transform(transformer: Handle, value: &str) -> f64 {
        let value = CString::new(value).unwrap();
        let mut error = NULL_HANDLE;
        let mut output = 0.0;
        unsafe {
            assert!(numericalize_transform(transformer, value.as_ptr(), &mut output, &mut error));
        }
        output
    }

    #[test]
    fn test_known_and_unknown_values() {
        let transformer = trained(&["orange", "apple", "peach"]);
        assert_eq!(transform(transformer, "apple"), 0.0);
        assert_eq!(transform(transformer, "orange"), 1.0);
        assert_eq!(transform(transformer, "peach"), 2.0);
        assert!(transform(transformer, "kiwi").is_nan());

        let mut error = NULL_HANDLE;
        let mut output: *mut f64 = std::ptr::null_mut();
        let mut items = 1usize;
        unsafe {
            assert!(numericalize_flush(transformer, &mut output, &mut items, &mut error));
            assert_eq!(items, 0);
            assert!(numericalize_destroy_transformed_data(output, items, &mut error));
            assert!(numericalize_destroy_transformer(transformer, &mut error));
        }
    }

    #[test]
    fn test_null_input_is_invalid_argument() {
        let transformer = trained(&["a"]);
        let mut error = NULL_HANDLE;
        let mut output = 0.0;
        unsafe {
            assert!(!numericalize_transform(transformer, std::ptr::null(), &mut output, &mut error));
        }
        let (kind, message) = consume_error(error);
        assert_eq!(kind, ErrorKind::InvalidArgument);
        assert!(message.contains("'input' is null"));
        unsafe {
            assert!(numericalize_destroy_transformer(transformer, &mut error));
        }
    }

    #[test]
    fn test_saved_data_survives_round_trip() {
        let transformer = trained(&["b", "a"]);
        let mut error = NULL_HANDLE;
        let mut data: *mut u8 = std::ptr::null_mut();
        let mut len = 0usize;
        let mut restored = NULL_HANDLE;
        unsafe {
            assert!(numericalize_create_transformer_save_data(transformer, &mut data, &mut len, &mut error));
            assert!(numericalize_create_transformer_from_saved_data(data, len, &mut restored, &mut error));
            assert!(crate::ffi::featurizers_destroy_transformer_save_data(data, len, &mut error));
        }
        assert_eq!(transform(restored, "b"), 1.0);
        unsafe {
            assert!(numericalize_destroy_transformer(transformer, &mut error));
            assert!(numericalize_destroy_transformer(restored, &mut error));
        }
    }

    #[test]
    fn test_saved_data_null_with_length_is_invalid_argument() {
        let mut error = NULL_HANDLE;
        let mut restored = NULL_HANDLE;
        unsafe {
            assert!(!numericalize_create_transformer_from_saved_data(
                std::ptr::null(),
                8,
                &mut restored,
                &mut error
            ));
        }
        assert_eq!(restored, NULL_HANDLE);
        assert_eq!(consume_error(error).0, ErrorKind::InvalidArgument);
    }
}
