//! Generic bodies shared by every featurizer family.
//!
//! [`estimator_lifecycle!`] stamps out the `#[no_mangle]` entry points that
//! look the same for every family. Record-shaped entry points (`fit`,
//! `transform`, `flush`) are written per family and call the helpers here.

use super::boundary::{destroy_raw_buffer, ffi_call, into_raw_buffer, out_param, slice_arg};
use super::{insert, take, with_object, Handle, NativeKind};
use crate::error::Result;
use crate::estimator::{Accumulator, Estimator, FitResult};
use crate::transformer::Transformer;

pub(crate) unsafe fn create_estimator<A>(
    function: &'static str,
    accumulator: impl FnOnce() -> Result<A>,
    output: *mut Handle,
    error: *mut Handle,
) -> bool
where
    A: Accumulator,
    Estimator<A>: NativeKind,
{
    ffi_call(function, error, || {
        let output = out_param(output, "estimator")?;
        *output = insert(Estimator::standalone(accumulator()?))?;
        Ok(())
    })
}

pub(crate) unsafe fn destroy<T: NativeKind>(function: &'static str, handle: Handle, error: *mut Handle) -> bool {
    ffi_call(function, error, || take::<T>(handle).map(drop))
}

pub(crate) unsafe fn get_state<A>(
    function: &'static str,
    handle: Handle,
    output: *mut u8,
    error: *mut Handle,
) -> bool
where
    A: Accumulator,
    Estimator<A>: NativeKind,
{
    ffi_call(function, error, || {
        let output = out_param(output, "state")?;
        *output = with_object(handle, |estimator: &mut Estimator<A>| Ok(estimator.state() as u8))?;
        Ok(())
    })
}

pub(crate) unsafe fn is_training_complete<A>(
    function: &'static str,
    handle: Handle,
    output: *mut bool,
    error: *mut Handle,
) -> bool
where
    A: Accumulator,
    Estimator<A>: NativeKind,
{
    ffi_call(function, error, || {
        let output = out_param(output, "is_complete")?;
        *output = with_object(handle, |estimator: &mut Estimator<A>| {
            Ok(estimator.is_training_complete())
        })?;
        Ok(())
    })
}

pub(crate) unsafe fn on_data_completed<A>(function: &'static str, handle: Handle, error: *mut Handle) -> bool
where
    A: Accumulator,
    Estimator<A>: NativeKind,
{
    ffi_call(function, error, || {
        with_object(handle, |estimator: &mut Estimator<A>| estimator.on_data_completed())
    })
}

pub(crate) unsafe fn complete_training<A>(function: &'static str, handle: Handle, error: *mut Handle) -> bool
where
    A: Accumulator,
    Estimator<A>: NativeKind,
{
    ffi_call(function, error, || {
        with_object(handle, |estimator: &mut Estimator<A>| estimator.complete_training())
    })
}

pub(crate) unsafe fn create_transformer_from_estimator<A>(
    function: &'static str,
    handle: Handle,
    output: *mut Handle,
    error: *mut Handle,
) -> bool
where
    A: Accumulator,
    A::Transformer: NativeKind,
    Estimator<A>: NativeKind,
{
    ffi_call(function, error, || {
        let output = out_param(output, "transformer")?;
        let transformer = with_object(handle, |estimator: &mut Estimator<A>| estimator.create_transformer())?;
        *output = insert(transformer)?;
        Ok(())
    })
}

pub(crate) unsafe fn create_transformer_from_saved_data<T>(
    function: &'static str,
    data: *const u8,
    len: usize,
    output: *mut Handle,
    error: *mut Handle,
) -> bool
where
    T: Transformer + NativeKind,
{
    ffi_call(function, error, || {
        let output = out_param(output, "transformer")?;
        let bytes = slice_arg(data, len, "data")?;
        *output = insert(T::from_bytes(bytes)?)?;
        Ok(())
    })
}

pub(crate) unsafe fn create_transformer_save_data<T>(
    function: &'static str,
    handle: Handle,
    output: *mut *mut u8,
    output_len: *mut usize,
    error: *mut Handle,
) -> bool
where
    T: Transformer + NativeKind,
{
    ffi_call(function, error, || {
        let output = out_param(output, "data")?;
        let output_len = out_param(output_len, "data_len")?;
        let bytes = with_object(handle, |transformer: &mut T| transformer.to_bytes())?;
        let (ptr, len) = into_raw_buffer(&bytes)?;
        *output = ptr;
        *output_len = len;
        Ok(())
    })
}

/// Feeds records to the estimator behind `handle`.
pub(crate) fn fit_records<A>(handle: Handle, records: &[A::Input]) -> Result<FitResult>
where
    A: Accumulator,
    Estimator<A>: NativeKind,
{
    with_object(handle, |estimator: &mut Estimator<A>| estimator.fit_buffer(records))
}

pub(crate) fn transform_record<T>(handle: Handle, input: &T::Input) -> Result<T::Output>
where
    T: Transformer + NativeKind,
{
    with_object(handle, |transformer: &mut T| transformer.execute(input))
}

pub(crate) fn flush_transformer<T>(handle: Handle) -> Result<Vec<T::Output>>
where
    T: Transformer + NativeKind,
{
    with_object(handle, |transformer: &mut T| transformer.flush())
}

/// Releases bytes from any `*_create_transformer_save_data`.
///
/// # Safety
/// `(data, len)` must come from a save-data call and not have been released.
#[no_mangle]
pub unsafe extern "C" fn featurizers_destroy_transformer_save_data(
    data: *mut u8,
    len: usize,
    error: *mut Handle,
) -> bool {
    ffi_call("featurizers_destroy_transformer_save_data", error, || {
        destroy_raw_buffer(data, len, "data")
    })
}

/// Exports the entry points every featurizer family shares.
macro_rules! estimator_lifecycle {
    (
        accumulator: $acc:ty,
        transformer: $transformer:ty,
        destroy_estimator: $destroy_estimator:ident,
        get_state: $get_state:ident,
        is_training_complete: $is_training_complete:ident,
        on_data_completed: $on_data_completed:ident,
        complete_training: $complete_training:ident,
        create_transformer_from_estimator: $from_estimator:ident,
        create_transformer_from_saved_data: $from_saved_data:ident,
        destroy_transformer: $destroy_transformer:ident,
        create_transformer_save_data: $save_data:ident $(,)?
    ) => {
        /// # Safety
        /// `error` must be null or valid for writes.
        #[no_mangle]
        pub unsafe extern "C" fn $destroy_estimator(
            handle: $crate::ffi::Handle,
            error: *mut $crate::ffi::Handle,
        ) -> bool {
            $crate::ffi::common::destroy::<$crate::estimator::Estimator<$acc>>(
                stringify!($destroy_estimator),
                handle,
                error,
            )
        }

        /// Writes the TrainingState code.
        ///
        /// # Safety
        /// `state` and `error` must be null or valid for writes.
        #[no_mangle]
        pub unsafe extern "C" fn $get_state(
            handle: $crate::ffi::Handle,
            state: *mut u8,
            error: *mut $crate::ffi::Handle,
        ) -> bool {
            $crate::ffi::common::get_state::<$acc>(stringify!($get_state), handle, state, error)
        }

        /// # Safety
        /// `is_complete` and `error` must be null or valid for writes.
        #[no_mangle]
        pub unsafe extern "C" fn $is_training_complete(
            handle: $crate::ffi::Handle,
            is_complete: *mut bool,
            error: *mut $crate::ffi::Handle,
        ) -> bool {
            $crate::ffi::common::is_training_complete::<$acc>(
                stringify!($is_training_complete),
                handle,
                is_complete,
                error,
            )
        }

        /// # Safety
        /// `error` must be null or valid for writes.
        #[no_mangle]
        pub unsafe extern "C" fn $on_data_completed(
            handle: $crate::ffi::Handle,
            error: *mut $crate::ffi::Handle,
        ) -> bool {
            $crate::ffi::common::on_data_completed::<$acc>(stringify!($on_data_completed), handle, error)
        }

        /// # Safety
        /// `error` must be null or valid for writes.
        #[no_mangle]
        pub unsafe extern "C" fn $complete_training(
            handle: $crate::ffi::Handle,
            error: *mut $crate::ffi::Handle,
        ) -> bool {
            $crate::ffi::common::complete_training::<$acc>(stringify!($complete_training), handle, error)
        }

        /// # Safety
        /// `transformer` and `error` must be null or valid for writes.
        #[no_mangle]
        pub unsafe extern "C" fn $from_estimator(
            handle: $crate::ffi::Handle,
            transformer: *mut $crate::ffi::Handle,
            error: *mut $crate::ffi::Handle,
        ) -> bool {
            $crate::ffi::common::create_transformer_from_estimator::<$acc>(
                stringify!($from_estimator),
                handle,
                transformer,
                error,
            )
        }

        /// # Safety
        /// `data` must be valid for reads of `len` bytes; `transformer` and
        /// `error` must be null or valid for writes.
        #[no_mangle]
        pub unsafe extern "C" fn $from_saved_data(
            data: *const u8,
            len: usize,
            transformer: *mut $crate::ffi::Handle,
            error: *mut $crate::ffi::Handle,
        ) -> bool {
            $crate::ffi::common::create_transformer_from_saved_data::<$transformer>(
                stringify!($from_saved_data),
                data,
                len,
                transformer,
                error,
            )
        }

        /// # Safety
        /// `error` must be null or valid for writes.
        #[no_mangle]
        pub unsafe extern "C" fn $destroy_transformer(
            handle: $crate::ffi::Handle,
            error: *mut $crate::ffi::Handle,
        ) -> bool {
            $crate::ffi::common::destroy::<$transformer>(stringify!($destroy_transformer), handle, error)
        }

        /// The bytes must be released with `featurizers_destroy_transformer_save_data`.
        ///
        /// # Safety
        /// `data`, `data_len` and `error` must be null or valid for writes.
        #[no_mangle]
        pub unsafe extern "C" fn $save_data(
            handle: $crate::ffi::Handle,
            data: *mut *mut u8,
            data_len: *mut usize,
            error: *mut $crate::ffi::Handle,
        ) -> bool {
            $crate::ffi::common::create_transformer_save_data::<$transformer>(
                stringify!($save_data),
                handle,
                data,
                data_len,
                error,
            )
        }
    };
}

pub(crate) use estimator_lifecycle;
