//! C ABI.
//!
//! Every exported function returns `bool` and reports failures through an
//! `error` out-parameter that receives an ErrorInfo handle (`0` on success).
//! Estimators, transformers and error infos all live in one thread-local
//! [`HandleTable`] as variants of [`NativeObject`], so passing a handle of
//! the wrong kind is reported as InvalidArgument.
//!
//! The table is per thread: a handle created on one thread is not found on
//! another.
//!
//! # Example (C)
//! ```text
//! uint64_t estimator = 0, error = 0;
//! if (!rolling_window_create_estimator(1, 3, 1, 2, &estimator, &error)) {
//!     char const *message = NULL;
//!     featurizers_get_error_info_string(error, &message, &error2);
//!     ...
//! }
//! ```

mod boundary;
mod common;
pub mod error_info;
pub mod handles;
pub mod max_normalize;
pub mod numericalize;
pub mod rolling_window;
pub mod stringify;

pub use common::featurizers_destroy_transformer_save_data;
pub use handles::{Handle, HandleTable, NULL_HANDLE};

use crate::error::{FeaturizerError, Result};
use crate::featurizers::{
    MaxNormalizeEstimator, MaxNormalizeTransformer, NumericalizeEstimator, NumericalizeTransformer,
    RollingWindowEstimator, StringEstimator, StringTransformer,
};
use crate::window::WindowTransformer;
use error_info::ErrorInfo;
use std::cell::RefCell;

/// Every object type that can sit behind a handle.
#[derive(Debug)]
pub enum NativeObject {
    RollingWindowEstimator(RollingWindowEstimator),
    RollingWindowTransformer(WindowTransformer),
    MaxNormalizeEstimator(MaxNormalizeEstimator),
    MaxNormalizeTransformer(MaxNormalizeTransformer),
    NumericalizeEstimator(NumericalizeEstimator<String>),
    NumericalizeTransformer(NumericalizeTransformer<String>),
    StringifyEstimator(StringEstimator<f32>),
    StringifyTransformer(StringTransformer<f32>),
    ErrorInfo(ErrorInfo),
}

/// Typed view of one [`NativeObject`] variant.
pub(crate) trait NativeKind: Sized {
    const KIND: &'static str;

    fn wrap(self) -> NativeObject;
    fn view(object: &NativeObject) -> Option<&Self>;
    fn view_mut(object: &mut NativeObject) -> Option<&mut Self>;
    fn into_inner(object: NativeObject) -> Option<Self>;
}

macro_rules! native_kind {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl NativeKind for $ty {
                const KIND: &'static str = stringify!($variant);

                fn wrap(self) -> NativeObject {
                    NativeObject::$variant(self)
                }

                fn view(object: &NativeObject) -> Option<&Self> {
                    match object {
                        NativeObject::$variant(value) => Some(value),
                        _ => None,
                    }
                }

                fn view_mut(object: &mut NativeObject) -> Option<&mut Self> {
                    match object {
                        NativeObject::$variant(value) => Some(value),
                        _ => None,
                    }
                }

                fn into_inner(object: NativeObject) -> Option<Self> {
                    match object {
                        NativeObject::$variant(value) => Some(value),
                        _ => None,
                    }
                }
            }
        )*

        impl NativeObject {
            fn kind_name(&self) -> &'static str {
                match self {
                    $(NativeObject::$variant(_) => stringify!($variant),)*
                }
            }
        }
    };
}

native_kind! {
    RollingWindowEstimator => RollingWindowEstimator,
    RollingWindowTransformer => WindowTransformer,
    MaxNormalizeEstimator => MaxNormalizeEstimator,
    MaxNormalizeTransformer => MaxNormalizeTransformer,
    NumericalizeEstimator => NumericalizeEstimator<String>,
    NumericalizeTransformer => NumericalizeTransformer<String>,
    StringifyEstimator => StringEstimator<f32>,
    StringifyTransformer => StringTransformer<f32>,
    ErrorInfo => ErrorInfo,
}

thread_local! {
    static HANDLES: RefCell<HandleTable<NativeObject>> = RefCell::new(HandleTable::new());
}

fn with_table<R>(f: impl FnOnce(&mut HandleTable<NativeObject>) -> Result<R>) -> Result<R> {
    HANDLES.with(|cell| {
        let mut table = cell
            .try_borrow_mut()
            .map_err(|_| FeaturizerError::invalid_state("handle table is already in use"))?;
        f(&mut table)
    })
}

fn kind_mismatch<T: NativeKind>(handle: Handle, found: &'static str) -> FeaturizerError {
    FeaturizerError::invalid_argument(format!(
        "handle {:#x} refers to a {}, not a {}",
        handle,
        found,
        T::KIND
    ))
}

/// Stores `value` and returns its new handle.
pub(crate) fn insert<T: NativeKind>(value: T) -> Result<Handle> {
    let handle = with_table(|table| table.add(value.wrap()))?;
    tracing::debug!(kind = T::KIND, handle, "created handle");
    Ok(handle)
}

/// Runs `f` on the object behind `handle`.
///
/// The table stays borrowed while `f` runs; `f` must not create or destroy
/// handles.
pub(crate) fn with_object<T: NativeKind, R>(
    handle: Handle,
    f: impl FnOnce(&mut T) -> Result<R>,
) -> Result<R> {
    with_table(|table| {
        let object = table.get_mut(handle)?;
        let found = object.kind_name();
        match T::view_mut(object) {
            Some(value) => f(value),
            None => Err(kind_mismatch::<T>(handle, found)),
        }
    })
}

/// Removes and returns the object behind `handle`. A kind mismatch leaves
/// the object in place.
pub(crate) fn take<T: NativeKind>(handle: Handle) -> Result<T> {
    let value = with_table(|table| {
        let object = table.get(handle)?;
        if T::view(object).is_none() {
            return Err(kind_mismatch::<T>(handle, object.kind_name()));
        }
        let object = table.remove(handle)?;
        T::into_inner(object).ok_or_else(|| FeaturizerError::invalid_state("handle kind changed"))
    })?;
    tracing::debug!(kind = T::KIND, handle, "destroyed handle");
    Ok(value)
}

/// Number of live handles on this thread.
pub fn live_handle_count() -> usize {
    HANDLES.with(|cell| cell.try_borrow().map(|table| table.len()).unwrap_or(0))
}
