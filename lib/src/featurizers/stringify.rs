//! Stringify featurizer.
//!
//! Converts values to their canonical string form. No training is needed:
//! the estimator reaches `Finished` as soon as training begins.
//!
//! | type            | output                         |
//! |-----------------|--------------------------------|
//! | integers        | decimal, `-250`                |
//! | `f32`, `f64`    | six decimals, `4.444400`       |
//! | `bool`          | `True` / `False`               |
//! | `String`        | verbatim                       |
//! | `Vec<T>`        | `[a,b,c]`                      |
//! | `Option<T>`     | inner value or `NULL`          |
//!
//! Float `NaN` and `None` are nulls. They print as `NaN` / `NULL`, or as an
//! empty string when `empty_string_for_nulls` is set.

use crate::archive::{Archivable, ArchiveReader, ArchiveWriter};
use crate::error::{FeaturizerError, Result};
use crate::estimator::{Accumulator, Estimator, EstimatorContext, FitResult};
use crate::transformer::Transformer;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// Canonical string form of a value.
pub trait StringifyValue {
    /// Whether the type has a null representation.
    const NULLABLE: bool;

    fn is_null(&self) -> bool {
        false
    }

    fn to_featurizer_string(&self) -> String;
}

macro_rules! impl_stringify_integer {
    ($($t:ty),*) => {
        $(
            impl StringifyValue for $t {
                const NULLABLE: bool = false;

                fn to_featurizer_string(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

impl_stringify_integer!(u8, u16, u32, u64, i8, i16, i32, i64);

macro_rules! impl_stringify_float {
    ($($t:ty),*) => {
        $(
            impl StringifyValue for $t {
                const NULLABLE: bool = true;

                fn is_null(&self) -> bool {
                    self.is_nan()
                }

                fn to_featurizer_string(&self) -> String {
                    if self.is_nan() {
                        "NaN".to_string()
                    } else {
                        format!("{:.6}", self)
                    }
                }
            }
        )*
    };
}

impl_stringify_float!(f32, f64);

impl StringifyValue for bool {
    const NULLABLE: bool = false;

    fn to_featurizer_string(&self) -> String {
        let text = if *self { "True" } else { "False" };
        text.to_string()
    }
}

impl StringifyValue for String {
    const NULLABLE: bool = false;

    fn to_featurizer_string(&self) -> String {
        self.clone()
    }
}

impl<T: StringifyValue> StringifyValue for Vec<T> {
    const NULLABLE: bool = false;

    fn to_featurizer_string(&self) -> String {
        let items: Vec<String> = self.iter().map(StringifyValue::to_featurizer_string).collect();
        format!("[{}]", items.join(","))
    }
}

impl<T: StringifyValue> StringifyValue for Option<T> {
    const NULLABLE: bool = true;

    fn is_null(&self) -> bool {
        self.is_none()
    }

    fn to_featurizer_string(&self) -> String {
        match self {
            Some(value) => value.to_featurizer_string(),
            None => "NULL".to_string(),
        }
    }
}

/// Configuration for the stringify featurizer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringConfig {
    /// Emit `""` instead of the null marker. Only valid for nullable types.
    pub empty_string_for_nulls: bool,
}

impl StringConfig {
    /// Checks the configuration against the value type it will stringify.
    pub fn validate_for<T: StringifyValue>(&self) -> Result<()> {
        if self.empty_string_for_nulls && !T::NULLABLE {
            return Err(FeaturizerError::invalid_argument(format!(
                "empty_string_for_nulls is not supported for non-nullable type {}",
                std::any::type_name::<T>()
            )));
        }
        Ok(())
    }
}

/// Accumulator that needs no data.
#[derive(Debug, Clone)]
pub struct StringAccumulator<T> {
    config: StringConfig,
    _marker: PhantomData<T>,
}

impl<T: StringifyValue> StringAccumulator<T> {
    pub fn new(config: StringConfig) -> Result<Self> {
        config.validate_for::<T>()?;
        Ok(Self {
            config,
            _marker: PhantomData,
        })
    }
}

impl<T: StringifyValue> Accumulator for StringAccumulator<T> {
    type Input = T;
    type Transformer = StringTransformer<T>;
    const NAME: &'static str = "StringEstimator";

    fn begin_training(&mut self, _ctx: &EstimatorContext) -> Result<bool> {
        Ok(false)
    }

    fn fit(&mut self, _inputs: &[T], _ctx: &EstimatorContext) -> Result<FitResult> {
        Err(FeaturizerError::invalid_state(
            "StringEstimator does not accept training data",
        ))
    }

    fn create_transformer(&mut self, _ctx: &EstimatorContext) -> Result<StringTransformer<T>> {
        StringTransformer::new(self.config)
    }
}

pub type StringEstimator<T> = Estimator<StringAccumulator<T>>;

#[derive(Debug, Clone, PartialEq)]
pub struct StringTransformer<T> {
    empty_string_for_nulls: bool,
    _marker: PhantomData<T>,
}

impl<T: StringifyValue> StringTransformer<T> {
    pub fn new(config: StringConfig) -> Result<Self> {
        config.validate_for::<T>()?;
        Ok(Self {
            empty_string_for_nulls: config.empty_string_for_nulls,
            _marker: PhantomData,
        })
    }

    pub fn empty_string_for_nulls(&self) -> bool {
        self.empty_string_for_nulls
    }
}

impl<T: StringifyValue> Transformer for StringTransformer<T> {
    type Input = T;
    type Output = String;

    fn execute(&mut self, input: &T) -> Result<String> {
        if self.empty_string_for_nulls && input.is_null() {
            return Ok(String::new());
        }
        Ok(input.to_featurizer_string())
    }

    fn save(&self, ar: &mut ArchiveWriter) -> Result<()> {
        self.empty_string_for_nulls.save(ar)
    }

    fn load(ar: &mut ArchiveReader<'_>) -> Result<Self> {
        let config = StringConfig {
            empty_string_for_nulls: bool::load(ar)?,
        };
        Self::new(config).map_err(|e| FeaturizerError::decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::TrainingState;

    fn stringify<T: StringifyValue>(value: T) -> String {
        StringTransformer::<T>::new(StringConfig::default())
            .unwrap()
            .execute(&value)
            .unwrap()
    }

    #[test]
    fn test_estimator_needs_no_training() {
        let mut estimator = Estimator::standalone(StringAccumulator::<i32>::new(StringConfig::default()).unwrap());
        estimator.begin_training().unwrap();
        assert_eq!(estimator.state(), TrainingState::Finished);
        assert!(estimator.is_training_complete());
        assert!(matches!(
            estimator.fit(&1),
            Err(FeaturizerError::InvalidState(_))
        ));
        estimator.complete_training().unwrap();
        assert!(estimator.create_transformer().is_ok());
    }

    #[test]
    fn test_integers() {
        assert_eq!(stringify(20i8), "20");
        assert_eq!(stringify(-250i16), "-250");
        assert_eq!(stringify(480i32), "480");
        assert_eq!(stringify(-7799i64), "-7799");
        assert_eq!(stringify(250u16), "250");
        assert_eq!(stringify(7799u64), "7799");
    }

    #[test]
    fn test_floats_use_six_decimals() {
        assert_eq!(stringify(4.4444f32), "4.444400");
        assert_eq!(stringify(123f32), "123.000000");
        assert_eq!(stringify(123.45f64), "123.450000");
        assert_eq!(stringify(f64::NAN), "NaN");
    }

    #[test]
    fn test_bools_and_strings() {
        assert_eq!(stringify(true), "True");
        assert_eq!(stringify(false), "False");
        assert_eq!(stringify("this is a string".to_string()), "this is a string");
    }

    #[test]
    fn test_containers() {
        assert_eq!(
            stringify(vec![1.03f64, -20.1, 305.8]),
            "[1.030000,-20.100000,305.800000]"
        );
        assert_eq!(stringify(Vec::<i32>::new()), "[]");
        assert_eq!(stringify(Some(3u8)), "3");
        assert_eq!(stringify(None::<u8>), "NULL");
    }

    #[test]
    fn test_empty_string_for_nulls() {
        let config = StringConfig {
            empty_string_for_nulls: true,
        };
        let mut transformer = StringTransformer::<f32>::new(config).unwrap();
        assert_eq!(transformer.execute(&f32::NAN).unwrap(), "");
        assert_eq!(transformer.execute(&1.5).unwrap(), "1.500000");
    }

    #[test]
    fn test_empty_string_for_non_nullable_rejected() {
        let config = StringConfig {
            empty_string_for_nulls: true,
        };
        assert!(matches!(
            StringAccumulator::<i32>::new(config),
            Err(FeaturizerError::InvalidArgument(_))
        ));
        assert!(matches!(
            StringTransformer::<String>::new(config),
            Err(FeaturizerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_round_trip_keeps_flag() {
        let config = StringConfig {
            empty_string_for_nulls: true,
        };
        let transformer = StringTransformer::<f64>::new(config).unwrap();
        let bytes = transformer.to_bytes().unwrap();
        let mut restored = StringTransformer::<f64>::from_bytes(&bytes).unwrap();
        assert!(restored.empty_string_for_nulls());
        assert_eq!(restored.execute(&f64::NAN).unwrap(), "");
    }

    #[test]
    fn test_load_rejects_flag_for_non_nullable() {
        let bytes = StringTransformer::<f64>::new(StringConfig {
            empty_string_for_nulls: true,
        })
        .unwrap()
        .to_bytes()
        .unwrap();
        assert!(matches!(
            StringTransformer::<i64>::from_bytes(&bytes),
            Err(FeaturizerError::Decode(_))
        ));
    }
}
