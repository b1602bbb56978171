//! The applied half of a featurizer.
//!
//! A [`Transformer`] is produced either by a finished
//! [`Estimator`](crate::estimator::Estimator) or by decoding bytes written by
//! [`Transformer::to_bytes`]. A decoded transformer behaves exactly like the one
//! that was saved, buffered streaming state included.
//!
//! # Example
//! ```ignore
//! use featurizers::transformer::Transformer;
//!
//! let bytes = transformer.to_bytes()?;
//! let mut restored = RollingWindowTransformer::from_bytes(&bytes)?;
//! assert_eq!(restored.execute(&record)?.len(), horizon);
//! ```

use crate::archive::{read_version, write_version, ArchiveReader, ArchiveWriter};
use crate::error::Result;
use std::marker::PhantomData;

/// Trait for trained transformers.
pub trait Transformer {
    /// Record type consumed by [`execute`](Transformer::execute).
    type Input;
    /// Value produced for each record.
    type Output;

    /// Transforms a single record.
    fn execute(&mut self, input: &Self::Input) -> Result<Self::Output>;

    /// Emits whatever is still buffered at end of stream.
    ///
    /// Transformers that emit one output per input have nothing buffered.
    fn flush(&mut self) -> Result<Vec<Self::Output>> {
        Ok(Vec::new())
    }

    /// Writes the transformer body (without version header).
    fn save(&self, ar: &mut ArchiveWriter) -> Result<()>;

    /// Reads a transformer body written by [`save`](Transformer::save).
    fn load(ar: &mut ArchiveReader<'_>) -> Result<Self>
    where
        Self: Sized;

    /// Serializes the transformer with a version header.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = ArchiveWriter::new();
        write_version(&mut writer)?;
        self.save(&mut writer)?;
        tracing::debug!(bytes = writer.len(), "saved transformer");
        Ok(writer.commit())
    }

    /// Decodes bytes produced by [`to_bytes`](Transformer::to_bytes).
    ///
    /// Every byte must be consumed.
    fn from_bytes(bytes: &[u8]) -> Result<Self>
    where
        Self: Sized,
    {
        let mut reader = ArchiveReader::new(bytes);
        read_version(&mut reader)?;
        let transformer = Self::load(&mut reader)?;
        reader.finish()?;
        tracing::debug!(bytes = bytes.len(), "loaded transformer");
        Ok(transformer)
    }

    /// Save the transformer to a file.
    fn save_to_file<P: AsRef<std::path::Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    /// Load a transformer from a file.
    fn load_from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self>
    where
        Self: Sized,
    {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

/// Transformer that returns its input unchanged.
///
/// Annotation-only pipeline stages produce one of these.
#[derive(Debug, Clone, Default)]
pub struct PassThroughTransformer<T> {
    _marker: PhantomData<T>,
}

impl<T> PassThroughTransformer<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: Clone> Transformer for PassThroughTransformer<T> {
    type Input = T;
    type Output = T;

    fn execute(&mut self, input: &T) -> Result<T> {
        Ok(input.clone())
    }

    fn save(&self, _ar: &mut ArchiveWriter) -> Result<()> {
        Ok(())
    }

    fn load(_ar: &mut ArchiveReader<'_>) -> Result<Self> {
        Ok(Self::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeaturizerError;

    #[test]
    fn test_pass_through_execute() {
        let mut t = PassThroughTransformer::<Vec<f64>>::new();
        assert_eq!(t.execute(&vec![1.0, 2.0]).unwrap(), vec![1.0, 2.0]);
        assert!(t.flush().unwrap().is_empty());
    }

    #[test]
    fn test_to_bytes_is_version_only() {
        let t = PassThroughTransformer::<f64>::new();
        assert_eq!(t.to_bytes().unwrap(), vec![1, 0, 0, 0]);
    }

    #[test]
    fn test_from_bytes_rejects_trailing_data() {
        let err = PassThroughTransformer::<f64>::from_bytes(&[1, 0, 0, 0, 9]).unwrap_err();
        assert!(matches!(err, FeaturizerError::Decode(_)));
    }

    #[test]
    fn test_from_bytes_rejects_truncated_header() {
        let err = PassThroughTransformer::<f64>::from_bytes(&[1, 0]).unwrap_err();
        assert!(matches!(err, FeaturizerError::Decode(_)));
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pass_through.bin");
        let t = PassThroughTransformer::<f64>::new();
        t.save_to_file(&path).unwrap();
        let mut loaded = PassThroughTransformer::<f64>::load_from_file(&path).unwrap();
        assert_eq!(loaded.execute(&3.5).unwrap(), 3.5);
    }

    #[test]
    fn test_load_missing_file() {
        let err = PassThroughTransformer::<f64>::load_from_file("/nonexistent/featurizer.bin")
            .unwrap_err();
        assert!(matches!(err, FeaturizerError::Io(_)));
    }
}
