//! Binary archive used to persist trained transformer state.
//!
//! The format has no type tags. A type's `save` and its matching `load` must
//! read and write fields in exactly the same order:
//!
//! - integers are little-endian and fixed width
//! - floats are IEEE-754 bit patterns, also little-endian
//! - `bool` is a single byte (`0` or `1`)
//! - byte strings, strings, sequences and maps carry a `u32` length prefix
//!
//! Transformers start their payload with a version header written by
//! [`write_version`] and checked by [`read_version`].
//!
//! # Example
//! ```ignore
//! use featurizers::archive::{Archivable, ArchiveReader, ArchiveWriter};
//!
//! let mut writer = ArchiveWriter::new();
//! 42u32.save(&mut writer)?;
//! "grain".to_string().save(&mut writer)?;
//! let bytes = writer.commit();
//!
//! let mut reader = ArchiveReader::new(&bytes);
//! assert_eq!(u32::load(&mut reader)?, 42);
//! assert_eq!(String::load(&mut reader)?, "grain");
//! assert!(reader.at_end());
//! ```

use crate::error::{FeaturizerError, Result};
use std::collections::{BTreeMap, VecDeque};

/// Major version written at the start of every transformer archive.
pub const ARCHIVE_MAJOR_VERSION: u16 = 1;
/// Minor version written at the start of every transformer archive.
pub const ARCHIVE_MINOR_VERSION: u16 = 0;

/// Write cursor over a growable byte buffer.
#[derive(Debug, Default)]
pub struct ArchiveWriter {
    buffer: Vec<u8>,
}

impl ArchiveWriter {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Writes a `u32` length prefix.
    pub fn write_len(&mut self, len: usize) -> Result<()> {
        let len = u32::try_from(len).map_err(|_| {
            FeaturizerError::invalid_argument(format!(
                "length {} does not fit in an archive length prefix",
                len
            ))
        })?;
        self.write_raw(&len.to_le_bytes());
        Ok(())
    }

    /// Writes a length-prefixed byte string.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.write_len(bytes.len())?;
        self.write_raw(bytes);
        Ok(())
    }

    /// Finalizes the archive and hands back the accumulated bytes.
    pub fn commit(self) -> Vec<u8> {
        self.buffer
    }
}

/// Read cursor over a borrowed byte range.
#[derive(Debug, Clone)]
pub struct ArchiveReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> ArchiveReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn at_end(&self) -> bool {
        self.offset == self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// Consumes exactly `len` bytes.
    pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(FeaturizerError::decode(format!(
                "Invalid buffer: needed {} bytes at offset {}, {} remain",
                len,
                self.offset,
                self.remaining()
            )));
        }
        let bytes = &self.data[self.offset..self.offset + len];
        self.offset += len;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_raw(N)?);
        Ok(out)
    }

    /// Reads a `u32` length prefix.
    pub fn read_len(&mut self) -> Result<usize> {
        let len = u32::from_le_bytes(self.read_array::<4>()?);
        Ok(len as usize)
    }

    /// Reads a length-prefixed byte string.
    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_len()?;
        self.read_raw(len)
    }

    /// Fails unless every byte has been consumed.
    pub fn finish(&self) -> Result<()> {
        if self.at_end() {
            Ok(())
        } else {
            Err(FeaturizerError::decode(format!(
                "{} trailing bytes after archive payload",
                self.remaining()
            )))
        }
    }
}

/// Types with a fixed archive encoding.
pub trait Archivable: Sized {
    fn save(&self, ar: &mut ArchiveWriter) -> Result<()>;
    fn load(ar: &mut ArchiveReader<'_>) -> Result<Self>;
}

macro_rules! impl_archivable_le {
    ($($t:ty),* $(,)?) => {
        $(
            impl Archivable for $t {
                fn save(&self, ar: &mut ArchiveWriter) -> Result<()> {
                    ar.write_raw(&self.to_le_bytes());
                    Ok(())
                }

                fn load(ar: &mut ArchiveReader<'_>) -> Result<Self> {
                    Ok(<$t>::from_le_bytes(ar.read_array()?))
                }
            }
        )*
    };
}

impl_archivable_le!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl Archivable for bool {
    fn save(&self, ar: &mut ArchiveWriter) -> Result<()> {
        ar.write_raw(&[u8::from(*self)]);
        Ok(())
    }

    fn load(ar: &mut ArchiveReader<'_>) -> Result<Self> {
        match u8::load(ar)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(FeaturizerError::decode(format!(
                "invalid bool byte {}",
                other
            ))),
        }
    }
}

impl Archivable for String {
    fn save(&self, ar: &mut ArchiveWriter) -> Result<()> {
        ar.write_bytes(self.as_bytes())
    }

    fn load(ar: &mut ArchiveReader<'_>) -> Result<Self> {
        let bytes = ar.read_bytes()?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| FeaturizerError::decode(format!("invalid UTF-8 string: {}", e)))
    }
}

impl<T: Archivable> Archivable for Vec<T> {
    fn save(&self, ar: &mut ArchiveWriter) -> Result<()> {
        ar.write_len(self.len())?;
        for item in self {
            item.save(ar)?;
        }
        Ok(())
    }

    fn load(ar: &mut ArchiveReader<'_>) -> Result<Self> {
        let len = ar.read_len()?;
        // A corrupt prefix must not drive a huge up-front allocation.
        let mut items = Vec::with_capacity(len.min(ar.remaining()));
        for _ in 0..len {
            items.push(T::load(ar)?);
        }
        Ok(items)
    }
}

impl<T: Archivable> Archivable for VecDeque<T> {
    fn save(&self, ar: &mut ArchiveWriter) -> Result<()> {
        ar.write_len(self.len())?;
        for item in self {
            item.save(ar)?;
        }
        Ok(())
    }

    fn load(ar: &mut ArchiveReader<'_>) -> Result<Self> {
        Ok(Vec::<T>::load(ar)?.into())
    }
}

impl<T: Archivable> Archivable for Option<T> {
    fn save(&self, ar: &mut ArchiveWriter) -> Result<()> {
        match self {
            Some(value) => {
                true.save(ar)?;
                value.save(ar)
            }
            None => false.save(ar),
        }
    }

    fn load(ar: &mut ArchiveReader<'_>) -> Result<Self> {
        if bool::load(ar)? {
            Ok(Some(T::load(ar)?))
        } else {
            Ok(None)
        }
    }
}

impl<K: Archivable + Ord, V: Archivable> Archivable for BTreeMap<K, V> {
    fn save(&self, ar: &mut ArchiveWriter) -> Result<()> {
        ar.write_len(self.len())?;
        for (key, value) in self {
            key.save(ar)?;
            value.save(ar)?;
        }
        Ok(())
    }

    fn load(ar: &mut ArchiveReader<'_>) -> Result<Self> {
        let len = ar.read_len()?;
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let key = K::load(ar)?;
            let value = V::load(ar)?;
            map.insert(key, value);
        }
        Ok(map)
    }
}

impl<A: Archivable, B: Archivable> Archivable for (A, B) {
    fn save(&self, ar: &mut ArchiveWriter) -> Result<()> {
        self.0.save(ar)?;
        self.1.save(ar)
    }

    fn load(ar: &mut ArchiveReader<'_>) -> Result<Self> {
        let a = A::load(ar)?;
        let b = B::load(ar)?;
        Ok((a, b))
    }
}

/// Writes the transformer archive version header.
pub fn write_version(ar: &mut ArchiveWriter) -> Result<()> {
    ARCHIVE_MAJOR_VERSION.save(ar)?;
    ARCHIVE_MINOR_VERSION.save(ar)
}

/// Reads and checks the transformer archive version header.
pub fn read_version(ar: &mut ArchiveReader<'_>) -> Result<()> {
    let major = u16::load(ar)?;
    let minor = u16::load(ar)?;
    if major != ARCHIVE_MAJOR_VERSION || minor != ARCHIVE_MINOR_VERSION {
        return Err(FeaturizerError::decode(format!(
            "Unsupported archive version {}.{}",
            major, minor
        )));
    }
    Ok(())
}
