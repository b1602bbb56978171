//! Generation-tagged slot table backing every ABI handle.
//!
//! A handle packs the slot generation into the high 32 bits and the slot
//! index into the low 32 bits. Generations start at 1, so `0` is never a
//! valid handle. Removing an entry bumps its slot's generation; a slot whose
//! generation is exhausted is retired instead of being reused, so a handle
//! value is never handed out twice.

use crate::error::{FeaturizerError, Result};

/// Opaque integer handed to foreign callers.
pub type Handle = u64;

/// Reserved "no object" handle.
pub const NULL_HANDLE: Handle = 0;

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

#[derive(Debug)]
pub struct HandleTable<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> Default for HandleTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn pack(index: u32, generation: u32) -> Handle {
    (u64::from(generation) << 32) | u64::from(index)
}

fn unpack(handle: Handle) -> (usize, u32) {
    ((handle & 0xFFFF_FFFF) as usize, (handle >> 32) as u32)
}

impl<T> HandleTable<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn add(&mut self, value: T) -> Result<Handle> {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            let generation = slot.generation;
            self.live += 1;
            return Ok(pack(index, generation));
        }

        let index = u32::try_from(self.slots.len())
            .map_err(|_| FeaturizerError::AllocationFailure("handle table is full".to_string()))?;
        self.slots.try_reserve(1)?;
        self.slots.push(Slot {
            generation: 1,
            value: Some(value),
        });
        self.live += 1;
        Ok(pack(index, 1))
    }

    pub fn get(&self, handle: Handle) -> Result<&T> {
        let (index, generation) = unpack(handle);
        self.slots
            .get(index)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.as_ref())
            .ok_or_else(|| invalid_handle(handle))
    }

    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut T> {
        let (index, generation) = unpack(handle);
        self.slots
            .get_mut(index)
            .filter(|slot| slot.generation == generation)
            .and_then(|slot| slot.value.as_mut())
            .ok_or_else(|| invalid_handle(handle))
    }

    pub fn remove(&mut self, handle: Handle) -> Result<T> {
        let (index, generation) = unpack(handle);
        let slot = self
            .slots
            .get_mut(index)
            .filter(|slot| slot.generation == generation)
            .ok_or_else(|| invalid_handle(handle))?;
        let value = slot.value.take().ok_or_else(|| invalid_handle(handle))?;
        let reusable = slot.generation < u32::MAX;
        if reusable {
            slot.generation += 1;
        }
        self.live -= 1;
        if reusable {
            // index came from the low 32 bits of the handle
            self.free.push(index as u32);
        }
        Ok(value)
    }
}

fn invalid_handle(handle: Handle) -> FeaturizerError {
    FeaturizerError::invalid_argument(format!("invalid handle {:#x}", handle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut table = HandleTable::new();
        let a = table.add("a").unwrap();
        let b = table.add("b").unwrap();
        assert_ne!(a, NULL_HANDLE);
        assert_ne!(a, b);
        assert_eq!(*table.get(a).unwrap(), "a");
        assert_eq!(*table.get(b).unwrap(), "b");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_null_handle_is_invalid() {
        let mut table: HandleTable<i32> = HandleTable::new();
        table.add(1).unwrap();
        assert!(matches!(
            table.get(NULL_HANDLE),
            Err(FeaturizerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_removed_handle_is_stale() {
        let mut table = HandleTable::new();
        let handle = table.add(7).unwrap();
        assert_eq!(table.remove(handle).unwrap(), 7);
        assert!(table.is_empty());
        assert!(matches!(
            table.get(handle),
            Err(FeaturizerError::InvalidArgument(_))
        ));
        assert!(matches!(
            table.remove(handle),
            Err(FeaturizerError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_slot_reuse_gets_new_handle() {
        let mut table = HandleTable::new();
        let first = table.add(1).unwrap();
        table.remove(first).unwrap();
        let second = table.add(2).unwrap();
        assert_ne!(first, second);
        assert_eq!(first & 0xFFFF_FFFF, second & 0xFFFF_FFFF);
        assert!(table.get(first).is_err());
        assert_eq!(*table.get(second).unwrap(), 2);
    }

    #[test]
    fn test_get_mut_updates_value() {
        let mut table = HandleTable::new();
        let handle = table.add(vec![1]).unwrap();
        table.get_mut(handle).unwrap().push(2);
        assert_eq!(table.get(handle).unwrap(), &vec![1, 2]);
    }

    #[test]
    fn test_exhausted_slot_is_retired() {
        let mut table = HandleTable::new();
        let handle = table.add(1).unwrap();
        table.slots[0].generation = u32::MAX;
        let exhausted = pack(0, u32::MAX);
        table.remove(exhausted).unwrap();
        assert!(table.free.is_empty());
        let next = table.add(2).unwrap();
        assert_eq!(next & 0xFFFF_FFFF, 1);
        assert!(table.get(handle).is_err());
    }
}
