//! Generational slot storage for live algorithm instances.
//!
//! Bundles and pending receives carry an [`AlgorithmHandle`] instead of a
//! pointer back to their algorithm. A handle whose slot was freed (or
//! reused) resolves to `EngineError::StaleHandle`.

use serde::Serialize;

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct AlgorithmHandle {
    pub index: usize,
    pub generation: u64,
}

#[derive(Debug)]
struct Slot<T> {
    generation: u64,
    value: Option<T>,
}

#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<usize>,
    live: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }
}

impl<T> Arena<T> {
    pub fn insert(&mut self, value: T) -> AlgorithmHandle {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index];
            slot.generation += 1;
            slot.value = Some(value);
            return AlgorithmHandle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len();
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        AlgorithmHandle {
            index,
            generation: 0,
        }
    }

    fn stale(handle: AlgorithmHandle) -> EngineError {
        EngineError::StaleHandle {
            index: handle.index,
            generation: handle.generation,
        }
    }

    pub fn get(&self, handle: AlgorithmHandle) -> Result<&T, EngineError> {
        self.slots
            .get(handle.index)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.value.as_ref())
            .ok_or(Self::stale(handle))
    }

    pub fn get_mut(&mut self, handle: AlgorithmHandle) -> Result<&mut T, EngineError> {
        self.slots
            .get_mut(handle.index)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.value.as_mut())
            .ok_or(Self::stale(handle))
    }

    /// Take the value out of its slot; the slot may then be reused.
    pub fn remove(&mut self, handle: AlgorithmHandle) -> Result<T, EngineError> {
        let slot = self
            .slots
            .get_mut(handle.index)
            .filter(|s| s.generation == handle.generation)
            .ok_or(Self::stale(handle))?;
        let value = slot.value.take().ok_or(Self::stale(handle))?;
        self.free.push(handle.index);
        self.live -= 1;
        Ok(value)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reused_slot_invalidates_old_handle() {
        let mut arena = Arena::default();
        let a = arena.insert("a");
        assert_eq!(*arena.get(a).unwrap(), "a");
        assert_eq!(arena.remove(a).unwrap(), "a");
        let b = arena.insert("b");
        assert_eq!(b.index, a.index);
        assert_ne!(b.generation, a.generation);
        assert!(matches!(
            arena.get(a),
            Err(EngineError::StaleHandle { .. })
        ));
        assert_eq!(*arena.get_mut(b).unwrap(), "b");
        assert_eq!(arena.len(), 1);
    }
}
