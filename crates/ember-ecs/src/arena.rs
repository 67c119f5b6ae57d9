use std::fmt;

/// Slot index plus generation. Shared representation behind
/// [`Entity`](crate::Entity) and [`ComponentId`](crate::ComponentId).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

impl RawId {
    /// Create an id from raw parts (mainly for testing).
    pub fn from_raw(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Generation-counted slot storage with free-list recycling.
///
/// A freed slot bumps its generation, so ids handed out before the free no
/// longer resolve even after the slot is reused.
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Store a value, reusing a freed slot if available.
    pub fn insert(&mut self, value: T) -> RawId {
        self.len += 1;
        if let Some(index) = self.free_list.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            RawId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                value: Some(value),
            });
            RawId {
                index,
                generation: 0,
            }
        }
    }

    /// Free a slot, returning its value if the id was still live.
    pub fn remove(&mut self, id: RawId) -> Option<T> {
        let slot = self.slots.get_mut(id.index as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.index);
        self.len -= 1;
        Some(value)
    }

    pub fn get(&self, id: RawId) -> Option<&T> {
        self.slots
            .get(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.value.as_ref())
    }

    pub fn get_mut(&mut self, id: RawId) -> Option<&mut T> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|s| s.generation == id.generation)
            .and_then(|s| s.value.as_mut())
    }

    pub fn contains(&self, id: RawId) -> bool {
        self.get(id).is_some()
    }

    /// Number of occupied slots.
    pub fn len(&self) -> usize {
        self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_sequential() {
        let mut arena = Arena::with_capacity(4);
        let a = arena.insert('a');
        let b = arena.insert('b');
        assert_eq!(a.index(), 0);
        assert_eq!(b.index(), 1);
        assert_eq!(a.generation(), 0);
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(b), Some(&'b'));
    }

    #[test]
    fn remove_and_reuse() {
        let mut arena = Arena::with_capacity(4);
        let a = arena.insert(1);
        assert_eq!(arena.remove(a), Some(1));
        let reused = arena.insert(2);
        assert_eq!(reused.index(), 0);
        assert_eq!(reused.generation(), 1);
        assert_ne!(a, reused);
    }

    #[test]
    fn double_remove_fails() {
        let mut arena = Arena::with_capacity(1);
        let a = arena.insert(());
        assert!(arena.remove(a).is_some());
        assert!(arena.remove(a).is_none());
        assert_eq!(arena.len(), 0);
    }

    #[test]
    fn stale_id_does_not_resolve() {
        let mut arena = Arena::with_capacity(1);
        let a = arena.insert("old");
        arena.remove(a);
        let b = arena.insert("new");
        assert!(!arena.contains(a));
        assert_eq!(arena.get(b), Some(&"new"));
        assert!(arena.get_mut(a).is_none());
    }
}
