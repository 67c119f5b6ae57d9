use std::collections::HashMap;

/// Handle returned by [`EventEmitter::on`], used to unregister a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Name-keyed listener lists.
///
/// The emitter only stores listeners; invoking them is left to the owner,
/// which takes a snapshot with [`listeners`](Self::listeners) and is then
/// free to mutate the emitter (or anything else) while dispatching.
#[derive(Debug, Clone)]
pub struct EventEmitter<L> {
    listeners: HashMap<String, Vec<(ListenerId, L)>>,
    next_id: u64,
    muted: bool,
}

impl<L: Clone> EventEmitter<L> {
    pub fn new() -> Self {
        Self {
            listeners: HashMap::new(),
            next_id: 0,
            muted: false,
        }
    }

    /// Register a listener for `name`. Listeners fire in registration order.
    pub fn on(&mut self, name: impl Into<String>, listener: L) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners
            .entry(name.into())
            .or_default()
            .push((id, listener));
        id
    }

    /// Remove one listener. Returns `true` if it was registered.
    pub fn off(&mut self, name: &str, id: ListenerId) -> bool {
        let Some(list) = self.listeners.get_mut(name) else {
            return false;
        };
        let Some(pos) = list.iter().position(|(lid, _)| *lid == id) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            self.listeners.remove(name);
        }
        true
    }

    /// Remove every listener for `name`, returning how many were removed.
    pub fn off_all(&mut self, name: &str) -> usize {
        self.listeners.remove(name).map_or(0, |l| l.len())
    }

    /// Snapshot of the listeners for `name`. Empty while muted.
    pub fn listeners(&self, name: &str) -> Vec<L> {
        if self.muted {
            return Vec::new();
        }
        self.listeners
            .get(name)
            .map(|l| l.iter().map(|(_, listener)| listener.clone()).collect())
            .unwrap_or_default()
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.get(name).map_or(0, Vec::len)
    }

    pub fn has_listeners(&self, name: &str) -> bool {
        self.listener_count(name) > 0
    }

    /// Suppress dispatch without dropping registrations.
    pub fn mute(&mut self) {
        self.muted = true;
    }

    pub fn unmute(&mut self) {
        self.muted = false;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }
}

impl<L: Clone> Default for EventEmitter<L> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_off_roundtrip() {
        let mut emitter = EventEmitter::new();
        let a = emitter.on("foo", 'a');
        emitter.on("foo", 'b');

        assert_eq!(emitter.listeners("foo"), vec!['a', 'b']);
        assert!(emitter.off("foo", a));
        assert!(!emitter.off("foo", a));
        assert_eq!(emitter.listeners("foo"), vec!['b']);
        assert!(emitter.listeners("bar").is_empty());
    }

    #[test]
    fn muted_emitter_hands_out_nothing() {
        let mut emitter = EventEmitter::new();
        emitter.on("foo", 1u8);
        emitter.mute();
        assert!(emitter.listeners("foo").is_empty());
        assert!(emitter.has_listeners("foo"));
        emitter.unmute();
        assert_eq!(emitter.listeners("foo"), vec![1]);
    }

    #[test]
    fn off_all_and_clear() {
        let mut emitter = EventEmitter::new();
        emitter.on("foo", 1u8);
        emitter.on("foo", 2);
        emitter.on("bar", 3);
        assert_eq!(emitter.off_all("foo"), 2);
        assert_eq!(emitter.listener_count("foo"), 0);
        emitter.clear();
        assert!(!emitter.has_listeners("bar"));
    }
}
