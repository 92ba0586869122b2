//! Per-model-space run serialization.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use parking_lot::Mutex;

/// In-flight set of model spaces, each with a backlog of parked work.
///
/// The worker that enters a space owns it until [`SpaceLocks::next`] finds the
/// backlog empty. Work for a held space is parked instead of waited on, so a
/// busy space never occupies more than one worker.
pub struct SpaceLocks<T> {
    spaces: Arc<Mutex<HashMap<String, VecDeque<T>>>>,
}

impl<T> Clone for SpaceLocks<T> {
    fn clone(&self) -> Self {
        Self {
            spaces: Arc::clone(&self.spaces),
        }
    }
}

impl<T> Default for SpaceLocks<T> {
    fn default() -> Self {
        Self {
            spaces: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl<T> SpaceLocks<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take `model_space` for the caller and hand `item` back, or park `item`
    /// behind the current holder and return `None`.
    pub fn enter(&self, model_space: &str, item: T) -> Option<T> {
        let mut spaces = self.spaces.lock();
        match spaces.get_mut(model_space) {
            Some(backlog) => {
                backlog.push_back(item);
                None
            }
            None => {
                spaces.insert(model_space.to_string(), VecDeque::new());
                Some(item)
            }
        }
    }

    /// Next parked item for a space the caller holds. Releases the space when
    /// the backlog is empty.
    pub fn next(&self, model_space: &str) -> Option<T> {
        let mut spaces = self.spaces.lock();
        let item = spaces.get_mut(model_space).and_then(VecDeque::pop_front);
        if item.is_none() {
            spaces.remove(model_space);
        }
        item
    }

    /// Whether a run currently holds the space.
    pub fn is_held(&self, model_space: &str) -> bool {
        self.spaces.lock().contains_key(model_space)
    }

    pub fn parked(&self, model_space: &str) -> usize {
        self.spaces.lock().get(model_space).map_or(0, VecDeque::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_space_parks_other_space_does_not() {
        let locks = SpaceLocks::new();
        assert_eq!(locks.enter("m1", 1), Some(1));
        assert!(locks.is_held("m1"));
        assert!(!locks.is_held("m2"));

        assert_eq!(locks.enter("m1", 2), None);
        assert_eq!(locks.enter("m1", 3), None);
        assert_eq!(locks.enter("m2", 4), Some(4));
        assert_eq!(locks.parked("m1"), 2);

        assert_eq!(locks.next("m1"), Some(2));
        assert_eq!(locks.next("m1"), Some(3));
        assert!(locks.is_held("m1"));
        assert_eq!(locks.next("m1"), None);
        assert!(!locks.is_held("m1"));

        assert_eq!(locks.enter("m1", 5), Some(5));
    }
}
