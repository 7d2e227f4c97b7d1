//! Selection set: identities of the keys targeted by batch operations.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::ids::{KeyId, TrackKey};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    keys: HashSet<KeyId>,
}

impl Selection {
    /// Returns false when the key was already selected.
    #[inline]
    pub fn insert(&mut self, id: KeyId) -> bool {
        self.keys.insert(id)
    }

    /// Returns false when the key was not selected.
    #[inline]
    pub fn remove(&mut self, id: &KeyId) -> bool {
        self.keys.remove(id)
    }

    #[inline]
    pub fn contains(&self, id: &KeyId) -> bool {
        self.keys.contains(id)
    }

    #[inline]
    pub fn clear(&mut self) {
        self.keys.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &KeyId> {
        self.keys.iter()
    }

    pub fn retain(&mut self, f: impl FnMut(&KeyId) -> bool) {
        self.keys.retain(f);
    }

    /// Selected ids in (uniform, channel, frame) order.
    pub fn sorted(&self) -> Vec<KeyId> {
        let mut ids: Vec<KeyId> = self.keys.iter().cloned().collect();
        ids.sort();
        ids
    }

    /// Distinct channels touched by the selection, sorted.
    pub fn tracks(&self) -> Vec<TrackKey> {
        let mut tracks: Vec<TrackKey> = self.keys.iter().map(KeyId::track).collect();
        tracks.sort();
        tracks.dedup();
        tracks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove_are_idempotent() {
        let mut sel = Selection::default();
        let id = KeyId::new("u", 0, 4);
        assert!(sel.insert(id.clone()));
        assert!(!sel.insert(id.clone()));
        assert_eq!(sel.len(), 1);

        assert!(!sel.remove(&KeyId::new("u", 0, 5)));
        assert_eq!(sel.len(), 1);
        assert!(sel.remove(&id));
        assert!(sel.is_empty());
    }

    #[test]
    fn tracks_are_deduplicated() {
        let mut sel = Selection::default();
        sel.insert(KeyId::new("b", 1, 4));
        sel.insert(KeyId::new("a", 0, 4));
        sel.insert(KeyId::new("a", 0, 9));
        assert_eq!(
            sel.tracks(),
            vec![TrackKey::new("a", 0), TrackKey::new("b", 1)]
        );
        assert_eq!(sel.sorted()[0], KeyId::new("a", 0, 4));
    }
}
