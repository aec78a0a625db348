//! Per-session object-identity tracking.
//!
//! Both flatteners break cycles the same way: an object is labeled
//! *before* its fields are visited, so any path that re-reaches it finds
//! the label and stops. The label is a C symbol for the source emitter
//! and a small integer id for the wire codec; the tracker is generic
//! over that.
//!
//! The map is keyed on pointer identity, and every entry keeps an owning
//! handle to its object: a session may span several roots, and a heap
//! address freed between roots must not hand its label to a new object.
//!
//! One tracker serves exactly one flattening or encoding session. It is
//! never shared between sessions.

use rustc_hash::FxHashMap;

use crate::value::{ObjRef, ObjectIdent};

/// Map from object identity to an assigned label. Entries hold their
/// object alive for the tracker's lifetime.
#[derive(Debug, Default)]
pub struct IdentityTracker<L> {
    labels: FxHashMap<ObjectIdent, (ObjRef, L)>,
}

impl<L> IdentityTracker<L> {
    pub fn new() -> Self {
        IdentityTracker { labels: FxHashMap::default() }
    }

    /// The label assigned to `obj`, if it has been reached before.
    pub fn get(&self, obj: &ObjRef) -> Option<&L> {
        self.labels.get(&obj.ident()).map(|(_, label)| label)
    }

    /// Labels `obj`. Returns `false` if it was already labeled, in which
    /// case the existing label is kept.
    pub fn insert(&mut self, obj: &ObjRef, label: L) -> bool {
        use std::collections::hash_map::Entry;
        match self.labels.entry(obj.ident()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(e) => {
                e.insert((obj.clone(), label));
                true
            }
        }
    }

    /// Labels `obj` unconditionally, replacing any existing label. Used
    /// where a provisional label is recorded before the final one is
    /// known.
    pub fn set(&mut self, obj: &ObjRef, label: L) {
        self.labels.insert(obj.ident(), (obj.clone(), label));
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn labels_stick_to_the_first_assignment() {
        let v = Value::record("A", vec![]);
        let obj = v.as_ref().unwrap();
        let mut tracker = IdentityTracker::new();
        assert!(tracker.insert(obj, "gvar0".to_string()));
        assert!(!tracker.insert(obj, "gvar1".to_string()));
        assert_eq!(tracker.get(obj).map(String::as_str), Some("gvar0"));
    }

    #[test]
    fn set_replaces_a_provisional_label() {
        let v = Value::record("A", vec![]);
        let obj = v.as_ref().unwrap();
        let mut tracker = IdentityTracker::new();
        tracker.insert(obj, "gvar0".to_string());
        tracker.set(obj, "(struct A_4){ 1024 }".to_string());
        assert_eq!(
            tracker.get(obj).map(String::as_str),
            Some("(struct A_4){ 1024 }")
        );
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn distinct_objects_get_distinct_slots() {
        let a = Value::record("A", vec![]);
        let b = Value::record("A", vec![]);
        let mut tracker = IdentityTracker::new();
        tracker.insert(a.as_ref().unwrap(), 0u16);
        tracker.insert(b.as_ref().unwrap(), 1u16);
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn dropped_objects_never_donate_their_label() {
        let mut tracker = IdentityTracker::new();
        // churn through objects whose heap cells are freed immediately;
        // if the tracker let an entry's object die, a later allocation
        // at the same address would inherit its label
        for i in 0..64 {
            let v = Value::record("A", vec![Value::Int(i)]);
            let obj = v.as_ref().unwrap();
            assert!(
                tracker.get(obj).is_none(),
                "fresh object carried a recycled label"
            );
            tracker.insert(obj, i);
        }
        assert_eq!(tracker.len(), 64);
    }
}
