//! # IDs
//! Documents and layers are referred to by a [`UniqueID`], which is unique within one run of the program
//! and namespaced by a marker type. IDs are handed out in increasing order per namespace, starting at 1.

use std::{any::TypeId, collections::BTreeMap, num::NonZeroU64};

// Next free ID, by namespace.
static NEXT_ID: parking_lot::Mutex<BTreeMap<TypeId, NonZeroU64>> =
    parking_lot::const_mutex(BTreeMap::new());

/// ID that is guaranteed unique within this execution of the program.
/// IDs from different namespaces may share a value but never compare equal, as they are different types.
pub struct UniqueID<T: 'static> {
    id: NonZeroU64,
    // fn() -> T keeps the ID Send + Sync regardless of T.
    _namespace: std::marker::PhantomData<fn() -> T>,
}
impl<T: 'static> UniqueID<T> {
    /// Allocate a fresh ID.
    #[must_use]
    pub fn new() -> Self {
        let mut next = NEXT_ID.lock();
        let slot = next.entry(TypeId::of::<T>()).or_insert(NonZeroU64::MIN);
        let id = *slot;
        let Some(following) = id.checked_add(1) else {
            // Handing out a duplicate would corrupt every map keyed by this namespace.
            log::error!("{} ID space exhausted! Aborting!", Self::namespace());
            log::logger().flush();
            std::process::abort();
        };
        *slot = following;
        Self {
            id,
            _namespace: std::marker::PhantomData,
        }
    }
    /// Get the raw numeric value of this ID.
    #[must_use]
    pub fn get(&self) -> u64 {
        self.id.get()
    }
    fn namespace() -> &'static str {
        // rsplit always yields at least one item.
        std::any::type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or_default()
    }
}
impl<T: 'static> Default for UniqueID<T> {
    fn default() -> Self {
        Self::new()
    }
}
impl<T: 'static> Clone for UniqueID<T> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<T: 'static> Copy for UniqueID<T> {}
impl<T: 'static> PartialEq for UniqueID<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
impl<T: 'static> Eq for UniqueID<T> {}
impl<T: 'static> PartialOrd for UniqueID<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl<T: 'static> Ord for UniqueID<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}
impl<T: 'static> std::hash::Hash for UniqueID<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
impl<T: 'static> std::fmt::Display for UniqueID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", Self::namespace(), self.id)
    }
}
impl<T: 'static> std::fmt::Debug for UniqueID<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod test {
    use super::UniqueID;
    // Tests share the global counters, so each one gets its own namespace.

    #[test]
    fn starts_at_one() {
        struct Namespace;
        let id = UniqueID::<Namespace>::new();
        assert_eq!(id.get(), 1);
        assert_eq!(UniqueID::<Namespace>::new().get(), 2);
    }
    #[test]
    fn unique() {
        struct Namespace;
        let mut ids: Vec<_> = (0..512).map(|_| UniqueID::<Namespace>::new()).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(before, ids.len(), "had duplicate ids");
    }
    #[test]
    fn namespaced_display() {
        struct Widget;
        let id = UniqueID::<Widget>::new();
        assert_eq!(id.to_string(), "Widget#1");
        assert_eq!(format!("{id:?}"), "Widget#1");
    }
}
