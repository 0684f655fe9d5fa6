//! Per-domain singleton cell
//!
//! Holds the live provider of one domain together with the backend kind that
//! produced it. Nothing is built until the first resolution.

use parking_lot::RwLock;
use std::sync::Arc;

struct ActiveProvider<K, P: ?Sized> {
    kind: K,
    instance: Arc<P>,
}

/// Outcome of [`ProviderSlot::resolve`]
pub enum Resolution<P: ?Sized> {
    /// The live instance already had the requested kind
    Existing(Arc<P>),
    /// A new instance was built; `replaced` is the one it displaced, if any
    Created {
        instance: Arc<P>,
        replaced: Option<Arc<P>>,
    },
}

impl<P: ?Sized> Resolution<P> {
    /// The instance callers should use
    #[must_use]
    pub fn instance(&self) -> &Arc<P> {
        match self {
            Self::Existing(instance) | Self::Created { instance, .. } => instance,
        }
    }
}

/// Lazily filled, kind-tagged singleton for one provider domain
pub struct ProviderSlot<K, P: ?Sized> {
    active: RwLock<Option<ActiveProvider<K, P>>>,
}

impl<K, P> ProviderSlot<K, P>
where
    K: Copy + Eq,
    P: ?Sized,
{
    /// An empty slot
    #[must_use]
    pub fn new() -> Self {
        Self {
            active: RwLock::new(None),
        }
    }

    /// Return the live instance if it has `kind`, otherwise build and store one
    ///
    /// `build` runs under the write lock, so concurrent resolutions of the
    /// same kind construct exactly one instance. It must not block.
    pub fn resolve<F>(&self, kind: K, build: F) -> Resolution<P>
    where
        F: FnOnce(K) -> Arc<P>,
    {
        if let Some(instance) = Self::matching(&self.active.read(), kind) {
            return Resolution::Existing(instance);
        }

        let mut active = self.active.write();
        if let Some(instance) = Self::matching(&active, kind) {
            return Resolution::Existing(instance);
        }

        let instance = build(kind);
        let replaced = active
            .replace(ActiveProvider {
                kind,
                instance: Arc::clone(&instance),
            })
            .map(|previous| previous.instance);

        Resolution::Created { instance, replaced }
    }

    fn matching(active: &Option<ActiveProvider<K, P>>, kind: K) -> Option<Arc<P>> {
        active
            .as_ref()
            .filter(|active| active.kind == kind)
            .map(|active| Arc::clone(&active.instance))
    }

    /// Kind of the live instance, if any
    #[must_use]
    pub fn kind(&self) -> Option<K> {
        self.active.read().as_ref().map(|active| active.kind)
    }

    /// The live instance, if any
    #[must_use]
    pub fn current(&self) -> Option<Arc<P>> {
        self.active
            .read()
            .as_ref()
            .map(|active| Arc::clone(&active.instance))
    }

    /// Empty the slot, returning the instance it held
    pub fn take(&self) -> Option<Arc<P>> {
        self.active.write().take().map(|active| active.instance)
    }
}

impl<K, P> Default for ProviderSlot<K, P>
where
    K: Copy + Eq,
    P: ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_empty_until_first_resolution() {
        let slot: ProviderSlot<u8, str> = ProviderSlot::new();
        assert!(slot.current().is_none());
        assert!(slot.kind().is_none());
    }

    #[test]
    fn test_same_kind_reuses_instance() {
        let slot: ProviderSlot<u8, str> = ProviderSlot::new();
        let builds = AtomicUsize::new(0);
        let build = |_: u8| {
            builds.fetch_add(1, Ordering::SeqCst);
            Arc::<str>::from("first")
        };

        let first = slot.resolve(1, build);
        let second = slot.resolve(1, |_| Arc::<str>::from("second"));

        assert!(matches!(first, Resolution::Created { replaced: None, .. }));
        assert!(matches!(second, Resolution::Existing(_)));
        assert!(Arc::ptr_eq(first.instance(), second.instance()));
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_kind_change_replaces_instance() {
        let slot: ProviderSlot<u8, str> = ProviderSlot::new();
        let first = slot.resolve(1, |_| Arc::<str>::from("one"));
        let second = slot.resolve(2, |_| Arc::<str>::from("two"));

        match second {
            Resolution::Created { instance, replaced } => {
                assert_eq!(&*instance, "two");
                assert!(Arc::ptr_eq(&replaced.unwrap(), first.instance()));
            }
            Resolution::Existing(_) => panic!("kind change must build a new instance"),
        }
        assert_eq!(slot.kind(), Some(2));
    }

    #[test]
    fn test_take_empties_slot() {
        let slot: ProviderSlot<u8, str> = ProviderSlot::new();
        slot.resolve(1, |_| Arc::<str>::from("one"));

        assert_eq!(slot.take().as_deref(), Some("one"));
        assert!(slot.current().is_none());
    }
}
