//! Key comparers: the pair of hash and equality functions a map uses for keys.

use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;

/// Hashing and equality over keys of type `Q`.
///
/// Implementations must be consistent: `equals(a, b)` implies
/// `hash(a) == hash(b)`. When a map stores `K` and is queried with a
/// borrowed `Q`, the comparer's `K` and `Q` impls must agree the same way
/// `Borrow` requires for `Hash`/`Eq`.
pub trait KeyComparer<Q: ?Sized> {
    fn hash(&self, key: &Q) -> u64;
    fn equals(&self, a: &Q, b: &Q) -> bool;
}

/// Comparer using the key's own `Hash` and `Eq` through a `BuildHasher`.
#[derive(Clone, Debug, Default)]
pub struct HashComparer<S> {
    hasher: S,
}

impl<S> HashComparer<S> {
    pub fn new(hasher: S) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }
}

impl<Q, S> KeyComparer<Q> for HashComparer<S>
where
    Q: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &Q) -> u64 {
        self.hasher.hash_one(key)
    }

    #[inline]
    fn equals(&self, a: &Q, b: &Q) -> bool {
        a == b
    }
}

/// Comparer used when none is supplied.
pub type DefaultComparer = HashComparer<DefaultHashBuilder>;

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: `String` and `str` hash identically, so borrowed lookups
    /// land in the same bucket as the stored key.
    #[test]
    fn borrowed_forms_hash_alike() {
        let c = DefaultComparer::default();
        let owned = "needle".to_string();
        assert_eq!(
            KeyComparer::<String>::hash(&c, &owned),
            KeyComparer::<str>::hash(&c, "needle")
        );
        assert!(KeyComparer::<str>::equals(&c, "a", "a"));
        assert!(!KeyComparer::<str>::equals(&c, "a", "b"));
    }

    #[test]
    fn clones_share_seed() {
        let c = DefaultComparer::default();
        let d = c.clone();
        assert_eq!(
            KeyComparer::<str>::hash(&c, "k"),
            KeyComparer::<str>::hash(&d, "k")
        );
    }
}
