//! ChainedHashMap: storage core with prime-sized buckets, chained entries and a free list.

use crate::comparer::{DefaultComparer, KeyComparer};
use crate::error::Error;
use crate::pair::KeyValuePair;
use crate::primes;
use crate::views::{Iter, Keys, Values, View};
use core::borrow::Borrow;
use core::fmt;
use core::ops::Index;
use std::sync::atomic::{AtomicU64, Ordering};

/// Chain terminator, empty bucket and free-slot marker.
pub(crate) const NIL: i32 = -1;

/// Stored hash codes keep 31 bits so they never collide with `NIL`.
const HASH_MASK: u64 = 0x7FFF_FFFF;

/// Chain walks longer than this during insert are reported via `tracing`.
pub const HASH_COLLISION_THRESHOLD: usize = 100;

static NEXT_MAP_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Debug)]
pub(crate) struct Entry<K, V> {
    /// Masked key hash; `NIL` while the slot sits on the free list.
    pub(crate) hash_code: i32,
    /// Next entry of the same chain, or next free slot.
    pub(crate) next: i32,
    pub(crate) pair: Option<(K, V)>,
}

impl<K, V> Entry<K, V> {
    #[inline]
    pub(crate) fn live(&self) -> Option<(&K, &V)> {
        if self.hash_code >= 0 {
            self.pair.as_ref().map(|(k, v)| (k, v))
        } else {
            None
        }
    }
}

#[inline]
fn masked_hash<Q, C>(comparer: &C, key: &Q) -> i32
where
    Q: ?Sized,
    C: KeyComparer<Q>,
{
    let h = comparer.hash(key);
    ((h ^ (h >> 32)) & HASH_MASK) as i32
}

#[inline]
fn bucket_of(hash_code: i32, len: usize) -> usize {
    hash_code as usize % len
}

/// Hash map with separate chaining threaded through a flat entry array.
///
/// Removed slots go onto a free list and are reused before the entry array
/// grows. Every insert, overwrite, removal and non-empty clear bumps a
/// version counter that detached [`Cursor`](crate::Cursor)s check on each step.
pub struct ChainedHashMap<K, V, C = DefaultComparer> {
    buckets: Vec<i32>,
    entries: Vec<Entry<K, V>>,
    free_list: i32,
    free_count: usize,
    version: u64,
    id: u64,
    comparer: C,
}

impl<K, V> ChainedHashMap<K, V> {
    pub fn new() -> Self {
        Self::with_comparer(DefaultComparer::default())
    }

    /// Allocates the tables up front for at least `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Result<Self, Error> {
        Self::with_capacity_and_comparer(capacity, DefaultComparer::default())
    }
}

impl<K, V, C: Default> Default for ChainedHashMap<K, V, C> {
    fn default() -> Self {
        Self::with_comparer(C::default())
    }
}

impl<K, V, C> ChainedHashMap<K, V, C> {
    /// Empty, unallocated map; tables are sized on first insert.
    pub fn with_comparer(comparer: C) -> Self {
        Self {
            buckets: Vec::new(),
            entries: Vec::new(),
            free_list: NIL,
            free_count: 0,
            version: 0,
            id: NEXT_MAP_ID.fetch_add(1, Ordering::Relaxed),
            comparer,
        }
    }

    pub fn with_capacity_and_comparer(capacity: usize, comparer: C) -> Result<Self, Error> {
        let mut map = Self::with_comparer(comparer);
        if capacity > 0 {
            let requested =
                i32::try_from(capacity).map_err(|_| Error::CapacityOverflow { requested: capacity })?;
            map.initialize(requested)?;
        }
        Ok(map)
    }

    fn initialize(&mut self, capacity: i32) -> Result<(), Error> {
        let size = primes::get_prime(capacity)? as usize;
        self.buckets = vec![NIL; size];
        self.entries = Vec::with_capacity(size);
        self.free_list = NIL;
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!(requested = capacity, size, "table initialized");
        }
        Ok(())
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len() - self.free_count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bucket count, which is also the number of entry slots before growth.
    /// Zero while unallocated.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Slots ever handed out and not reclaimed by `clear`, live or free.
    #[inline]
    pub fn high_water_mark(&self) -> usize {
        self.entries.len()
    }

    pub fn comparer(&self) -> &C {
        &self.comparer
    }

    #[inline]
    pub(crate) fn version(&self) -> u64 {
        self.version
    }

    #[inline]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub(crate) fn entries(&self) -> &[Entry<K, V>] {
        &self.entries
    }

    #[inline]
    fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }

    /// Removes every entry, keeping the allocated tables. No-op when empty.
    pub fn clear(&mut self) {
        if self.is_empty() {
            return;
        }
        let cleared = self.len();
        self.buckets.fill(NIL);
        self.entries.clear();
        self.free_list = NIL;
        self.free_count = 0;
        self.bump_version();
        if tracing::enabled!(tracing::Level::TRACE) {
            tracing::trace!(cleared, "map cleared");
        }
    }

    /// Linear scan over live values using the value type's own equality.
    pub fn contains_value<W>(&self, value: &W) -> bool
    where
        V: Borrow<W>,
        W: ?Sized + PartialEq,
    {
        self.iter()
            .any(|(_, v)| <V as Borrow<W>>::borrow(v) == value)
    }

    /// Live entries in ascending slot order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.entries, self.len())
    }

    pub fn keys(&self) -> Keys<'_, K, V, C> {
        View::new(self)
    }

    pub fn values(&self) -> Values<'_, K, V, C> {
        View::new(self)
    }

    /// Writes every live entry, in slot order, into `buffer` from `start` on.
    pub fn copy_to(
        &self,
        buffer: &mut [Option<KeyValuePair<K, V>>],
        start: usize,
    ) -> Result<(), Error>
    where
        K: Clone,
        V: Clone,
    {
        if start > buffer.len() {
            return Err(Error::OutOfRange {
                index: start,
                len: buffer.len(),
            });
        }
        let available = buffer.len() - start;
        if available < self.len() {
            return Err(Error::InsufficientSpace {
                needed: self.len(),
                available,
            });
        }
        for (slot, (k, v)) in buffer[start..].iter_mut().zip(self.iter()) {
            *slot = Some(KeyValuePair::new(k.clone(), v.clone()));
        }
        Ok(())
    }

    pub fn to_pairs(&self) -> Vec<KeyValuePair<K, V>>
    where
        K: Clone,
        V: Clone,
    {
        self.iter()
            .map(|(k, v)| KeyValuePair::new(k.clone(), v.clone()))
            .collect()
    }

    /// Slot index of `key`, if present.
    pub fn find<Q>(&self, key: &Q) -> Option<usize>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparer<Q>,
    {
        if self.buckets.is_empty() {
            return None;
        }
        let hash = masked_hash(&self.comparer, key);
        let mut i = self.buckets[bucket_of(hash, self.buckets.len())];
        while i >= 0 {
            let entry = &self.entries[i as usize];
            if entry.hash_code == hash {
                if let Some((k, _)) = &entry.pair {
                    if self.comparer.equals(k.borrow(), key) {
                        return Some(i as usize);
                    }
                }
            }
            i = entry.next;
        }
        None
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparer<Q>,
    {
        self.find(key).is_some()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparer<Q>,
    {
        let i = self.find(key)?;
        self.entries[i].live().map(|(_, v)| v)
    }

    /// Mutable access to the value for `key`. A hit counts as an overwrite
    /// and invalidates outstanding cursors.
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparer<Q>,
    {
        let i = self.find(key)?;
        self.bump_version();
        self.entries[i].pair.as_mut().map(|(_, v)| v)
    }

    /// Value for `key`, or [`Error::KeyNotFound`].
    pub fn value_of<Q>(&self, key: &Q) -> Result<&V, Error>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparer<Q>,
    {
        self.get(key).ok_or(Error::KeyNotFound)
    }

    /// Unlinks `key` and returns the owned pair; the slot joins the free list.
    pub fn take<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparer<Q>,
    {
        if self.buckets.is_empty() {
            return None;
        }
        let hash = masked_hash(&self.comparer, key);
        let bucket = bucket_of(hash, self.buckets.len());
        let mut last = NIL;
        let mut i = self.buckets[bucket];
        while i >= 0 {
            let entry = &self.entries[i as usize];
            let matched = entry.hash_code == hash
                && entry
                    .pair
                    .as_ref()
                    .is_some_and(|(k, _)| self.comparer.equals(k.borrow(), key));
            if matched {
                let next = entry.next;
                if last < 0 {
                    self.buckets[bucket] = next;
                } else {
                    self.entries[last as usize].next = next;
                }
                let freed = &mut self.entries[i as usize];
                freed.hash_code = NIL;
                freed.next = self.free_list;
                let pair = freed.pair.take();
                self.free_list = i;
                self.free_count += 1;
                self.bump_version();
                return pair;
            }
            last = i;
            i = entry.next;
        }
        None
    }

    /// Removes `key`; returns whether it was present.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized,
        C: KeyComparer<Q>,
    {
        self.take(key).is_some()
    }
}

impl<K, V, C> ChainedHashMap<K, V, C>
where
    C: KeyComparer<K>,
{
    /// Builds a map holding every pair of `source`, in source order.
    ///
    /// Fails with [`Error::DuplicateKey`] if the source repeats a key.
    pub fn from_source<I>(source: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
        C: Default,
    {
        Self::from_source_with_comparer(source, C::default())
    }

    pub fn from_source_with_comparer<I>(source: I, comparer: C) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let source = source.into_iter();
        let (hint, _) = source.size_hint();
        let mut map = Self::with_capacity_and_comparer(hint, comparer)?;
        for (key, value) in source {
            map.add(key, value)?;
        }
        Ok(map)
    }

    /// Inserts a new pair; fails with [`Error::DuplicateKey`] and leaves the
    /// map untouched if `key` is already present.
    pub fn add(&mut self, key: K, value: V) -> Result<(), Error> {
        self.insert_entry(key, value, false).map(|_| ())
    }

    /// Inserts or overwrites; returns the previous value on overwrite.
    ///
    /// Fails with [`Error::CapacityOverflow`] if a new key needs the table to
    /// grow past `MAX_PRIME_ARRAY_LENGTH`.
    pub fn try_set(&mut self, key: K, value: V) -> Result<Option<V>, Error> {
        self.insert_entry(key, value, true)
    }

    /// Inserts or overwrites; returns the previous value on overwrite.
    ///
    /// # Panics
    ///
    /// Panics if the table cannot grow any further. Use [`try_set`](Self::try_set)
    /// to handle that case.
    pub fn set(&mut self, key: K, value: V) -> Option<V> {
        match self.try_set(key, value) {
            Ok(prev) => prev,
            Err(e) => panic!("{e}"),
        }
    }

    fn insert_entry(&mut self, key: K, value: V, overwrite: bool) -> Result<Option<V>, Error> {
        if self.buckets.is_empty() {
            self.initialize(0)?;
        }
        let hash = masked_hash(&self.comparer, &key);
        let mut target = bucket_of(hash, self.buckets.len());
        let mut collisions = 0usize;
        let mut i = self.buckets[target];
        while i >= 0 {
            let entry = &mut self.entries[i as usize];
            if entry.hash_code == hash {
                if let Some((k, v)) = entry.pair.as_mut() {
                    if self.comparer.equals(k, &key) {
                        if !overwrite {
                            return Err(Error::DuplicateKey);
                        }
                        let old = core::mem::replace(v, value);
                        self.bump_version();
                        return Ok(Some(old));
                    }
                }
            }
            collisions += 1;
            i = entry.next;
        }
        if collisions > HASH_COLLISION_THRESHOLD && tracing::enabled!(tracing::Level::WARN) {
            tracing::warn!(
                collisions,
                buckets = self.buckets.len(),
                "long hash chain on insert"
            );
        }

        let index = if self.free_count > 0 {
            let index = self.free_list as usize;
            self.free_list = self.entries[index].next;
            self.free_count -= 1;
            index
        } else {
            if self.entries.len() == self.buckets.len() {
                self.grow()?;
                target = bucket_of(hash, self.buckets.len());
            }
            self.entries.push(Entry {
                hash_code: NIL,
                next: NIL,
                pair: None,
            });
            self.entries.len() - 1
        };

        let entry = &mut self.entries[index];
        entry.hash_code = hash;
        entry.next = self.buckets[target];
        entry.pair = Some((key, value));
        self.buckets[target] = index as i32;
        self.bump_version();
        Ok(None)
    }

    fn grow(&mut self) -> Result<(), Error> {
        let count = i32::try_from(self.entries.len()).map_err(|_| Error::CapacityOverflow {
            requested: self.entries.len(),
        })?;
        let new_size = primes::expand_prime(count)? as usize;
        self.resize(new_size, false);
        Ok(())
    }

    /// Re-threads every live entry into `new_size` buckets. Slot indices are
    /// preserved, so the free list stays valid without being touched.
    fn resize(&mut self, new_size: usize, force_new_hash_codes: bool) {
        let old_size = self.buckets.len();
        self.entries
            .reserve_exact(new_size.saturating_sub(self.entries.len()));
        if force_new_hash_codes {
            for entry in self.entries.iter_mut() {
                if entry.hash_code >= 0 {
                    if let Some((k, _)) = &entry.pair {
                        entry.hash_code = masked_hash(&self.comparer, k);
                    }
                }
            }
        }
        let mut buckets = vec![NIL; new_size];
        for (i, entry) in self.entries.iter_mut().enumerate() {
            if entry.hash_code >= 0 {
                let bucket = bucket_of(entry.hash_code, new_size);
                entry.next = buckets[bucket];
                buckets[bucket] = i as i32;
            }
        }
        self.buckets = buckets;
        if tracing::enabled!(tracing::Level::DEBUG) {
            tracing::debug!(
                old_size,
                new_size,
                live = self.len(),
                rehashed = force_new_hash_codes,
                "table resized"
            );
        }
    }

    /// Swaps in `comparer` and recomputes every stored hash at the current
    /// table size. The new comparer must agree with the old one on equality.
    pub fn rehash_with(&mut self, comparer: C) {
        self.comparer = comparer;
        if !self.buckets.is_empty() {
            self.resize(self.buckets.len(), true);
        }
    }
}

impl<K, V, C> Clone for ChainedHashMap<K, V, C>
where
    K: Clone,
    V: Clone,
    C: Clone,
{
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets.clone(),
            entries: self.entries.clone(),
            free_list: self.free_list,
            free_count: self.free_count,
            version: self.version,
            // A clone is a distinct map for cursor ownership checks.
            id: NEXT_MAP_ID.fetch_add(1, Ordering::Relaxed),
            comparer: self.comparer.clone(),
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for ChainedHashMap<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K, V, C, Q> Index<&Q> for ChainedHashMap<K, V, C>
where
    K: Borrow<Q>,
    Q: ?Sized,
    C: KeyComparer<Q>,
{
    type Output = V;

    /// Panics with the [`Error::KeyNotFound`] message if `key` is absent.
    fn index(&self, key: &Q) -> &V {
        match self.value_of(key) {
            Ok(v) => v,
            Err(e) => panic!("{e}"),
        }
    }
}

/// Later pairs overwrite earlier ones. Panics on capacity overflow, like [`ChainedHashMap::set`].
impl<K, V, C> Extend<(K, V)> for ChainedHashMap<K, V, C>
where
    C: KeyComparer<K>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.set(key, value);
        }
    }
}

impl<K, V, C> FromIterator<(K, V)> for ChainedHashMap<K, V, C>
where
    C: KeyComparer<K> + Default,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::with_comparer(C::default());
        map.extend(iter);
        map
    }
}

impl<'a, K, V, C> IntoIterator for &'a ChainedHashMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
impl<K, V, C> ChainedHashMap<K, V, C> {
    /// Walks every bucket chain and the free list, checking each live entry
    /// is reachable exactly once from the bucket its hash selects.
    pub(crate) fn assert_consistent(&self) {
        let mut seen = std::collections::BTreeSet::new();
        for (b, &head) in self.buckets.iter().enumerate() {
            let mut i = head;
            while i >= 0 {
                let e = &self.entries[i as usize];
                assert!(e.hash_code >= 0, "free slot linked into a chain");
                assert_eq!(bucket_of(e.hash_code, self.buckets.len()), b);
                assert!(seen.insert(i), "entry linked twice");
                i = e.next;
            }
        }
        assert_eq!(seen.len(), self.len());
        let mut free = 0;
        let mut i = self.free_list;
        while i >= 0 {
            let e = &self.entries[i as usize];
            assert_eq!(e.hash_code, NIL);
            assert!(e.pair.is_none());
            free += 1;
            i = e.next;
        }
        assert_eq!(free, self.free_count);
        assert!(self.entries.len() <= self.buckets.len());
    }

    pub(crate) fn free_count(&self) -> usize {
        self.free_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string_map() -> ChainedHashMap<String, String> {
        ChainedHashMap::new()
    }

    /// Collision-forcing comparer: every key hashes to the same bucket.
    #[derive(Clone, Default)]
    struct ConstComparer;
    impl KeyComparer<str> for ConstComparer {
        fn hash(&self, _key: &str) -> u64 {
            0
        }
        fn equals(&self, a: &str, b: &str) -> bool {
            a == b
        }
    }
    impl KeyComparer<String> for ConstComparer {
        fn hash(&self, _key: &String) -> u64 {
            0
        }
        fn equals(&self, a: &String, b: &String) -> bool {
            a == b
        }
    }

    /// Invariant: tables stay unallocated until the first insert, which sizes
    /// them with the first table prime.
    #[test]
    fn lazy_allocation() {
        let mut m = string_map();
        assert_eq!(m.capacity(), 0);
        assert!(m.find("x").is_none());
        assert!(!m.remove("x"));
        m.add("a".into(), "b".into()).unwrap();
        assert_eq!(m.capacity(), 3);
    }

    /// Invariant: capacity 10 is rounded up to the prime 11.
    #[test]
    fn with_capacity_rounds_to_prime() {
        let m: ChainedHashMap<String, String> = ChainedHashMap::with_capacity(10).unwrap();
        assert_eq!(m.capacity(), 11);
        let m: ChainedHashMap<String, String> = ChainedHashMap::with_capacity(0).unwrap();
        assert_eq!(m.capacity(), 0);
    }

    #[test]
    fn with_capacity_rejects_unrepresentable_sizes() {
        let r: Result<ChainedHashMap<String, String>, _> =
            ChainedHashMap::with_capacity(usize::MAX);
        assert!(matches!(r, Err(Error::CapacityOverflow { .. })));
    }

    /// Invariant: duplicate `add` fails and leaves count, value and version unchanged.
    #[test]
    fn duplicate_add_rejected_without_side_effects() {
        let mut m = string_map();
        m.add("dup".into(), "1".into()).unwrap();
        let version = m.version();
        let hwm = m.high_water_mark();
        assert_eq!(m.add("dup".into(), "2".into()), Err(Error::DuplicateKey));
        assert_eq!(m.len(), 1);
        assert_eq!(m.version(), version);
        assert_eq!(m.high_water_mark(), hwm);
        assert_eq!(m.get("dup").map(String::as_str), Some("1"));
    }

    /// Invariant: overwriting keeps the slot but still bumps the version.
    #[test]
    fn set_overwrites_in_place_and_versions() {
        let mut m = string_map();
        assert_eq!(m.set("k".into(), "1".into()), None);
        let slot = m.find("k").unwrap();
        let version = m.version();
        assert_eq!(m.set("k".into(), "2".into()), Some("1".to_string()));
        assert_eq!(m.find("k"), Some(slot));
        assert_eq!(m.version(), version + 1);
        assert_eq!(m.len(), 1);
        assert_eq!(m["k"], "2");
    }

    /// Invariant: a removed slot is recycled before the entry array grows.
    #[test]
    fn free_list_reuse() {
        let mut m = string_map();
        m.add("a".into(), "1".into()).unwrap();
        m.add("b".into(), "2".into()).unwrap();
        let slot_a = m.find("a").unwrap();
        assert!(m.remove("a"));
        assert_eq!(m.free_count, 1);
        assert_eq!(m.free_list, slot_a as i32);
        m.add("c".into(), "3".into()).unwrap();
        assert_eq!(m.high_water_mark(), 2);
        assert_eq!(m.find("c"), Some(slot_a));
        assert_eq!(m.free_count, 0);
        assert_eq!(m.free_list, NIL);
        assert_eq!(m.len(), 2);
        m.assert_consistent();
    }

    /// Invariant: free slots are reused most-recently-freed first.
    #[test]
    fn free_list_is_lifo() {
        let mut m = string_map();
        for k in ["a", "b", "c"] {
            m.add(k.into(), k.into()).unwrap();
        }
        let (sa, sc) = (m.find("a").unwrap(), m.find("c").unwrap());
        m.remove("a");
        m.remove("c");
        m.add("x".into(), "x".into()).unwrap();
        m.add("y".into(), "y".into()).unwrap();
        assert_eq!(m.find("x"), Some(sc));
        assert_eq!(m.find("y"), Some(sa));
        m.assert_consistent();
    }

    /// Invariant: growth follows `expand_prime` and every entry stays reachable.
    #[test]
    fn resize_grows_through_prime_sizes() {
        let mut m: ChainedHashMap<String, usize> = ChainedHashMap::new();
        let mut sizes = vec![];
        for i in 0..200 {
            m.add(format!("k{i}"), i).unwrap();
            if sizes.last() != Some(&m.capacity()) {
                sizes.push(m.capacity());
            }
        }
        assert_eq!(sizes, vec![3, 7, 17, 37, 89, 197, 431]);
        for i in 0..200 {
            assert_eq!(m.get(format!("k{i}").as_str()), Some(&i));
        }
        m.assert_consistent();
    }

    /// Invariant: freed slots survive a resize and remain on the free list.
    #[test]
    fn resize_preserves_free_list() {
        let mut m: ChainedHashMap<String, usize> = ChainedHashMap::with_capacity(3).unwrap();
        for i in 0..3 {
            m.add(format!("k{i}"), i).unwrap();
        }
        m.remove("k1");
        // Reuses the freed slot, so the table is full again without growing.
        m.add("k3".into(), 3).unwrap();
        assert_eq!(m.capacity(), 3);
        m.remove("k0");
        m.add("k4".into(), 4).unwrap();
        m.add("k5".into(), 5).unwrap();
        assert_eq!(m.capacity(), 7);
        m.remove("k2");
        m.add("k6".into(), 6).unwrap();
        m.add("k7".into(), 7).unwrap();
        assert_eq!(m.len(), 5);
        m.assert_consistent();
        for k in ["k3", "k4", "k5", "k6", "k7"] {
            assert!(m.contains_key(k), "{k} missing");
        }
    }

    /// Invariant: removal unlinks correctly from head, middle and tail of one chain.
    #[test]
    fn removal_within_single_chain() {
        let mut m: ChainedHashMap<String, i32, ConstComparer> =
            ChainedHashMap::with_comparer(ConstComparer);
        for (i, k) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            m.add((*k).to_string(), i as i32).unwrap();
        }
        assert!(m.remove("c"));
        m.assert_consistent();
        assert!(m.remove("e"));
        m.assert_consistent();
        assert!(m.remove("a"));
        m.assert_consistent();
        assert!(!m.remove("a"));
        assert_eq!(m.get("b"), Some(&1));
        assert_eq!(m.get("d"), Some(&3));
        assert_eq!(m.len(), 2);
    }

    /// Invariant: clear keeps the allocation, empties everything and bumps the
    /// version once; a second clear is a no-op.
    #[test]
    fn clear_is_idempotent() {
        let mut m = string_map();
        for k in ["a", "c", "d"] {
            m.add(k.into(), k.into()).unwrap();
        }
        m.remove("c");
        let cap = m.capacity();
        let v0 = m.version();
        m.clear();
        assert_eq!(m.version(), v0 + 1);
        assert_eq!(m.len(), 0);
        assert_eq!(m.high_water_mark(), 0);
        assert_eq!(m.free_list, NIL);
        assert_eq!(m.capacity(), cap);
        m.clear();
        assert_eq!(m.version(), v0 + 1);
        assert!(!m.contains_key("a"));
        m.assert_consistent();
    }

    /// Invariant: clear is keyed on the logical size; with only freed slots
    /// left it neither bumps the version nor drops the free list.
    #[test]
    fn clear_with_only_free_slots_is_noop() {
        let mut m = string_map();
        m.add("a".into(), "1".into()).unwrap();
        m.add("b".into(), "2".into()).unwrap();
        m.remove("a");
        m.remove("b");
        let v0 = m.version();
        m.clear();
        assert_eq!(m.version(), v0);
        assert_eq!(m.free_count(), 2);
        assert_eq!(m.high_water_mark(), 2);
        m.assert_consistent();
        m.add("c".into(), "3".into()).unwrap();
        assert_eq!(m.high_water_mark(), 2);
    }

    #[test]
    fn clear_on_fresh_map_is_noop() {
        let mut m = string_map();
        m.clear();
        assert_eq!(m.version(), 0);
        assert_eq!(m.capacity(), 0);
    }

    /// Invariant: rehashing with a new comparer keeps every key reachable and
    /// does not count as a mutation.
    #[test]
    fn rehash_with_keeps_entries() {
        let mut m: ChainedHashMap<String, i32> = ChainedHashMap::new();
        for i in 0..50 {
            m.add(format!("k{i}"), i).unwrap();
        }
        m.remove("k7");
        let version = m.version();
        m.rehash_with(DefaultComparer::default());
        assert_eq!(m.version(), version);
        m.assert_consistent();
        for i in 0..50 {
            assert_eq!(m.get(format!("k{i}").as_str()).is_some(), i != 7);
        }
    }

    #[test]
    fn stored_hashes_are_non_negative() {
        let mut m: ChainedHashMap<u64, u64> = ChainedHashMap::new();
        for i in 0u64..100 {
            m.add(i.wrapping_mul(0x9E37_79B9_7F4A_7C15), i).unwrap();
        }
        assert!(m.entries.iter().all(|e| e.hash_code >= 0));
    }

    /// Invariant: value lookups use the value type's equality and skip free slots.
    #[test]
    fn contains_value_scans_live_entries() {
        let mut m = string_map();
        m.add("e".into(), "f".into()).unwrap();
        m.add("g".into(), "h".into()).unwrap();
        assert!(m.contains_value("f"));
        m.remove("e");
        assert!(!m.contains_value("f"));
        assert!(m.contains_value(&"h".to_string()));
    }

    #[test]
    fn value_of_reports_missing_keys() {
        let mut m = string_map();
        m.add("a".into(), "b".into()).unwrap();
        assert_eq!(m.value_of("a").map(String::as_str), Ok("b"));
        assert_eq!(m.value_of("z"), Err(Error::KeyNotFound));
    }

    #[test]
    #[should_panic(expected = "not present")]
    fn index_panics_on_missing_key() {
        let m = string_map();
        let _ = &m["missing"];
    }

    #[test]
    fn get_mut_updates_value() {
        let mut m = string_map();
        m.add("a".into(), "b".into()).unwrap();
        let version = m.version();
        m.get_mut("a").unwrap().push('!');
        assert_eq!(m["a"], "b!");
        assert_eq!(m.version(), version + 1);
        assert!(m.get_mut("missing").is_none());
        assert_eq!(m.version(), version + 1);
    }

    /// Invariant: try_set reports the replaced value and versions like set.
    #[test]
    fn try_set_inserts_and_overwrites() {
        let mut m = string_map();
        assert_eq!(m.try_set("k".into(), "1".into()), Ok(None));
        let version = m.version();
        assert_eq!(m.try_set("k".into(), "2".into()), Ok(Some("1".to_string())));
        assert_eq!(m.version(), version + 1);
        assert_eq!(m.len(), 1);
    }

    #[test]
    fn clone_is_independent() {
        let mut m = string_map();
        m.add("a".into(), "1".into()).unwrap();
        let mut c = m.clone();
        assert_ne!(c.id(), m.id());
        c.set("a".into(), "2".into());
        c.add("b".into(), "3".into()).unwrap();
        assert_eq!(m["a"], "1");
        assert!(!m.contains_key("b"));
        assert_eq!(c.len(), 2);
    }

    #[test]
    fn debug_formats_as_map() {
        let mut m: ChainedHashMap<&str, i32> = ChainedHashMap::new();
        m.add("a", 1).unwrap();
        assert_eq!(format!("{m:?}"), r#"{"a": 1}"#);
    }
}
