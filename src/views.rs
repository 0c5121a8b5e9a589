//! Keys/values projections over the entry array.
//!
//! Both views share one implementation parameterized by a [`Projection`]
//! marker. A view offers two traversals:
//! - `iter()`: a borrowing iterator. The borrow keeps the map immutable for
//!   the iterator's lifetime, so no version check is needed.
//! - `cursor()`: a detached [`Cursor`] that holds no borrow. Each step is
//!   handed the map and fails fast if the map changed since the cursor was
//!   created (or last reset).

use crate::chained_hash_map::{ChainedHashMap, Entry};
use crate::comparer::DefaultComparer;
use crate::error::Error;
use core::fmt;
use core::iter::FusedIterator;
use core::marker::PhantomData;

/// Selects which half of a live entry a view yields.
pub trait Projection<K, V> {
    type Output;
    fn project<'a>(key: &'a K, value: &'a V) -> &'a Self::Output;
}

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct KeyProjection;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct ValueProjection;

impl<K, V> Projection<K, V> for KeyProjection {
    type Output = K;
    #[inline]
    fn project<'a>(key: &'a K, _value: &'a V) -> &'a K {
        key
    }
}

impl<K, V> Projection<K, V> for ValueProjection {
    type Output = V;
    #[inline]
    fn project<'a>(_key: &'a K, value: &'a V) -> &'a V {
        value
    }
}

/// Iterator over live `(&K, &V)` pairs in ascending slot order.
pub struct Iter<'a, K, V> {
    entries: core::slice::Iter<'a, Entry<K, V>>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(crate) fn new(entries: &'a [Entry<K, V>], live: usize) -> Self {
        Self {
            entries: entries.iter(),
            remaining: live,
        }
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        for entry in self.entries.by_ref() {
            if let Some(pair) = entry.live() {
                self.remaining -= 1;
                return Some(pair);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            remaining: self.remaining,
        }
    }
}

/// Projected iterator yielded by [`View::iter`].
pub struct ViewIter<'a, K, V, P> {
    inner: Iter<'a, K, V>,
    _projection: PhantomData<P>,
}

impl<'a, K, V, P> Iterator for ViewIter<'a, K, V, P>
where
    P: Projection<K, V>,
    P::Output: 'a,
{
    type Item = &'a P::Output;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, v)| P::project(k, v))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, K, V, P> ExactSizeIterator for ViewIter<'a, K, V, P>
where
    P: Projection<K, V>,
    P::Output: 'a,
{
}

impl<'a, K, V, P> FusedIterator for ViewIter<'a, K, V, P>
where
    P: Projection<K, V>,
    P::Output: 'a,
{
}

impl<K, V, P> Clone for ViewIter<'_, K, V, P> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _projection: PhantomData,
        }
    }
}

/// Read-only projection of a map. Holds no state of its own.
pub struct View<'a, K, V, C, P> {
    map: &'a ChainedHashMap<K, V, C>,
    _projection: PhantomData<P>,
}

pub type Keys<'a, K, V, C = DefaultComparer> = View<'a, K, V, C, KeyProjection>;
pub type Values<'a, K, V, C = DefaultComparer> = View<'a, K, V, C, ValueProjection>;

impl<'a, K, V, C, P> View<'a, K, V, C, P> {
    pub(crate) fn new(map: &'a ChainedHashMap<K, V, C>) -> Self {
        Self {
            map,
            _projection: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> ViewIter<'a, K, V, P> {
        ViewIter {
            inner: self.map.iter(),
            _projection: PhantomData,
        }
    }

    /// A fresh detached traversal positioned before the first element.
    pub fn cursor(&self) -> Cursor<P> {
        Cursor::new(self.map)
    }

    /// Whether both views project the same map instance.
    pub fn same_map(&self, other: &Self) -> bool {
        core::ptr::eq(self.map, other.map)
    }
}

impl<K, V, C, P> Clone for View<'_, K, V, C, P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V, C, P> Copy for View<'_, K, V, C, P> {}

impl<'a, K, V, C, P> IntoIterator for View<'a, K, V, C, P>
where
    P: Projection<K, V>,
    P::Output: 'a,
{
    type Item = &'a P::Output;
    type IntoIter = ViewIter<'a, K, V, P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, K, V, C, P> fmt::Debug for View<'a, K, V, C, P>
where
    P: Projection<K, V>,
    P::Output: fmt::Debug + 'a,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Position {
    NotStarted,
    At(usize),
    Ended,
}

/// Detached, restartable traversal over one map's live entries.
///
/// Captures the map's identity and version at creation. Every operation
/// takes the map again and fails with [`Error::WrongMap`] for a different
/// map or [`Error::VersionMismatch`] once the map has been mutated.
#[derive(Clone, Debug)]
pub struct Cursor<P> {
    map_id: u64,
    version: u64,
    position: Position,
    _projection: PhantomData<P>,
}

pub type KeyCursor = Cursor<KeyProjection>;
pub type ValueCursor = Cursor<ValueProjection>;

impl<P> Cursor<P> {
    pub(crate) fn new<K, V, C>(map: &ChainedHashMap<K, V, C>) -> Self {
        Self {
            map_id: map.id(),
            version: map.version(),
            position: Position::NotStarted,
            _projection: PhantomData,
        }
    }

    fn check<K, V, C>(&self, map: &ChainedHashMap<K, V, C>) -> Result<(), Error> {
        if map.id() != self.map_id {
            return Err(Error::WrongMap);
        }
        if map.version() != self.version {
            return Err(Error::VersionMismatch);
        }
        Ok(())
    }

    /// Steps to the next live slot. Returns `Ok(false)` once exhausted.
    pub fn move_next<K, V, C>(&mut self, map: &ChainedHashMap<K, V, C>) -> Result<bool, Error> {
        self.check(map)?;
        let start = match self.position {
            Position::NotStarted => 0,
            Position::At(slot) => slot + 1,
            Position::Ended => return Ok(false),
        };
        let entries = map.entries();
        for slot in start..entries.len() {
            if entries[slot].hash_code >= 0 {
                self.position = Position::At(slot);
                return Ok(true);
            }
        }
        self.position = Position::Ended;
        Ok(false)
    }

    /// Element under the cursor; [`Error::NoCurrent`] before the first
    /// successful `move_next` or after exhaustion.
    pub fn current<'m, K, V, C>(
        &self,
        map: &'m ChainedHashMap<K, V, C>,
    ) -> Result<&'m P::Output, Error>
    where
        P: Projection<K, V>,
        P::Output: 'm,
    {
        self.check(map)?;
        match self.position {
            Position::At(slot) => map.entries()[slot]
                .live()
                .map(|(k, v)| P::project(k, v))
                .ok_or(Error::NoCurrent),
            Position::NotStarted | Position::Ended => Err(Error::NoCurrent),
        }
    }

    /// `move_next` followed by `current`; `Ok(None)` once exhausted.
    pub fn advance<'m, K, V, C>(
        &mut self,
        map: &'m ChainedHashMap<K, V, C>,
    ) -> Result<Option<&'m P::Output>, Error>
    where
        P: Projection<K, V>,
        P::Output: 'm,
    {
        if self.move_next(map)? {
            self.current(map).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Rewinds to before the first element. The version must still match;
    /// a stale cursor cannot be revived.
    pub fn reset<K, V, C>(&mut self, map: &ChainedHashMap<K, V, C>) -> Result<(), Error> {
        self.check(map)?;
        self.position = Position::NotStarted;
        Ok(())
    }

    /// True once `move_next` has been called since creation or the last reset.
    pub fn is_started(&self) -> bool {
        self.position != Position::NotStarted
    }

    /// True after `move_next` has run past the last live slot.
    pub fn is_finished(&self) -> bool {
        self.position == Position::Ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ChainedHashMap<String, String> {
        let mut m = ChainedHashMap::new();
        for (k, v) in [("a", "1"), ("b", "2"), ("c", "3")] {
            m.add(k.to_string(), v.to_string()).unwrap();
        }
        m
    }

    /// Invariant: keys and values come out in slot order and skip freed slots.
    #[test]
    fn views_follow_slot_order() {
        let mut m = sample();
        m.remove("b");
        let keys: Vec<&str> = m.keys().iter().map(String::as_str).collect();
        let values: Vec<&str> = m.values().into_iter().map(String::as_str).collect();
        assert_eq!(keys, ["a", "c"]);
        assert_eq!(values, ["1", "3"]);
        assert_eq!(m.keys().iter().len(), 2);
    }

    /// Invariant: reading before the first step and after the last fails.
    #[test]
    fn current_outside_window_fails() {
        let m = sample();
        let mut c = m.keys().cursor();
        assert_eq!(c.current(&m), Err(Error::NoCurrent));
        while c.move_next(&m).unwrap() {
            assert!(c.current(&m).is_ok());
        }
        assert!(c.is_finished());
        assert_eq!(c.current(&m), Err(Error::NoCurrent));
        assert_eq!(c.move_next(&m), Ok(false));
    }

    /// Invariant: any mutation after creation fails the next step.
    #[test]
    fn mutation_invalidates_cursor() {
        let mut m = sample();
        let mut c = m.values().cursor();
        assert_eq!(c.move_next(&m), Ok(true));
        m.set("a".into(), "changed".into());
        assert_eq!(c.move_next(&m), Err(Error::VersionMismatch));
        assert_eq!(c.current(&m), Err(Error::VersionMismatch));
        assert_eq!(c.reset(&m), Err(Error::VersionMismatch));
    }

    /// Invariant: a failed removal and a duplicate add are not mutations.
    #[test]
    fn rejected_operations_keep_cursor_valid() {
        let mut m = sample();
        let mut c = m.keys().cursor();
        assert!(!m.remove("zzz"));
        assert!(m.add("a".into(), "x".into()).is_err());
        assert_eq!(c.advance(&m).unwrap().map(String::as_str), Some("a"));
    }

    #[test]
    fn reset_rewinds() {
        let m = sample();
        let mut c = m.keys().cursor();
        let first: Vec<String> = std::iter::from_fn(|| c.advance(&m).unwrap().cloned()).collect();
        assert!(c.is_finished());
        c.reset(&m).unwrap();
        assert!(!c.is_started());
        let second: Vec<String> = std::iter::from_fn(|| c.advance(&m).unwrap().cloned()).collect();
        assert_eq!(first, second);
        assert_eq!(first, ["a", "b", "c"]);
    }

    #[test]
    fn cursor_rejects_foreign_map() {
        let m = sample();
        let other = sample();
        let mut c = m.keys().cursor();
        assert_eq!(c.move_next(&other), Err(Error::WrongMap));
    }

    #[test]
    fn views_of_same_map_are_equivalent() {
        let m = sample();
        let other = sample();
        assert!(m.keys().same_map(&m.keys()));
        assert!(!m.keys().same_map(&other.keys()));
        assert_eq!(format!("{:?}", m.values()), r#"["1", "2", "3"]"#);
    }

    #[test]
    fn empty_map_cursor_ends_immediately() {
        let m: ChainedHashMap<String, String> = ChainedHashMap::new();
        let mut c = m.keys().cursor();
        assert_eq!(c.move_next(&m), Ok(false));
        assert_eq!(c.current(&m), Err(Error::NoCurrent));
    }
}
