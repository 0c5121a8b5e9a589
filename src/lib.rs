//! chained-hashmap: a single-threaded associative array with separate
//! chaining, prime-sized bucket tables, slot reuse and fail-fast cursors.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: amortized O(1) insert/lookup/remove over a flat, index-addressed
//!   entry array, with iteration order equal to slot order.
//! - Layers:
//!   - primes: picks bucket counts from a fixed ascending prime table, or by
//!     trial division past its end; computes the next size on growth.
//!   - ChainedHashMap<K, V, C>: the storage core. A bucket array of chain
//!     heads, an entry array threaded into chains by `next` indices, and a
//!     free list threaded through removed slots by the same field.
//!   - views: `Keys`/`Values` projections sharing one generic traversal,
//!     either borrowing (`iter`) or detached (`Cursor`).
//!
//! Constraints
//! - Single-threaded, single owner. No locks, no atomics on the hot path.
//! - Slots are never moved once assigned; resize copies the entry array
//!   verbatim and only re-threads bucket chains.
//! - Tables are allocated lazily and never shrink; `clear` keeps them.
//! - Stored hash codes are masked to 31 bits; `-1` marks a free slot.
//!
//! Mutation versioning
//! - Insert, overwrite (including a `get_mut` hit), remove and a non-empty
//!   clear bump a version counter.
//!   Failed operations (duplicate add, absent remove) do not.
//! - Borrowing iterators cannot observe mutation; the borrow checker
//!   forbids it. Detached cursors re-check the version on every step and
//!   fail with `Error::VersionMismatch` after any mutation.
//!
//! Comparers
//! - A `KeyComparer<Q>` supplies hashing and equality for keys. The default
//!   wraps the key's own `Hash + Eq` with hashbrown's default hasher; custom
//!   comparers (for example case-insensitive) plug in at construction.
//! - `contains_value` compares values with `V: PartialEq`, not the comparer.
//!
//! Notes and non-goals
//! - No internal synchronization and no persistence.
//! - `StringMap` is the `String -> String` specialization.

mod chained_hash_map;
mod chained_hash_map_proptest;
pub mod comparer;
mod error;
mod pair;
pub mod primes;
mod views;

// Public surface
pub use chained_hash_map::{ChainedHashMap, HASH_COLLISION_THRESHOLD};
pub use comparer::{DefaultComparer, HashComparer, KeyComparer};
pub use error::{Error, ErrorKind};
pub use pair::KeyValuePair;
pub use views::{
    Cursor, Iter, KeyCursor, KeyProjection, Keys, Projection, ValueCursor, ValueProjection,
    Values, View, ViewIter,
};

/// String-keyed, string-valued map.
pub type StringMap = ChainedHashMap<String, String>;
