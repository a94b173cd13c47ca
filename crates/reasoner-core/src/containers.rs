//! # Hashable Containers
//!
//! Mapping, sequence and set wrappers whose identity is a content digest.
//!
//! ## Hash Freshness
//!
//! No container caches its own hash. Every call to
//! [`StableHash::stable_digest`] recomputes from current contents, so a
//! mutation anywhere below a container (however deeply nested) is always
//! reflected the next time its identity is observed.
//!
//! A [`HashableSet`] records the digest of each element as it enters. Its
//! elements are never handed out mutably except through
//! [`HashableSet::for_each_mut`], which recomputes every recorded digest.
//!
//! ## Equality
//!
//! `PartialEq` on every container is digest equality.

use crate::hash::{Digest, StableHash, StableHasher};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::ops::{Deref, DerefMut};

// =============================================================================
// HASHABLE MAPPING
// =============================================================================

/// Key → value map with deterministic (sorted) iteration and an
/// order-independent identity.
#[derive(Debug, Clone)]
pub struct HashableMapping<K, V> {
    inner: BTreeMap<K, V>,
}

impl<K, V> Default for HashableMapping<K, V> {
    fn default() -> Self {
        Self {
            inner: BTreeMap::new(),
        }
    }
}

impl<K: Ord, V> HashableMapping<K, V> {
    /// Create an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.inner.get(key)
    }

    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        self.inner.get_mut(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.contains_key(key)
    }

    /// Insert a value, returning the one it replaced.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        self.inner.insert(key, value)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.inner.remove(key)
    }

    pub fn entry(&mut self, key: K) -> btree_map::Entry<'_, K, V> {
        self.inner.entry(key)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, K, V> {
        self.inner.iter()
    }

    pub fn iter_mut(&mut self) -> btree_map::IterMut<'_, K, V> {
        self.inner.iter_mut()
    }

    pub fn keys(&self) -> btree_map::Keys<'_, K, V> {
        self.inner.keys()
    }

    pub fn values(&self) -> btree_map::Values<'_, K, V> {
        self.inner.values()
    }

    pub fn values_mut(&mut self) -> btree_map::ValuesMut<'_, K, V> {
        self.inner.values_mut()
    }

    /// Key-union with `other`.
    ///
    /// Entries whose key already exists are folded in with `merge`; the rest
    /// are inserted as-is. Stops at the first merge error.
    pub fn merge_entries<E, I, F>(&mut self, other: I, mut merge: F) -> Result<(), E>
    where
        I: IntoIterator<Item = (K, V)>,
        F: FnMut(&K, &mut V, V) -> Result<(), E>,
    {
        for (key, value) in other {
            match self.inner.get_mut(&key) {
                Some(existing) => merge(&key, existing, value)?,
                None => {
                    self.inner.insert(key, value);
                }
            }
        }
        Ok(())
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for HashableMapping<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl<K, V> IntoIterator for HashableMapping<K, V> {
    type Item = (K, V);
    type IntoIter = btree_map::IntoIter<K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a, K, V> IntoIterator for &'a HashableMapping<K, V> {
    type Item = (&'a K, &'a V);
    type IntoIter = btree_map::Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl<K: StableHash, V: StableHash> StableHash for HashableMapping<K, V> {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        let digests = self
            .inner
            .iter()
            .map(|(key, value)| {
                let mut entry = StableHasher::new();
                key.stable_hash(&mut entry);
                value.stable_hash(&mut entry);
                entry.finish()
            })
            .collect();
        hasher.write_unordered(digests);
    }
}

impl<K: StableHash, V: StableHash> PartialEq for HashableMapping<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.stable_digest() == other.stable_digest()
    }
}

impl<K: StableHash, V: StableHash> Eq for HashableMapping<K, V> {}

impl<K: Serialize, V: Serialize> Serialize for HashableMapping<K, V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.serialize(serializer)
    }
}

impl<'de, K, V> Deserialize<'de> for HashableMapping<K, V>
where
    K: Deserialize<'de> + Ord,
    V: Deserialize<'de>,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        BTreeMap::deserialize(deserializer).map(|inner| Self { inner })
    }
}

// =============================================================================
// HASHABLE SEQUENCE
// =============================================================================

/// Ordered list whose identity depends on element order.
///
/// Dereferences to `Vec<V>` for full read/write access.
#[derive(Debug, Clone)]
pub struct HashableSequence<V> {
    inner: Vec<V>,
}

impl<V> Default for HashableSequence<V> {
    fn default() -> Self {
        Self { inner: Vec::new() }
    }
}

impl<V> HashableSequence<V> {
    /// Create an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take back the underlying vector.
    #[must_use]
    pub fn into_vec(self) -> Vec<V> {
        self.inner
    }
}

impl<V> From<Vec<V>> for HashableSequence<V> {
    fn from(inner: Vec<V>) -> Self {
        Self { inner }
    }
}

impl<V> Deref for HashableSequence<V> {
    type Target = Vec<V>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<V> DerefMut for HashableSequence<V> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}

impl<V> FromIterator<V> for HashableSequence<V> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl<V> IntoIterator for HashableSequence<V> {
    type Item = V;
    type IntoIter = std::vec::IntoIter<V>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.into_iter()
    }
}

impl<'a, V> IntoIterator for &'a HashableSequence<V> {
    type Item = &'a V;
    type IntoIter = std::slice::Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}

impl<V: StableHash> StableHash for HashableSequence<V> {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_ordered(self.inner.iter());
    }
}

impl<V: StableHash> PartialEq for HashableSequence<V> {
    fn eq(&self, other: &Self) -> bool {
        self.stable_digest() == other.stable_digest()
    }
}

impl<V: StableHash> Eq for HashableSequence<V> {}

impl<V: Serialize> Serialize for HashableSequence<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.inner.serialize(serializer)
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for HashableSequence<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::deserialize(deserializer).map(|inner| Self { inner })
    }
}

// =============================================================================
// HASHABLE SET
// =============================================================================

/// Unordered collection with no two elements sharing a digest.
///
/// Elements are kept in first-insertion order, which is also the order they
/// serialize in (as a JSON array). Identity ignores that order.
///
/// Each element's digest is recorded when it enters the set and indexed, so
/// membership checks do not rehash the set. Elements are only reachable
/// mutably through [`HashableSet::for_each_mut`], which recomputes them.
#[derive(Debug, Clone)]
pub struct HashableSet<V> {
    items: Vec<V>,
    digests: Vec<Digest>,
    index: BTreeMap<Digest, usize>,
}

impl<V> Default for HashableSet<V> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            digests: Vec::new(),
            index: BTreeMap::new(),
        }
    }
}

impl<V> HashableSet<V> {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, V> {
        self.items.iter()
    }

    /// Take the elements out, in insertion order.
    #[must_use]
    pub fn into_vec(self) -> Vec<V> {
        self.items
    }

    fn push(&mut self, digest: Digest, item: V) {
        self.index.insert(digest, self.items.len());
        self.digests.push(digest);
        self.items.push(item);
    }

    fn take_entries(&mut self) -> Vec<(Digest, V)> {
        self.index.clear();
        let digests = std::mem::take(&mut self.digests);
        let items = std::mem::take(&mut self.items);
        digests.into_iter().zip(items).collect()
    }

    fn rebuild_index(&mut self) {
        self.index = self
            .digests
            .iter()
            .enumerate()
            .map(|(position, digest)| (*digest, position))
            .collect();
    }
}

impl<V: StableHash> HashableSet<V> {
    pub fn contains(&self, value: &V) -> bool {
        self.index.contains_key(&value.stable_digest())
    }

    /// Element identity-equal to `value`, if any.
    pub fn find(&self, value: &V) -> Option<&V> {
        self.index
            .get(&value.stable_digest())
            .map(|&position| &self.items[position])
    }

    /// Insert `value` unless an identity-equal element is present.
    ///
    /// Returns `true` if the value was inserted.
    pub fn insert(&mut self, value: V) -> bool {
        let digest = value.stable_digest();
        if self.index.contains_key(&digest) {
            return false;
        }
        self.push(digest, value);
        true
    }

    /// Remove and return the element identity-equal to `value`.
    pub fn remove(&mut self, value: &V) -> Option<V> {
        let position = self.index.remove(&value.stable_digest())?;
        self.digests.remove(position);
        let removed = self.items.remove(position);
        self.rebuild_index();
        Some(removed)
    }

    pub fn retain<F: FnMut(&V) -> bool>(&mut self, mut f: F) {
        for (digest, item) in self.take_entries() {
            if f(&item) {
                self.push(digest, item);
            }
        }
    }

    /// Plain set union: incoming elements already present are dropped.
    pub fn extend<I: IntoIterator<Item = V>>(&mut self, other: I) {
        for item in other {
            self.insert(item);
        }
    }

    /// Set union that folds identity-equal elements together with `merge`.
    ///
    /// A merge may change an element's identity (for example by growing a
    /// binding set), which can make two elements equal; those are folded
    /// together too, until no two elements share a digest.
    pub fn union_with<E, I, F>(&mut self, other: I, mut merge: F) -> Result<(), E>
    where
        I: IntoIterator<Item = V>,
        F: FnMut(&mut V, V) -> Result<(), E>,
    {
        let mut collided = false;
        for item in other {
            let digest = item.stable_digest();
            collided |= self.absorb(digest, item, &mut merge)?;
        }
        while collided {
            collided = false;
            for (digest, item) in self.take_entries() {
                collided |= self.absorb(digest, item, &mut merge)?;
            }
        }
        Ok(())
    }

    /// Mutate every element in place, then drop elements that became
    /// identical to an earlier one.
    pub fn for_each_mut<F: FnMut(&mut V)>(&mut self, f: F) {
        self.items.iter_mut().for_each(f);
        self.index.clear();
        self.digests.clear();
        let items = std::mem::take(&mut self.items);
        self.extend(items);
    }

    /// Add one element, merging it into an identity-equal one if present.
    ///
    /// Returns `true` when the merge gave an element the digest of another
    /// element; the set then holds a duplicate until the caller re-absorbs.
    fn absorb<E, F>(&mut self, digest: Digest, item: V, merge: &mut F) -> Result<bool, E>
    where
        F: FnMut(&mut V, V) -> Result<(), E>,
    {
        let Some(&position) = self.index.get(&digest) else {
            self.push(digest, item);
            return Ok(false);
        };
        merge(&mut self.items[position], item)?;
        let updated = self.items[position].stable_digest();
        if updated == digest {
            return Ok(false);
        }
        self.index.remove(&digest);
        self.digests[position] = updated;
        match self.index.entry(updated) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(position);
                Ok(false)
            }
            btree_map::Entry::Occupied(_) => Ok(true),
        }
    }
}

impl<V: StableHash> FromIterator<V> for HashableSet<V> {
    fn from_iter<I: IntoIterator<Item = V>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<V> IntoIterator for HashableSet<V> {
    type Item = V;
    type IntoIter = std::vec::IntoIter<V>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, V> IntoIterator for &'a HashableSet<V> {
    type Item = &'a V;
    type IntoIter = std::slice::Iter<'a, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<V: StableHash> StableHash for HashableSet<V> {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_unordered(self.digests.clone());
    }
}

impl<V: StableHash> PartialEq for HashableSet<V> {
    fn eq(&self, other: &Self) -> bool {
        self.stable_digest() == other.stable_digest()
    }
}

impl<V: StableHash> Eq for HashableSet<V> {}

impl<V: Serialize> Serialize for HashableSet<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, V: Deserialize<'de> + StableHash> Deserialize<'de> for HashableSet<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<V>::deserialize(deserializer).map(|items| items.into_iter().collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
