//! # Stable Hashing
//!
//! Deterministic, cross-process content digests for every value in the
//! message model.
//!
//! `std::hash::Hash` is deliberately not used for identity: the standard
//! hashers are seeded per process, so two services could never agree on an
//! edge key. Instead every hashable value writes a canonical, tagged,
//! length-prefixed byte stream into a BLAKE3 hasher.
//!
//! ## Canonical Encoding
//!
//! - Scalars are written with a one-byte type tag followed by a fixed-width
//!   or length-prefixed payload.
//! - Integral floats are written as integers, so `1` and `1.0` agree.
//! - Ordered containers write their length and then each element in order.
//! - Unordered containers (sets, JSON objects, mappings) write their length
//!   and then the digests of their elements, sorted. Insertion order can
//!   therefore never leak into an identity.

use std::fmt;

// =============================================================================
// ENCODING TAGS
// =============================================================================

const TAG_NONE: u8 = 0x00;
const TAG_STR: u8 = 0x01;
const TAG_BOOL: u8 = 0x02;
const TAG_INT: u8 = 0x03;
const TAG_UINT: u8 = 0x04;
const TAG_FLOAT: u8 = 0x05;
const TAG_SOME: u8 = 0x06;
const TAG_ORDERED: u8 = 0x07;
const TAG_UNORDERED: u8 = 0x08;
const TAG_STRUCT: u8 = 0x09;
const TAG_DIGEST: u8 = 0x0A;

// =============================================================================
// DIGEST
// =============================================================================

/// A 256-bit BLAKE3 content digest.
///
/// Equality of digests is the equality relation of the whole message model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Raw digest bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex of the first `bytes` bytes (clamped to 32).
    #[must_use]
    pub fn short_hex(&self, bytes: usize) -> String {
        let mut out = String::with_capacity(bytes.min(32) * 2);
        for byte in self.0.iter().take(bytes) {
            out.push_str(&format!("{:02x}", byte));
        }
        out
    }

    /// Full lowercase hex (64 characters).
    #[must_use]
    pub fn to_hex(&self) -> String {
        self.short_hex(32)
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// =============================================================================
// HASHER
// =============================================================================

/// Canonical byte sink over BLAKE3.
#[derive(Debug, Clone, Default)]
pub struct StableHasher {
    inner: blake3::Hasher,
}

impl StableHasher {
    /// Create a fresh hasher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Finish hashing. The hasher may keep being written to afterwards.
    #[must_use]
    pub fn finish(&self) -> Digest {
        Digest(*self.inner.finalize().as_bytes())
    }

    fn write_len(&mut self, len: usize) {
        self.inner.update(&(len as u64).to_le_bytes());
    }

    /// Mark the start of a named structure (entity type or enum variant).
    ///
    /// Two structures with identical field values but different tags never
    /// collide.
    pub fn write_tag(&mut self, tag: &str) {
        self.inner.update(&[TAG_STRUCT]);
        self.write_len(tag.len());
        self.inner.update(tag.as_bytes());
    }

    pub fn write_str(&mut self, value: &str) {
        self.inner.update(&[TAG_STR]);
        self.write_len(value.len());
        self.inner.update(value.as_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.inner.update(&[TAG_BOOL, u8::from(value)]);
    }

    pub fn write_i64(&mut self, value: i64) {
        self.inner.update(&[TAG_INT]);
        self.inner.update(&value.to_le_bytes());
    }

    /// Unsigned values that fit in `i64` share the signed encoding.
    pub fn write_u64(&mut self, value: u64) {
        if let Ok(signed) = i64::try_from(value) {
            self.write_i64(signed);
            return;
        }
        self.inner.update(&[TAG_UINT]);
        self.inner.update(&value.to_le_bytes());
    }

    /// Integral finite floats share the integer encoding; all NaNs collapse
    /// to one canonical NaN.
    pub fn write_f64(&mut self, value: f64) {
        if value.is_finite()
            && value.fract() == 0.0
            && value >= i64::MIN as f64
            && value < i64::MAX as f64
        {
            self.write_i64(value as i64);
            return;
        }
        let bits = if value.is_nan() {
            f64::NAN.to_bits()
        } else {
            value.to_bits()
        };
        self.inner.update(&[TAG_FLOAT]);
        self.inner.update(&bits.to_le_bytes());
    }

    pub fn write_none(&mut self) {
        self.inner.update(&[TAG_NONE]);
    }

    pub fn write_some<T: StableHash + ?Sized>(&mut self, value: &T) {
        self.inner.update(&[TAG_SOME]);
        value.stable_hash(self);
    }

    pub fn write_digest(&mut self, digest: &Digest) {
        self.inner.update(&[TAG_DIGEST]);
        self.inner.update(&digest.0);
    }

    /// Write a sequence whose order is part of its identity.
    pub fn write_ordered<'a, T, I>(&mut self, items: I)
    where
        T: StableHash + ?Sized + 'a,
        I: ExactSizeIterator<Item = &'a T>,
    {
        self.inner.update(&[TAG_ORDERED]);
        self.write_len(items.len());
        for item in items {
            item.stable_hash(self);
        }
    }

    /// Write a collection whose order is NOT part of its identity.
    ///
    /// Element digests are sorted before being written.
    pub fn write_unordered(&mut self, mut digests: Vec<Digest>) {
        digests.sort_unstable();
        self.inner.update(&[TAG_UNORDERED]);
        self.write_len(digests.len());
        for digest in &digests {
            self.inner.update(&digest.0);
        }
    }
}

// =============================================================================
// STABLEHASH TRAIT
// =============================================================================

/// Values with a deterministic, cross-process content identity.
///
/// Implementations choose which fields take part in identity; entity types
/// with mergeable extras (edges, sources, results, analyses) hash only their
/// identity fields.
pub trait StableHash {
    /// Write this value's canonical encoding into `hasher`.
    fn stable_hash(&self, hasher: &mut StableHasher);

    /// Digest of this value alone.
    fn stable_digest(&self) -> Digest {
        let mut hasher = StableHasher::new();
        self.stable_hash(&mut hasher);
        hasher.finish()
    }
}

impl StableHash for str {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_str(self);
    }
}

impl StableHash for String {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_str(self);
    }
}

impl StableHash for bool {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_bool(*self);
    }
}

impl StableHash for i64 {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_i64(*self);
    }
}

impl StableHash for u64 {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_u64(*self);
    }
}

impl StableHash for f64 {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_f64(*self);
    }
}

impl StableHash for Digest {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_digest(self);
    }
}

impl<T: StableHash + ?Sized> StableHash for &T {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        (**self).stable_hash(hasher);
    }
}

impl<T: StableHash> StableHash for Option<T> {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        match self {
            Some(value) => hasher.write_some(value),
            None => hasher.write_none(),
        }
    }
}

impl<T: StableHash> StableHash for Vec<T> {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        hasher.write_ordered(self.iter());
    }
}

/// JSON objects are unordered; arrays are ordered.
impl StableHash for serde_json::Value {
    fn stable_hash(&self, hasher: &mut StableHasher) {
        use serde_json::Value;

        match self {
            Value::Null => hasher.write_none(),
            Value::Bool(b) => hasher.write_bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    hasher.write_i64(i);
                } else if let Some(u) = n.as_u64() {
                    hasher.write_u64(u);
                } else {
                    hasher.write_f64(n.as_f64().unwrap_or(f64::NAN));
                }
            }
            Value::String(s) => hasher.write_str(s),
            Value::Array(items) => hasher.write_ordered(items.iter()),
            Value::Object(map) => {
                let digests = map
                    .iter()
                    .map(|(key, value)| {
                        let mut entry = StableHasher::new();
                        entry.write_str(key);
                        value.stable_hash(&mut entry);
                        entry.finish()
                    })
                    .collect();
                hasher.write_unordered(digests);
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn digest_is_deterministic() {
        assert_eq!("abc".stable_digest(), "abc".stable_digest());
        assert_ne!("abc".stable_digest(), "abd".stable_digest());
    }

    #[test]
    fn digest_matches_known_vector() {
        // Pins the canonical encoding: a change here re-keys every edge.
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[TAG_STR]);
        hasher.update(&3u64.to_le_bytes());
        hasher.update(b"abc");
        assert_eq!("abc".stable_digest().0, *hasher.finalize().as_bytes());
    }

    #[test]
    fn integral_float_matches_integer() {
        assert_eq!(1.0f64.stable_digest(), 1i64.stable_digest());
        assert_eq!((-0.0f64).stable_digest(), 0i64.stable_digest());
        assert_ne!(1.5f64.stable_digest(), 1i64.stable_digest());
    }

    #[test]
    fn unsigned_matches_signed_when_in_range() {
        assert_eq!(7u64.stable_digest(), 7i64.stable_digest());
        assert_ne!(u64::MAX.stable_digest(), (-1i64).stable_digest());
    }

    #[test]
    fn json_object_key_order_is_irrelevant() {
        let a: serde_json::Value =
            serde_json::from_str(r#"{"x": 1, "y": [1, 2]}"#).expect("parse");
        let b: serde_json::Value =
            serde_json::from_str(r#"{"y": [1, 2], "x": 1}"#).expect("parse");
        assert_eq!(a.stable_digest(), b.stable_digest());
    }

    #[test]
    fn json_array_order_matters() {
        assert_ne!(json!([1, 2]).stable_digest(), json!([2, 1]).stable_digest());
    }

    #[test]
    fn json_number_forms_agree() {
        assert_eq!(json!(2).stable_digest(), json!(2.0).stable_digest());
    }

    #[test]
    fn option_distinguishes_none_from_empty() {
        let none: Option<String> = None;
        let empty = Some(String::new());
        assert_ne!(none.stable_digest(), empty.stable_digest());
    }

    #[test]
    fn tags_separate_structures() {
        let mut a = StableHasher::new();
        a.write_tag("Node");
        a.write_str("x");
        let mut b = StableHasher::new();
        b.write_tag("Edge");
        b.write_str("x");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn unordered_ignores_order() {
        let d1 = "a".stable_digest();
        let d2 = "b".stable_digest();
        let mut h1 = StableHasher::new();
        h1.write_unordered(vec![d1, d2]);
        let mut h2 = StableHasher::new();
        h2.write_unordered(vec![d2, d1]);
        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn short_hex_length() {
        let digest = "edge".stable_digest();
        assert_eq!(digest.short_hex(6).len(), 12);
        assert_eq!(digest.to_hex().len(), 64);
        assert!(digest.to_hex().starts_with(&digest.short_hex(6)));
    }
}
