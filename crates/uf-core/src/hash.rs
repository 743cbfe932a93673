//! Hash functions for the rule index and the cookie journal
//!
//! Uses Murmur3 32-bit with two different seeds to create a 64-bit composite key.
//! Host-anchor lookups and journal keys use the 64-bit form; pattern tokens use a
//! single 32-bit pass.

/// 64-bit hash represented as two 32-bit parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Hash64 {
    pub lo: u32,
    pub hi: u32,
}

impl Hash64 {
    #[inline]
    pub const fn new(lo: u32, hi: u32) -> Self {
        Self { lo, hi }
    }

    /// Convert to a single u64 for use as a map key.
    #[inline]
    pub const fn to_u64(&self) -> u64 {
        ((self.hi as u64) << 32) | (self.lo as u64)
    }
}

const SEED_LO: u32 = 0x9e3779b9;
const SEED_HI: u32 = 0x85ebca6b;
const SEED_TOKEN: u32 = 0x811c9dc5;

/// Murmur3 32-bit hash.
#[inline]
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    let len = data.len();
    let mut h = seed;

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        h ^= scramble(k);
        h = h.rotate_left(13);
        h = h.wrapping_mul(5).wrapping_add(0xe6546b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let mut k: u32 = 0;
        for (i, &b) in tail.iter().enumerate() {
            k ^= (b as u32) << (8 * i);
        }
        h ^= scramble(k);
    }

    h ^= len as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;

    h
}

#[inline]
fn scramble(k: u32) -> u32 {
    k.wrapping_mul(0xcc9e2d51)
        .rotate_left(15)
        .wrapping_mul(0x1b873593)
}

/// Compute 64-bit hash as (lo, hi) pair using two Murmur3 passes.
#[inline]
pub fn hash64(data: &[u8]) -> Hash64 {
    Hash64 {
        lo: murmur3_32(data, SEED_LO),
        hi: murmur3_32(data, SEED_HI),
    }
}

/// Hash a hostname for the host-anchor table.
/// Lowercases the input so lookups are case-insensitive.
#[inline]
pub fn hash_domain(domain: &str) -> Hash64 {
    if domain.bytes().any(|b| b.is_ascii_uppercase()) {
        hash64(domain.to_ascii_lowercase().as_bytes())
    } else {
        hash64(domain.as_bytes())
    }
}

/// Compute a 32-bit hash for pattern and URL tokens.
/// Callers pass tokens already lowercased.
#[inline]
pub fn hash_token(token: &str) -> u32 {
    murmur3_32(token.as_bytes(), SEED_TOKEN)
}

/// Journal key for a cookie: name and domain hashed together.
///
/// The separator byte keeps `("ab", "c")` and `("a", "bc")` apart.
pub fn hash_cookie_key(name: &str, domain: &str) -> u64 {
    let mut buf = Vec::with_capacity(name.len() + domain.len() + 1);
    buf.extend_from_slice(name.as_bytes());
    buf.push(0);
    buf.extend_from_slice(domain.as_bytes());
    hash64(&buf).to_u64()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_murmur3_consistent() {
        assert_eq!(murmur3_32(b"example.com", 0), murmur3_32(b"example.com", 0));
    }

    #[test]
    fn test_murmur3_different_strings() {
        assert_ne!(murmur3_32(b"example.com", 0), murmur3_32(b"example.org", 0));
    }

    #[test]
    fn test_murmur3_different_seeds() {
        assert_ne!(murmur3_32(b"example.com", 0), murmur3_32(b"example.com", 1));
    }

    #[test]
    fn test_murmur3_tail_lengths_differ() {
        let hashes: Vec<u32> = (1..=8).map(|len| murmur3_32(&vec![b'a'; len], 0)).collect();
        for (i, a) in hashes.iter().enumerate() {
            for b in &hashes[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_hash_domain_case_insensitive() {
        assert_eq!(hash_domain("Example.COM"), hash_domain("example.com"));
    }

    #[test]
    fn test_cookie_key_separates_name_and_domain() {
        assert_ne!(hash_cookie_key("ab", "c"), hash_cookie_key("a", "bc"));
        assert_eq!(hash_cookie_key("sid", "example.org"), hash_cookie_key("sid", "example.org"));
        assert_ne!(hash_cookie_key("sid", "example.org"), hash_cookie_key("sid", ""));
    }
}
