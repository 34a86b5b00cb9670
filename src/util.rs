//! Common utility functions.
//!
//! Hashing helpers used by the user-id hash strategies.

/// FNV-1a 64-bit hash constants.
pub mod fnv64 {
    /// Offset basis for FNV-1a 64-bit hash.
    pub const OFFSET_BASIS: u64 = 0xcbf29ce484222325;
    /// Prime multiplier for FNV-1a 64-bit hash.
    pub const PRIME: u64 = 0x100000001b3;
}

/// Folds one byte into an FNV-1a 64-bit hash state.
#[inline(always)]
pub fn fnv1a_hash_u8(mut hash: u64, value: u8) -> u64 {
    hash ^= value as u64;
    hash.wrapping_mul(fnv64::PRIME)
}

/// Computes FNV-1a 64-bit hash for a byte sequence.
///
/// # Arguments
/// * `hash` - Initial hash state
/// * `bytes` - Input bytes to hash
#[inline]
pub fn fnv1a_hash_bytes(mut hash: u64, bytes: &[u8]) -> u64 {
    for &byte in bytes {
        hash = fnv1a_hash_u8(hash, byte);
    }
    hash
}

/// Lower-case hex encoding of a byte slice.
pub fn to_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        out.push(DIGITS[(byte >> 4) as usize] as char);
        out.push(DIGITS[(byte & 0x0f) as usize] as char);
    }
    out
}
