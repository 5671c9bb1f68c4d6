use sha2::{Digest, Sha256};

/// Number of rollout buckets.
pub const BUCKET_COUNT: i32 = 100;

/// Deterministic rollout bucket in `0..100` for a flag/user pair.
///
/// SHA-256 of `"{flag_name}:{user_id}"`; the first four digest bytes are
/// read as a signed big-endian integer and reduced with floored modulo.
/// Existing bucket assignments depend on this exact byte interpretation.
pub fn bucket(flag_name: &str, user_id: &str) -> u8 {
    let mut hasher = Sha256::new();
    hasher.update(flag_name.as_bytes());
    hasher.update(b":");
    hasher.update(user_id.as_bytes());
    let digest = hasher.finalize();

    let prefix = i32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
    prefix.rem_euclid(BUCKET_COUNT) as u8
}
