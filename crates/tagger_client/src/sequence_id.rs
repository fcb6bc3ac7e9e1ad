//! Sequence-id generation.

use chrono::Utc;
use uuid::Uuid;

/// Generate a sequence id from the current time plus 32 random bits.
///
/// The value is masked to 63 bits so it is always a positive `i64` and
/// survives the protobuf int64 parameter without narrowing. Zero is
/// avoided because the server treats a zero sequence id as "no sequence".
pub fn generate_sequence_id() -> i64 {
    let micros = Utc::now().timestamp_micros();
    let entropy = Uuid::new_v4().as_u128() as u32;
    let id = micros.wrapping_add(entropy as i64) & i64::MAX;
    if id == 0 {
        1
    } else {
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_positive() {
        for _ in 0..1000 {
            assert!(generate_sequence_id() > 0);
        }
    }

    #[test]
    fn test_ids_are_distinct_across_calls() {
        let a = generate_sequence_id();
        let b = generate_sequence_id();
        assert_ne!(a, b);
    }
}
