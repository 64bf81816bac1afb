// src/utils/id_generator.rs
use chrono::{DateTime, Utc};
use rand::Rng;

const RIDE_PREFIX: &str = "rid";
const HEX: &[u8] = b"0123456789abcdef";
const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Server-assigned ride id: `rid-{yymmdd}-{suffix}`.
pub fn generate_ride_id() -> String {
    ride_id_at(Utc::now())
}

/// The five-character suffix is three characters from one alphabet followed
/// by two from the other, hex and alphanumeric picked in random order.
fn ride_id_at(created_at: DateTime<Utc>) -> String {
    let mut rng = rand::rng();
    let (head, tail) = if rng.random::<bool>() {
        (HEX, ALPHANUMERIC)
    } else {
        (ALPHANUMERIC, HEX)
    };

    let suffix: String = (0..5)
        .map(|i| {
            let alphabet = if i < 3 { head } else { tail };
            alphabet[rng.random_range(0..alphabet.len())] as char
        })
        .collect();

    format!("{}-{}-{}", RIDE_PREFIX, created_at.format("%y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_ride_id_layout() {
        let created_at = Utc.with_ymd_and_hms(2026, 10, 19, 6, 45, 0).unwrap();

        for _ in 0..50 {
            let id = ride_id_at(created_at);
            let parts: Vec<&str> = id.split('-').collect();
            assert_eq!(parts.len(), 3, "bad id: {}", id);
            assert_eq!(parts[0], "rid");
            assert_eq!(parts[1], "261019");
            assert_eq!(parts[2].len(), 5);
            assert!(parts[2].chars().all(|c| c.is_ascii_alphanumeric()), "bad id: {}", id);
        }
    }

    #[test]
    fn test_generated_ids_differ() {
        let first = generate_ride_id();
        assert!(first.starts_with("rid-"));
        assert!((0..10).any(|_| generate_ride_id() != first));
    }
}
