//! Order codes.

use jiff::Timestamp;
use rand::Rng;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_SUFFIX_LEN: usize = 8;

/// Generate a human-facing order code such as `ORD-20260301-7KQ2M9XA`.
///
/// The date is the UTC day of `now`; the suffix is random, so a failed
/// attempt never reuses its code on retry.
pub fn generate_order_code(now: Timestamp) -> String {
    let mut rng = rand::thread_rng();

    let suffix: String = (0..CODE_SUFFIX_LEN)
        .filter_map(|_| {
            CODE_ALPHABET
                .get(rng.gen_range(0..CODE_ALPHABET.len()))
                .copied()
                .map(char::from)
        })
        .collect();

    format!("ORD-{}-{suffix}", now.strftime("%Y%m%d"))
}
