use crate::base32;
use rand::RngCore;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

const TIMESTAMP_BITS: u32 = 48;
const RANDOM_BITS: u32 = 80;
const RANDOM_MASK: u128 = (1u128 << RANDOM_BITS) - 1;
const ENCODED_LEN: usize = 26; // 128 bits / 5 bits-per-symbol, rounded up

struct MonotonicState {
    last_ms: u64,
    last_random: u128,
}

static STATE: Mutex<Option<MonotonicState>> = Mutex::new(None);

/// Mint a 128-bit time-ordered value: the high 48 bits are the current
/// millisecond timestamp, the low 80 bits are random. Two identifiers minted
/// within the same millisecond in this process are guaranteed to sort in
/// call order: the random tail is monotonically incremented instead of
/// re-rolled whenever the timestamp hasn't advanced.
pub fn mint_raw() -> u128 {
    let now_ms = current_millis();
    let mut guard = STATE.lock().unwrap_or_else(|e| e.into_inner());

    let random = match guard.as_mut() {
        Some(state) if state.last_ms == now_ms => {
            state.last_random = (state.last_random + 1) & RANDOM_MASK;
            state.last_random
        }
        _ => {
            let fresh = random_80();
            *guard = Some(MonotonicState {
                last_ms: now_ms,
                last_random: fresh,
            });
            fresh
        }
    };

    ((now_ms as u128 & ((1u128 << TIMESTAMP_BITS) - 1)) << RANDOM_BITS) | random
}

/// Mint and render as a Crockford base-32 string, ready to be prefixed by an
/// identifier type's tag (e.g. `"evt_"`).
pub fn mint_encoded() -> String {
    base32::encode_u128(mint_raw(), ENCODED_LEN)
}

fn random_80() -> u128 {
    let mut rng = rand::thread_rng();
    let hi = rng.next_u64() as u128;
    let lo = rng.next_u32() as u128;
    ((hi << 32) | lo) & RANDOM_MASK
}

fn current_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the unix epoch")
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_within_same_call() {
        let a = mint_raw();
        let b = mint_raw();
        assert!(b > a, "{b} should sort after {a}");
    }

    #[test]
    fn encoded_ids_are_lexicographically_sortable() {
        let mut ids: Vec<String> = (0..50).map(|_| mint_encoded()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
        ids.dedup();
        assert_eq!(ids.len(), 50, "minted ids must be unique");
    }
}
