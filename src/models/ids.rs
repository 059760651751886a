use chrono::Utc;
use rand::Rng;
use std::sync::atomic::{AtomicI64, Ordering};

/// Custom epoch for generated ids: 2024-01-01T00:00:00Z in milliseconds.
const ID_EPOCH_MS: i64 = 1_704_067_200_000;
const SEQUENCE_BITS: u32 = 12;
const SEQUENCE_MASK: i64 = (1 << SEQUENCE_BITS) - 1;
const TIMESTAMP_MASK: i64 = 0x1FF_FFFF_FFFF;

/// Last id handed out in this process
static LAST_ID: AtomicI64 = AtomicI64::new(0);

/// Generate a time-ordered 53-bit id: 41 bits of milliseconds since the
/// custom epoch, 12 bits of sequence. Fits in a JSON number without precision loss.
///
/// Each millisecond starts its sequence at a random offset in the lower half,
/// then increments; ids from one process are strictly increasing. When a
/// millisecond's sequence is exhausted the caller spins until the clock moves on.
pub fn snowflake_id() -> i64 {
    loop {
        let last = LAST_ID.load(Ordering::Acquire);
        let millis = (Utc::now().timestamp_millis() - ID_EPOCH_MS) & TIMESTAMP_MASK;

        let next = if millis > last >> SEQUENCE_BITS {
            let offset: i64 = rand::thread_rng().gen_range(0..=SEQUENCE_MASK >> 1);
            (millis << SEQUENCE_BITS) | offset
        } else if last & SEQUENCE_MASK < SEQUENCE_MASK {
            last + 1
        } else {
            std::hint::spin_loop();
            continue;
        };

        if LAST_ID
            .compare_exchange(last, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            return next;
        }
    }
}
