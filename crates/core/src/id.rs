//! Sortable unique ID generation
//!
//! Generates time-ordered `i64` identifiers that can be used as primary keys
//! without asking the database for one. Each id packs three fields, most
//! significant first:
//!
//! - 41 bits: milliseconds since [`EPOCH_MILLIS`] (2010-01-01T00:00:00Z)
//! - 11 bits: shard id
//! - 12 bits: per-generator sequence
//!
//! A single generator can mint 4096 distinct ids per millisecond, and 2048
//! shards can mint concurrently without colliding. The representable window
//! runs from [`MIN_TIME_MILLIS`] (1975-02-28) to roughly 2044-12-31; times
//! outside it produce ids whose high bits wrap.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicI64, Ordering};

use crate::errors::{CoreError, CoreResult};

const SHARD_BITS: u32 = 11;
const SEQ_BITS: u32 = 12;
const TIME_SHIFT: u32 = SHARD_BITS + SEQ_BITS;

/// 2010-01-01T00:00:00Z in Unix milliseconds
pub const EPOCH_MILLIS: i64 = 1_262_304_000_000;

/// Largest shard id that fits in the shard field
pub const MAX_SHARD: i64 = (1 << SHARD_BITS) - 1;

/// Largest sequence value that fits in the sequence field
pub const MAX_SEQUENCE: i64 = (1 << SEQ_BITS) - 1;

/// Earliest supported instant, 1975-02-28T04:06:12.224Z in Unix milliseconds.
///
/// Its offset from the epoch is `-2^40`, so the time field lands exactly on
/// the sign bit; anything earlier underflows the layout.
pub const MIN_TIME_MILLIS: i64 = EPOCH_MILLIS - (1 << 40);

/// Sortable id generator for one shard.
///
/// The sequence counter is never reset; it wraps through the 12-bit mask, so
/// only the first 4096 ids minted in any one millisecond are guaranteed
/// distinct.
#[derive(Debug)]
pub struct IdGenerator {
    seq: AtomicI64,
    shard: i64,
}

/// Fields recovered from a generated id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IdParts {
    pub time: DateTime<Utc>,
    pub shard: i64,
    pub sequence: i64,
}

impl IdGenerator {
    /// Create a generator for `shard`, reduced into `0..=2047`
    pub fn new(shard: i64) -> Self {
        Self {
            seq: AtomicI64::new(0),
            shard: shard.rem_euclid(MAX_SHARD + 1),
        }
    }

    /// The shard id embedded in every id this generator produces
    pub fn shard(&self) -> i64 {
        self.shard
    }

    /// Next id for `time`
    pub fn next_for_time(&self, time: DateTime<Utc>) -> i64 {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        self.pack(time, seq & MAX_SEQUENCE)
    }

    /// Next id for the current time
    pub fn next(&self) -> i64 {
        self.next_for_time(Utc::now())
    }

    /// Largest id this generator could produce for `time`
    pub fn max_for_time(&self, time: DateTime<Utc>) -> i64 {
        self.pack(time, MAX_SEQUENCE)
    }

    fn pack(&self, time: DateTime<Utc>, seq: i64) -> i64 {
        let offset = time.timestamp_millis() - EPOCH_MILLIS;
        (offset << TIME_SHIFT) | (self.shard << SEQ_BITS) | seq
    }
}

/// Split an id back into its time, shard and sequence
pub fn split_id(id: i64) -> IdParts {
    let millis = (id >> TIME_SHIFT) + EPOCH_MILLIS;
    IdParts {
        // every 41-bit offset is well inside chrono's range
        time: DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::<Utc>::MIN_UTC),
        shard: (id >> SEQ_BITS) & MAX_SHARD,
        sequence: id & MAX_SEQUENCE,
    }
}

/// Parse the decimal text form of an id
pub fn parse_id(text: &str) -> CoreResult<i64> {
    text.trim()
        .parse()
        .map_err(|_| CoreError::validation(format!("'{}' is not a 64-bit integer id", text)))
}

/// Smallest id any generator can produce for `time`.
///
/// Returns `i64::MIN` for times before the supported window so range queries
/// stay inclusive instead of wrapping.
pub fn min_id_time(time: DateTime<Utc>) -> i64 {
    if time.timestamp_millis() < MIN_TIME_MILLIS {
        return i64::MIN;
    }
    IdGenerator::new(0).next_for_time(time)
}

/// Largest id any generator can produce for `time`
pub fn max_id_time(time: DateTime<Utc>) -> i64 {
    IdGenerator::new(MAX_SHARD).max_for_time(time)
}
