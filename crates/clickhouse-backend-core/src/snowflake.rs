// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Snowflake id generation for primary keys the server cannot assign.
//!
//! Layout of an id, most significant bit first:
//!
//! | Bits | Field |
//! |------|-------|
//! | 41 | Milliseconds since [`TWEPOCH`] |
//! | 5 | Datacenter id |
//! | 5 | Worker id |
//! | 12 | Sequence within the millisecond |
//!
//! Ids from one worker are strictly increasing. When the clock steps back or
//! the sequence of a millisecond is exhausted, the worker keeps counting on
//! the last timestamp it issued instead of waiting.
//!
//! # Example
//!
//! ```rust
//! use clickhouse_backend_core::snowflake::IdWorker;
//!
//! let worker = IdWorker::new(1, 2).unwrap();
//! let a = worker.next_id();
//! let b = worker.next_id();
//! assert!(b > a);
//! assert_eq!(IdWorker::datacenter_of(a), 1);
//! assert_eq!(IdWorker::worker_of(a), 2);
//! ```

use std::{
    sync::{Arc, LazyLock},
    time::{SystemTime, UNIX_EPOCH}
};

use parking_lot::Mutex;

use crate::{Error, Result};

/// Custom epoch in milliseconds (2010-11-04T01:42:54.657Z).
pub const TWEPOCH: u64 = 1_288_834_974_657;

const WORKER_ID_BITS: u64 = 5;
const DATACENTER_ID_BITS: u64 = 5;
const SEQUENCE_BITS: u64 = 12;

/// Largest worker id.
pub const MAX_WORKER_ID: u64 = (1 << WORKER_ID_BITS) - 1;
/// Largest datacenter id.
pub const MAX_DATACENTER_ID: u64 = (1 << DATACENTER_ID_BITS) - 1;

const WORKER_ID_SHIFT: u64 = SEQUENCE_BITS;
const DATACENTER_ID_SHIFT: u64 = SEQUENCE_BITS + WORKER_ID_BITS;
const TIMESTAMP_SHIFT: u64 = SEQUENCE_BITS + WORKER_ID_BITS + DATACENTER_ID_BITS;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

type Clock = Box<dyn Fn() -> u64 + Send + Sync>;

#[derive(Debug, Default)]
struct State {
    last_timestamp: u64,
    sequence:       u64
}

/// Thread-safe id generator.
pub struct IdWorker {
    datacenter_id: u64,
    worker_id:     u64,
    clock:         Clock,
    state:         Mutex<State>
}

impl std::fmt::Debug for IdWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdWorker")
            .field("datacenter_id", &self.datacenter_id)
            .field("worker_id", &self.worker_id)
            .finish_non_exhaustive()
    }
}

fn system_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}

impl IdWorker {
    /// Create a worker reading the system clock.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when an id does not fit in five bits.
    pub fn new(datacenter_id: u64, worker_id: u64) -> Result<Self> {
        Self::with_clock(datacenter_id, worker_id, system_millis)
    }

    /// Create a worker reading milliseconds since the Unix epoch from `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when an id does not fit in five bits.
    pub fn with_clock(
        datacenter_id: u64,
        worker_id: u64,
        clock: impl Fn() -> u64 + Send + Sync + 'static
    ) -> Result<Self> {
        if datacenter_id > MAX_DATACENTER_ID {
            return Err(Error::config(format!(
                "datacenter id must be in [0, {MAX_DATACENTER_ID}], got {datacenter_id}"
            )));
        }
        if worker_id > MAX_WORKER_ID {
            return Err(Error::config(format!(
                "worker id must be in [0, {MAX_WORKER_ID}], got {worker_id}"
            )));
        }
        Ok(Self {
            datacenter_id,
            worker_id,
            clock: Box::new(clock),
            state: Mutex::new(State::default())
        })
    }

    /// Datacenter id of this worker.
    #[must_use]
    pub const fn datacenter_id(&self) -> u64 {
        self.datacenter_id
    }

    /// Worker id of this worker.
    #[must_use]
    pub const fn worker_id(&self) -> u64 {
        self.worker_id
    }

    /// Next id.
    pub fn next_id(&self) -> u64 {
        let now = (self.clock)().saturating_sub(TWEPOCH);
        let mut state = self.state.lock();
        if now > state.last_timestamp {
            state.last_timestamp = now;
            state.sequence = 0;
        } else {
            state.sequence = (state.sequence + 1) & SEQUENCE_MASK;
            if state.sequence == 0 {
                state.last_timestamp += 1;
            }
        }
        (state.last_timestamp << TIMESTAMP_SHIFT)
            | (self.datacenter_id << DATACENTER_ID_SHIFT)
            | (self.worker_id << WORKER_ID_SHIFT)
            | state.sequence
    }

    /// `count` consecutive ids.
    pub fn next_ids(&self, count: usize) -> Vec<u64> {
        (0..count).map(|_| self.next_id()).collect()
    }

    /// Milliseconds since the Unix epoch encoded in `id`.
    #[must_use]
    pub const fn timestamp_of(id: u64) -> u64 {
        (id >> TIMESTAMP_SHIFT) + TWEPOCH
    }

    /// Datacenter id encoded in `id`.
    #[must_use]
    pub const fn datacenter_of(id: u64) -> u64 {
        (id >> DATACENTER_ID_SHIFT) & MAX_DATACENTER_ID
    }

    /// Worker id encoded in `id`.
    #[must_use]
    pub const fn worker_of(id: u64) -> u64 {
        (id >> WORKER_ID_SHIFT) & MAX_WORKER_ID
    }

    /// Sequence number encoded in `id`.
    #[must_use]
    pub const fn sequence_of(id: u64) -> u64 {
        id & SEQUENCE_MASK
    }
}

static GLOBAL: LazyLock<Mutex<Option<Arc<IdWorker>>>> = LazyLock::new(|| Mutex::new(None));

fn env_id(name: &str) -> Result<u64> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| Error::config(format!("{name} must be an integer, got {raw:?}"))),
        Err(_) => Ok(0)
    }
}

/// Process-wide worker, created on first use.
///
/// Ids come from `CLICKHOUSE_DATACENTER_ID` and `CLICKHOUSE_WORKER_ID`
/// (default 0).
///
/// # Errors
///
/// Returns [`Error::Config`] when the environment holds invalid ids.
pub fn id_worker() -> Result<Arc<IdWorker>> {
    let mut slot = GLOBAL.lock();
    if let Some(worker) = slot.as_ref() {
        return Ok(Arc::clone(worker));
    }
    let worker = Arc::new(IdWorker::new(
        env_id("CLICKHOUSE_DATACENTER_ID")?,
        env_id("CLICKHOUSE_WORKER_ID")?
    )?);
    tracing::debug!(
        datacenter_id = worker.datacenter_id(),
        worker_id = worker.worker_id(),
        "created snowflake id worker"
    );
    *slot = Some(Arc::clone(&worker));
    Ok(worker)
}

/// Install `worker` as the process-wide worker.
pub fn set_id_worker(worker: IdWorker) {
    *GLOBAL.lock() = Some(Arc::new(worker));
}

/// Forget the process-wide worker; the next call to [`id_worker`] creates a
/// new one.
pub fn reset_id_worker() {
    *GLOBAL.lock() = None;
}
