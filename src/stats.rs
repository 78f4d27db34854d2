// Copyright (C) 2026  Braiins Systems s.r.o.
//
// This file is part of Braiins Open-Source Initiative (BOSI).
//
// BOSI is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//
// Please, keep in mind that we may also license BOSI or any part thereof
// under a proprietary license. For more information on the terms and conditions
// of such proprietary license or if you have any other questions, please
// contact us at opensource@braiins.com.

//! Ambient observability accumulators (SPEC_FULL §4.10).
//!
//! Mirrors cgminer's `get_api_stats`/`cgminer_pool_stats` accumulators.
//! No REST/API server is implemented around these (named out of scope
//! in spec.md §1) — they are plain counters a caller can read.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Per-device statistics surfaced by `get_api_stats` in the original.
#[derive(Debug, Default)]
pub struct DeviceStats {
    pub sleep_ms: AtomicU64,
    pub avg_wait_ms: AtomicU64,
    pub hw_errors: AtomicU64,
}

impl DeviceStats {
    pub fn record_sleep_ms(&self, ms: u64) {
        self.sleep_ms.store(ms, Ordering::Relaxed);
    }

    pub fn record_avg_wait_ms(&self, ms: u64) {
        self.avg_wait_ms.store(ms, Ordering::Relaxed);
    }

    pub fn increment_hw_errors(&self) -> u64 {
        self.hw_errors.fetch_add(1, Ordering::Relaxed) + 1
    }
}

/// Per-pool traffic counters (`cgminer_pool_stats` in the original), plus
/// the `pool->probed`/`successful_connect` flag pair (SPEC_FULL.md §3):
/// `probed` records whether a connection has ever been attempted against
/// this pool, `successful_connect` whether one has ever fully succeeded.
/// A caller uses the pair to decide whether a fresh connection failure is
/// "first contact" (log quietly) or "lost an established link" (log
/// louder).
#[derive(Debug, Default)]
pub struct PoolStats {
    pub times_sent: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub times_received: AtomicU64,
    pub bytes_received: AtomicU64,
    probed: AtomicBool,
    successful_connect: AtomicBool,
}

impl PoolStats {
    pub fn record_sent(&self, bytes: u64) {
        self.times_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_received(&self, bytes: u64) {
        self.times_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn mark_probed(&self) {
        self.probed.store(true, Ordering::Relaxed);
    }

    pub fn is_probed(&self) -> bool {
        self.probed.load(Ordering::Relaxed)
    }

    pub fn mark_successful_connect(&self) {
        self.successful_connect.store(true, Ordering::Relaxed);
    }

    pub fn is_successful_connect(&self) -> bool {
        self.successful_connect.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn probed_and_successful_connect_start_false() {
        let stats = PoolStats::default();
        assert!(!stats.is_probed());
        assert!(!stats.is_successful_connect());
    }

    #[test]
    fn marking_is_independent() {
        let stats = PoolStats::default();
        stats.mark_probed();
        assert!(stats.is_probed());
        assert!(!stats.is_successful_connect());

        stats.mark_successful_connect();
        assert!(stats.is_successful_connect());
    }
}
