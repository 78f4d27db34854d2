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

//! Process-wide mutable state, collected into one explicitly-passed
//! value instead of C's file-scope globals (design note in spec.md §9):
//! `nettime` (reader/writer protected), `swork_id` (atomic counter),
//! `total_getworks` (atomic counter).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Instant;

pub struct GlobalContext {
    /// Timestamp of the last non-share network activity across all
    /// pools, used by the JSON-RPC engine's 250ms rate shaping.
    nettime: RwLock<Instant>,
    swork_id: AtomicU64,
    pub total_getworks: AtomicU64,
}

impl GlobalContext {
    pub fn new() -> Self {
        Self {
            nettime: RwLock::new(Instant::now()),
            swork_id: AtomicU64::new(0),
            total_getworks: AtomicU64::new(0),
        }
    }

    pub fn last_nettime(&self) -> Instant {
        *self.nettime.read().unwrap()
    }

    pub fn set_nettime_now(&self) {
        *self.nettime.write().unwrap() = Instant::now();
    }

    /// Returns the next JSON-RPC request id (post-increment, matching
    /// `swork_id++`).
    pub fn next_swork_id(&self) -> u64 {
        self.swork_id.fetch_add(1, Ordering::Relaxed)
    }

    pub fn increment_total_getworks(&self) {
        self.total_getworks.fetch_add(1, Ordering::Relaxed);
    }
}

impl Default for GlobalContext {
    fn default() -> Self {
        Self::new()
    }
}
