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

//! Cooperative restart/shutdown signaling (spec.md §5 "Cancellation /
//! restart").
//!
//! bOSminer models this with an async `shutdown::Sender`/`Receiver`
//! pair; our concurrency model is OS threads, so the equivalent is a
//! cheap `Arc<AtomicBool>` flag polled at the iteration boundaries the
//! spec names (scan-loop top, between send and poll, inside the result
//! wait loop) plus the queue's own deadline-bounded `pop`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct RestartFlag(Arc<AtomicBool>);

impl RestartFlag {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// True if a work restart (new job superseding the in-flight scan)
    /// has been requested.
    pub fn requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Requests a restart; scan loops polling `requested()` will notice
    /// on their next check.
    pub fn set(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Clears the flag, e.g. once a new scan has started honoring it.
    pub fn clear(&self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_then_requested_then_clear() {
        let flag = RestartFlag::new();
        assert!(!flag.requested());
        flag.set();
        assert!(flag.requested());
        flag.clear();
        assert!(!flag.requested());
    }
}
