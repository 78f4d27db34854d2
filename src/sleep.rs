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

//! Monotonic, EINTR-safe millisecond sleep (C2).
//!
//! `std::thread::sleep` on Linux is already built on `clock_nanosleep`
//! with `TIME_ABSTIME`-free retry-on-interrupt semantics, but we keep an
//! explicit residual-tracking loop (mirroring cgminer's `nmsleep`, which
//! loops on `nanosleep`'s `tleft` out-parameter) so the contract —
//! "never returns early, even across repeated interruption" — is
//! documented at the call site rather than relying on libc internals.

use std::time::{Duration, Instant};

/// Sleeps for at least `ms` milliseconds. Never returns early: if the
/// underlying sleep is interrupted it resumes for the remaining
/// duration.
pub fn nmsleep(ms: u64) {
    let target = Duration::from_millis(ms);
    let start = Instant::now();
    loop {
        let elapsed = start.elapsed();
        if elapsed >= target {
            return;
        }
        std::thread::sleep(target - elapsed);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn sleeps_at_least_requested_duration() {
        let start = Instant::now();
        nmsleep(20);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn zero_is_a_no_op() {
        let start = Instant::now();
        nmsleep(0);
        assert!(start.elapsed() < Duration::from_millis(50));
    }
}
