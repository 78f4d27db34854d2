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

//! BitForce scan loop (C8): one send -> sleep -> poll -> classify cycle.
//!
//! Grounded in `bitforce_scanhash`/`bitforce_thread_init`
//! (`driver-bitforce.c`).

use crate::device::bitforce::{BitforceDevice, ResultOutcome};
use crate::error::DeviceError;
use crate::shutdown::RestartFlag;
use crate::sleep::nmsleep;
use crate::work::Work;

use slog::warn;

/// Nonces accepted by a scan; each carries the candidate nonce value
/// for the caller (scheduler, out of scope) to validate and submit.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub nonces: Vec<u32>,
    /// Hashes attempted this scan, for hashrate accounting.
    pub hashes_done: u64,
}

/// Runs one scan cycle against `dev` for `work`. Honors `restart` at
/// every step boundary named in spec.md §4.8.
pub fn scan_once(
    logger: &slog::Logger,
    dev: &BitforceDevice<'_>,
    work: &Work,
    restart: &RestartFlag,
) -> Result<ScanResult, DeviceError> {
    let send_ok = dev.send_work(work)?;

    nmsleep(dev.sleep_ms());
    if restart.requested() {
        return Ok(ScanResult::default());
    }

    if !send_ok {
        warn!(logger, "comms error sending work; reinitializing");
        dev.stats.increment_hw_errors();
        dev.reinitialize();
        return Ok(ScanResult::default());
    }

    match dev.get_result(work, restart)? {
        ResultOutcome::Found(nonces) => Ok(ScanResult {
            hashes_done: nonces.len() as u64,
            nonces,
        }),
        ResultOutcome::NoNonce => Ok(ScanResult {
            nonces: Vec::new(),
            hashes_done: 0xFFFF_FFFF,
        }),
        ResultOutcome::Idle | ResultOutcome::Abandoned => Ok(ScanResult::default()),
    }
}

/// Per-thread startup stagger (`thread_id * 100ms`) to avoid bus
/// contention when multiple devices initialize at once.
pub fn startup_delay_ms(thread_id: usize) -> u64 {
    thread_id as u64 * 100
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn startup_delay_scales_with_thread_id() {
        assert_eq!(startup_delay_ms(0), 0);
        assert_eq!(startup_delay_ms(3), 300);
    }
}
