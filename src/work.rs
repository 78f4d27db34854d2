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

//! Work unit data model (spec.md §3 "Work unit").
//!
//! An immutable-for-the-duration-of-the-hash record: midstate, tail,
//! starting nonce, job identity. Produced by the scheduler (out of
//! scope — see spec.md §1), passed by reference into the scan loop (C8)
//! for one scan, read-only within the device session (C7).

/// SHA-256 midstate after the first 512-bit block of a block header.
pub type Midstate = [u8; 32];

/// The second-block remainder, i.e. bytes 64..76 of the 80-byte header.
pub type Tail = [u8; 12];

#[derive(Debug, Clone)]
pub struct Work {
    pub midstate: Midstate,
    pub tail: Tail,
    /// Starting nonce for this scan; advanced by the caller between
    /// scans when nonce-range is enabled (see device/frame.rs).
    pub nonce: u32,
    pub job_id: String,
    /// Compact target this work must beat (for scheduler-side
    /// `fulltest` use; not consumed by the device session itself, which
    /// defers nonce validity to the chip).
    pub target: [u8; 32],
}

impl Work {
    pub fn new(midstate: Midstate, tail: Tail, job_id: impl Into<String>, target: [u8; 32]) -> Self {
        Self {
            midstate,
            tail,
            nonce: 0,
            job_id: job_id.into(),
            target,
        }
    }
}
