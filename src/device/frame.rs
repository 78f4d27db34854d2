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

//! BitForce send-work frame layout (spec.md §4.7 "Send work frame
//! layout").
//!
//! Grounded in `bitforce_send_work`'s frame construction in
//! `driver-bitforce.c`. Laid out with `packed_struct`, the same crate
//! `bosminer-erupter`'s `icarus::WorkPayload` uses for its chip work
//! frame, here in big-endian (`msb`) since the BitForce protocol is
//! big-endian where the original icarus one is little-endian.

use crate::work::{Midstate, Tail};
use packed_struct::prelude::*;
use packed_struct_codegen::PackedStruct;

/// ~1/5th of the 32-bit nonce space; the span covered by one ranged
/// send and the amount `Work::nonce` is advanced by between scans.
pub const NONCE_RANGE_SPAN: u32 = 0x3333_3333;

const SENTINEL: [u8; 8] = [0x3E; 8];

/// 60-byte frame used when nonce-range is disabled; the device
/// searches the full `0xFFFFFFFF` space.
#[derive(PackedStruct, Debug, Clone, Copy)]
#[packed_struct(endian = "msb")]
pub struct FullWorkFrame {
    pub sentinel_head: [u8; 8],
    pub midstate: [u8; 32],
    pub tail: [u8; 12],
    pub sentinel_tail: [u8; 8],
}

impl FullWorkFrame {
    pub fn new(midstate: &Midstate, tail: &Tail) -> Self {
        Self {
            sentinel_head: SENTINEL,
            midstate: *midstate,
            tail: *tail,
            sentinel_tail: SENTINEL,
        }
    }

    pub fn into_bytes(self) -> [u8; 60] {
        self.pack()
    }
}

/// 68-byte frame used when nonce-range is enabled: the device searches
/// only `[start_nonce, start_nonce + NONCE_RANGE_SPAN)`.
#[derive(PackedStruct, Debug, Clone, Copy)]
#[packed_struct(endian = "msb")]
pub struct RangedWorkFrame {
    pub sentinel_head: [u8; 8],
    pub midstate: [u8; 32],
    pub tail: [u8; 12],
    pub start_nonce: u32,
    pub end_nonce: u32,
    pub sentinel_tail: [u8; 8],
}

impl RangedWorkFrame {
    pub fn new(midstate: &Midstate, tail: &Tail, start_nonce: u32) -> Self {
        Self {
            sentinel_head: SENTINEL,
            midstate: *midstate,
            tail: *tail,
            start_nonce,
            end_nonce: start_nonce.wrapping_add(NONCE_RANGE_SPAN - 1),
            sentinel_tail: SENTINEL,
        }
    }

    pub fn into_bytes(self) -> [u8; 68] {
        self.pack()
    }
}

pub fn build_full_frame(midstate: &Midstate, tail: &Tail) -> [u8; 60] {
    FullWorkFrame::new(midstate, tail).into_bytes()
}

pub fn build_ranged_frame(midstate: &Midstate, tail: &Tail, start_nonce: u32) -> [u8; 68] {
    RangedWorkFrame::new(midstate, tail, start_nonce).into_bytes()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn s2_full_frame_no_range() {
        let midstate = [0x11u8; 32];
        let tail = [0x22u8; 12];
        let frame = build_full_frame(&midstate, &tail);

        assert_eq!(frame.len(), 60);
        assert_eq!(&frame[0..8], &[0x3E; 8]);
        assert_eq!(&frame[8..40], &[0x11; 32]);
        assert_eq!(&frame[40..52], &[0x22; 12]);
        assert_eq!(&frame[52..60], &[0x3E; 8]);
    }

    #[test]
    fn s3_ranged_frame_start_zero() {
        let midstate = [0x11u8; 32];
        let tail = [0x22u8; 12];
        let frame = build_ranged_frame(&midstate, &tail, 0);

        assert_eq!(frame.len(), 68);
        assert_eq!(&frame[0..8], &[0x3E; 8]);
        assert_eq!(&frame[52..56], &[0x00, 0x00, 0x00, 0x00]);
        assert_eq!(&frame[56..60], &[0x33, 0x33, 0x33, 0x32]);
        assert_eq!(&frame[60..68], &[0x3E; 8]);
    }
}
