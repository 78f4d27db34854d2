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

//! Byte/hex codec and big-endian word-swap helpers (C1).
//!
//! Grounded in `bin2hex`/`hex2bin`/`fulltest` from `util.c`. `bin2hex`
//! over-allocates its `calloc` buffer to a multiple of 4 bytes, but that
//! padding only ever becomes the C string's trailing NUL terminator(s) —
//! the logical string value a caller sees is never padded, so
//! `bin_to_hex` doesn't pad its returned `String` either. `hex_to_bin`
//! rejects truncated input outright instead of silently returning a
//! short buffer.

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("hex string truncated: expected {expected} hex chars, found {found}")]
    Truncated { expected: usize, found: usize },
    #[error("invalid hex byte at position {0}")]
    InvalidHex(usize),
}

/// Converts `bytes` to a lowercase hex string.
pub fn bin_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Decodes exactly `len` bytes from `hexstr` into `dst` (`dst.len() ==
/// len`). Succeeds only if `hexstr` is exactly `2 * len` valid hex
/// characters; anything shorter, longer, or non-hex is a reported
/// failure rather than a partial decode.
pub fn hex_to_bin(dst: &mut [u8], hexstr: &str, len: usize) -> Result<(), CodecError> {
    assert_eq!(dst.len(), len, "dst must be exactly `len` bytes");
    let expected_chars = 2 * len;
    if hexstr.len() != expected_chars {
        return Err(CodecError::Truncated {
            expected: expected_chars,
            found: hexstr.len(),
        });
    }
    hex::decode_to_slice(hexstr, dst).map_err(|_| CodecError::InvalidHex(0))
}

/// Reverses the byte order of a 32-bit word.
#[inline]
pub fn swap32(x: u32) -> u32 {
    x.swap_bytes()
}

/// Reverses the byte order of a 256-bit (32-byte) word.
pub fn swap256(input: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    for i in 0..32 {
        out[i] = input[31 - i];
    }
    out
}

/// Big-endian lexicographic compare of two 256-bit values after
/// `swap256`, mirroring cgminer's `fulltest`: true iff `hash <= target`.
pub fn fulltest(hash: &[u8; 32], target: &[u8; 32]) -> bool {
    let hash_swap = swap256(hash);
    let target_swap = swap256(target);

    let mut rc = true;
    for i in 0..8 {
        let h32 = BigEndian::read_u32(&hash_swap[i * 4..i * 4 + 4]);
        let t32 = BigEndian::read_u32(&target_swap[i * 4..i * 4 + 4]);
        if h32 > t32 {
            rc = false;
            break;
        }
        if h32 < t32 {
            rc = true;
            break;
        }
    }
    rc
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn s1_hex_round_trip() {
        let mut bin = [0u8; 4];
        hex_to_bin(&mut bin, "deadbeef", 4).unwrap();
        assert_eq!(bin, [0xde, 0xad, 0xbe, 0xef]);
        assert_eq!(bin_to_hex(&bin), "deadbeef");
    }

    #[test]
    fn hex_round_trip_property() {
        for n in 0..64usize {
            let bytes: Vec<u8> = (0..n).map(|i| (i * 37 + 11) as u8).collect();
            let h = bin_to_hex(&bytes);
            let mut back = vec![0u8; n];
            hex_to_bin(&mut back, &h, n).unwrap();
            assert_eq!(back, bytes);
        }
    }

    #[test]
    fn bin_to_hex_does_not_pad_odd_byte_counts() {
        assert_eq!(bin_to_hex(&[0xab, 0xcd, 0xef]), "abcdef");
    }

    #[test]
    fn hex_to_bin_rejects_truncation() {
        let mut bin = [0u8; 4];
        assert!(hex_to_bin(&mut bin, "deadbe", 4).is_err());
        assert!(hex_to_bin(&mut bin, "deadbeefaa", 4).is_err());
    }

    #[test]
    fn swap32_involution() {
        for x in [0u32, 1, 0xdead_beef, 0xffff_ffff] {
            assert_eq!(swap32(swap32(x)), x);
        }
    }

    #[test]
    fn swap256_involution() {
        let mut input = [0u8; 32];
        for (i, b) in input.iter_mut().enumerate() {
            *b = i as u8;
        }
        assert_eq!(swap256(&swap256(&input)), input);
    }

    #[test]
    fn fulltest_hash_le_target() {
        let mut hash = [0u8; 32];
        let mut target = [0xffu8; 32];
        hash[31] = 0x01;
        target[31] = 0x02;
        assert!(fulltest(&hash, &target));

        target[31] = 0x00;
        hash[31] = 0x01;
        assert!(!fulltest(&hash, &target));
    }
}
