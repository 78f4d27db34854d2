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

//! Error taxonomy (see spec.md §7).
//!
//! Each recoverable kind from the spec's error taxonomy gets its own
//! variant; recoverable errors are handled locally by the caller (logged
//! and degraded/retried), never propagated past the component boundary —
//! only `DeviceError`/`NetError` that callers can't locally recover from
//! bubble up to `main`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("USB transport error: {0}")]
    Usb(String),
    #[error("device did not identify as a BitForce SHA256 unit after {attempts} attempts")]
    DetectFailed { attempts: u32 },
    #[error("device reported an unexpected reply to {command}: {reply:?}")]
    ProtocolGarbled { command: &'static str, reply: String },
    #[error("device comms error while sending work")]
    CommsError,
}

#[derive(Debug, Error)]
pub enum NetError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timed out waiting for a line-terminated reply")]
    Timeout,
    #[error("JSON-RPC call failed: {0}")]
    JsonRpc(String),
    #[error("stratum is not active on this pool")]
    NotActive,
    #[error("malformed notify: missing mandatory field {0}")]
    MalformedNotify(&'static str),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
