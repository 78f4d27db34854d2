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

//! BitForce FTDI device driver core and Stratum + long-poll pool
//! protocol core.
//!
//! Two subsystems: a per-device command/response protocol state
//! machine talking to a BitForce ASIC over FTDI USB ([`device`]), and a
//! pool protocol client speaking Stratum and HTTP getwork/long-poll
//! JSON-RPC ([`net`]). They share [`codec`], [`sleep`], and [`queue`].

pub mod codec;
pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod logging;
pub mod net;
pub mod queue;
pub mod shutdown;
pub mod sleep;
pub mod stats;
pub mod url;
pub mod work;
