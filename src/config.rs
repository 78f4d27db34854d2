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

//! CLI surface, replacing the out-of-scope "CLI / configuration
//! parsing" collaborator named in spec.md §1. Uses `clap`'s derive
//! API, the same crate multiple repos in this corpus use for their
//! binary entry points.

use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "bfminer", about = "BitForce FTDI mining client core")]
pub struct Args {
    /// Pool URL, e.g. stratum+tcp://pool.example.com:3333
    #[arg(long)]
    pub url: String,

    /// Worker username
    #[arg(long)]
    pub user: String,

    /// Worker password
    #[arg(long, default_value = "x")]
    pub pass: String,

    /// Enable BitForce nonce-range work splitting (`opt_bfl_noncerange`)
    #[arg(long = "bfl-range")]
    pub bfl_range: bool,

    /// Space out non-share network requests by at least 250ms
    #[arg(long)]
    pub delay_net: bool,

    /// Fallback getwork scantime (seconds) when a pool omits X-Roll-Ntime's expire=
    #[arg(long, default_value_t = 60)]
    pub scantime: u32,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
