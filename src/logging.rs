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

//! Process-wide structured logging setup.
//!
//! Grounded in `ii-logging`'s stack (`slog` + `slog-term` + `slog-async`
//! + `slog-envlogger`) as depended on by every bOSminer crate. `applog`
//! and its level routing are the named external collaborator in
//! spec.md §1; this module is the concrete sink every component in this
//! crate logs against, in place of that collaborator.

use lazy_static::lazy_static;
use slog::{o, Drain};

/// Drain channel size for the async logger. bOSminer overrides this
/// per-backend because mining loops can burst log lines; we pick one
/// constant here since this crate has a single binary entry point.
pub const ASYNC_LOGGER_DRAIN_CHANNEL_SIZE: usize = 128;

lazy_static! {
    static ref ROOT_LOGGER: slog::Logger = build_root_logger();
}

fn build_root_logger() -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let term_drain = slog_term::FullFormat::new(decorator).build().fuse();
    let envlogger_drain = slog_envlogger::new(term_drain);
    let async_drain = slog_async::Async::new(envlogger_drain)
        .chan_size(ASYNC_LOGGER_DRAIN_CHANNEL_SIZE)
        .build()
        .fuse();
    slog::Logger::root(async_drain, o!())
}

/// Returns a handle to the process-wide root logger. Call once at
/// startup and clone/derive child loggers (`logger.new(o!(...))`) for
/// each device session / pool session so log lines carry their
/// identity automatically.
pub fn root() -> slog::Logger {
    ROOT_LOGGER.clone()
}
