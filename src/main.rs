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

//! Wires the pool session and device scan loop together. The top-level
//! work scheduler and share-submission accounting are named out of
//! scope (spec.md §1); this binary drives one pool and, when a
//! BitForce device is present, one device thread directly against each
//! other rather than through a scheduler.

use bfminer::config::Args;
use bfminer::context::GlobalContext;
use bfminer::device::bitforce::BitforceDevice;
use bfminer::device::ftdi::FtdiHandle;
use bfminer::device::scan::{scan_once, startup_delay_ms};
use bfminer::logging;
use bfminer::net::stratum::PoolSession;
use bfminer::shutdown::RestartFlag;
use bfminer::sleep::nmsleep;
use bfminer::url::{extract_sockaddr, get_proxy};
use bfminer::work::Work;

use anyhow::Context as _;
use slog::{debug, error, info, o};
use std::sync::Arc;

fn main() {
    let logger = logging::root();
    if let Err(e) = run(&logger) {
        error!(logger, "fatal error"; "error" => format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(logger: &slog::Logger) -> anyhow::Result<()> {
    let args = Args::parse_args();

    let (proxy, real_url) = get_proxy(&args.url);
    let addr = extract_sockaddr(real_url).with_context(|| format!("invalid pool url {:?}", args.url))?;

    let ctx = Arc::new(GlobalContext::new());
    let restart = RestartFlag::new();

    let pool = Arc::new(PoolSession::new(
        logger.clone(),
        ctx.clone(),
        0,
        addr,
        args.user.clone(),
        args.pass.clone(),
        proxy,
    ));

    let pool_thread = {
        let pool = pool.clone();
        let logger = logger.new(o!("thread" => "pool"));
        std::thread::spawn(move || run_pool_session(&logger, &pool))
    };

    if let Err(e) = run_device(logger, &pool, &restart, args.bfl_range) {
        error!(logger, "no BitForce device available"; "error" => e.to_string());
    }

    let _ = pool_thread.join();
    Ok(())
}

fn run_pool_session(logger: &slog::Logger, pool: &PoolSession) {
    loop {
        if let Err(e) = pool.initiate_stratum() {
            if pool.stats.is_successful_connect() {
                error!(logger, "lost connection to pool"; "error" => e.to_string());
            } else {
                debug!(logger, "failed to connect to pool"; "error" => e.to_string());
            }
            nmsleep(5_000);
            continue;
        }
        if let Err(e) = pool.auth_stratum() {
            error!(logger, "stratum authorization failed"; "error" => e.to_string());
            pool.suspend_stratum();
            nmsleep(5_000);
            continue;
        }
        info!(logger, "pool session established");
        break;
    }
}

fn run_device(
    logger: &slog::Logger,
    pool: &PoolSession,
    restart: &RestartFlag,
    bfl_range: bool,
) -> Result<(), bfminer::error::DeviceError> {
    let context = libusb::Context::new().map_err(|e| bfminer::error::DeviceError::Usb(e.to_string()))?;

    let devices = context
        .devices()
        .map_err(|e| bfminer::error::DeviceError::Usb(e.to_string()))?;

    for (index, device) in devices.iter().enumerate() {
        let desc = match device.device_descriptor() {
            Ok(d) => d,
            Err(_) => continue,
        };
        if desc.vendor_id() != bfminer::device::ftdi::BITFORCE_VID
            || desc.product_id() != bfminer::device::ftdi::BITFORCE_PID
        {
            continue;
        }

        let bus = device.bus_number();
        let address = device.address();
        let ftdi = FtdiHandle::open(&context, bus, address)?;
        ftdi.initialise()?;

        let dev = BitforceDevice::detect(logger.clone(), index, ftdi, bus, address, bfl_range)?;
        info!(logger, "starting scan loop"; "name" => dev.name().unwrap_or_default());

        nmsleep(startup_delay_ms(index));

        loop {
            let swork = pool.swork();
            if swork.job_id.is_empty() {
                nmsleep(500);
                continue;
            }
            let work = Work::new([0u8; 32], [0u8; 12], swork.job_id.clone(), [0xFFu8; 32]);
            match scan_once(logger, &dev, &work, restart) {
                Ok(result) if !result.nonces.is_empty() => {
                    info!(logger, "nonces found"; "count" => result.nonces.len());
                }
                Ok(_) => {}
                Err(e) => {
                    error!(logger, "scan error"; "error" => e.to_string());
                }
            }
        }
    }

    Err(bfminer::error::DeviceError::DetectFailed { attempts: 0 })
}
