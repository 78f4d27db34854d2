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

//! Per-device BitForce command/response protocol (C7).
//!
//! Grounded in `bitforce_detect_one`/`bitforce_send_work`/
//! `bitforce_get_result`/`bitforce_get_temp`/`bitforce_flash_led`
//! (`driver-bitforce.c`). The capability-interface shape follows
//! `bosminer`'s `hal::Backend` trait (`hal.rs`) in place of the
//! original's `struct device_drv` function-pointer vtable.

use crate::codec::swap32;
use crate::device::ftdi::FtdiHandle;
use crate::device::frame::{build_full_frame, build_ranged_frame, NONCE_RANGE_SPAN};
use crate::error::DeviceError;
use crate::shutdown::RestartFlag;
use crate::sleep::nmsleep;
use crate::stats::DeviceStats;
use crate::work::Work;

use slog::{debug, info, o, warn};
use std::sync::Mutex;
use std::time::{Duration, Instant};

pub const CHECK_INTERVAL_MS: u64 = 10;
pub const WORK_CHECK_INTERVAL_MS: u64 = 50;
pub const TIMEOUT_S: u64 = 7;
pub const LONG_TIMEOUT_S: u64 = 30;
pub const REINIT_COUNT: u32 = 6;
pub const REINIT_TIME_MS: u64 = 1000;
pub const TIME_AVG_CONSTANT: u64 = 8;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnableState {
    Enabled,
    Recovering,
    Disabled,
}

/// Outcome of classifying a `ZFX` reply.
#[derive(Debug, PartialEq, Eq)]
pub enum ResultOutcome {
    /// `NONCE-FOUND:...`; carries the host-endian nonces found.
    Found(Vec<u32>),
    NoNonce,
    Idle,
    /// Work-restart observed mid-poll, or the 30s abandon timeout hit.
    Abandoned,
}

struct Inner<'ctx> {
    ftdi: FtdiHandle<'ctx>,
    name: Option<String>,
    nonce_range_supported: bool,
    sleep_ms: u64,
    wait_ms: u64,
    avg_wait_ms: f64,
    last_temp: f32,
    cutoff_temp: f32,
    enable: EnableState,
    polling: bool,
    flash_led: bool,
    work_start: Option<Instant>,
}

/// One physical BitForce device, its stable identity and the mutex
/// that serializes every byte of USB traffic with it.
pub struct BitforceDevice<'ctx> {
    logger: slog::Logger,
    pub driver_tag: &'static str,
    pub device_index: usize,
    pub bus: u8,
    pub address: u8,
    inner: Mutex<Inner<'ctx>>,
    pub stats: DeviceStats,
}

impl<'ctx> BitforceDevice<'ctx> {
    /// Attempts identification up to `REINIT_COUNT + 1` times, 1000 ms
    /// apart. `opt_bfl_noncerange` picks the initial `sleep_ms` target:
    /// 500 ms with nonce-range enabled, 2500 ms without.
    pub fn detect(
        logger: slog::Logger,
        device_index: usize,
        ftdi: FtdiHandle<'ctx>,
        bus: u8,
        address: u8,
        opt_bfl_noncerange: bool,
    ) -> Result<Self, DeviceError> {
        let logger = logger.new(o!("device" => device_index, "bus" => bus, "address" => address));
        let mut last_err = None;

        for attempt in 0..=REINIT_COUNT {
            if attempt > 0 {
                nmsleep(REINIT_TIME_MS);
            }
            match ftdi.write(b"ZGX") {
                Ok(_) => {}
                Err(e) => {
                    last_err = Some(e);
                    continue;
                }
            }
            match read_line(&ftdi, COMMAND_TIMEOUT) {
                Some(reply) if reply.contains("SHA256") => {
                    let name = extract_id_name(&reply);
                    info!(logger, "detected BitForce device"; "name" => name.clone().unwrap_or_default());
                    let sleep_ms = if opt_bfl_noncerange { 500 } else { 2500 };
                    let inner = Inner {
                        ftdi,
                        name,
                        nonce_range_supported: opt_bfl_noncerange,
                        sleep_ms,
                        wait_ms: 0,
                        avg_wait_ms: 0.0,
                        last_temp: 0.0,
                        cutoff_temp: 0.0,
                        enable: EnableState::Enabled,
                        polling: false,
                        flash_led: false,
                        work_start: None,
                    };
                    return Ok(Self {
                        logger,
                        driver_tag: "bitforce",
                        device_index,
                        bus,
                        address,
                        inner: Mutex::new(inner),
                        stats: DeviceStats::default(),
                    });
                }
                Some(_) | None => continue,
            }
        }

        Err(last_err.unwrap_or(DeviceError::DetectFailed {
            attempts: REINIT_COUNT + 1,
        }))
    }

    pub fn name(&self) -> Option<String> {
        self.inner.lock().unwrap().name.clone()
    }

    pub fn enable_state(&self) -> EnableState {
        self.inner.lock().unwrap().enable
    }

    pub fn sleep_ms(&self) -> u64 {
        self.inner.lock().unwrap().sleep_ms
    }

    pub fn request_flash(&self) {
        self.inner.lock().unwrap().flash_led = true;
    }

    fn initialise_locked(&self, inner: &mut Inner<'ctx>) {
        warn!(self.logger, "re-running FTDI initialization sequence");
        if let Err(e) = inner.ftdi.initialise() {
            warn!(self.logger, "initialization sequence failed"; "error" => e.to_string());
        }
    }

    /// Re-runs the FTDI initialization sequence, for callers outside
    /// this module that hit a comms error they can't retry in place
    /// (spec.md §4.8 step 5, §7 "Fatal per-scan").
    pub fn reinitialize(&self) {
        let mut inner = self.inner.lock().unwrap();
        self.initialise_locked(&mut inner);
    }

    /// Sends `work` to the device. Retries indefinitely on `B`usy or an
    /// empty reply; on any other non-`OK` reply, downgrades out of
    /// nonce-range mode and retries once before failing.
    ///
    /// The retry path re-acquires the device mutex every iteration
    /// (spec.md §9's bugfix (a): the original's goto skipped
    /// re-acquisition).
    pub fn send_work(&self, work: &Work) -> Result<bool, DeviceError> {
        let mut downgrade_retried = false;

        loop {
            let mut inner = self.inner.lock().unwrap();
            let ranged = inner.nonce_range_supported;
            let opcode: &[u8] = if ranged { b"ZPX" } else { b"ZDX" };
            inner.ftdi.write(opcode)?;
            let reply = read_line(&inner.ftdi, COMMAND_TIMEOUT);

            match reply.as_deref() {
                None => {
                    drop(inner);
                    nmsleep(WORK_CHECK_INTERVAL_MS);
                    continue;
                }
                Some(r) if r.is_empty() || r.starts_with('B') => {
                    drop(inner);
                    nmsleep(WORK_CHECK_INTERVAL_MS);
                    continue;
                }
                Some("OK") => {
                    let frame_ok = if ranged {
                        let frame = build_ranged_frame(&work.midstate, &work.tail, work.nonce);
                        inner.ftdi.write(&frame)?;
                        read_line(&inner.ftdi, COMMAND_TIMEOUT).as_deref() == Some("OK")
                    } else {
                        let frame = build_full_frame(&work.midstate, &work.tail);
                        inner.ftdi.write(&frame)?;
                        read_line(&inner.ftdi, COMMAND_TIMEOUT).as_deref() == Some("OK")
                    };
                    if frame_ok {
                        inner.work_start = Some(Instant::now());
                        return Ok(true);
                    }
                    return Ok(false);
                }
                Some(_other) => {
                    if ranged && !downgrade_retried {
                        inner.nonce_range_supported = false;
                        inner.sleep_ms *= 5;
                        downgrade_retried = true;
                        drop(inner);
                        continue;
                    }
                    return Ok(false);
                }
            }
        }
    }

    /// Polls for a completed scan result. Returns once the device
    /// reports non-`BUSY`, the 30s long-timeout elapses, or `restart`
    /// is requested.
    pub fn get_result(&self, work: &Work, restart: &RestartFlag) -> Result<ResultOutcome, DeviceError> {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.polling = true;
        }

        let start = Instant::now();
        let mut wait_ms: u64 = 0;

        let reply = loop {
            if restart.requested() {
                self.inner.lock().unwrap().polling = false;
                return Ok(ResultOutcome::Abandoned);
            }

            let mut inner = self.inner.lock().unwrap();
            inner.ftdi.write(b"ZFX")?;
            let reply = read_line(&inner.ftdi, COMMAND_TIMEOUT);
            drop(inner);

            match reply {
                None => {
                    wait_ms += 2 * WORK_CHECK_INTERVAL_MS;
                    nmsleep(2 * WORK_CHECK_INTERVAL_MS);
                }
                Some(ref r) if r.starts_with('B') => {
                    wait_ms += CHECK_INTERVAL_MS;
                    nmsleep(CHECK_INTERVAL_MS);
                }
                Some(r) => break Some(r),
            }

            if start.elapsed().as_millis() as u64 >= LONG_TIMEOUT_S * 1000 {
                break None;
            }
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        if elapsed_ms > TIMEOUT_S * 1000 && elapsed_ms < LONG_TIMEOUT_S * 1000 {
            warn!(self.logger, "device over-heat/stall suspected"; "elapsed_ms" => elapsed_ms);
        }

        let mut inner = self.inner.lock().unwrap();
        inner.polling = false;

        let reply = match reply {
            Some(r) => r,
            None => return Ok(ResultOutcome::Abandoned),
        };

        let nonces_in_scan: u32 = if inner.nonce_range_supported {
            NONCE_RANGE_SPAN
        } else {
            0xFFFF_FFFF
        };

        let outcome = if reply.starts_with("NO-NONCE") {
            ResultOutcome::NoNonce
        } else if reply.starts_with("IDLE") {
            ResultOutcome::Idle
        } else if let Some(list) = reply.strip_prefix("NONCE-FOUND:") {
            let mut found = Vec::new();
            for token in list.trim().split(',') {
                let token = token.trim();
                if token.len() != 8 {
                    continue;
                }
                let mut bytes = [0u8; 4];
                if hex::decode_to_slice(token, &mut bytes).is_err() {
                    continue;
                }
                let le = u32::from_le_bytes(bytes);
                let host_nonce = swap32(le);

                if inner.nonce_range_supported {
                    let lower = work.nonce.wrapping_sub(nonces_in_scan).wrapping_sub(1);
                    if !(lower..work.nonce).contains(&host_nonce) {
                        inner.nonce_range_supported = false;
                    }
                }
                found.push(host_nonce);
            }
            ResultOutcome::Found(found)
        } else {
            self.stats.increment_hw_errors();
            warn!(self.logger, "garbled work-status reply"; "reply" => reply.clone());
            self.initialise_locked(&mut inner);
            return Ok(ResultOutcome::Abandoned);
        };

        if matches!(outcome, ResultOutcome::Found(_) | ResultOutcome::NoNonce) {
            let w = wait_ms as f64;
            let s = inner.sleep_ms as f64;
            let new_sleep = if w > s + 100.0 {
                s + (w - s) / 2.0
            } else if (w - s).abs() < f64::EPSILON {
                if inner.sleep_ms > 50 {
                    s - WORK_CHECK_INTERVAL_MS as f64
                } else if inner.sleep_ms > 10 {
                    s - CHECK_INTERVAL_MS as f64
                } else {
                    s
                }
            } else {
                s
            };
            inner.sleep_ms = new_sleep.max(CHECK_INTERVAL_MS as f64) as u64;
            inner.avg_wait_ms += (elapsed_ms as f64 - inner.avg_wait_ms) / TIME_AVG_CONSTANT as f64;
            self.stats.record_sleep_ms(inner.sleep_ms);
            self.stats.record_avg_wait_ms(inner.avg_wait_ms as u64);
            debug!(self.logger, "adaptive sleep tuned"; "sleep_ms" => inner.sleep_ms, "wait_ms" => wait_ms);
        }

        Ok(outcome)
    }

    /// Queries temperature unless a scan is in flight (`polling`) or
    /// the lock is contended. A pending `flash_led` request is
    /// serviced instead, once, in place of the temperature query.
    pub fn get_temp(&self) -> bool {
        let mut inner = match self.inner.try_lock() {
            Ok(g) => g,
            Err(_) => return false,
        };
        if inner.polling {
            return false;
        }
        if inner.flash_led {
            inner.flash_led = false;
            let _ = inner.ftdi.write(b"ZMX");
            return true;
        }

        if inner.ftdi.write(b"ZLX").is_err() {
            return false;
        }
        let reply = read_line(&inner.ftdi, COMMAND_TIMEOUT);
        let reply = match reply {
            Some(r) => r,
            None => return false,
        };

        match parse_temp_reply(&reply) {
            Some(value) => {
                inner.last_temp = value;
                if inner.cutoff_temp > 0.0 && value > inner.cutoff_temp {
                    warn!(self.logger, "thermal cutoff tripped"; "temp" => value, "cutoff" => inner.cutoff_temp);
                    inner.enable = EnableState::Recovering;
                }
                true
            }
            None => {
                self.stats.increment_hw_errors();
                warn!(self.logger, "garbled temperature reply"; "reply" => reply);
                self.initialise_locked(&mut inner);
                false
            }
        }
    }
}

/// Parses a `ZLX` reply. Returns `None` for anything not prefixed with
/// `TEMP:`, and for values that are non-numeric, `<= 0`, or still `>
/// 100` after the defensive re-parse (legacy firmware occasionally
/// emits a mis-scaled reading).
fn parse_temp_reply(reply: &str) -> Option<f32> {
    let rest = reply.strip_prefix("TEMP:")?;
    let mut value: f32 = rest.trim().parse().ok()?;
    if value > 100.0 {
        value = rest.trim().parse::<f32>().ok().filter(|v| *v <= 100.0)?;
    }
    if value <= 0.0 {
        return None;
    }
    Some(value)
}

fn extract_id_name(reply: &str) -> Option<String> {
    let start = reply.find(">>>ID: ")? + ">>>ID: ".len();
    let end = reply[start..].find(">>>")? + start;
    if end > start {
        Some(reply[start..end].to_string())
    } else {
        None
    }
}

/// Reads from the bulk-in endpoint until a `\n` is seen or `timeout`
/// elapses, returning the line with the terminator stripped.
fn read_line(ftdi: &FtdiHandle<'_>, timeout: Duration) -> Option<String> {
    let start = Instant::now();
    let mut acc = Vec::new();
    let mut scratch = [0u8; 256];

    loop {
        if start.elapsed() >= timeout {
            return None;
        }
        match ftdi.read(&mut scratch, timeout - start.elapsed()) {
            Ok(0) => continue,
            Ok(n) => {
                acc.extend_from_slice(&scratch[..n]);
                if let Some(pos) = acc.iter().position(|&b| b == b'\n') {
                    acc.truncate(pos);
                    return Some(String::from_utf8_lossy(&acc).trim_end_matches('\r').to_string());
                }
            }
            Err(_) => return None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn extract_id_name_parses_marker() {
        let reply = ">>>ID: BitFORCE SC>>>SHA256";
        assert_eq!(extract_id_name(reply), Some("BitFORCE SC".to_string()));
    }

    #[test]
    fn extract_id_name_handles_missing_markers() {
        assert_eq!(extract_id_name("SHA256"), None);
    }

    #[test]
    fn s7_garbled_temp_reply_is_rejected() {
        assert_eq!(parse_temp_reply("NONCE-FOUND:1234"), None);
        assert_eq!(parse_temp_reply(""), None);
    }

    #[test]
    fn temp_reply_happy_path() {
        assert_eq!(parse_temp_reply("TEMP:52.3"), Some(52.3));
    }

    #[test]
    fn temp_reply_above_100_without_valid_reparse_is_rejected() {
        assert_eq!(parse_temp_reply("TEMP:512.0"), None);
    }

    #[test]
    fn temp_reply_zero_or_negative_is_rejected() {
        assert_eq!(parse_temp_reply("TEMP:0"), None);
        assert_eq!(parse_temp_reply("TEMP:-3.0"), None);
    }

    #[test]
    fn s4_adaptive_sleep_catch_up() {
        let sleep_ms: f64 = 500.0;
        let wait_ms: f64 = 800.0;
        let new_sleep = sleep_ms + (wait_ms - sleep_ms) / 2.0;
        assert_eq!(new_sleep as u64, 650);
    }

    #[test]
    fn s5_adaptive_sleep_tighten() {
        let sleep_ms: u64 = 500;
        let new_sleep = sleep_ms - WORK_CHECK_INTERVAL_MS;
        assert_eq!(new_sleep, 450);
    }

    #[test]
    fn s8_nonce_found_parsing_byte_swap() {
        let tokens = "12345678,87654321";
        let parsed: Vec<u32> = tokens
            .split(',')
            .map(|t| {
                let mut bytes = [0u8; 4];
                hex::decode_to_slice(t, &mut bytes).unwrap();
                swap32(u32::from_le_bytes(bytes))
            })
            .collect();
        assert_eq!(parsed, vec![0x12345678, 0x87654321]);
    }
}
