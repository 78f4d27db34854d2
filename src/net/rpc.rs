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

//! JSON-RPC request engine over HTTP (C5).
//!
//! Grounded in `json_rpc_call`/`resp_hdr_cb` (`util.c`). Uses a blocking
//! `reqwest` client (the same crate + `blocking` feature used by
//! `gmine_mobile`'s chain HTTP client) since every other component in
//! this crate runs on a dedicated OS thread rather than an async
//! executor.

use crate::context::GlobalContext;
use crate::error::NetError;
use crate::stats::PoolStats;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const NORMAL_TIMEOUT: Duration = Duration::from_secs(60);
const LONGPOLL_TIMEOUT: Duration = Duration::from_secs(3600);
const DELAY_NET_MIN_GAP: Duration = Duration::from_millis(250);

/// Options for one JSON-RPC call.
pub struct RpcCall<'a> {
    pub url: &'a str,
    pub userpass: Option<(&'a str, &'a str)>,
    pub body: &'a str,
    pub longpoll: bool,
    pub share: bool,
}

/// Header-derived outcome of a call, beyond the decoded JSON body.
#[derive(Debug, Default)]
pub struct RpcOutcome {
    pub value: serde_json::Value,
    /// `None` when `X-Roll-Ntime: N` disabled rolling; `Some(seconds)`
    /// otherwise (falling back to `default_scantime` when no `expire=`
    /// was present).
    pub rolltime: Option<u32>,
    pub lp_path: Option<String>,
    pub stratum_url: Option<String>,
}

pub struct JsonRpcEngine {
    client: reqwest::blocking::Client,
    ctx: Arc<GlobalContext>,
    pub stats: PoolStats,
    delay_net: bool,
    global_hashrate: Option<u64>,
    force_fresh: AtomicBool,
    user_agent: String,
    default_scantime: u32,
}

impl JsonRpcEngine {
    pub fn new(
        ctx: Arc<GlobalContext>,
        delay_net: bool,
        user_agent: impl Into<String>,
        default_scantime: u32,
    ) -> Self {
        Self {
            client: reqwest::blocking::Client::new(),
            ctx,
            stats: PoolStats::default(),
            delay_net,
            global_hashrate: None,
            force_fresh: AtomicBool::new(false),
            user_agent: user_agent.into(),
            default_scantime,
        }
    }

    pub fn set_global_hashrate(&mut self, hashrate: Option<u64>) {
        self.global_hashrate = hashrate;
    }

    /// Executes one JSON-RPC HTTP POST and decodes the response.
    pub fn call(&self, req: RpcCall<'_>) -> Result<RpcOutcome, NetError> {
        self.rate_shape(req.share);

        let timeout = if req.longpoll {
            LONGPOLL_TIMEOUT
        } else {
            NORMAL_TIMEOUT
        };

        let mut builder = self
            .client
            .post(req.url)
            .timeout(timeout)
            .header("Content-type", "application/json")
            .header(
                "X-Mining-Extensions",
                "longpoll midstate rollntime submitold",
            )
            .header("User-Agent", self.user_agent.as_str())
            .header("Content-Length", req.body.len().to_string())
            .header("Expect", "")
            .body(req.body.to_string());

        if let Some(hashrate) = self.global_hashrate {
            builder = builder.header("X-Mining-Hashrate", hashrate.to_string());
        }
        if let Some((user, pass)) = req.userpass {
            builder = builder.basic_auth(user, Some(pass));
        }
        if self.force_fresh.swap(false, Ordering::AcqRel) {
            builder = builder.header("Connection", "close");
        }

        let response = match builder.send() {
            Ok(r) => r,
            Err(e) => {
                self.force_fresh.store(true, Ordering::Release);
                return Err(NetError::Http(e));
            }
        };

        let headers = response.headers().clone();
        let sent_bytes = req.body.len() as u64;

        let body = match response.text() {
            Ok(b) => b,
            Err(e) => {
                self.force_fresh.store(true, Ordering::Release);
                return Err(NetError::Http(e));
            }
        };

        self.stats.record_sent(sent_bytes);
        self.stats.record_received(body.len() as u64);

        let mut value: serde_json::Value = serde_json::from_str(&body).map_err(|e| {
            self.force_fresh.store(true, Ordering::Release);
            NetError::Json(e)
        })?;

        let result_present = value
            .get("result")
            .map(|r| !r.is_null())
            .unwrap_or(false);
        let error_is_null = value
            .get("error")
            .map(|e| e.is_null())
            .unwrap_or(true);
        if !result_present || !error_is_null {
            self.force_fresh.store(true, Ordering::Release);
            return Err(NetError::JsonRpc(body));
        }

        let rolltime = match headers.get("X-Roll-Ntime") {
            Some(v) => {
                let v = v.to_str().unwrap_or("");
                if v.eq_ignore_ascii_case("n") {
                    None
                } else {
                    let expire = v
                        .to_ascii_lowercase()
                        .strip_prefix("expire=")
                        .and_then(|s| s.parse::<u32>().ok());
                    Some(expire.unwrap_or(self.default_scantime))
                }
            }
            None => None,
        };

        let lp_path = headers
            .get("X-Long-Polling")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let stratum_url = headers
            .get("X-Stratum")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        if let Some(reason) = headers.get("X-Reject-Reason").and_then(|v| v.to_str().ok()) {
            if let Some(obj) = value.as_object_mut() {
                obj.insert(
                    "reject-reason".to_string(),
                    serde_json::Value::String(reason.to_string()),
                );
            }
        }

        Ok(RpcOutcome {
            value,
            rolltime,
            lp_path,
            stratum_url,
        })
    }

    fn rate_shape(&self, share: bool) {
        if !self.delay_net {
            return;
        }
        if !share {
            let last = self.ctx.last_nettime();
            let elapsed = last.elapsed();
            if elapsed < DELAY_NET_MIN_GAP {
                std::thread::sleep(DELAY_NET_MIN_GAP - elapsed);
            }
        }
        self.ctx.set_nettime_now();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rate_shape_enforces_minimum_gap_for_non_share() {
        let ctx = Arc::new(GlobalContext::new());
        let engine = JsonRpcEngine::new(ctx, true, "bfminer-test/0.1", 60);

        let start = std::time::Instant::now();
        engine.rate_shape(false);
        engine.rate_shape(false);
        assert!(start.elapsed() >= DELAY_NET_MIN_GAP);
    }

    #[test]
    fn rate_shape_skips_delay_for_share_but_updates_nettime() {
        let ctx = Arc::new(GlobalContext::new());
        let engine = JsonRpcEngine::new(ctx.clone(), true, "bfminer-test/0.1", 60);

        let before = ctx.last_nettime();
        engine.rate_shape(true);
        assert!(ctx.last_nettime() >= before);
    }
}
