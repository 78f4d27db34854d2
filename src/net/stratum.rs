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

//! Stratum client state machine (C6).
//!
//! Grounded in `initiate_stratum`/`auth_stratum`/`parse_method`/
//! `parse_notify`/`parse_diff`/`parse_reconnect`/`send_version`/
//! `suspend_stratum`/`__stratum_send` (`util.c`). The write-loop bugfix
//! from spec.md §9(b) — tracking the *delta* sent per `write()` call,
//! not the cumulative total — is applied in `send_line_locked`.

use crate::context::GlobalContext;
use crate::error::NetError;
use crate::net::line_reader::LineBuffer;
use crate::stats::PoolStats;
use crate::url::{ParsedProxy, SockAddr};

use serde_json::{json, Value};
use slog::{debug, info, o, warn};
use std::io::{ErrorKind, Write};
use std::net::TcpStream;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StratumState {
    Closed,
    Subscribed,
    Authorized,
    Active,
}

/// The parameters of the most recently received `mining.notify`, plus
/// the running difficulty (`swork` in the original). `Serialize` so a
/// caller can surface the current job as part of its own stats/API view.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SWork {
    pub job_id: String,
    pub prev_hash: String,
    pub coinbase1: String,
    pub coinbase2: String,
    pub merkle: Vec<String>,
    pub bbversion: String,
    pub nbit: String,
    pub ntime: String,
    pub clean: bool,
    pub diff: f64,
}

struct StratumIo {
    stream: Option<TcpStream>,
    buf: LineBuffer,
    active: bool,
}

struct PoolData {
    swork: SWork,
    nonce1: Option<String>,
    n2size: Option<u64>,
    nonce2: u64,
}

pub struct PoolSession {
    logger: slog::Logger,
    ctx: Arc<GlobalContext>,
    pool_no: u32,
    host: Mutex<String>,
    port: Mutex<String>,
    user: String,
    pass: String,
    proxy: Option<ParsedProxy>,
    /// Guards socket I/O and the receive buffer.
    stratum: Mutex<StratumIo>,
    /// Guards `swork` mutation, independent of `stratum` so a reader
    /// parsing a notify doesn't block a concurrent sender.
    pool: Mutex<PoolData>,
    pub stats: PoolStats,
    getwork_requested: AtomicU64,
    state: Mutex<StratumState>,
    stratum_notify: AtomicBool,
}

impl PoolSession {
    pub fn new(
        logger: slog::Logger,
        ctx: Arc<GlobalContext>,
        pool_no: u32,
        addr: SockAddr,
        user: impl Into<String>,
        pass: impl Into<String>,
        proxy: Option<ParsedProxy>,
    ) -> Self {
        Self {
            logger: logger.new(o!("pool" => pool_no)),
            ctx,
            pool_no,
            host: Mutex::new(addr.host),
            port: Mutex::new(addr.port),
            user: user.into(),
            pass: pass.into(),
            proxy,
            stratum: Mutex::new(StratumIo {
                stream: None,
                buf: LineBuffer::new(),
                active: false,
            }),
            pool: Mutex::new(PoolData {
                swork: SWork::default(),
                nonce1: None,
                n2size: None,
                nonce2: 0,
            }),
            stats: PoolStats::default(),
            getwork_requested: AtomicU64::new(0),
            state: Mutex::new(StratumState::Closed),
            stratum_notify: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> StratumState {
        *self.state.lock().unwrap()
    }

    pub fn swork(&self) -> SWork {
        self.pool.lock().unwrap().swork.clone()
    }

    pub fn nonce2(&self) -> u64 {
        self.pool.lock().unwrap().nonce2
    }

    /// Opens a connection to the configured host:port, enables
    /// keep-alive and disables Nagle, then performs `mining.subscribe`.
    pub fn initiate_stratum(&self) -> Result<(), NetError> {
        {
            let mut io = self.stratum.lock().unwrap();
            io.active = false;
        }

        let host = self.host.lock().unwrap().clone();
        let port = self.port.lock().unwrap().clone();
        if let Some(proxy) = &self.proxy {
            warn!(
                self.logger,
                "proxy {:?} configured via {} but only direct connections are implemented; connecting directly",
                proxy.proxy_type,
                proxy.proxy_host
            );
        }

        self.stats.mark_probed();
        let stream = TcpStream::connect((connect_host(&host), port.parse::<u16>().unwrap_or(80)))
            .map_err(|e| NetError::Transport(e.to_string()))?;
        configure_socket(&stream)?;

        {
            let mut io = self.stratum.lock().unwrap();
            io.stream = Some(stream);
            io.buf = LineBuffer::new();
        }

        let id = self.ctx.next_swork_id();
        let request = json!({"id": id, "method": "mining.subscribe", "params": []}).to_string();
        self.send_raw(&request)?;

        let line = self.recv_line_locked().ok_or(NetError::Timeout)?;
        let val: Value = serde_json::from_str(&line)?;

        let result = val.get("result").ok_or_else(|| NetError::JsonRpc(line.clone()))?;
        if result.is_null() {
            return Err(NetError::JsonRpc(line));
        }
        let error_is_null = val.get("error").map(|e| e.is_null()).unwrap_or(true);
        if !error_is_null {
            return Err(NetError::JsonRpc(line));
        }

        let nonce1 = result
            .get(1)
            .and_then(Value::as_str)
            .ok_or_else(|| NetError::JsonRpc("missing nonce1 in subscribe result".into()))?
            .to_string();
        let n2size = result
            .get(2)
            .and_then(Value::as_u64)
            .filter(|n| *n > 0)
            .ok_or_else(|| NetError::JsonRpc("missing n2size in subscribe result".into()))?;

        {
            let mut pool = self.pool.lock().unwrap();
            pool.nonce1 = Some(nonce1);
            pool.n2size = Some(n2size);
            pool.swork.diff = 1.0;
        }
        {
            let mut io = self.stratum.lock().unwrap();
            io.active = true;
        }
        *self.state.lock().unwrap() = StratumState::Subscribed;
        self.stats.mark_successful_connect();
        info!(self.logger, "subscribed");
        Ok(())
    }

    /// Sends `mining.authorize`, consuming any leading method
    /// notifications before treating the first non-method reply as the
    /// auth response.
    pub fn auth_stratum(&self) -> Result<(), NetError> {
        let id = self.ctx.next_swork_id();
        let request = json!({
            "id": id,
            "method": "mining.authorize",
            "params": [self.user.clone(), self.pass.clone()],
        })
        .to_string();
        self.send_raw(&request)?;

        let reply = loop {
            let line = self.recv_line_locked().ok_or(NetError::Timeout)?;
            if self.parse_method(&line) {
                continue;
            }
            break line;
        };

        let val: Value = serde_json::from_str(&reply)?;
        let result = val.get("result");
        let error_is_null = val.get("error").map(|e| e.is_null()).unwrap_or(true);
        let result_ok = result.map(|r| !r.is_null() && r.as_bool() != Some(false)).unwrap_or(false);
        if !result_ok || !error_is_null {
            return Err(NetError::JsonRpc(reply));
        }

        *self.state.lock().unwrap() = StratumState::Authorized;
        info!(self.logger, "stratum authorization success");
        Ok(())
    }

    /// Dispatches one line as a method notification. Returns `true` if
    /// it was recognized and handled (whether or not the handler
    /// itself succeeded), `false` if it should instead be treated as a
    /// plain RPC reply.
    pub fn parse_method(&self, line: &str) -> bool {
        let val: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(_) => return false,
        };
        let method = match val.get("method").and_then(Value::as_str) {
            Some(m) => m.to_string(),
            None => return false,
        };
        let error_non_null = val.get("error").map(|e| !e.is_null()).unwrap_or(false);
        if error_non_null {
            return false;
        }
        let params = val.get("params").cloned().unwrap_or(Value::Null);
        let lower = method.to_ascii_lowercase();

        if lower.starts_with("mining.notify") {
            let ok = self.parse_notify(&params);
            self.stratum_notify.store(ok, Ordering::Relaxed);
            return true;
        }
        if lower.starts_with("mining.set_difficulty") {
            self.parse_diff(&params);
            return true;
        }
        if lower.starts_with("client.reconnect") {
            let _ = self.parse_reconnect(&params);
            return true;
        }
        if lower.starts_with("client.get_version") {
            if let Some(id) = val.get("id").and_then(Value::as_u64) {
                let _ = self.send_version(id);
            }
            return true;
        }
        false
    }

    fn parse_notify(&self, params: &Value) -> bool {
        let field = |i: usize| params.get(i).and_then(Value::as_str).map(str::to_string);

        let job_id = field(0);
        let prev_hash = field(1);
        let coinbase1 = field(2);
        let coinbase2 = field(3);
        let bbversion = field(5);
        let nbit = field(6);
        let ntime = field(7);
        let clean = params.get(8).and_then(Value::as_bool).unwrap_or(false);

        let (job_id, prev_hash, coinbase1, coinbase2, bbversion, nbit, ntime) =
            match (job_id, prev_hash, coinbase1, coinbase2, bbversion, nbit, ntime) {
                (Some(a), Some(b), Some(c), Some(d), Some(e), Some(f), Some(g)) => {
                    (a, b, c, d, e, f, g)
                }
                _ => return false, // invariant 7: missing mandatory field leaves swork unmodified
            };

        let merkle: Vec<String> = params
            .get(4)
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        {
            let mut pool = self.pool.lock().unwrap();
            pool.swork = SWork {
                job_id,
                prev_hash,
                coinbase1,
                coinbase2,
                merkle,
                bbversion,
                nbit,
                ntime,
                clean,
                diff: pool.swork.diff,
            };
            if clean {
                pool.nonce2 = 0;
            }
        }

        self.getwork_requested.fetch_add(1, Ordering::Relaxed);
        self.ctx.increment_total_getworks();
        *self.state.lock().unwrap() = StratumState::Active;
        true
    }

    fn parse_diff(&self, params: &Value) -> bool {
        let diff = match params.get(0).and_then(Value::as_f64) {
            Some(d) if d != 0.0 => d,
            _ => return false,
        };
        self.pool.lock().unwrap().swork.diff = diff;
        debug!(self.logger, "difficulty set"; "diff" => diff);
        true
    }

    fn parse_reconnect(&self, params: &Value) -> Result<(), NetError> {
        if let Some(host) = params.get(0).and_then(Value::as_str) {
            *self.host.lock().unwrap() = host.to_string();
        }
        if let Some(port) = params.get(1) {
            let port_str = match port {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                _ => self.port.lock().unwrap().clone(),
            };
            *self.port.lock().unwrap() = port_str;
        }
        info!(self.logger, "reconnect requested");
        self.initiate_stratum()?;
        self.auth_stratum()
    }

    fn send_version(&self, id: u64) -> bool {
        let reply = json!({
            "id": id,
            "result": format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            "error": Value::Null,
        })
        .to_string();
        self.send_raw(&reply).is_ok()
    }

    /// Marks the session inactive then closes the socket. Mirrors
    /// `suspend_stratum`.
    pub fn suspend_stratum(&self) {
        info!(self.logger, "closing stratum socket");
        let mut io = self.stratum.lock().unwrap();
        io.active = false;
        io.stream = None;
        *self.state.lock().unwrap() = StratumState::Closed;
    }

    /// Sends `s` if the pool is active; fails without touching the
    /// socket otherwise (invariant 10).
    pub fn stratum_send(&self, s: &str) -> Result<(), NetError> {
        let active = self.stratum.lock().unwrap().active;
        if !active {
            return Err(NetError::NotActive);
        }
        self.send_raw(s)
    }

    fn send_raw(&self, s: &str) -> Result<(), NetError> {
        let mut io = self.stratum.lock().unwrap();
        let stream = io.stream.as_mut().ok_or(NetError::NotActive)?;
        let sent = send_line_locked(stream, s)?;
        drop(io);
        self.stats.record_sent(sent as u64);
        Ok(())
    }

    fn recv_line_locked(&self) -> Option<String> {
        let mut io = self.stratum.lock().unwrap();
        let StratumIo { stream, buf, .. } = &mut *io;
        let stream = stream.as_mut()?;
        buf.recv_line(stream)
    }
}

/// Strips IPv6 brackets (if any) from a host so it's usable with
/// `TcpStream::connect`, which doesn't accept `"[::1]"` literally.
/// `url::extract_sockaddr` keeps IPv6 hosts bracketed, so this must trim
/// both ends, not just the leading `[`.
fn connect_host(host: &str) -> &str {
    host.trim_matches(['[', ']'])
}

fn configure_socket(stream: &TcpStream) -> Result<(), NetError> {
    stream
        .set_nodelay(true)
        .map_err(|e| NetError::Transport(e.to_string()))?;
    let sock = socket2::SockRef::from(stream);
    let keepalive = socket2::TcpKeepalive::new()
        .with_time(Duration::from_secs(60))
        .with_interval(Duration::from_secs(60));
    sock.set_tcp_keepalive(&keepalive)
        .map_err(|e| NetError::Transport(e.to_string()))?;
    Ok(())
}

/// Writes `s` followed by `\n` under a nonblocking write loop, tracking
/// the *delta* bytes accepted by each `write()` call (spec.md §9(b)
/// fix: the original's `len -= ssent` used the cumulative total).
fn send_line_locked(stream: &mut TcpStream, s: &str) -> Result<usize, NetError> {
    let mut data = s.as_bytes().to_vec();
    data.push(b'\n');
    let total = data.len();

    stream
        .set_nonblocking(true)
        .map_err(|e| NetError::Transport(e.to_string()))?;

    let mut offset = 0;
    let result = loop {
        if offset >= total {
            break Ok(total);
        }
        match stream.write(&data[offset..]) {
            Ok(sent) => offset += sent,
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                std::thread::sleep(Duration::from_millis(5));
            }
            Err(e) => break Err(NetError::Transport(e.to_string())),
        }
    };
    let _ = stream.set_nonblocking(false);
    result
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn connect_host_strips_ipv6_brackets_both_ends() {
        assert_eq!(connect_host("[::1]"), "::1");
        assert_eq!(connect_host("[2001:db8::1]"), "2001:db8::1");
    }

    #[test]
    fn connect_host_leaves_plain_hosts_unchanged() {
        assert_eq!(connect_host("127.0.0.1"), "127.0.0.1");
        assert_eq!(connect_host("pool.example.com"), "pool.example.com");
    }

    fn session() -> PoolSession {
        PoolSession::new(
            crate::logging::root(),
            Arc::new(GlobalContext::new()),
            0,
            SockAddr {
                host: "127.0.0.1".into(),
                port: "3333".into(),
            },
            "user",
            "pass",
            None,
        )
    }

    #[test]
    fn s6_notify_happy_path() {
        let pool = session();
        let params: Value = serde_json::from_str(
            r#"["job1","prev","cb1","cb2",["m0","m1"],"ver","nbit","nt",true]"#,
        )
        .unwrap();
        assert!(pool.parse_notify(&params));

        let swork = pool.swork();
        assert_eq!(swork.job_id, "job1");
        assert_eq!(swork.merkle.len(), 2);
        assert!(swork.clean);
        assert_eq!(pool.nonce2(), 0);
        assert_eq!(pool.ctx.total_getworks.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn invariant7_missing_field_leaves_swork_unmodified() {
        let pool = session();
        let good: Value = serde_json::from_str(
            r#"["job1","prev","cb1","cb2",["m0"],"ver","nbit","nt",false]"#,
        )
        .unwrap();
        assert!(pool.parse_notify(&good));

        let bad: Value = serde_json::from_str(r#"["job2","prev2","cb1","cb2",["m0"]]"#).unwrap();
        assert!(!pool.parse_notify(&bad));

        assert_eq!(pool.swork().job_id, "job1");
    }

    #[test]
    fn invariant8_clean_resets_nonce2_atomically() {
        let pool = session();
        pool.pool.lock().unwrap().nonce2 = 42;
        let params: Value = serde_json::from_str(
            r#"["job1","prev","cb1","cb2",["m0"],"ver","nbit","nt",true]"#,
        )
        .unwrap();
        assert!(pool.parse_notify(&params));
        assert_eq!(pool.nonce2(), 0);
    }

    #[test]
    fn invariant10_send_fails_when_not_active() {
        let pool = session();
        assert!(pool.stratum_send("{}").is_err());
    }

    #[test]
    fn set_difficulty_updates_diff() {
        let pool = session();
        let params: Value = serde_json::from_str("[4.5]").unwrap();
        assert!(pool.parse_diff(&params));
        assert_eq!(pool.swork().diff, 4.5);
    }

    #[test]
    fn zero_difficulty_is_rejected() {
        let pool = session();
        let params: Value = serde_json::from_str("[0]").unwrap();
        assert!(!pool.parse_diff(&params));
    }
}
