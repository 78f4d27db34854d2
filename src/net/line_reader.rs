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

//! Line-framed socket reader with a growable buffer (C4).
//!
//! Grounded in `recv_line`/`recalloc_sock`/`clear_sock` (`util.c`).
//! Two corrected behaviors from spec.md §9's flagged issues are applied
//! here: the receive-buffer compaction after splitting off a line copies
//! `buflen - len` bytes (not `buflen - len + 1`, which overread by one
//! in the original).

use std::io::{ErrorKind, Read};
use std::net::TcpStream;
use std::time::{Duration, Instant};

/// Buffer growth granularity. 8 KiB, matching cgminer's `RBUFSIZE`.
pub const RBUFSIZE: usize = 8192;

const LINE_WAIT_TIMEOUT: Duration = Duration::from_secs(60);

/// Growable, newline-framed receive buffer for one pool's socket.
/// All mutation is expected to happen under the pool's `stratum_lock`
/// (spec.md §4.4) — this type itself does no locking, it's the payload
/// the lock protects.
#[derive(Default)]
pub struct LineBuffer {
    buf: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn find_newline(&self) -> Option<usize> {
        self.buf.iter().position(|&b| b == b'\n')
    }

    /// Extracts and returns the next newline-terminated record from
    /// `stream`, reading more data as needed. Returns `None` on timeout
    /// or any I/O failure, draining the socket non-blocking first so a
    /// desynchronized stream doesn't wedge the next call.
    pub fn recv_line(&mut self, stream: &mut TcpStream) -> Option<String> {
        if self.find_newline().is_none() {
            let start = Instant::now();
            loop {
                let elapsed = start.elapsed();
                if elapsed >= LINE_WAIT_TIMEOUT {
                    self.clear(stream);
                    return None;
                }
                let remaining = LINE_WAIT_TIMEOUT - elapsed;
                if stream.set_read_timeout(Some(remaining)).is_err() {
                    self.clear(stream);
                    return None;
                }

                let mut scratch = [0u8; RBUFSIZE];
                match stream.read(&mut scratch) {
                    Ok(0) => {
                        // peer closed
                        self.clear(stream);
                        return None;
                    }
                    Ok(n) => {
                        self.buf.extend_from_slice(&scratch[..n]);
                        if self.find_newline().is_some() {
                            break;
                        }
                    }
                    Err(e)
                        if e.kind() == ErrorKind::WouldBlock
                            || e.kind() == ErrorKind::TimedOut =>
                    {
                        continue;
                    }
                    Err(_) => {
                        self.clear(stream);
                        return None;
                    }
                }
            }
        }

        let nl = match self.find_newline() {
            Some(idx) => idx,
            None => {
                self.clear(stream);
                return None;
            }
        };

        let line = String::from_utf8_lossy(&self.buf[..nl]).into_owned();
        let buflen = self.buf.len();
        let len = nl; // bytes before the '\n'
        let tail_start = len + 1;
        if buflen > tail_start {
            self.buf.copy_within(tail_start..buflen, 0);
            self.buf.truncate(buflen - tail_start);
        } else {
            self.buf.clear();
        }

        Some(line)
    }

    /// Drains whatever is currently pending on the socket without
    /// blocking and resets the buffer, mirroring `clear_sock`.
    fn clear(&mut self, stream: &mut TcpStream) {
        self.buf.clear();
        if stream.set_nonblocking(true).is_err() {
            return;
        }
        let mut scratch = [0u8; RBUFSIZE];
        loop {
            match stream.read(&mut scratch) {
                Ok(0) => break,
                Ok(_) => continue,
                Err(_) => break,
            }
        }
        let _ = stream.set_nonblocking(false);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::io::Write;
    use std::net::TcpListener;

    fn pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (server, _) = listener.accept().unwrap();
        (client, server)
    }

    #[test]
    fn recv_line_never_contains_newline() {
        let (mut client, mut server) = pair();
        server.write_all(b"hello\nworld\n").unwrap();

        let mut lb = LineBuffer::new();
        let first = lb.recv_line(&mut client).unwrap();
        assert_eq!(first, "hello");
        assert!(!first.contains('\n'));

        let second = lb.recv_line(&mut client).unwrap();
        assert_eq!(second, "world");
    }

    #[test]
    fn retains_tail_after_split() {
        let (mut client, mut server) = pair();
        server.write_all(b"line1\nline2").unwrap();

        let mut lb = LineBuffer::new();
        let first = lb.recv_line(&mut client).unwrap();
        assert_eq!(first, "line1");
        assert_eq!(lb.buf, b"line2");
    }
}
