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

//! Drives the stratum line reader against a real loopback `TcpStream`
//! pair, and the work queue across real OS threads, rather than through
//! a single-threaded unit test.

use bfminer::net::line_reader::LineBuffer;
use bfminer::queue::ThreadQueue;

use std::io::Write;
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn loopback_pair() -> (TcpStream, TcpStream) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let client = TcpStream::connect(addr).unwrap();
    let (server, _) = listener.accept().unwrap();
    (client, server)
}

#[test]
fn recv_line_reassembles_a_message_sent_in_chunks() {
    let (mut client, mut server) = loopback_pair();

    let writer = std::thread::spawn(move || {
        server.write_all(br#"{"id":1,"method":"mining.notify","params":["#).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        server.write_all(br#""job1"]}"#).unwrap();
        server.write_all(b"\n").unwrap();
    });

    let mut buf = LineBuffer::new();
    let line = buf.recv_line(&mut client).expect("line within timeout");
    assert_eq!(
        line,
        r#"{"id":1,"method":"mining.notify","params":["job1"]}"#
    );

    writer.join().unwrap();
}

#[test]
fn recv_line_splits_two_messages_delivered_in_one_write() {
    let (mut client, mut server) = loopback_pair();
    server
        .write_all(b"{\"a\":1}\n{\"b\":2}\n")
        .unwrap();

    let mut buf = LineBuffer::new();
    let first = buf.recv_line(&mut client).unwrap();
    let second = buf.recv_line(&mut client).unwrap();
    assert_eq!(first, "{\"a\":1}");
    assert_eq!(second, "{\"b\":2}");
}

#[test]
fn recv_line_returns_none_when_peer_closes_mid_read() {
    let (mut client, server) = loopback_pair();
    drop(server);

    let mut buf = LineBuffer::new();
    assert_eq!(buf.recv_line(&mut client), None);
}

/// Feeds parsed "notify" payloads from a reader thread into a shared
/// queue and drains them on the main thread, the same producer/consumer
/// shape the pool session and a device scan loop use in production.
#[test]
fn queue_moves_stratum_lines_between_reader_and_worker_threads() {
    let (mut client, mut server) = loopback_pair();
    let queue: Arc<ThreadQueue<String>> = Arc::new(ThreadQueue::new());

    let writer = std::thread::spawn(move || {
        for i in 0..5 {
            server
                .write_all(format!("{{\"job\":{}}}\n", i).as_bytes())
                .unwrap();
            std::thread::sleep(Duration::from_millis(5));
        }
    });

    let reader_queue = queue.clone();
    let reader = std::thread::spawn(move || {
        let mut buf = LineBuffer::new();
        for _ in 0..5 {
            let line = buf.recv_line(&mut client).expect("line within timeout");
            reader_queue.push(line);
        }
    });

    let deadline = Instant::now() + Duration::from_secs(5);
    let mut received = Vec::new();
    for _ in 0..5 {
        received.push(queue.pop(Some(deadline)).expect("queued line"));
    }

    writer.join().unwrap();
    reader.join().unwrap();

    assert_eq!(
        received,
        vec!["{\"job\":0}", "{\"job\":1}", "{\"job\":2}", "{\"job\":3}", "{\"job\":4}"]
    );
}
