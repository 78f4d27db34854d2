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

//! Thread-safe FIFO queue with freeze semantics (C3).
//!
//! Grounded in cgminer's `tq_new`/`tq_push`/`tq_pop`/`tq_freeze`/`tq_thaw`
//! (`util.c`): a `Mutex`-guarded `VecDeque` plus a `Condvar`, translated
//! from the original's pthread mutex/cond pair. `pop` takes an absolute
//! deadline (`Instant`), matching `tq_pop`'s `abstime` (the original uses
//! wall-clock `timespec`; we use `Instant` since it's monotonic and the
//! original's *intent* — bound how long a waiter blocks — is the same
//! either way).

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::Instant;

struct State<T> {
    items: VecDeque<T>,
    frozen: bool,
}

/// A bounded-wait, freezable FIFO queue for handing work or results
/// between threads.
pub struct ThreadQueue<T> {
    state: Mutex<State<T>>,
    cond: Condvar,
}

impl<T> ThreadQueue<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                items: VecDeque::new(),
                frozen: false,
            }),
            cond: Condvar::new(),
        }
    }

    /// Appends `data` and wakes one waiter. Fails without enqueuing if
    /// the queue is frozen.
    pub fn push(&self, data: T) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.frozen {
            return false;
        }
        state.items.push_back(data);
        self.cond.notify_one();
        true
    }

    /// Pops the oldest element, waiting on the condition variable until
    /// one is available, the queue is frozen, or `deadline` (if given)
    /// passes. Returns `None` on timeout or if woken with nothing to
    /// pop (e.g. a freeze with an empty queue).
    pub fn pop(&self, deadline: Option<Instant>) -> Option<T> {
        let mut state = self.state.lock().unwrap();
        loop {
            if let Some(item) = state.items.pop_front() {
                return Some(item);
            }
            match deadline {
                None => {
                    state = self.cond.wait(state).unwrap();
                }
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    let (guard, timeout_result) =
                        self.cond.wait_timeout(state, deadline - now).unwrap();
                    state = guard;
                    if timeout_result.timed_out() && state.items.is_empty() {
                        return None;
                    }
                }
            }
            if state.items.is_empty() && state.frozen {
                return None;
            }
        }
    }

    /// Freezes the queue: subsequent `push` calls fail, and any waiter
    /// in `pop` re-evaluates (and returns `None` if the queue is empty).
    pub fn freeze(&self) {
        let mut state = self.state.lock().unwrap();
        state.frozen = true;
        self.cond.notify_all();
    }

    /// Unfreezes the queue, allowing `push` to succeed again.
    pub fn thaw(&self) {
        let mut state = self.state.lock().unwrap();
        state.frozen = false;
        self.cond.notify_all();
    }
}

impl<T> Default for ThreadQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn push_then_pop_is_fifo() {
        let q = ThreadQueue::new();
        q.push(1);
        q.push(2);
        assert_eq!(q.pop(None), Some(1));
        assert_eq!(q.pop(None), Some(2));
    }

    #[test]
    fn frozen_push_fails_without_enqueuing() {
        let q = ThreadQueue::new();
        q.freeze();
        assert!(!q.push(1));
        assert_eq!(
            q.pop(Some(Instant::now() + Duration::from_millis(10))),
            None
        );
    }

    #[test]
    fn pop_honors_deadline() {
        let q: ThreadQueue<i32> = ThreadQueue::new();
        let start = Instant::now();
        let result = q.pop(Some(start + Duration::from_millis(30)));
        assert_eq!(result, None);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn push_wakes_a_blocked_popper() {
        let q = Arc::new(ThreadQueue::new());
        let q2 = q.clone();
        let handle = std::thread::spawn(move || q2.pop(None));
        std::thread::sleep(Duration::from_millis(20));
        q.push(42);
        assert_eq!(handle.join().unwrap(), Some(42));
    }

    #[test]
    fn freeze_wakes_a_blocked_popper_with_none() {
        let q: Arc<ThreadQueue<i32>> = Arc::new(ThreadQueue::new());
        let q2 = q.clone();
        let handle = std::thread::spawn(move || q2.pop(None));
        std::thread::sleep(Duration::from_millis(20));
        q.freeze();
        assert_eq!(handle.join().unwrap(), None);
    }
}
