use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::protocol::Message;

use crate::prelude::*;

/// Bounded queue of inbound messages shared between the reader thread and the transport.
///
/// When full, pushing a message pushes out the oldest one, so readers always see the most
/// recent state of the vehicle.
pub(super) struct Inbox {
    state: Mutex<InboxState>,
    available: Condvar,
    capacity: usize,
}

struct InboxState {
    messages: VecDeque<Message>,
    closed: bool,
}

impl Inbox {
    pub(super) fn new(capacity: usize) -> Self {
        Self {
            state: Mutex::new(InboxState {
                messages: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            available: Condvar::new(),
            capacity: capacity.max(1),
        }
    }

    /// Appends a message.
    ///
    /// Returns the message that was pushed out of the full queue.
    pub(super) fn push(&self, message: Message) -> Result<Option<Message>> {
        let mut state = self.state.lock()?;

        let pushed_out = if state.messages.len() >= self.capacity {
            state.messages.pop_front()
        } else {
            None
        };
        state.messages.push_back(message);

        self.available.notify_one();
        Ok(pushed_out)
    }

    /// Marks inbox as closed. Queued messages are still delivered.
    pub(super) fn close(&self) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        state.closed = true;
        self.available.notify_all();
    }

    /// Takes the oldest message, waiting up to `timeout` for one to arrive.
    ///
    /// Fails with [`Error::Disconnected`] once inbox is closed and drained.
    pub(super) fn recv_timeout(&self, timeout: Duration) -> Result<Option<Message>> {
        let started = Instant::now();
        let mut state = self.state.lock()?;

        loop {
            if let Some(message) = state.messages.pop_front() {
                return Ok(Some(message));
            }
            if state.closed {
                return Err(Error::Disconnected);
            }

            let remaining = match timeout.checked_sub(started.elapsed()) {
                Some(remaining) if !remaining.is_zero() => remaining,
                _ => return Ok(None),
            };
            state = self.available.wait_timeout(state, remaining)?.0;
        }
    }
}
