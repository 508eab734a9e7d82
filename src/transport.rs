// Copyright (C) 2026 Brian Johnson
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

use std::time::Duration;

// ============================================================================
// Transport Trait
// ============================================================================

/// Message channel the state machines talk through. Delivery is best effort;
/// every call returns at most one whole packet.
pub trait Transport: Send {
    fn send(&mut self, msg: &[u8]) -> std::io::Result<()>;

    /// Next message, or `None` once `timeout` passes without one.
    fn receive_with_timeout(&mut self, timeout: Duration) -> std::io::Result<Option<Vec<u8>>>;
}

// ============================================================================
// Mock Transport for Testing
// ============================================================================

#[cfg(test)]
pub struct MockTransport {
    // Messages to hand out (None = timeout)
    replies: Vec<Option<Vec<u8>>>,
    reply_pos: usize,
    // Track what was sent
    send_log: Vec<Vec<u8>>,
    // Expected sends for verification
    expected_sends: Vec<Vec<u8>>,
}

#[cfg(test)]
impl MockTransport {
    pub fn new(replies: Vec<Option<Vec<u8>>>, expected_sends: Vec<Vec<u8>>) -> Self {
        MockTransport {
            replies,
            reply_pos: 0,
            send_log: Vec::new(),
            expected_sends,
        }
    }
}

#[cfg(test)]
impl Transport for MockTransport {
    fn send(&mut self, msg: &[u8]) -> std::io::Result<()> {
        self.send_log.push(msg.to_vec());
        Ok(())
    }

    fn receive_with_timeout(&mut self, _timeout: Duration) -> std::io::Result<Option<Vec<u8>>> {
        // Out of replies = timeout
        if self.reply_pos >= self.replies.len() {
            return Ok(None);
        }

        let reply = self.replies[self.reply_pos].clone();
        self.reply_pos += 1;
        Ok(reply)
    }
}

#[cfg(test)]
impl Drop for MockTransport {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }

        assert_eq!(
            self.reply_pos,
            self.replies.len(),
            "MockTransport dropped with {} unconsumed replies (read {} of {})",
            self.replies.len() - self.reply_pos,
            self.reply_pos,
            self.replies.len()
        );

        assert_eq!(
            &self.send_log,
            &self.expected_sends,
            "MockTransport send log mismatch!\nExpected {} messages:\n{:02X?}\nGot {} messages:\n{:02X?}",
            self.expected_sends.len(),
            self.expected_sends,
            self.send_log.len(),
            self.send_log
        );
    }
}

// ============================================================================
// In-memory link for end-to-end tests
// ============================================================================


// ============================================================================
// Fault injection for tests
// ============================================================================

#[cfg(test)]
pub mod faults {
    use super::Transport;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Wraps a transport and flips one header bit in the first copy of every
    /// distinct message it sends. Retransmissions of the same bytes go through
    /// untouched.
    pub struct CorruptFirstCopy<T: Transport> {
        inner: T,
        last_original: Option<Vec<u8>>,
        pub corrupted: Arc<AtomicUsize>,
    }

    impl<T: Transport> CorruptFirstCopy<T> {
        pub fn new(inner: T) -> Self {
            CorruptFirstCopy {
                inner,
                last_original: None,
                corrupted: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl<T: Transport> Transport for CorruptFirstCopy<T> {
        fn send(&mut self, msg: &[u8]) -> std::io::Result<()> {
            if self.last_original.as_deref() == Some(msg) {
                return self.inner.send(msg);
            }

            self.last_original = Some(msg.to_vec());
            let mut damaged = msg.to_vec();
            // Sequence byte: inside the checksum span for every packet shape
            damaged[2] ^= 0x20;
            self.corrupted.fetch_add(1, Ordering::SeqCst);
            self.inner.send(&damaged)
        }

        fn receive_with_timeout(&mut self, timeout: Duration) -> std::io::Result<Option<Vec<u8>>> {
            self.inner.receive_with_timeout(timeout)
        }
    }

    /// Counts the messages of one packet type passing through `send`.
    pub struct CountingTransport<T: Transport> {
        inner: T,
        tag: u8,
        pub count: Arc<AtomicUsize>,
    }

    impl<T: Transport> CountingTransport<T> {
        pub fn new(inner: T, tag: u8) -> Self {
            CountingTransport {
                inner,
                tag,
                count: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl<T: Transport> Transport for CountingTransport<T> {
        fn send(&mut self, msg: &[u8]) -> std::io::Result<()> {
            if msg.get(3) == Some(&self.tag) {
                self.count.fetch_add(1, Ordering::SeqCst);
            }
            self.inner.send(msg)
        }

        fn receive_with_timeout(&mut self, timeout: Duration) -> std::io::Result<Option<Vec<u8>>> {
            self.inner.receive_with_timeout(timeout)
        }
    }
}
