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

//! Transfer settings shared by both roles

use std::time::Duration;
use crate::frame::SendInit;
use crate::protocol::{MAX_RETRIES, MAXL, RECV_FILE_PREFIX, TIME};

#[derive(Debug, Clone)]
pub struct Config {
    /// How long to wait for each reply
    pub timeout: Duration,

    /// Attempts per packet (sender) and timeouts tolerated while waiting
    /// for the send-init (receiver)
    pub retries: u32,

    /// Consecutive timeouts the receiver tolerates once the session is up.
    /// `None` waits forever.
    pub receive_retries: Option<u32>,

    /// Largest data chunk this side sends or accepts
    pub max_data_len: u8,

    /// Prepended to received file names
    pub recv_prefix: String,

    /// Warn when a peer's sequence number disagrees with ours
    pub check_sequence: bool,

    /// Receiver re-acks a retransmitted frame instead of dispatching it twice
    pub drop_duplicates: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(TIME as u64),
            retries: MAX_RETRIES,
            receive_retries: Some(MAX_RETRIES),
            max_data_len: MAXL,
            recv_prefix: RECV_FILE_PREFIX.to_string(),
            check_sequence: false,
            drop_duplicates: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Option record advertised in the send-init
    pub fn send_init(&self) -> SendInit {
        let secs = self.timeout.as_secs().clamp(1, u8::MAX as u64) as u8;
        SendInit {
            maxl: self.chunk_len(),
            time: secs,
            ..SendInit::default()
        }
    }

    /// Our own chunk size. Never 0: an empty chunk marks the end of a file.
    pub fn chunk_len(&self) -> u8 {
        self.max_data_len.max(1)
    }

    /// Chunk size to use after the peer advertised `peer_maxl`
    pub fn negotiated_maxl(&self, peer_maxl: u8) -> u8 {
        if peer_maxl == 0 {
            self.chunk_len()
        } else {
            self.chunk_len().min(peer_maxl)
        }
    }
}
