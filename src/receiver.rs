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

use std::ffi::OsString;
use std::marker::PhantomData;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use crate::config::Config;
use crate::frame::{Frame, FrameError, Packet, SendInit};
use crate::seq::Seq;
use crate::transport::Transport;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ReceiverError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("no connection: sender silent for {attempts} timeouts")]
    NoConnection { attempts: u32 },

    #[error("sender went silent after {timeouts} timeouts waiting for packet {seq}")]
    Idle { seq: u8, timeouts: u32 },

    #[error("file {} could not be created: {source}", .path.display())]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unusable file name {0:?}")]
    InvalidFileName(String),

    #[error("cannot build packet: {0}")]
    Frame(#[from] FrameError),

    #[error("Transfer complete")]
    TransferComplete,
}

// ============================================================================
// Session
// ============================================================================

struct OpenOutput {
    path: PathBuf,
    file: File,
    written: u64,
}

/// The receiver's only file-system state: the output file currently being
/// written, if any. `F` opens it, `Z` closes it.
pub struct Session {
    output_dir: PathBuf,
    prefix: String,
    current: Option<OpenOutput>,
}

impl Session {
    pub fn new(output_dir: PathBuf, prefix: String) -> Self {
        Session { output_dir, prefix, current: None }
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Creates (or truncates) `<prefix><name>` in the output directory.
    /// Directory parts of `name` are dropped.
    pub fn open(&mut self, name: &[u8]) -> Result<&Path, ReceiverError> {
        let name = name_from_wire(name);
        let base = Path::new(&name)
            .file_name()
            .ok_or_else(|| ReceiverError::InvalidFileName(name.to_string_lossy().into_owned()))?;

        let mut file_name = OsString::from(&self.prefix);
        file_name.push(base);
        let path = self.output_dir.join(file_name);

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o644);
        }

        let file = options.open(&path).map_err(|source| ReceiverError::CreateFile {
            path: path.clone(),
            source,
        })?;

        let output = self.current.insert(OpenOutput { path, file, written: 0 });
        Ok(&output.path)
    }

    /// Appends to the open file. Returns false when no file is open.
    pub fn write(&mut self, data: &[u8]) -> Result<bool, ReceiverError> {
        match self.current.as_mut() {
            Some(output) => {
                output.file.write_all(data)?;
                output.written += data.len() as u64;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Flushes and closes the open file, returning its path and size.
    pub fn close(&mut self) -> Result<Option<(PathBuf, u64)>, ReceiverError> {
        match self.current.take() {
            Some(mut output) => {
                output.file.flush()?;
                Ok(Some((output.path, output.written)))
            }
            None => Ok(None),
        }
    }
}

/// File names travel as raw bytes; keep them byte-for-byte where the
/// platform allows it.
#[cfg(unix)]
fn name_from_wire(bytes: &[u8]) -> OsString {
    use std::os::unix::ffi::OsStrExt;
    std::ffi::OsStr::from_bytes(bytes).to_os_string()
}

#[cfg(not(unix))]
fn name_from_wire(bytes: &[u8]) -> OsString {
    OsString::from(String::from_utf8_lossy(bytes).into_owned())
}

// ============================================================================
// States
// ============================================================================

pub struct AwaitNegotiate;
pub struct AwaitPacket;

// ============================================================================
// FSM Structure
// ============================================================================

pub struct ReceiverFsm<State> {
    state: PhantomData<State>,
    transport: Box<dyn Transport>,
    config: Config,
    session: Session,
    seq: Seq,
    // Sequence number of the last frame we accepted, and the send-init reply
    last_accepted: Option<u8>,
    negotiated: Option<SendInit>,
}

// ============================================================================
// Trait
// ============================================================================

pub trait ReceiverState: Send {
    fn step(self: Box<Self>) -> Result<Box<dyn ReceiverState>, ReceiverError>;
}

// ============================================================================
// Helper to transition states
// ============================================================================

impl<S> ReceiverFsm<S> {
    fn transition<T>(self) -> Box<ReceiverFsm<T>> {
        Box::new(ReceiverFsm {
            state: PhantomData,
            transport: self.transport,
            config: self.config,
            session: self.session,
            seq: self.seq,
            last_accepted: self.last_accepted,
            negotiated: self.negotiated,
        })
    }

    fn io_error(&self, e: std::io::Error) -> ReceiverError {
        let type_name = std::any::type_name::<S>();
        let state_name = type_name.split("::").last().unwrap_or(type_name);
        ReceiverError::Io(std::io::Error::new(
            e.kind(),
            format!("{} (in state: {})", e, state_name)
        ))
    }

    fn reply(&mut self, seq: u8, packet: Packet) -> Result<(), ReceiverError> {
        let kind = packet.kind();
        let bytes = Frame::new(seq, packet).encode()?;
        self.transport.send(&bytes).map_err(|e| self.io_error(e))?;
        debug!("Sent: '{}' seq={}", kind, seq);
        Ok(())
    }

    fn receive(&mut self) -> Result<Option<Vec<u8>>, ReceiverError> {
        self.transport
            .receive_with_timeout(self.config.timeout)
            .map_err(|e| self.io_error(e))
    }
}

// ============================================================================
// State Implementations
// ============================================================================

impl ReceiverFsm<AwaitNegotiate> {
    /// Waits for the sender's `S` and answers with our option record. Gives
    /// up after `retries` timeouts in a row.
    pub fn await_negotiate(&mut self) -> Result<SendInit, ReceiverError> {
        let mut timeouts = 0;

        loop {
            let Some(msg) = self.receive()? else {
                timeouts += 1;
                info!("Sender not ready");
                if timeouts >= self.config.retries {
                    return Err(ReceiverError::NoConnection { attempts: timeouts });
                }
                continue;
            };
            timeouts = 0;

            match Frame::decode(&msg) {
                Ok(Frame { seq, packet: Packet::SendInit(init) }) => {
                    debug!("Received: 'S' seq={} maxl={} time={}", seq, init.maxl, init.time);

                    let answer = SendInit {
                        maxl: self.config.negotiated_maxl(init.maxl),
                        ..init
                    };
                    self.reply(self.seq.value(), Packet::Ack(Some(answer)))?;
                    self.negotiated = Some(answer);
                    self.last_accepted = Some(seq);
                    self.seq.advance();
                    return Ok(init);
                }
                Ok(other) => {
                    warn!("Expected 'S', got '{}' seq={}", other.packet.kind(), other.seq);
                    self.reply(self.seq.value(), Packet::Nak)?;
                }
                Err(e) => {
                    debug!("[incorrect crc] {}", e);
                    self.reply(self.seq.value(), Packet::Nak)?;
                }
            }
        }
    }
}

impl ReceiverState for ReceiverFsm<AwaitNegotiate> {
    fn step(self: Box<Self>) -> Result<Box<dyn ReceiverState>, ReceiverError> {
        let mut fsm = *self;
        fsm.await_negotiate()?;
        info!("Connection established");
        let next = fsm.transition::<AwaitPacket>();
        Ok(next as Box<dyn ReceiverState>)
    }
}

impl ReceiverFsm<AwaitPacket> {
    /// Waits for the next intact packet, NAKing damaged copies, and acks it
    /// under our current sequence number. `None` means an intact packet that
    /// cannot be used; it was acknowledged all the same.
    pub fn receive_one(&mut self) -> Result<Option<Frame>, ReceiverError> {
        let expected = self.seq.value();
        let mut timeouts = 0;

        loop {
            let Some(msg) = self.receive()? else {
                timeouts += 1;
                debug!("[timeout] waiting for seq = {}, try = {}", expected, timeouts);
                if let Some(limit) = self.config.receive_retries {
                    if timeouts >= limit {
                        if self.session.is_open() {
                            warn!("Sender went quiet with a file still open");
                        }
                        return Err(ReceiverError::Idle { seq: expected, timeouts });
                    }
                }
                continue;
            };
            timeouts = 0;

            let frame = match Frame::decode(&msg) {
                Ok(frame) => frame,
                Err(e) if e.is_corrupt() => {
                    debug!("[incorrect crc] seq = {}: {}", expected, e);
                    self.reply(expected, Packet::Nak)?;
                    continue;
                }
                Err(e) => {
                    warn!("Ignoring packet {}: {}", expected, e);
                    self.reply(expected, Packet::Ack(None))?;
                    return Ok(None);
                }
            };

            if self.config.drop_duplicates
                && frame.seq != expected
                && Some(frame.seq) == self.last_accepted
            {
                debug!("Packet {} arrived again, acknowledging without processing", frame.seq);
                let answer = match frame.packet {
                    Packet::SendInit(_) => Packet::Ack(self.negotiated),
                    _ => Packet::Ack(None),
                };
                self.reply(frame.seq, answer)?;
                continue;
            }

            if self.config.check_sequence && frame.seq != expected {
                warn!("Packet carries seq {} but {} was expected", frame.seq, expected);
            }

            debug!("Received: '{}' seq={}", frame.packet.kind(), frame.seq);
            self.reply(expected, Packet::Ack(None))?;
            self.last_accepted = Some(frame.seq);
            return Ok(Some(frame));
        }
    }

    /// Acts on an acknowledged packet. `B` ends the session.
    pub fn dispatch(&mut self, frame: Frame) -> Result<(), ReceiverError> {
        match frame.packet {
            Packet::FileHeader(name) => {
                if let Some((path, _)) = self.session.close()? {
                    warn!("New file header while {} was still open; closed it", path.display());
                }
                let path = self.session.open(&name)?;
                info!("File {} created", path.display());
                Ok(())
            }
            Packet::Data(data) => {
                if !self.session.write(&data)? {
                    warn!("Data packet {} with no open file, {} bytes dropped", frame.seq, data.len());
                }
                Ok(())
            }
            Packet::EndOfFile => {
                match self.session.close()? {
                    Some((path, written)) => info!("Received {} ({} bytes)", path.display(), written),
                    None => warn!("End of file {} with no open file", frame.seq),
                }
                Ok(())
            }
            Packet::EndOfTransmission => {
                if let Some((path, written)) = self.session.close()? {
                    warn!("Transmission ended inside {} ({} bytes written)", path.display(), written);
                }
                Err(ReceiverError::TransferComplete)
            }
            other => {
                warn!("Ignoring unexpected '{}' packet {}", other.kind(), frame.seq);
                Ok(())
            }
        }
    }
}

impl ReceiverState for ReceiverFsm<AwaitPacket> {
    fn step(self: Box<Self>) -> Result<Box<dyn ReceiverState>, ReceiverError> {
        let mut fsm = *self;

        let received = fsm.receive_one()?;
        fsm.seq.advance();

        if let Some(frame) = received {
            fsm.dispatch(frame)?;
        }
        Ok(Box::new(fsm) as Box<dyn ReceiverState>)
    }
}

// ============================================================================
// Constructor & Runner
// ============================================================================

impl ReceiverFsm<AwaitNegotiate> {
    pub fn new(transport: Box<dyn Transport>, output_dir: PathBuf, config: Config) -> Box<dyn ReceiverState> {
        let session = Session::new(output_dir, config.recv_prefix.clone());
        Box::new(ReceiverFsm {
            state: PhantomData::<AwaitNegotiate>,
            transport,
            config,
            session,
            seq: Seq::default(),
            last_accepted: None,
            negotiated: None,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
