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

use std::marker::PhantomData;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::io::Read;
use thiserror::Error;
use tracing::{debug, info, warn};
use crate::config::Config;
use crate::frame::{Frame, FrameError, Packet};
use crate::seq::Seq;
use crate::transport::Transport;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum SenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection could not be established ({attempts} attempts)")]
    NoConnection { attempts: u32 },

    #[error("'{kind}' packet {seq} not acknowledged after {attempts} attempts")]
    Unacknowledged { kind: char, seq: u8, attempts: u32 },

    #[error("file {} could not be opened: {source}", .path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no usable file name in {}", .0.display())]
    InvalidFileName(PathBuf),

    #[error("cannot build packet: {0}")]
    Frame(#[from] FrameError),

    #[error("Transfer complete")]
    TransferComplete,
}

// ============================================================================
// States
// ============================================================================

pub struct Negotiate;
pub struct NextFile;
pub struct SendHeader;
pub struct SendData;
pub struct SendEof;
pub struct EndTransmission;

// ============================================================================
// FSM Structure
// ============================================================================

struct OpenInput {
    path: PathBuf,
    file: File,
    sent: u64,
}

pub struct SenderFsm<State> {
    state: PhantomData<State>,
    transport: Box<dyn Transport>,
    config: Config,
    files: Vec<PathBuf>,
    current: Option<OpenInput>,
    seq: Seq,
    maxl: usize,
}

// ============================================================================
// Trait
// ============================================================================

pub trait SenderState: Send {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState>, SenderError>;
}

// ============================================================================
// Helper to transition states
// ============================================================================

impl<S> SenderFsm<S> {
    fn transition<T>(self) -> Box<SenderFsm<T>> {
        Box::new(SenderFsm {
            state: PhantomData,
            transport: self.transport,
            config: self.config,
            files: self.files,
            current: self.current,
            seq: self.seq,
            maxl: self.maxl,
        })
    }

    fn io_error(&self, e: std::io::Error) -> SenderError {
        let type_name = std::any::type_name::<S>();
        let state_name = type_name.split("::").last().unwrap_or(type_name);
        SenderError::Io(std::io::Error::new(
            e.kind(),
            format!("{} (in state: {})", e, state_name)
        ))
    }

    /// Sends `packet` under the current sequence number and waits for a `Y`.
    /// Timeouts, `N` replies and anything else that is not an intact `Y` cost
    /// one attempt and the identical bytes go out again.
    pub fn send_packet_and_await_ack(&mut self, packet: Packet) -> Result<Frame, SenderError> {
        let frame = Frame::new(self.seq.value(), packet);
        let bytes = frame.encode()?;
        let kind = frame.packet.kind();

        for attempt in 1..=self.config.retries {
            self.transport.send(&bytes).map_err(|e| self.io_error(e))?;
            debug!("Sent: '{}' seq={} ({} bytes)", kind, frame.seq, bytes.len());

            let reply = self.transport
                .receive_with_timeout(self.config.timeout)
                .map_err(|e| self.io_error(e))?;

            match reply.as_deref().map(Frame::decode) {
                None => {
                    warn!("[timeout] seq = {}, try = {}", frame.seq, attempt);
                }
                Some(Ok(ack @ Frame { packet: Packet::Ack(_), .. })) => {
                    debug!("Received: 'Y' seq={}", ack.seq);
                    if self.config.check_sequence && ack.seq != frame.seq {
                        warn!("Ack carries seq {} but packet {} was sent", ack.seq, frame.seq);
                    }
                    return Ok(ack);
                }
                Some(Ok(Frame { packet: Packet::Nak, seq })) => {
                    debug!("Received: 'N' seq={}, resending", seq);
                }
                Some(Ok(other)) => {
                    debug!("Received: '{}' while waiting for 'Y', resending", other.packet.kind());
                }
                Some(Err(e)) => {
                    debug!("Unreadable reply ({}), resending", e);
                }
            }
        }

        Err(SenderError::Unacknowledged {
            kind,
            seq: frame.seq,
            attempts: self.config.retries,
        })
    }
}

// ============================================================================
// State Implementations
// ============================================================================

impl SenderFsm<Negotiate> {
    /// Exchanges send-init packets. The chunk size for the rest of the
    /// session is the smaller of ours and the receiver's.
    pub fn begin_transfer(&mut self) -> Result<(), SenderError> {
        let init = self.config.send_init();
        let ack = match self.send_packet_and_await_ack(Packet::SendInit(init)) {
            Ok(ack) => ack,
            Err(SenderError::Unacknowledged { attempts, .. }) => {
                return Err(SenderError::NoConnection { attempts });
            }
            Err(e) => return Err(e),
        };

        if let Packet::Ack(Some(peer)) = ack.packet {
            self.maxl = self.config.negotiated_maxl(peer.maxl) as usize;
            debug!("Receiver accepts {} byte chunks, using {}", peer.maxl, self.maxl);
        }

        self.seq.advance();
        info!("Connection established");
        Ok(())
    }
}

impl SenderState for SenderFsm<Negotiate> {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState>, SenderError> {
        let mut fsm = *self;
        fsm.begin_transfer()?;
        let next = fsm.transition::<NextFile>();
        Ok(next as Box<dyn SenderState>)
    }
}

impl SenderState for SenderFsm<NextFile> {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState>, SenderError> {
        let mut fsm = *self;

        if fsm.files.is_empty() {
            let next = fsm.transition::<EndTransmission>();
            return Ok(next as Box<dyn SenderState>);
        }

        let path = fsm.files.remove(0);
        let file = File::open(&path).map_err(|source| SenderError::OpenFile {
            path: path.clone(),
            source,
        })?;
        debug!("Opened: {:?}", path);

        fsm.current = Some(OpenInput { path, file, sent: 0 });
        let next = fsm.transition::<SendHeader>();
        Ok(next as Box<dyn SenderState>)
    }
}

impl SenderState for SenderFsm<SendHeader> {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState>, SenderError> {
        let mut fsm = *self;

        let name = match &fsm.current {
            Some(input) => file_name_bytes(&input.path)?,
            None => {
                let next = fsm.transition::<NextFile>();
                return Ok(next as Box<dyn SenderState>);
            }
        };

        info!("Sending file: {}", String::from_utf8_lossy(&name));
        fsm.send_packet_and_await_ack(Packet::FileHeader(name))?;
        fsm.seq.advance();

        let next = fsm.transition::<SendData>();
        Ok(next as Box<dyn SenderState>)
    }
}

impl SenderState for SenderFsm<SendData> {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState>, SenderError> {
        let mut fsm = *self;
        let maxl = fsm.maxl;

        let read = match fsm.current.as_mut() {
            Some(input) => {
                let mut chunk = Vec::with_capacity(maxl);
                (&mut input.file)
                    .take(maxl as u64)
                    .read_to_end(&mut chunk)
                    .map(|n| {
                        input.sent += n as u64;
                        chunk
                    })
            }
            None => Ok(Vec::new()),
        };
        let chunk = read.map_err(|e| fsm.io_error(e))?;

        // A short (possibly empty) chunk is always the last one
        let last = chunk.len() < maxl;
        debug!("Prepared chunk ({} bytes)", chunk.len());

        fsm.send_packet_and_await_ack(Packet::Data(chunk))?;
        fsm.seq.advance();

        if last {
            let next = fsm.transition::<SendEof>();
            Ok(next as Box<dyn SenderState>)
        } else {
            Ok(Box::new(fsm) as Box<dyn SenderState>)
        }
    }
}

impl SenderState for SenderFsm<SendEof> {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState>, SenderError> {
        let mut fsm = *self;

        fsm.send_packet_and_await_ack(Packet::EndOfFile)?;
        fsm.seq.advance();

        if let Some(input) = fsm.current.take() {
            info!("Sent {} ({} bytes)", input.path.display(), input.sent);
        }
        if !fsm.files.is_empty() {
            debug!("{} files remaining", fsm.files.len());
        }

        let next = fsm.transition::<NextFile>();
        Ok(next as Box<dyn SenderState>)
    }
}

impl SenderFsm<EndTransmission> {
    /// Sends `B`. Every file was acknowledged already, so a lost final ack
    /// only earns a warning.
    pub fn end_transfer(&mut self) -> Result<(), SenderError> {
        match self.send_packet_and_await_ack(Packet::EndOfTransmission) {
            Ok(_) => {
                self.seq.advance();
                Ok(())
            }
            Err(SenderError::Unacknowledged { attempts, .. }) => {
                warn!("End of transmission not acknowledged after {} attempts", attempts);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

impl SenderState for SenderFsm<EndTransmission> {
    fn step(self: Box<Self>) -> Result<Box<dyn SenderState>, SenderError> {
        let mut fsm = *self;
        fsm.end_transfer()?;
        Err(SenderError::TransferComplete)
    }
}

// ============================================================================
// Constructor & Runner
// ============================================================================

impl SenderFsm<Negotiate> {
    pub fn new(transport: Box<dyn Transport>, files: Vec<PathBuf>, config: Config) -> Box<dyn SenderState> {
        let maxl = config.chunk_len() as usize;
        Box::new(SenderFsm {
            state: PhantomData::<Negotiate>,
            transport,
            config,
            files,
            current: None,
            seq: Seq::default(),
            maxl,
        })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Final path component as sent in the `F` packet
fn file_name_bytes(path: &Path) -> Result<Vec<u8>, SenderError> {
    match path.file_name() {
        Some(name) if !name.is_empty() => Ok(name.as_encoded_bytes().to_vec()),
        _ => Err(SenderError::InvalidFileName(path.to_path_buf())),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use crate::frame::SendInit;
    use crate::transport::MockTransport;

    fn run_sender(mut fsm: Box<dyn SenderState>) -> Result<(), SenderError> {
        loop {
            match fsm.step() {
                Ok(next) => fsm = next,
                Err(SenderError::TransferComplete) => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    fn test_config() -> Config {
        Config {
            timeout: Duration::from_millis(10),
            ..Config::default()
        }
    }

    fn frame(seq: u8, packet: Packet) -> Vec<u8> {
        Frame::new(seq, packet).encode().unwrap()
    }

    fn ack(seq: u8) -> Option<Vec<u8>> {
        Some(frame(seq, Packet::Ack(None)))
    }

    fn init_ack() -> Option<Vec<u8>> {
        Some(frame(0, Packet::Ack(Some(test_config().send_init()))))
    }

    fn send_init() -> Vec<u8> {
        frame(0, Packet::SendInit(test_config().send_init()))
    }

    #[test]
    fn test_send_init_carries_configured_timeout() {
        // 10 ms rounds up to the one-second floor of the TIME field
        let bytes = send_init();
        let decoded = Frame::decode(&bytes).unwrap();
        match decoded.packet {
            Packet::SendInit(init) => {
                assert_eq!(init.time, 1);
                assert_eq!(init.maxl, 250);
                assert_ne!(init, SendInit::default());
            }
            other => panic!("expected send-init, got {:?}", other),
        }

        let mock = Box::new(MockTransport::new(vec![None], vec![bytes]));
        let config = Config { retries: 1, ..test_config() };
        let fsm = SenderFsm::new(mock, vec![PathBuf::from("unused.txt")], config);
        assert!(matches!(run_sender(fsm), Err(SenderError::NoConnection { attempts: 1 })));
    }

    #[test]
    fn test_file_name_bytes() {
        assert_eq!(file_name_bytes(Path::new("test.txt")).unwrap(), b"test.txt");
        assert_eq!(file_name_bytes(Path::new("/path/to/file.txt")).unwrap(), b"file.txt");
        assert!(matches!(
            file_name_bytes(Path::new("/")),
            Err(SenderError::InvalidFileName(_))
        ));
        assert!(matches!(
            file_name_bytes(Path::new("dir/..")),
            Err(SenderError::InvalidFileName(_))
        ));
    }

    #[test]
    fn test_sender_full_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let test_file = dir.path().join("data.bin");
        let content: Vec<u8> = (0..600).map(|i| (i % 256) as u8).collect();
        std::fs::write(&test_file, &content).unwrap();

        let responses = (0..7).map(|seq| if seq == 0 { init_ack() } else { ack(seq) }).collect();

        let expected_writes = vec![
            send_init(),
            frame(1, Packet::FileHeader(b"data.bin".to_vec())),
            frame(2, Packet::Data(content[0..250].to_vec())),
            frame(3, Packet::Data(content[250..500].to_vec())),
            frame(4, Packet::Data(content[500..600].to_vec())),
            frame(5, Packet::EndOfFile),
            frame(6, Packet::EndOfTransmission),
        ];

        let mock = Box::new(MockTransport::new(responses, expected_writes));
        let fsm = SenderFsm::new(mock, vec![test_file], test_config());

        if let Err(e) = run_sender(fsm) {
            panic!("Transfer failed: {:?}", e);
        }
    }

    #[test]
    fn test_sender_exact_multiple_sends_empty_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let test_file = dir.path().join("even.bin");
        std::fs::write(&test_file, vec![0xA5; 500]).unwrap();

        let responses = (0..7).map(|seq| if seq == 0 { init_ack() } else { ack(seq) }).collect();

        let expected_writes = vec![
            send_init(),
            frame(1, Packet::FileHeader(b"even.bin".to_vec())),
            frame(2, Packet::Data(vec![0xA5; 250])),
            frame(3, Packet::Data(vec![0xA5; 250])),
            frame(4, Packet::Data(vec![])),
            frame(5, Packet::EndOfFile),
            frame(6, Packet::EndOfTransmission),
        ];

        let mock = Box::new(MockTransport::new(responses, expected_writes));
        let fsm = SenderFsm::new(mock, vec![test_file], test_config());
        run_sender(fsm).expect("transfer should finish");
    }

    #[test]
    fn test_sender_handshake_gives_up_after_three_attempts() {
        let responses = vec![None, None, None];
        let expected_writes = vec![send_init(), send_init(), send_init()];

        let mock = Box::new(MockTransport::new(responses, expected_writes));
        let fsm = SenderFsm::new(mock, vec![PathBuf::from("unused.txt")], test_config());

        match run_sender(fsm) {
            Err(SenderError::NoConnection { attempts }) => assert_eq!(attempts, 3),
            other => panic!("expected NoConnection, got {:?}", other),
        }
    }

    #[test]
    fn test_sender_handshake_retry() {
        let responses = vec![None, None, init_ack()];
        let expected_writes = vec![send_init(), send_init(), send_init()];

        let mock = Box::new(MockTransport::new(responses, expected_writes));
        let fsm = SenderFsm::new(mock, vec![PathBuf::from("dummy.txt")], test_config());

        fsm.step().expect("third attempt should succeed");
    }

    #[test]
    fn test_sender_packet_gives_up_after_three_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let test_file = dir.path().join("lost.txt");
        std::fs::write(&test_file, b"lost").unwrap();

        let header = frame(1, Packet::FileHeader(b"lost.txt".to_vec()));
        let responses = vec![init_ack(), None, None, None];
        let expected_writes = vec![send_init(), header.clone(), header.clone(), header];

        let mock = Box::new(MockTransport::new(responses, expected_writes));
        let fsm = SenderFsm::new(mock, vec![test_file], test_config());

        match run_sender(fsm) {
            Err(SenderError::Unacknowledged { kind, seq, attempts }) => {
                assert_eq!((kind, seq, attempts), ('F', 1, 3));
            }
            other => panic!("expected Unacknowledged, got {:?}", other),
        }
    }

    #[test]
    fn test_sender_nak_and_garbage_count_as_attempts() {
        let dir = tempfile::tempdir().unwrap();
        let test_file = dir.path().join("retry.txt");
        std::fs::write(&test_file, b"retry").unwrap();

        let header = frame(1, Packet::FileHeader(b"retry.txt".to_vec()));
        let data = frame(2, Packet::Data(b"retry".to_vec()));

        let responses = vec![
            init_ack(),
            Some(frame(1, Packet::Nak)),
            Some(vec![0x01, 0x02, 0x03]),
            ack(1),
            Some(frame(2, Packet::Nak)),
            ack(2),
            ack(3),
            ack(4),
        ];

        let expected_writes = vec![
            send_init(),
            header.clone(),
            header.clone(),
            header,
            data.clone(),
            data,
            frame(3, Packet::EndOfFile),
            frame(4, Packet::EndOfTransmission),
        ];

        let mock = Box::new(MockTransport::new(responses, expected_writes));
        let fsm = SenderFsm::new(mock, vec![test_file], test_config());
        run_sender(fsm).expect("transfer should recover from NAKs");
    }

    #[test]
    fn test_sender_uses_receivers_smaller_chunk_size() {
        let dir = tempfile::tempdir().unwrap();
        let test_file = dir.path().join("small.bin");
        let content = vec![7u8; 250];
        std::fs::write(&test_file, &content).unwrap();

        let peer = SendInit { maxl: 100, ..SendInit::default() };
        let mut responses = vec![Some(frame(0, Packet::Ack(Some(peer))))];
        responses.extend((1..7).map(ack));

        let expected_writes = vec![
            send_init(),
            frame(1, Packet::FileHeader(b"small.bin".to_vec())),
            frame(2, Packet::Data(vec![7; 100])),
            frame(3, Packet::Data(vec![7; 100])),
            frame(4, Packet::Data(vec![7; 50])),
            frame(5, Packet::EndOfFile),
            frame(6, Packet::EndOfTransmission),
        ];

        let mock = Box::new(MockTransport::new(responses, expected_writes));
        let fsm = SenderFsm::new(mock, vec![test_file], test_config());
        run_sender(fsm).expect("transfer should finish");
    }

    #[test]
    fn test_sender_missing_file_aborts() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.txt");

        let mock = Box::new(MockTransport::new(vec![init_ack()], vec![send_init()]));
        let fsm = SenderFsm::new(mock, vec![missing.clone()], test_config());

        match run_sender(fsm) {
            Err(SenderError::OpenFile { path, .. }) => assert_eq!(path, missing),
            other => panic!("expected OpenFile, got {:?}", other),
        }
    }

    #[test]
    fn test_sender_multiple_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.txt");
        let second = dir.path().join("second.txt");
        std::fs::write(&first, b"first").unwrap();
        std::fs::write(&second, b"second").unwrap();

        let responses = (0..8).map(|seq| if seq == 0 { init_ack() } else { ack(seq) }).collect();

        let expected_writes = vec![
            send_init(),
            frame(1, Packet::FileHeader(b"first.txt".to_vec())),
            frame(2, Packet::Data(b"first".to_vec())),
            frame(3, Packet::EndOfFile),
            frame(4, Packet::FileHeader(b"second.txt".to_vec())),
            frame(5, Packet::Data(b"second".to_vec())),
            frame(6, Packet::EndOfFile),
            frame(7, Packet::EndOfTransmission),
        ];

        let mock = Box::new(MockTransport::new(responses, expected_writes));
        let fsm = SenderFsm::new(mock, vec![first, second], test_config());
        run_sender(fsm).expect("transfer should finish");
    }

    #[test]
    fn test_sender_sequence_wraps() {
        let dir = tempfile::tempdir().unwrap();
        let test_file = dir.path().join("bytes.bin");
        let content: Vec<u8> = (0..70).collect();
        std::fs::write(&test_file, &content).unwrap();

        let config = Config { max_data_len: 1, ..test_config() };
        let init = config.send_init();

        let mut seq = Seq::default();
        let mut responses = Vec::new();
        let mut expected_writes = Vec::new();

        expected_writes.push(frame(seq.value(), Packet::SendInit(init)));
        responses.push(Some(frame(seq.value(), Packet::Ack(Some(init)))));
        seq.advance();

        let mut packets = vec![Packet::FileHeader(b"bytes.bin".to_vec())];
        packets.extend(content.iter().map(|&b| Packet::Data(vec![b])));
        packets.push(Packet::Data(vec![]));
        packets.push(Packet::EndOfFile);
        packets.push(Packet::EndOfTransmission);

        for packet in packets {
            expected_writes.push(frame(seq.value(), packet));
            responses.push(ack(seq.value()));
            seq.advance();
        }

        // S, F, 71 D, Z, B = 75 packets: the counter went round once
        assert_eq!(seq.value(), 75 - 64);

        let mock = Box::new(MockTransport::new(responses, expected_writes));
        let fsm = SenderFsm::new(mock, vec![test_file], config);
        run_sender(fsm).expect("transfer should finish");
    }

    #[test]
    fn test_sender_zero_chunk_size_still_terminates() {
        let dir = tempfile::tempdir().unwrap();
        let test_file = dir.path().join("ab.txt");
        std::fs::write(&test_file, b"ab").unwrap();

        let config = Config { max_data_len: 0, ..test_config() };
        let init = config.send_init();
        assert_eq!(init.maxl, 1);

        let mut responses = vec![Some(frame(0, Packet::Ack(Some(init))))];
        responses.extend((1..7).map(ack));
        let expected_writes = vec![
            frame(0, Packet::SendInit(init)),
            frame(1, Packet::FileHeader(b"ab.txt".to_vec())),
            frame(2, Packet::Data(b"a".to_vec())),
            frame(3, Packet::Data(b"b".to_vec())),
            frame(4, Packet::Data(vec![])),
            frame(5, Packet::EndOfFile),
            frame(6, Packet::EndOfTransmission),
        ];

        let mock = Box::new(MockTransport::new(responses, expected_writes));
        let fsm = SenderFsm::new(mock, vec![test_file], config);
        run_sender(fsm).expect("transfer should finish");
    }

    #[cfg(unix)]
    #[test]
    fn test_sender_read_error_names_state() {
        let dir = tempfile::tempdir().unwrap();
        // Opening a directory works on unix; reading from it does not
        let folder = dir.path().join("folder");
        std::fs::create_dir(&folder).unwrap();

        let responses = vec![init_ack(), ack(1)];
        let expected_writes = vec![send_init(), frame(1, Packet::FileHeader(b"folder".to_vec()))];

        let mock = Box::new(MockTransport::new(responses, expected_writes));
        let fsm = SenderFsm::new(mock, vec![folder], test_config());

        match run_sender(fsm) {
            Err(SenderError::Io(e)) => {
                assert!(e.to_string().contains("in state: SendData"), "got: {}", e);
            }
            other => panic!("expected Io, got {:?}", other),
        }
    }

    #[test]
    fn test_sender_lost_final_ack_still_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let test_file = dir.path().join("end.txt");
        std::fs::write(&test_file, b"end").unwrap();

        let eot = frame(4, Packet::EndOfTransmission);
        let responses = vec![init_ack(), ack(1), ack(2), ack(3), None, None, None];
        let expected_writes = vec![
            send_init(),
            frame(1, Packet::FileHeader(b"end.txt".to_vec())),
            frame(2, Packet::Data(b"end".to_vec())),
            frame(3, Packet::EndOfFile),
            eot.clone(),
            eot.clone(),
            eot,
        ];

        let mock = Box::new(MockTransport::new(responses, expected_writes));
        let fsm = SenderFsm::new(mock, vec![test_file], test_config());
        run_sender(fsm).expect("a lost final ack is not fatal");
    }
}
