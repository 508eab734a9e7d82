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

//! Packet model and wire codec.
//!
//! Every packet is laid out as
//!
//! ```text
//! +-----+-----+-----+------+------------+--------+--------+------+
//! | SOH | LEN | SEQ | TYPE | body ...   | CRC lo | CRC hi | MARK |
//! +-----+-----+-----+------+------------+--------+--------+------+
//! ```
//!
//! `LEN` is the encoded size minus [`LEN_ADJUST`]. The checksum covers the
//! header and the body. Decoding takes the checksum span from the buffer
//! size, so `LEN` is informational only.

use thiserror::Error;
use tracing::debug;
use crate::checksum;
use crate::protocol::*;

/// Largest body that still fits the one-byte `LEN` field.
pub const MAX_BODY_LEN: usize = u8::MAX as usize + LEN_ADJUST - HEADER_LEN - TRAILER_LEN;

const MIN_FRAME_LEN: usize = HEADER_LEN + TRAILER_LEN;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame too short ({len} bytes)")]
    Truncated { len: usize },

    #[error("bad start marker 0x{0:02X}")]
    BadStartMarker(u8),

    #[error("bad end mark 0x{0:02X}")]
    BadEndMark(u8),

    #[error("checksum mismatch: frame carries 0x{expected:04X}, computed 0x{computed:04X}")]
    Checksum { expected: u16, computed: u16 },

    #[error("unknown packet type 0x{0:02X}")]
    UnknownType(u8),

    #[error("'{tag}' packet with {len} byte body")]
    BadBody { tag: char, len: usize },

    #[error("body of {len} bytes exceeds the {max} byte limit")]
    BodyTooLong { len: usize, max: usize },

    #[error("sequence number {0} out of range")]
    BadSequence(u8),
}

impl FrameError {
    /// True when the bytes were damaged in transit and the peer should
    /// resend. False for frames that arrived intact but make no sense.
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            FrameError::Truncated { .. }
                | FrameError::BadStartMarker(_)
                | FrameError::BadEndMark(_)
                | FrameError::Checksum { .. }
        )
    }
}

// ============================================================================
// Send-init option record
// ============================================================================

/// Capabilities carried by an `S` packet and echoed in its acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendInit {
    pub maxl: u8,
    pub time: u8,
    pub npad: u8,
    pub padc: u8,
    pub eol: u8,
    pub qctl: u8,
    pub qbin: u8,
    pub chkt: u8,
    pub rept: u8,
    pub capa: u8,
    pub reserved: u8,
}

impl Default for SendInit {
    fn default() -> Self {
        SendInit {
            maxl: MAXL,
            time: TIME,
            npad: NPAD,
            padc: PADC,
            eol: EOL,
            qctl: QCTL,
            qbin: QBIN,
            chkt: CHKT,
            rept: REPT,
            capa: CAPA,
            reserved: RESERVED,
        }
    }
}

impl SendInit {
    pub fn to_bytes(&self) -> [u8; SEND_INIT_LEN] {
        [
            self.maxl, self.time, self.npad, self.padc, self.eol, self.qctl,
            self.qbin, self.chkt, self.rept, self.capa, self.reserved,
        ]
    }

    pub fn from_bytes(b: &[u8; SEND_INIT_LEN]) -> Self {
        SendInit {
            maxl: b[0],
            time: b[1],
            npad: b[2],
            padc: b[3],
            eol: b[4],
            qctl: b[5],
            qbin: b[6],
            chkt: b[7],
            rept: b[8],
            capa: b[9],
            reserved: b[10],
        }
    }
}

// ============================================================================
// Packet
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    SendInit(SendInit),
    FileHeader(Vec<u8>),
    Data(Vec<u8>),
    EndOfFile,
    EndOfTransmission,
    /// Acknowledgement. Answers to `S` carry the peer's option record.
    Ack(Option<SendInit>),
    Nak,
}

impl Packet {
    pub fn tag(&self) -> u8 {
        match self {
            Packet::SendInit(_) => TYPE_S,
            Packet::FileHeader(_) => TYPE_F,
            Packet::Data(_) => TYPE_D,
            Packet::EndOfFile => TYPE_Z,
            Packet::EndOfTransmission => TYPE_B,
            Packet::Ack(_) => TYPE_Y,
            Packet::Nak => TYPE_N,
        }
    }

    pub fn kind(&self) -> char {
        self.tag() as char
    }

    fn body(&self) -> &[u8] {
        match self {
            Packet::FileHeader(name) => name,
            Packet::Data(data) => data,
            _ => &[],
        }
    }

    fn from_parts(tag: u8, body: &[u8]) -> Result<Packet, FrameError> {
        let bad_body = || FrameError::BadBody { tag: tag as char, len: body.len() };
        match tag {
            TYPE_S => {
                let record: &[u8; SEND_INIT_LEN] = body.try_into().map_err(|_| bad_body())?;
                Ok(Packet::SendInit(SendInit::from_bytes(record)))
            }
            TYPE_F => Ok(Packet::FileHeader(body.to_vec())),
            TYPE_D => Ok(Packet::Data(body.to_vec())),
            TYPE_Y => match body.len() {
                0 => Ok(Packet::Ack(None)),
                SEND_INIT_LEN => {
                    let record: &[u8; SEND_INIT_LEN] = body.try_into().map_err(|_| bad_body())?;
                    Ok(Packet::Ack(Some(SendInit::from_bytes(record))))
                }
                _ => Err(bad_body()),
            },
            TYPE_Z | TYPE_B | TYPE_N if !body.is_empty() => Err(bad_body()),
            TYPE_Z => Ok(Packet::EndOfFile),
            TYPE_B => Ok(Packet::EndOfTransmission),
            TYPE_N => Ok(Packet::Nak),
            other => Err(FrameError::UnknownType(other)),
        }
    }
}

// ============================================================================
// Frame
// ============================================================================

/// A packet together with the sequence number it travels under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub seq: u8,
    pub packet: Packet,
}

impl Frame {
    pub fn new(seq: u8, packet: Packet) -> Self {
        Frame { seq, packet }
    }

    pub fn encode(&self) -> Result<Vec<u8>, FrameError> {
        if self.seq >= SEQ_MODULUS {
            return Err(FrameError::BadSequence(self.seq));
        }

        let init_record;
        let body: &[u8] = match &self.packet {
            Packet::SendInit(init) | Packet::Ack(Some(init)) => {
                init_record = init.to_bytes();
                &init_record
            }
            other => other.body(),
        };

        if body.len() > MAX_BODY_LEN {
            return Err(FrameError::BodyTooLong { len: body.len(), max: MAX_BODY_LEN });
        }

        let total = HEADER_LEN + body.len() + TRAILER_LEN;
        let mut buf = Vec::with_capacity(total);
        buf.push(SOH);
        buf.push((total - LEN_ADJUST) as u8);
        buf.push(self.seq);
        buf.push(self.packet.tag());
        buf.extend_from_slice(body);

        let crc = checksum::checksum(&buf);
        buf.extend_from_slice(&crc.to_le_bytes());
        buf.push(MARK);

        Ok(buf)
    }

    pub fn decode(buf: &[u8]) -> Result<Frame, FrameError> {
        if buf.len() < MIN_FRAME_LEN {
            return Err(FrameError::Truncated { len: buf.len() });
        }
        if buf[0] != SOH {
            return Err(FrameError::BadStartMarker(buf[0]));
        }
        let mark = buf[buf.len() - 1];
        if mark != MARK {
            return Err(FrameError::BadEndMark(mark));
        }

        let span = buf.len() - TRAILER_LEN;
        let expected = u16::from_le_bytes([buf[span], buf[span + 1]]);
        if !checksum::verify(&buf[..span], expected) {
            let computed = checksum::checksum(&buf[..span]);
            return Err(FrameError::Checksum { expected, computed });
        }

        let declared = buf[1] as usize + LEN_ADJUST;
        if declared != buf.len() {
            debug!("LEN field says {} bytes, frame has {}", declared, buf.len());
        }

        let seq = buf[2];
        let packet = Packet::from_parts(buf[3], &buf[HEADER_LEN..span])?;

        Ok(Frame { seq, packet })
    }
}

// ============================================================================
// Tests
// ============================================================================
