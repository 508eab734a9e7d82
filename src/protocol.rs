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

//! Kermit-style protocol constants

/// Start of header - first byte of every packet
pub const SOH: u8 = 0x01;

/// End mark - last byte of every packet
pub const MARK: u8 = 0x0D;

/// Send-init - capability negotiation
pub const TYPE_S: u8 = b'S';

/// File header - carries the file name
pub const TYPE_F: u8 = b'F';

/// Data - one chunk of file content
pub const TYPE_D: u8 = b'D';

/// End of file
pub const TYPE_Z: u8 = b'Z';

/// End of transmission - no more files
pub const TYPE_B: u8 = b'B';

/// Acknowledge
pub const TYPE_Y: u8 = b'Y';

/// Negative acknowledge - resend, the last packet was corrupted
pub const TYPE_N: u8 = b'N';

/// Header bytes: SOH, LEN, SEQ, TYPE
pub const HEADER_LEN: usize = 4;

/// Trailer bytes: checksum low, checksum high, MARK
pub const TRAILER_LEN: usize = 3;

/// Size of the send-init option record
pub const SEND_INIT_LEN: usize = 11;

/// The LEN field carries the encoded size minus this many bytes
pub const LEN_ADJUST: usize = 2;

/// Largest data chunk a packet may carry
pub const MAXL: u8 = 250;

/// Per-attempt timeout in seconds
pub const TIME: u8 = 5;

/// Attempts before a transfer is abandoned
pub const MAX_RETRIES: u32 = 3;

/// Sequence numbers wrap at this value
pub const SEQ_MODULUS: u8 = 64;

/// Prepended to every file name the receiver creates
pub const RECV_FILE_PREFIX: &str = "recv_";

// Default send-init fields
pub const NPAD: u8 = 0x00;
pub const PADC: u8 = 0x00;
pub const EOL: u8 = 0x0D;
pub const QCTL: u8 = 0x00;
pub const QBIN: u8 = 0x00;
pub const CHKT: u8 = 0x00;
pub const REPT: u8 = 0x00;
pub const CAPA: u8 = 0x00;
pub const RESERVED: u8 = 0x00;
