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

//! CRC-16/CCITT over the header and body of a packet.

use ::crc::{Crc, CRC_16_XMODEM};

const CCITT: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Checksum of `bytes`. Callers pass header + body, never the trailer.
pub fn checksum(bytes: &[u8]) -> u16 {
    CCITT.checksum(bytes)
}

pub fn verify(bytes: &[u8], expected: u16) -> bool {
    checksum(bytes) == expected
}
