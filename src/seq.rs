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

use crate::protocol::SEQ_MODULUS;

/// Sequence number following `current`, wrapping at `modulus`. A zero
/// modulus pins the counter at 0.
pub fn next(current: u8, modulus: u8) -> u8 {
    match modulus {
        0 => 0,
        m => ((current as u16 + 1) % m as u16) as u8,
    }
}

/// Local view of "which packet we are on". Each role owns one and advances
/// it once per completed round-trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Seq(u8);

impl Seq {
    pub fn value(self) -> u8 {
        self.0
    }

    pub fn advance(&mut self) {
        self.0 = next(self.0, SEQ_MODULUS);
    }
}

impl std::fmt::Display for Seq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next() {
        assert_eq!(next(0, 64), 1);
        assert_eq!(next(62, 64), 63);
        assert_eq!(next(63, 64), 0);
        assert_eq!(next(255, 255), 1);
        assert_eq!(next(7, 0), 0);
    }

    #[test]
    fn test_wraparound_after_full_cycle() {
        let mut seq = Seq::default();
        for _ in 0..64 {
            seq.advance();
        }
        assert_eq!(seq.value(), 0);

        seq.advance();
        assert_eq!(seq.value(), 1);
    }
}
