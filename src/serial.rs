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

use std::io::{Read, Write};
use std::time::{Duration, Instant};
use serialport::{SerialPort as SerialPortTrait, DataBits, Parity, StopBits};
use tracing::debug;
use crate::protocol::{LEN_ADJUST, SOH};
use crate::transport::Transport;

// ============================================================================
// Framing
// ============================================================================

/// Cuts a byte stream into packets: skip to SOH, read LEN, then LEN more
/// bytes.
#[derive(Default)]
pub struct Deframer {
    buf: Vec<u8>,
}

impl Deframer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one byte; returns a packet once the last byte of it arrives.
    pub fn push(&mut self, byte: u8) -> Option<Vec<u8>> {
        if self.buf.is_empty() && byte != SOH {
            return None;
        }
        self.buf.push(byte);

        if self.buf.len() >= 2 && self.buf.len() == self.buf[1] as usize + LEN_ADJUST {
            return Some(std::mem::take(&mut self.buf));
        }
        None
    }

    pub fn is_idle(&self) -> bool {
        self.buf.is_empty()
    }

    /// Whatever arrived of an unfinished packet.
    pub fn take_partial(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

// ============================================================================
// Serial Line
// ============================================================================

/// The two things the transport needs from an RS-232 line
pub trait SerialLine: Send {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()>;

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize>;
}

/// A real port opened through the serialport crate
pub struct RealSerialLine {
    port: Box<dyn SerialPortTrait>,
}

impl RealSerialLine {
    pub fn open(
        port_name: &str,
        baud_rate: u32,
        data_bits: DataBits,
        parity: Parity,
        stop_bits: StopBits,
    ) -> Result<Self, serialport::Error> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(data_bits)
            .parity(parity)
            .stop_bits(stop_bits)
            .timeout(Duration::from_millis(100))
            .open()?;

        Ok(RealSerialLine { port })
    }
}

impl SerialLine for RealSerialLine {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.port.write_all(buf)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> std::io::Result<usize> {
        self.port.set_timeout(timeout)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        self.port.read(buf)
    }
}

// ============================================================================
// Mock Serial Line for Testing
// ============================================================================

#[cfg(test)]
pub struct MockSerialLine {
    // Bytes handed out one read at a time (None = the line stays quiet)
    incoming: Vec<Option<u8>>,
    read_pos: usize,
    write_log: Vec<u8>,
    expected_writes: Vec<u8>,
}

#[cfg(test)]
impl MockSerialLine {
    pub fn new(incoming: Vec<Option<u8>>, expected_writes: Vec<u8>) -> Self {
        MockSerialLine {
            incoming,
            read_pos: 0,
            write_log: Vec::new(),
            expected_writes,
        }
    }
}

#[cfg(test)]
impl SerialLine for MockSerialLine {
    fn write_all(&mut self, buf: &[u8]) -> std::io::Result<()> {
        self.write_log.extend_from_slice(buf);
        Ok(())
    }

    fn read_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> std::io::Result<usize> {
        let quiet = || std::io::Error::new(std::io::ErrorKind::TimedOut, "Mock timeout");

        match self.incoming.get(self.read_pos) {
            None => Err(quiet()),
            Some(None) => {
                self.read_pos += 1;
                Err(quiet())
            }
            Some(Some(byte)) => {
                buf[0] = *byte;
                self.read_pos += 1;
                Ok(1)
            }
        }
    }
}

#[cfg(test)]
impl Drop for MockSerialLine {
    fn drop(&mut self) {
        if std::thread::panicking() {
            return;
        }
        assert_eq!(
            self.read_pos,
            self.incoming.len(),
            "MockSerialLine dropped with {} unread entries",
            self.incoming.len() - self.read_pos
        );
        assert_eq!(
            &self.write_log,
            &self.expected_writes,
            "MockSerialLine write log mismatch!\nExpected:\n{:02X?}\nGot:\n{:02X?}",
            self.expected_writes,
            self.write_log
        );
    }
}

// ============================================================================
// Serial Port Transport
// ============================================================================

/// Packets over an RS-232 line
pub struct SerialTransport {
    line: Box<dyn SerialLine>,
    deframer: Deframer,
}

impl SerialTransport {
    pub fn new(line: Box<dyn SerialLine>) -> Self {
        SerialTransport { line, deframer: Deframer::new() }
    }

    pub fn open(
        port_name: &str,
        baud_rate: u32,
        data_bits: DataBits,
        parity: Parity,
        stop_bits: StopBits,
    ) -> Result<Self, serialport::Error> {
        let line = RealSerialLine::open(port_name, baud_rate, data_bits, parity, stop_bits)?;
        Ok(SerialTransport::new(Box::new(line)))
    }
}

impl Transport for SerialTransport {
    fn send(&mut self, msg: &[u8]) -> std::io::Result<()> {
        self.line.write_all(msg)
    }

    fn receive_with_timeout(&mut self, timeout: Duration) -> std::io::Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + timeout;
        let mut byte = [0u8; 1];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            match self.line.read_timeout(&mut byte, remaining) {
                Ok(0) => continue,
                Ok(_) => {
                    if let Some(packet) = self.deframer.push(byte[0]) {
                        return Ok(Some(packet));
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                Err(e) => return Err(e),
            }
        }

        if self.deframer.is_idle() {
            Ok(None)
        } else {
            // Hand the fragment up so it gets NAKed like any damaged packet
            let partial = self.deframer.take_partial();
            debug!("Line went quiet mid-packet after {} bytes", partial.len());
            Ok(Some(partial))
        }
    }
}
