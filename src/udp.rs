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

//! One packet per UDP datagram.

use std::io::{Error, ErrorKind};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{Duration, Instant};
use tracing::debug;
use crate::transport::Transport;

/// Largest datagram we expect; a full packet is 257 bytes.
const MAX_DATAGRAM: usize = 1024;

pub struct UdpTransport {
    socket: UdpSocket,
    peer: Option<SocketAddr>,
}

impl UdpTransport {
    /// Sender side: bind an ephemeral port and talk to `host:port`.
    pub fn establish(host: &str, port: u16) -> std::io::Result<Self> {
        let peer = resolve(host, port)?;
        let local = if peer.is_ipv4() {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(local)?;
        debug!("UDP link {} -> {}", socket.local_addr()?, peer);
        Ok(UdpTransport { socket, peer: Some(peer) })
    }

    /// Receiver side: bind `host:port` and answer whoever speaks first.
    pub fn listen(host: &str, port: u16) -> std::io::Result<Self> {
        let addr = resolve(host, port)?;
        let socket = UdpSocket::bind(addr)?;
        debug!("UDP link listening on {}", socket.local_addr()?);
        Ok(UdpTransport { socket, peer: None })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

fn resolve(host: &str, port: u16) -> std::io::Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| Error::new(ErrorKind::NotFound, format!("cannot resolve {}:{}", host, port)))
}

impl Transport for UdpTransport {
    fn send(&mut self, msg: &[u8]) -> std::io::Result<()> {
        let peer = self
            .peer
            .ok_or_else(|| Error::new(ErrorKind::NotConnected, "no peer has contacted us yet"))?;
        self.socket.send_to(msg, peer)?;
        Ok(())
    }

    fn receive_with_timeout(&mut self, timeout: Duration) -> std::io::Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + timeout;
        let mut buf = [0u8; MAX_DATAGRAM];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            self.socket.set_read_timeout(Some(remaining))?;

            match self.socket.recv_from(&mut buf) {
                Ok((n, from)) => match self.peer {
                    None => {
                        debug!("Peer is {}", from);
                        self.peer = Some(from);
                        return Ok(Some(buf[..n].to_vec()));
                    }
                    Some(peer) if peer == from => return Ok(Some(buf[..n].to_vec())),
                    Some(peer) => {
                        debug!("Ignoring datagram from {} (peer is {})", from, peer);
                    }
                },
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Ok(None);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
