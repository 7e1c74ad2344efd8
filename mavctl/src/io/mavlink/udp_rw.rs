use std::io::{Read, Write};
use std::net::{SocketAddr, UdpSocket};
use std::sync::{Arc, RwLock};
use std::thread;

use crate::consts::{UDP_RETRIES, UDP_RETRY_INTERVAL};

/// Largest UDP payload.
const DATAGRAM_CAPACITY: usize = 65_507;

/// A wrapper around [`UdpSocket`] that implements [`Read`] and [`Write`].
///
/// Reads are served from a whole received datagram, so a frame is never cut by a short read
/// buffer. Writes go either to the connected address or to the last peer a datagram was received
/// from. Until such peer is known, writes fail with [`std::io::ErrorKind::NotConnected`].
pub(super) struct UdpRW {
    socket: UdpSocket,
    connected: bool,
    peer: Arc<RwLock<Option<SocketAddr>>>,
    buf: Vec<u8>,
    pos: usize,
    len: usize,
}

impl UdpRW {
    /// Binds a socket and learns the peer from incoming datagrams.
    pub(super) fn bind(addr: SocketAddr) -> std::io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        Ok(Self::new(socket, false))
    }

    /// Binds to an ephemeral port and sends datagrams to `addr`.
    pub(super) fn connect(addr: SocketAddr) -> std::io::Result<Self> {
        let local: SocketAddr = if addr.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            ([0u16; 8], 0).into()
        };
        let socket = UdpSocket::bind(local)?;
        socket.connect(addr)?;
        Ok(Self::new(socket, true))
    }

    fn new(socket: UdpSocket, connected: bool) -> Self {
        Self {
            socket,
            connected,
            peer: Arc::new(RwLock::new(None)),
            buf: vec![0; DATAGRAM_CAPACITY],
            pos: 0,
            len: 0,
        }
    }

    /// Underlying socket.
    pub(super) fn socket(&self) -> &UdpSocket {
        &self.socket
    }

    /// Creates a new independently owned handle to the underlying socket.
    ///
    /// Handles share the learned peer address but not the read buffer.
    pub(super) fn try_clone(&self) -> std::io::Result<Self> {
        Ok(Self {
            socket: self.socket.try_clone()?,
            connected: self.connected,
            peer: self.peer.clone(),
            buf: vec![0; DATAGRAM_CAPACITY],
            pos: 0,
            len: 0,
        })
    }

    fn receive_datagram(&mut self) -> std::io::Result<()> {
        if self.connected {
            self.len = self.socket.recv(&mut self.buf)?;
        } else {
            let (len, addr) = self.socket.recv_from(&mut self.buf)?;
            self.len = len;
            self.learn_peer(addr);
        }
        self.pos = 0;
        Ok(())
    }

    fn learn_peer(&self, addr: SocketAddr) {
        let mut peer = match self.peer.write() {
            Ok(peer) => peer,
            Err(poisoned) => poisoned.into_inner(),
        };
        if *peer != Some(addr) {
            log::debug!("[udp] peer address is {addr}");
            *peer = Some(addr);
        }
    }

    fn send_once(&self, buf: &[u8]) -> std::io::Result<usize> {
        if self.connected {
            return self.socket.send(buf);
        }

        let peer = match self.peer.read() {
            Ok(peer) => *peer,
            Err(poisoned) => *poisoned.into_inner(),
        };
        match peer {
            Some(addr) => self.socket.send_to(buf, addr),
            None => Err(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "no datagrams received yet, peer is unknown",
            )),
        }
    }
}

impl Read for UdpRW {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        while self.pos >= self.len {
            self.receive_datagram()?;
        }

        let available = &self.buf[self.pos..self.len];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for UdpRW {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut res = Ok(0);
        for i in 0..UDP_RETRIES {
            res = self.send_once(buf);
            match &res {
                Ok(_) => break,
                Err(err) if err.kind() == std::io::ErrorKind::NotConnected => break,
                Err(_) if i == UDP_RETRIES - 1 => break,
                Err(_) => thread::sleep(UDP_RETRY_INTERVAL),
            }
        }
        res
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local(port: u16) -> SocketAddr {
        ([127, 0, 0, 1], port).into()
    }

    #[test]
    fn small_reads_do_not_lose_datagram_tail() {
        let mut server = UdpRW::bind(local(0)).unwrap();
        let mut client = UdpRW::connect(server.socket().local_addr().unwrap()).unwrap();

        client.write_all(&[1, 2, 3, 4, 5]).unwrap();

        let mut head = [0u8; 2];
        let mut tail = [0u8; 3];
        server.read_exact(&mut head).unwrap();
        server.read_exact(&mut tail).unwrap();
        assert_eq!(head, [1, 2]);
        assert_eq!(tail, [3, 4, 5]);
    }

    #[test]
    fn bound_socket_replies_to_learned_peer() {
        let server = UdpRW::bind(local(0)).unwrap();
        let mut server_reader = server.try_clone().unwrap();
        let mut server_writer = server;
        let mut client = UdpRW::connect(server_reader.socket().local_addr().unwrap()).unwrap();

        assert_eq!(
            server_writer.write(&[0]).unwrap_err().kind(),
            std::io::ErrorKind::NotConnected
        );

        client.write_all(&[42]).unwrap();
        let mut buf = [0u8; 1];
        server_reader.read_exact(&mut buf).unwrap();

        server_writer.write_all(&[24]).unwrap();
        client.read_exact(&mut buf).unwrap();
        assert_eq!(buf, [24]);
    }
}
