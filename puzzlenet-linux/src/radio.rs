//! Radio emulation over UDP. Every datagram carries the sender's 6-byte link address
//! in front of the payload, the way the radio header would.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use puzzlenet_core::link::{Datagram, InboxSender, Link, SendError};
use puzzlenet_core::{PeerAddress, MAX_PAYLOAD};
use tokio::net::UdpSocket;

const HEADER_LEN: usize = 6;

pub struct UdpLink {
    me: PeerAddress,
    socket: Arc<UdpSocket>,
    endpoints: HashMap<PeerAddress, SocketAddr>,
}

impl UdpLink {
    pub fn new(
        me: PeerAddress,
        socket: Arc<UdpSocket>,
        endpoints: impl IntoIterator<Item = (PeerAddress, SocketAddr)>,
    ) -> Self {
        Self {
            me,
            socket,
            endpoints: endpoints.into_iter().collect(),
        }
    }
}

impl Link for UdpLink {
    fn send(&mut self, to: PeerAddress, bytes: &[u8]) -> Result<(), SendError> {
        if bytes.len() > MAX_PAYLOAD {
            return Err(SendError::TooLarge(bytes.len()));
        }
        let endpoint = *self.endpoints.get(&to).ok_or(SendError::UnknownPeer(to))?;
        self.socket
            .try_send_to(&frame(self.me, bytes), endpoint)
            .map(|_| ())
            .map_err(|e| SendError::Radio {
                to,
                reason: e.to_string(),
            })
    }
}

fn frame(from: PeerAddress, bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + bytes.len());
    out.extend_from_slice(from.as_bytes());
    out.extend_from_slice(bytes);
    out
}

fn unframe(buf: &[u8]) -> Option<Datagram> {
    if buf.len() < HEADER_LEN {
        return None;
    }
    let from = PeerAddress::from_slice(&buf[..HEADER_LEN])?;
    Some(Datagram {
        from,
        bytes: buf[HEADER_LEN..].to_vec(),
    })
}

/// Receive task: hand every datagram to the inbox and return to the socket.
pub async fn recv_loop(socket: Arc<UdpSocket>, inbox: InboxSender) -> std::io::Result<()> {
    let mut buf = vec![0u8; 2048];
    loop {
        let (n, src) = socket.recv_from(&mut buf).await?;
        match unframe(&buf[..n]) {
            Some(d) => {
                inbox.push(d);
            }
            None => log::debug!("runt datagram ({} bytes) from {}", n, src),
        }
    }
}
