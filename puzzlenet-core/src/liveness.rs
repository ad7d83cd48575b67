//! Liveness: per-peer connected flag derived from the age of the last datagram.
//! Any traffic counts, not only heartbeats.

use serde::Serialize;

use crate::address::PeerAddress;

/// Connection record for one configured peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeerLink {
    pub address: PeerAddress,
    pub last_seen_at: u64,
    pub connected: bool,
}

/// Tracks every configured peer. The peer set never grows after construction.
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    links: Vec<PeerLink>,
    timeout_ms: u64,
}

impl LivenessMonitor {
    pub fn new(peers: impl IntoIterator<Item = PeerAddress>, timeout_ms: u64) -> Self {
        let mut links: Vec<PeerLink> = Vec::new();
        for address in peers {
            if links.iter().all(|l| l.address != address) {
                links.push(PeerLink {
                    address,
                    last_seen_at: 0,
                    connected: false,
                });
            }
        }
        Self { links, timeout_ms }
    }

    pub fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Record a datagram from `from`. Returns true if the peer just became connected.
    /// Unknown addresses are ignored.
    pub fn record_traffic(&mut self, from: PeerAddress, now_ms: u64) -> bool {
        let Some(link) = self.links.iter_mut().find(|l| l.address == from) else {
            return false;
        };
        let was_connected = link.connected;
        link.connected = true;
        link.last_seen_at = now_ms;
        if !was_connected {
            log::info!("peer {} connected", from);
        }
        !was_connected
    }

    /// Expire peers silent for longer than the timeout. Returns the peers that just
    /// transitioned to disconnected.
    pub fn check(&mut self, now_ms: u64) -> Vec<PeerAddress> {
        let timeout = self.timeout_ms;
        let mut lost = Vec::new();
        for link in self.links.iter_mut() {
            if link.connected && now_ms.saturating_sub(link.last_seen_at) > timeout {
                link.connected = false;
                log::warn!(
                    "peer {} lost: silent for {} ms",
                    link.address,
                    now_ms.saturating_sub(link.last_seen_at)
                );
                lost.push(link.address);
            }
        }
        lost
    }

    pub fn is_connected(&self, addr: &PeerAddress) -> bool {
        self.link(addr).is_some_and(|l| l.connected)
    }

    pub fn link(&self, addr: &PeerAddress) -> Option<&PeerLink> {
        self.links.iter().find(|l| l.address == *addr)
    }

    pub fn links(&self) -> &[PeerLink] {
        &self.links
    }
}

/// Fixed-period trigger polled from the loop.
#[derive(Debug, Clone)]
pub struct HeartbeatTimer {
    interval_ms: u64,
    last_fired_at: u64,
}

impl HeartbeatTimer {
    /// The first beat fires one full interval after `now_ms`.
    pub fn new(interval_ms: u64, now_ms: u64) -> Self {
        Self {
            interval_ms,
            last_fired_at: now_ms,
        }
    }

    /// True (and re-armed) once more than one interval has passed since the last beat.
    pub fn due(&mut self, now_ms: u64) -> bool {
        if now_ms.saturating_sub(self.last_fired_at) > self.interval_ms {
            self.last_fired_at = now_ms;
            return true;
        }
        false
    }
}
