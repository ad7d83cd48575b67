//! Link transport: fire-and-forget datagrams to a fixed set of peers.
//!
//! The radio callback never touches node state. It pushes into an [`Inbox`] and the
//! loop drains it at the top of each iteration.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::address::PeerAddress;
use crate::protocol::MAX_PAYLOAD;

/// Default inbox depth.
pub const INBOX_CAPACITY: usize = 16;

/// One inbound datagram and the link address it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datagram {
    pub from: PeerAddress,
    pub bytes: Vec<u8>,
}

/// Outbound side of the radio. No acknowledgement, no retry, no buffering.
pub trait Link {
    fn send(&mut self, to: PeerAddress, bytes: &[u8]) -> Result<(), SendError>;
}

/// Transport-level send failure, reported once to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SendError {
    #[error("payload of {0} bytes exceeds the radio limit")]
    TooLarge(usize),
    #[error("{0} is not a configured peer")]
    UnknownPeer(PeerAddress),
    #[error("radio refused datagram to {to}: {reason}")]
    Radio { to: PeerAddress, reason: String },
}

/// Static set of peers this node talks to. Fixed at startup.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    peers: Vec<PeerAddress>,
}

impl AllowList {
    pub fn new(peers: impl IntoIterator<Item = PeerAddress>) -> Self {
        let mut list = Vec::new();
        for p in peers {
            if !list.contains(&p) {
                list.push(p);
            }
        }
        Self { peers: list }
    }

    pub fn contains(&self, addr: &PeerAddress) -> bool {
        self.peers.contains(addr)
    }

    /// True if the datagram may be dispatched. Unknown senders are logged and dropped.
    pub fn admit(&self, datagram: &Datagram) -> bool {
        if self.contains(&datagram.from) {
            return true;
        }
        log::warn!(
            "dropping {} bytes from unknown peer {}: {}",
            datagram.bytes.len(),
            datagram.from,
            String::from_utf8_lossy(&datagram.bytes)
        );
        false
    }

    pub fn peers(&self) -> &[PeerAddress] {
        &self.peers
    }
}

/// Create a bounded single-producer / single-consumer inbox.
pub fn inbox(capacity: usize) -> (InboxSender, Inbox) {
    let (tx, rx) = mpsc::sync_channel(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    (
        InboxSender {
            tx,
            dropped: dropped.clone(),
        },
        Inbox { rx, dropped },
    )
}

/// Producer half, owned by the receive callback. Never blocks.
pub struct InboxSender {
    tx: SyncSender<Datagram>,
    dropped: Arc<AtomicU64>,
}

impl InboxSender {
    /// Queue a datagram. When the inbox is full the datagram is lost, like on air.
    /// Returns false if it was not queued.
    pub fn push(&self, datagram: Datagram) -> bool {
        match self.tx.try_send(datagram) {
            Ok(()) => true,
            Err(TrySendError::Full(d)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                log::warn!("inbox full, dropping datagram from {}", d.from);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }
}

/// Consumer half, owned by the main loop.
pub struct Inbox {
    rx: Receiver<Datagram>,
    dropped: Arc<AtomicU64>,
}

impl Inbox {
    /// Take everything queued so far without waiting.
    pub fn drain(&self) -> Vec<Datagram> {
        self.rx.try_iter().collect()
    }

    /// Datagrams lost to a full inbox since creation.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Impairments applied by [`SimulatedRadio`].
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct RadioProfile {
    /// Chance (0-100) a datagram vanishes in flight.
    pub loss_percent: f32,
    /// Chance (0-100) a datagram arrives twice.
    pub duplicate_percent: f32,
    /// Chance (0-100) a send is refused by the radio.
    pub send_failure_percent: f32,
    /// Shuffle each delivery batch.
    pub reorder: bool,
}

struct Medium {
    rng: StdRng,
    profile: RadioProfile,
    queues: HashMap<PeerAddress, Vec<Datagram>>,
    down: Vec<PeerAddress>,
    sent: u64,
    lost: u64,
}

/// In-process star medium with loss, duplication and reordering.
/// Each node gets a [`RadioPort`]; the driver moves datagrams with [`SimulatedRadio::deliver`].
#[derive(Clone)]
pub struct SimulatedRadio {
    medium: Rc<RefCell<Medium>>,
}

impl SimulatedRadio {
    pub fn new(profile: RadioProfile, seed: u64) -> Self {
        Self {
            medium: Rc::new(RefCell::new(Medium {
                rng: StdRng::seed_from_u64(seed),
                profile,
                queues: HashMap::new(),
                down: Vec::new(),
                sent: 0,
                lost: 0,
            })),
        }
    }

    /// A perfect medium: nothing lost, duplicated or reordered.
    pub fn reliable() -> Self {
        Self::new(RadioProfile::default(), 0)
    }

    pub fn port(&self, address: PeerAddress) -> RadioPort {
        RadioPort {
            address,
            medium: self.medium.clone(),
        }
    }

    pub fn set_profile(&self, profile: RadioProfile) {
        self.medium.borrow_mut().profile = profile;
    }

    /// Take a node off the air (or back on). Traffic to or from it silently vanishes.
    pub fn set_down(&self, address: PeerAddress, down: bool) {
        let mut m = self.medium.borrow_mut();
        m.down.retain(|a| *a != address);
        if down {
            m.down.push(address);
            m.queues.remove(&address);
        }
    }

    /// Hand over everything in flight for `address`, in arrival order unless reordering is on.
    pub fn deliver(&self, address: PeerAddress) -> Vec<Datagram> {
        let mut m = self.medium.borrow_mut();
        let mut batch = m.queues.remove(&address).unwrap_or_default();
        if m.profile.reorder {
            batch.shuffle(&mut m.rng);
        }
        batch
    }

    /// (datagrams accepted by the radio, datagrams lost in flight)
    pub fn stats(&self) -> (u64, u64) {
        let m = self.medium.borrow();
        (m.sent, m.lost)
    }
}

/// A node's attachment to a [`SimulatedRadio`].
pub struct RadioPort {
    address: PeerAddress,
    medium: Rc<RefCell<Medium>>,
}

impl RadioPort {
    pub fn address(&self) -> PeerAddress {
        self.address
    }
}

fn roll(rng: &mut StdRng, percent: f32) -> bool {
    percent > 0.0 && rng.gen::<f32>() * 100.0 < percent
}

impl Link for RadioPort {
    fn send(&mut self, to: PeerAddress, bytes: &[u8]) -> Result<(), SendError> {
        if bytes.len() > MAX_PAYLOAD {
            return Err(SendError::TooLarge(bytes.len()));
        }
        let mut guard = self.medium.borrow_mut();
        let m = &mut *guard;
        if roll(&mut m.rng, m.profile.send_failure_percent) {
            return Err(SendError::Radio {
                to,
                reason: "simulated failure".into(),
            });
        }
        m.sent += 1;
        if m.down.contains(&to) || m.down.contains(&self.address) {
            m.lost += 1;
            return Ok(());
        }
        if roll(&mut m.rng, m.profile.loss_percent) {
            m.lost += 1;
            return Ok(());
        }
        let copies = if roll(&mut m.rng, m.profile.duplicate_percent) {
            2
        } else {
            1
        };
        let queue = m.queues.entry(to).or_default();
        for _ in 0..copies {
            queue.push(Datagram {
                from: self.address,
                bytes: bytes.to_vec(),
            });
        }
        Ok(())
    }
}
