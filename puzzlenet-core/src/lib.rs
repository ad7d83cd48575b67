//! Puzzlenet reference implementation: satellites driving physical puzzles and a
//! coordinator hub over a lossy single-hop datagram link.
//! Host-driven: no I/O; the host feeds datagrams, peripheral samples and the clock.

pub mod address;
pub mod protocol;
pub mod wire;

pub use address::{AddressParseError, PeerAddress};
pub use protocol::{Command, Message, MAX_PAYLOAD};
pub use wire::{decode, encode, DecodeError, EncodeError};

pub mod link;
pub mod liveness;

pub use link::{inbox, AllowList, Datagram, Inbox, InboxSender, Link, SendError, SimulatedRadio};
pub use liveness::{HeartbeatTimer, LivenessMonitor, PeerLink};

pub mod audio_station;
pub mod coordinator;
pub mod dispatch;
pub mod peripherals;
pub mod puzzle;
pub mod satellite;

pub use audio_station::{AudioStation, AudioStationConfig};
pub use coordinator::{Coordinator, CoordinatorConfig, RouteError, SessionError};
pub use dispatch::UnknownCommand;
pub use peripherals::Peripherals;
pub use puzzle::{PuzzleConfig, PuzzleEngine, Stage, Variant};
pub use satellite::{Satellite, SatelliteConfig, SatelliteRole};
