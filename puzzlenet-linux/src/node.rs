//! The one node this daemon runs, built from config.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use puzzlenet_core::coordinator::{SatelliteEntry, StartGame};
use puzzlenet_core::link::Inbox;
use puzzlenet_core::{
    AudioStation, Coordinator, CoordinatorConfig, PuzzleEngine, Satellite, SatelliteConfig,
    SatelliteRole,
};
use tokio::net::UdpSocket;

use crate::config::{Config, Role, SatelliteKind};
use crate::console::{BoardInput, ConsoleBoard, OperatorCommand};
use crate::radio::UdpLink;

pub enum Node {
    Coordinator(Coordinator<UdpLink>),
    Satellite(Satellite<UdpLink>),
}

impl Node {
    pub fn build(
        cfg: &Config,
        socket: Arc<UdpSocket>,
        board: &ConsoleBoard,
        now_ms: u64,
    ) -> Result<Self> {
        let link = UdpLink::new(
            cfg.address,
            socket,
            cfg.peers.iter().map(|p| (p.address, p.endpoint)),
        );
        let node = match cfg.role {
            Role::Coordinator => {
                let config = CoordinatorConfig {
                    satellites: cfg
                        .peers
                        .iter()
                        .map(|p| SatelliteEntry {
                            name: p.name.clone(),
                            address: p.address,
                        })
                        .collect(),
                    session_satellite: cfg.session_satellite.clone(),
                    ..CoordinatorConfig::default()
                };
                log::info!(
                    "coordinator {} tracking {} satellites",
                    cfg.address,
                    config.satellites.len()
                );
                Node::Coordinator(Coordinator::new(link, config, now_ms))
            }
            Role::Satellite => {
                let hub = cfg
                    .coordinator
                    .as_deref()
                    .and_then(|name| cfg.peer(name))
                    .ok_or_else(|| anyhow!("coordinator peer not configured"))?;
                let role = match cfg.kind {
                    SatelliteKind::AudioStation => {
                        SatelliteRole::AudioStation(AudioStation::new(cfg.audio.clone()))
                    }
                    SatelliteKind::Suitcase | SatelliteKind::MagnetBox => {
                        SatelliteRole::Puzzle(PuzzleEngine::new(cfg.puzzle_config(), now_ms))
                    }
                };
                log::info!(
                    "{} satellite {} reporting to {} ({})",
                    cfg.kind.name(),
                    cfg.address,
                    hub.name,
                    hub.address
                );
                let mut sat = Satellite::new(
                    link,
                    SatelliteConfig::new(hub.address, format!("{}_alive", cfg.kind.name())),
                    role,
                    board.peripherals(),
                    now_ms,
                );
                sat.boot(now_ms);
                Node::Satellite(sat)
            }
        };
        Ok(node)
    }

    pub fn run_once(&mut self, inbox: &Inbox, now_ms: u64) {
        match self {
            Node::Coordinator(c) => c.run_once(inbox, now_ms),
            Node::Satellite(s) => s.run_once(inbox, now_ms),
        }
    }

    pub fn restart_requested(&self) -> bool {
        matches!(self, Node::Satellite(s) if s.restart_requested())
    }

    pub fn board_input(&self, board: &ConsoleBoard, input: BoardInput) {
        match self {
            Node::Satellite(_) => board.feed(input),
            Node::Coordinator(_) => log::warn!("the coordinator has no peripherals"),
        }
    }

    /// Run one operator command. Query results are printed as JSON on stdout.
    pub fn operator(&mut self, cmd: OperatorCommand, now_ms: u64) -> Result<()> {
        let Node::Coordinator(c) = self else {
            return Err(anyhow!("operator commands need the coordinator role"));
        };
        match cmd {
            OperatorCommand::Start(group) => c.start_game(
                StartGame {
                    group_label: group,
                    ..StartGame::default()
                },
                now_ms,
            )?,
            OperatorCommand::Pause => c.pause_game(now_ms)?,
            OperatorCommand::Resume => c.resume_game(now_ms)?,
            OperatorCommand::End(status) => c.end_game(&status, now_ms)?,
            OperatorCommand::Play(name) => c.play_audio(&name, now_ms)?,
            OperatorCommand::Stop => c.stop_audio(now_ms)?,
            OperatorCommand::Volume(v) => c.set_volume(v, now_ms)?,
            OperatorCommand::OpenLock(sat) => c.open_lock(&sat, now_ms)?,
            OperatorCommand::Reset(sat) => c.reset_puzzle(&sat, now_ms)?,
            OperatorCommand::GetStatus(sat) => c.request_status(&sat, now_ms)?,
            OperatorCommand::Restart(sat) => c.restart(&sat, now_ms)?,
            OperatorCommand::RestartAll => {
                for (name, outcome) in c.restart_all(now_ms) {
                    match outcome {
                        Ok(()) => log::info!("restart sent to {}", name),
                        Err(e) => log::warn!("restart {}: {}", name, e),
                    }
                }
            }
            OperatorCommand::Status => print_json(&c.status(now_ms))?,
            OperatorCommand::Hint => print_json(&c.poll_hint(now_ms))?,
            OperatorCommand::Puzzle(sat) => {
                let status = c
                    .puzzle_status(&sat)
                    .ok_or_else(|| anyhow!("no satellite named {:?}", sat))?;
                print_json(&status)?;
            }
        }
        Ok(())
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
