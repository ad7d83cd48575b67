//! Load config from file and environment.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use puzzlenet_core::{AudioStationConfig, PeerAddress, PuzzleConfig, Variant};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Coordinator,
    Satellite,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SatelliteKind {
    #[default]
    Suitcase,
    MagnetBox,
    AudioStation,
}

impl SatelliteKind {
    pub fn name(&self) -> &'static str {
        match self {
            SatelliteKind::Suitcase => "suitcase",
            SatelliteKind::MagnetBox => "magnet_box",
            SatelliteKind::AudioStation => "audio_station",
        }
    }
}

/// One node on the emulated radio: its link address and the UDP endpoint behind it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PeerConfig {
    pub name: String,
    pub address: PeerAddress,
    pub endpoint: SocketAddr,
}

/// Daemon configuration. File: ~/.config/puzzlenet/config.toml or /etc/puzzlenet/config.toml.
/// Env overrides: PUZZLENET_ROLE, PUZZLENET_BIND, PUZZLENET_ADDRESS.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_role")]
    pub role: Role,
    /// Own link address, sent as the header of every datagram.
    #[serde(default = "default_address")]
    pub address: PeerAddress,
    /// Local UDP socket (default 127.0.0.1:47100).
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,
    /// Satellite only.
    #[serde(default)]
    pub kind: SatelliteKind,
    /// Satellite only: peer name of the coordinator.
    #[serde(default)]
    pub coordinator: Option<String>,
    /// Coordinator only: peer receiving session and audio commands.
    #[serde(default)]
    pub session_satellite: Option<String>,
    #[serde(default)]
    pub puzzle: Option<PuzzleConfig>,
    #[serde(default)]
    pub audio: AudioStationConfig,
}

fn default_role() -> Role {
    Role::Satellite
}
fn default_address() -> PeerAddress {
    PeerAddress::new([0x02, 0, 0, 0, 0, 0x01])
}
fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 47100))
}

impl Default for Config {
    fn default() -> Self {
        Self {
            role: default_role(),
            address: default_address(),
            bind: default_bind(),
            peers: Vec::new(),
            kind: SatelliteKind::default(),
            coordinator: None,
            session_satellite: None,
            puzzle: None,
            audio: AudioStationConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("{var}: {reason}")]
    Env { var: &'static str, reason: String },
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Config {
    pub fn peer(&self, name: &str) -> Option<&PeerConfig> {
        self.peers.iter().find(|p| p.name == name)
    }

    /// Puzzle settings for this satellite, variant fixed by `kind`.
    pub fn puzzle_config(&self) -> PuzzleConfig {
        let variant = match self.kind {
            SatelliteKind::MagnetBox => Variant::MagnetBox,
            _ => Variant::Suitcase,
        };
        match &self.puzzle {
            Some(p) => PuzzleConfig {
                variant,
                ..p.clone()
            },
            None if variant == Variant::MagnetBox => PuzzleConfig::magnet_box(),
            None => PuzzleConfig::default(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (i, p) in self.peers.iter().enumerate() {
            if self.peers[..i].iter().any(|q| q.name == p.name) {
                return Err(ConfigError::Invalid(format!("duplicate peer {:?}", p.name)));
            }
            if p.address == self.address {
                return Err(ConfigError::Invalid(format!(
                    "peer {:?} uses our own address {}",
                    p.name, p.address
                )));
            }
        }
        match self.role {
            Role::Satellite => {
                let Some(name) = &self.coordinator else {
                    return Err(ConfigError::Invalid(
                        "satellite needs `coordinator`".into(),
                    ));
                };
                if self.peer(name).is_none() {
                    return Err(ConfigError::Invalid(format!(
                        "coordinator {:?} is not a peer",
                        name
                    )));
                }
            }
            Role::Coordinator => {
                if let Some(name) = &self.session_satellite {
                    if self.peer(name).is_none() {
                        return Err(ConfigError::Invalid(format!(
                            "session satellite {:?} is not a peer",
                            name
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Load config: default, then config file, then env vars.
/// An explicit path must exist; the default locations are optional.
pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let mut c = match explicit {
        Some(p) => read(p)?,
        None => match config_paths().into_iter().find(|p| p.exists()) {
            Some(p) => read(&p)?,
            None => Config::default(),
        },
    };
    apply_env(&mut c, |k| std::env::var(k).ok())?;
    Ok(c)
}

fn apply_env(c: &mut Config, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
    if let Some(s) = var("PUZZLENET_ROLE") {
        c.role = match s.trim() {
            "coordinator" => Role::Coordinator,
            "satellite" => Role::Satellite,
            other => {
                return Err(ConfigError::Env {
                    var: "PUZZLENET_ROLE",
                    reason: format!("unknown role {:?}", other),
                })
            }
        };
    }
    if let Some(s) = var("PUZZLENET_BIND") {
        c.bind = s.trim().parse().map_err(|e| ConfigError::Env {
            var: "PUZZLENET_BIND",
            reason: format!("{}", e),
        })?;
    }
    if let Some(s) = var("PUZZLENET_ADDRESS") {
        c.address = s.trim().parse().map_err(|e| ConfigError::Env {
            var: "PUZZLENET_ADDRESS",
            reason: format!("{}", e),
        })?;
    }
    Ok(())
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/puzzlenet/config.toml"));
    }
    out.push(PathBuf::from("/etc/puzzlenet/config.toml"));
    out
}

fn read(path: &Path) -> Result<Config, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&s).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn parse(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SATELLITE: &str = r#"
role = "satellite"
address = "24:6F:28:00:00:02"
bind = "127.0.0.1:47102"
kind = "magnet_box"
coordinator = "hub"

[[peers]]
name = "hub"
address = "24:6F:28:00:00:01"
endpoint = "127.0.0.1:47101"

[puzzle]
correct_code = "4711"
tag1 = ["AABBCC"]
"#;

    #[test]
    fn satellite_file_parses() {
        let c = parse(SATELLITE).unwrap();
        c.validate().unwrap();
        assert_eq!(c.role, Role::Satellite);
        assert_eq!(c.kind, SatelliteKind::MagnetBox);
        assert_eq!(c.peer("hub").unwrap().endpoint.port(), 47101);
        let p = c.puzzle_config();
        assert_eq!(p.variant, Variant::MagnetBox);
        assert_eq!(p.correct_code, "4711");
        assert_eq!(p.tag1, vec!["AABBCC".to_string()]);
        assert_eq!(p.max_code_len, 11);
    }

    #[test]
    fn defaults_without_file() {
        let c = Config::default();
        assert_eq!(c.bind.port(), 47100);
        assert_eq!(c.puzzle_config().correct_code, "81522252839");
        assert_eq!(c.audio.default_volume, 20);
        assert!(c.validate().is_err());
    }

    #[test]
    fn unknown_fields_rejected() {
        assert!(parse("proxy_port = 3128").is_err());
    }

    #[test]
    fn env_overrides() {
        let mut c = parse(SATELLITE).unwrap();
        apply_env(&mut c, |k| match k {
            "PUZZLENET_ROLE" => Some("coordinator".into()),
            "PUZZLENET_BIND" => Some("0.0.0.0:5000".into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(c.role, Role::Coordinator);
        assert_eq!(c.bind.port(), 5000);
        let err = apply_env(&mut c, |k| (k == "PUZZLENET_ADDRESS").then(|| "zz".to_string()));
        assert!(matches!(err, Err(ConfigError::Env { .. })));
    }

    #[test]
    fn coordinator_must_name_known_peers() {
        let mut c = parse(SATELLITE).unwrap();
        c.role = Role::Coordinator;
        c.session_satellite = Some("golab".into());
        assert!(c.validate().is_err());
        c.session_satellite = Some("hub".into());
        c.validate().unwrap();
    }
}
