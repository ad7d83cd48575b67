// Puzzlenet Linux: runs one coordinator or satellite over emulated radio.

mod config;
mod console;
mod node;
mod radio;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use puzzlenet_core::link::{self, INBOX_CAPACITY};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::UdpSocket;

use config::Role;
use console::{ConsoleBoard, ConsoleInput};
use node::Node;

const LOOP_PERIOD: Duration = Duration::from_millis(50);

#[derive(Parser)]
#[command(name = "puzzlenet-linux", version)]
#[command(about = "Puzzlenet node daemon")]
struct Args {
    /// Config file (default: ~/.config/puzzlenet/config.toml, then /etc/puzzlenet/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, value_enum)]
    role: Option<Role>,

    /// UDP socket standing in for the radio
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut cfg = config::load(args.config.as_deref()).context("loading config")?;
    if let Some(role) = args.role {
        cfg.role = role;
    }
    if let Some(bind) = args.bind {
        cfg.bind = bind;
    }
    cfg.validate()?;

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cfg))
}

async fn run(cfg: config::Config) -> Result<()> {
    let socket = Arc::new(
        UdpSocket::bind(cfg.bind)
            .await
            .with_context(|| format!("binding {}", cfg.bind))?,
    );
    log::info!("listening on {} as {}", cfg.bind, cfg.address);

    let (inbox_tx, inbox) = link::inbox(INBOX_CAPACITY);
    let recv_socket = socket.clone();
    tokio::spawn(async move {
        if let Err(e) = radio::recv_loop(recv_socket, inbox_tx).await {
            log::error!("radio receive stopped: {}", e);
        }
    });

    let board = ConsoleBoard::new();
    let clock = Instant::now();
    let mut node = Node::build(&cfg, socket.clone(), &board, 0)?;

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut tick = tokio::time::interval(LOOP_PERIOD);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            res = &mut shutdown => {
                res?;
                log::info!("shutting down");
                break;
            }
            _ = tick.tick() => {
                let now = clock.elapsed().as_millis() as u64;
                node.run_once(&inbox, now);
                if node.restart_requested() {
                    log::info!("restarting node");
                    node = Node::build(&cfg, socket.clone(), &board, now)?;
                }
            }
            line = stdin.next_line(), if stdin_open => match line {
                Ok(Some(line)) if line.trim().is_empty() => {}
                Ok(Some(line)) => {
                    let now = clock.elapsed().as_millis() as u64;
                    match console::parse_line(&line) {
                        Ok(ConsoleInput::Board(input)) => node.board_input(&board, input),
                        Ok(ConsoleInput::Operator(cmd)) => {
                            if let Err(e) = node.operator(cmd, now) {
                                log::warn!("{:#}", e);
                            }
                        }
                        Err(e) => log::warn!("{}\n{}", e, console::HELP),
                    }
                }
                Ok(None) => stdin_open = false,
                Err(e) => {
                    log::warn!("stdin: {}", e);
                    stdin_open = false;
                }
            },
        }
    }
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM (Unix).
async fn shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}
