//! Command-line arguments and interactive console commands.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use voice_relay_vad::DetectorBackend;

use crate::config::{ConfigError, RelayConfig};

#[derive(Debug, Parser)]
#[command(
    name = "voice-relay",
    version,
    about = "Stream speech to a recognition service and relay the results"
)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Connect and accept console commands.
    Run(RunArgs),
    /// Print the available input devices.
    ListDevices,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DetectorKind {
    Energy,
    Silero,
}

#[derive(Debug, Default, Args)]
pub struct RunArgs {
    /// WebSocket URL of the recognition service.
    #[arg(long)]
    pub server: Option<String>,

    /// Accept self-signed server certificates.
    #[arg(long)]
    pub insecure: bool,

    /// Input device name.
    #[arg(long)]
    pub device: Option<String>,

    /// Replay a WAV file instead of capturing.
    #[arg(long, value_name = "FILE")]
    pub wav: Option<PathBuf>,

    /// Forward broadcasts as UDP datagrams to this address.
    #[arg(long, value_name = "ADDR")]
    pub broadcast_udp: Option<SocketAddr>,

    #[arg(long, value_enum)]
    pub detector: Option<DetectorKind>,

    /// Silero ONNX model, required with `--detector silero`.
    #[arg(long, value_name = "FILE")]
    pub silero_model: Option<PathBuf>,
}

impl RunArgs {
    /// Layer command-line overrides onto a loaded configuration.
    pub fn apply(&self, config: &mut RelayConfig) -> Result<(), ConfigError> {
        if let Some(server) = &self.server {
            config.server.url = server.clone();
        }
        if self.insecure {
            config.server.accept_invalid_certs = true;
        }
        if let Some(device) = &self.device {
            config.audio.device = Some(device.clone());
        }
        if let Some(wav) = &self.wav {
            config.audio.wav = Some(wav.clone());
        }
        if let Some(target) = self.broadcast_udp {
            config.broadcast.udp_target = Some(target);
        }

        let kind = self.detector.or(self.silero_model.as_ref().map(|_| DetectorKind::Silero));
        match kind {
            Some(DetectorKind::Energy) => {
                if !matches!(config.detector, DetectorBackend::Energy { .. }) {
                    config.detector = DetectorBackend::default();
                }
            }
            Some(DetectorKind::Silero) => {
                let model_path = match (&self.silero_model, &config.detector) {
                    (Some(path), _) => path.clone(),
                    (None, DetectorBackend::Silero { model_path }) => model_path.clone(),
                    (None, _) => {
                        return Err(ConfigError::Invalid(
                            "--detector silero requires --silero-model".to_string(),
                        ));
                    }
                };
                config.detector = DetectorBackend::Silero { model_path };
            }
            None => {}
        }
        config.validate()
    }
}

/// A line typed at the interactive console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Start,
    Stop,
    Clear,
    Langs,
    From(String),
    To(String),
    Status,
    Help,
    Quit,
}

pub const CONSOLE_HELP: &str =
    "commands: start, stop, clear, langs, from <code>, to <code>, status, help, quit";

impl ConsoleCommand {
    /// Parse one line. Blank lines are `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let argument = words.next();
        let command = match (verb.to_ascii_lowercase().as_str(), argument) {
            ("start", None) => Self::Start,
            ("stop", None) => Self::Stop,
            ("clear", None) => Self::Clear,
            ("langs", None) => Self::Langs,
            ("status", None) => Self::Status,
            ("help" | "?", None) => Self::Help,
            ("quit" | "exit", None) => Self::Quit,
            ("from", Some(code)) => Self::From(code.to_ascii_lowercase()),
            ("to", Some(code)) => Self::To(code.to_ascii_lowercase()),
            ("from" | "to", None) => return Err(format!("usage: {verb} <code>")),
            _ => return Err(format!("unrecognized command: {}", line.trim())),
        };
        if words.next().is_some() {
            return Err(format!("unexpected arguments: {}", line.trim()));
        }
        Ok(Some(command))
    }
}
