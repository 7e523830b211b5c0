use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use voice_relay::cli::{CONSOLE_HELP, Cli, Command, ConsoleCommand};
use voice_relay::{
    AudioSource, Relay, RelayConfig, SessionEvent, WavFileSource, WebSocketConnector,
};

fn init_tracing(verbose: u8) -> Result<()> {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .context("invalid log filter")?;
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("failed to install tracing subscriber")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let mut config = match &cli.config {
        Some(path) => RelayConfig::load(path)?,
        None => RelayConfig::default(),
    };

    match cli.command {
        Command::ListDevices => list_devices(),
        Command::Run(args) => {
            args.apply(&mut config)?;
            run(config).await
        }
    }
}

#[cfg(feature = "microphone")]
fn list_devices() -> Result<()> {
    for name in voice_relay::list_input_devices()? {
        println!("{name}");
    }
    Ok(())
}

#[cfg(not(feature = "microphone"))]
fn list_devices() -> Result<()> {
    anyhow::bail!("built without microphone support")
}

fn audio_source(config: &RelayConfig) -> Result<Box<dyn AudioSource>> {
    if let Some(path) = &config.audio.wav {
        return Ok(Box::new(WavFileSource::new(path)));
    }
    microphone(config)
}

#[cfg(feature = "microphone")]
fn microphone(config: &RelayConfig) -> Result<Box<dyn AudioSource>> {
    Ok(Box::new(voice_relay::MicrophoneSource::new(
        config.audio.device.clone(),
    )))
}

#[cfg(not(feature = "microphone"))]
fn microphone(_config: &RelayConfig) -> Result<Box<dyn AudioSource>> {
    anyhow::bail!("built without microphone support; use --wav")
}

async fn run(config: RelayConfig) -> Result<()> {
    let connector = Arc::new(
        WebSocketConnector::new(config.server.url.clone())
            .accept_invalid_certs(config.server.accept_invalid_certs),
    );
    let relay = Relay::launch(&config, connector, audio_source(&config)?)?;
    let printer = tokio::spawn(print_events(relay.session().subscribe()));
    println!("{CONSOLE_HELP}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("failed to read stdin")?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        match ConsoleCommand::parse(&line) {
            Ok(Some(ConsoleCommand::Quit)) => break,
            Ok(Some(command)) => execute(&relay, command),
            Ok(None) => {}
            Err(message) => println!("{message}"),
        }
    }

    relay.shutdown().await;
    printer.abort();
    Ok(())
}

fn execute(relay: &Relay, command: ConsoleCommand) {
    let session = relay.session();
    match command {
        ConsoleCommand::Start => {
            // Loading a model detector blocks; failures are already reported as status lines.
            let _ = tokio::task::block_in_place(|| relay.pipeline().start());
        }
        ConsoleCommand::Stop => relay.pipeline().stop(),
        ConsoleCommand::Clear => relay.pipeline().clear(),
        ConsoleCommand::Langs => {
            let directory = session.directory();
            if directory.is_empty() {
                println!("no languages advertised yet");
            }
            for source in directory.selectable_sources() {
                let targets: Vec<_> = directory
                    .targets_for(source)
                    .iter()
                    .map(|t| format!("{} ({})", t.code(), t.name()))
                    .collect();
                println!("{} ({}) -> {}", source.code(), source.name(), targets.join(", "));
            }
        }
        ConsoleCommand::From(code) => match session.select_source(&code) {
            Ok(source) => println!("from: {}", source.name()),
            Err(e) => println!("{e}"),
        },
        ConsoleCommand::To(code) => match session.select_target(&code) {
            Ok(target) => println!("to: {}", target.name()),
            Err(e) => println!("{e}"),
        },
        ConsoleCommand::Status => {
            let controls = session.controls();
            let pair = session
                .active_pair()
                .map_or_else(|| "none".to_string(), |pair| pair.to_string());
            println!(
                "connection: {}, listening: {}, pair: {pair}, can start: {}, can stop: {}",
                session.connection_state(),
                session.is_listening(),
                controls.can_start,
                controls.can_stop
            );
        }
        ConsoleCommand::Help => println!("{CONSOLE_HELP}"),
        ConsoleCommand::Quit => {}
    }
}

async fn print_events(mut events: tokio::sync::broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::Status(notification)) => println!("{notification}"),
            Ok(SessionEvent::Transcript { kind, text }) => print!("[{kind:?}] {text}"),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "console fell behind session events")
            }
            Err(RecvError::Closed) => break,
        }
    }
}
