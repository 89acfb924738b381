//! midihands - hand landmarks to MIDI control
//!
//! Main entry point for the CLI application.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use midihands::{
    client::{
        ChannelManager, ChannelSettings, ClientSession, ConnectionState, UiModel,
        UiSurface,
    },
    config::Config,
    output::{browser::open_in_browser, LogSink},
    tracking::detector::{run_detector, ReplayDetector},
    web::WebServer,
    AppState,
};

/// midihands - turn hand landmarks into MIDI control changes
#[derive(Parser, Debug)]
#[command(name = "midihands", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the backend: serve the frontend and turn frames into MIDI
    Serve(ServeArgs),

    /// Stream recorded detection frames to a running backend
    Replay(ReplayArgs),
}

#[derive(clap::Args, Debug, Default)]
struct ServeArgs {
    /// HTTP server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Don't open the frontend in a browser
    #[arg(long)]
    dont_open: bool,

    /// Number of samples in each moving average
    #[arg(long)]
    smooth: Option<usize>,

    /// Percentage of incoming frames to process, 0-100
    #[arg(long)]
    reduce_fps: Option<u8>,

    /// Directory of frontend files
    #[arg(long)]
    static_dir: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct ReplayArgs {
    /// JSON-lines file of detection results
    file: PathBuf,

    /// Page origin of the backend, e.g. http://localhost:8030
    #[arg(long)]
    origin: Option<String>,

    /// Output to select once the backend announces it
    #[arg(long)]
    output: Option<String>,

    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,

    /// Start over when the recording ends
    #[arg(long = "loop")]
    looping: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", midihands::NAME, midihands::VERSION);

    let config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    let runtime = tokio::runtime::Runtime::new()?;

    match args.command {
        Some(Command::Replay(replay_args)) => runtime.block_on(run_replay(config, replay_args))?,
        Some(Command::Serve(serve_args)) => runtime.block_on(run_server(config, serve_args))?,
        None => runtime.block_on(run_server(config, ServeArgs::default()))?,
    }

    info!("midihands stopped");
    Ok(())
}

async fn run_server(mut config: Config, args: ServeArgs) -> anyhow::Result<()> {
    // Apply CLI overrides
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.dont_open {
        config.server.open_browser = false;
    }
    if let Some(window) = args.smooth {
        config.processing.smoothing_window = window;
    }
    if let Some(percent) = args.reduce_fps {
        config.processing.keep_frame_percent = percent;
    }
    if let Some(dir) = args.static_dir {
        config.server.static_dir = dir;
    }

    config.validate()?;

    info!("Smoothing window: {}", config.processing.smoothing_window);
    info!("Keeping {}% of frames", config.processing.keep_frame_percent);

    let state = AppState::new(config.clone());
    for name in state.outputs.lock().await.names() {
        info!("Output available: {}", name);
    }

    let server = WebServer::new(Arc::clone(&state), &config.server);
    let listener = server.bind().await?;
    info!("HTTP server listening on {}", listener.local_addr()?);

    if config.server.open_browser {
        let url = format!("http://localhost:{}/", config.server.port);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            if let Err(e) = open_in_browser(&url).await {
                warn!("{}", e);
            }
        });
    }

    let server_task = tokio::spawn(server.serve(listener));

    shutdown_signal().await;
    info!("Shutdown signal received");
    state.shutdown();

    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("HTTP server error: {}", e),
        Err(e) => error!("HTTP server task failed: {}", e),
    }

    Ok(())
}

async fn run_replay(mut config: Config, args: ReplayArgs) -> anyhow::Result<()> {
    if let Some(origin) = args.origin {
        config.client.origin = origin;
    }
    if args.output.is_some() {
        config.client.output_target = args.output;
    }
    if let Some(fps) = args.fps.filter(|&fps| fps > 0) {
        config.client.frame_interval_ms = (1000 / fps as u64).max(1);
    }

    config.validate()?;

    let detector = ReplayDetector::from_file(&args.file)?.looping(args.looping);
    info!("Replaying {} frames from {}", detector.len(), args.file.display());

    let manager = ChannelManager::new(
        &config.client.origin,
        ChannelSettings::from_config(&config.client),
    )?;
    info!("Socket endpoint: {}", manager.endpoint());
    let channel = manager.connect();
    let handle = channel.handle.clone();

    let (shutdown_tx, _) = broadcast::channel::<()>(1);
    let signal_tx = shutdown_tx.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutdown signal received");
        let _ = signal_tx.send(());
    });

    // Frames sent before the first connection opens would only be dropped.
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::select! {
        _ = handle.wait_for(ConnectionState::Open) => {}
        _ = shutdown_rx.recv() => {
            handle.close();
            return Ok(());
        }
    }

    let (frames_tx, frames_rx) = mpsc::channel(4);
    let (_options_tx, options_rx) = watch::channel(config.detector.clone());
    tokio::spawn(run_detector(
        detector,
        Duration::from_millis(config.client.frame_interval_ms),
        frames_tx,
        options_rx,
        shutdown_tx.subscribe(),
    ));

    let ui = UiModel::new().with_preferred_output(config.client.output_target.clone());
    let session = ClientSession::new(handle.clone(), ui, LogSink::default());
    let session = session
        .run(frames_rx, channel.inbound, shutdown_tx.subscribe())
        .await;

    info!("Selected output: {:?}", session.ui().selected_output());
    for hand in ["left", "right"] {
        if let Some(readout) = session.ui().element(hand).filter(|r| !r.is_empty()) {
            info!("Last {} readout: {}", hand, readout.replace("<br>", ", "));
        }
    }

    // Give the last frames a moment to leave
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.close();
    if let Err(e) = channel.task.await {
        error!("Channel task failed: {}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
