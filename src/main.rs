use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cadence_gateway::api::ApiServer;
use cadence_gateway::audio::{AudioFrameSource, AudioPlayback, MicFrameSource};
use cadence_gateway::llm::GroqCompletion;
use cadence_gateway::session::{SessionCoordinator, SinkMessage};
use cadence_gateway::stt::deepgram::{DeepgramLiveSession, DeepgramSettings};
use cadence_gateway::tts::ElevenLabsSynthesizer;
use cadence_gateway::{Config, RoomTokenIssuer};

/// Cadence - Real-time voice assistant gateway
#[derive(Parser)]
#[command(name = "cadence", version, about)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "CADENCE_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on (overrides configuration)
    #[arg(long)]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run a voice session against the local microphone and speakers
    Listen,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Issue a room access token and print it
    IssueToken {
        /// Participant identity
        identity: String,
        /// Room name
        #[arg(short, long, default_value = "default")]
        room: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,cadence_gateway=info",
        1 => "info,cadence_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load_from(cli.config.as_deref())?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Listen => listen(&config).await,
            Command::TestMic { duration } => test_mic(duration).await,
            Command::IssueToken { identity, room } => issue_token(&config, &identity, &room),
        };
    }

    tracing::info!(port = config.server.port, "starting cadence gateway");

    let server = ApiServer::from_config(&config)?;
    server.run().await?;

    Ok(())
}

/// Run a full voice session against local audio hardware
async fn listen(config: &Config) -> anyhow::Result<()> {
    let api_key = config
        .stt
        .api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("Deepgram API key required (DEEPGRAM_API_KEY)"))?;

    let recognizer = Arc::new(DeepgramLiveSession::connect(DeepgramSettings {
        url: config.stt_listen_url(),
        api_key,
        keepalive: config.pipeline.keepalive(),
        reconnect_backoff: config.pipeline.reconnect_backoff(),
    }));

    let coordinator = SessionCoordinator::new(
        config.pipeline.clone(),
        recognizer,
        Arc::new(GroqCompletion::new(&config.llm)?),
        Arc::new(ElevenLabsSynthesizer::new(&config.tts)?),
    );

    let source = MicFrameSource::open()?;
    let playback = AudioPlayback::new(config.stt.sample_rate)?;

    let (sink_tx, mut sink_rx) = tokio::sync::mpsc::channel::<SinkMessage>(64);
    let output_task = tokio::spawn(async move {
        while let Some(message) = sink_rx.recv().await {
            match message {
                SinkMessage::Text(text) => print!("{text}"),
                SinkMessage::Audio(wav) => {
                    println!();
                    if let Err(e) = playback.play_wav(&wav).await {
                        tracing::warn!(error = %e, "playback failed");
                    }
                }
            }
        }
    });

    println!("Listening. Speak into your microphone; Ctrl-C to quit.\n");

    tokio::select! {
        result = coordinator.run(Box::new(source), sink_tx) => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupted, shutting down");
        }
    }

    output_task.abort();
    Ok(())
}

/// Test microphone input with a level meter
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut source = MicFrameSource::open()?;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(duration);

    let mut second = 0u64;
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.tick().await;

    let mut samples: Vec<i16> = Vec::new();
    loop {
        tokio::select! {
            frame = source.next_frame() => {
                let Some(frame) = frame else { break };
                samples.extend(
                    frame
                        .pcm()
                        .chunks_exact(2)
                        .map(|b| i16::from_le_bytes([b[0], b[1]])),
                );
            }
            _ = interval.tick() => {
                second += 1;
                let energy = calculate_rms(&samples);
                let peak = samples
                    .iter()
                    .map(|s| f32::from(*s).abs() / f32::from(i16::MAX))
                    .fold(0.0f32, f32::max);

                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let meter_len = (energy * 100.0).min(50.0) as usize;
                let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

                println!("[{second:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]");
                samples.clear();

                if tokio::time::Instant::now() >= deadline {
                    break;
                }
            }
        }
    }

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Calculate RMS energy of normalized PCM16 samples
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples
        .iter()
        .map(|s| {
            let v = f32::from(*s) / f32::from(i16::MAX);
            v * v
        })
        .sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Issue and print a room token
fn issue_token(config: &Config, identity: &str, room: &str) -> anyhow::Result<()> {
    let issuer = RoomTokenIssuer::new(&config.token)?;
    let token = issuer.issue(identity, room)?;
    println!("{token}");
    Ok(())
}
