//! Media Stream Receiver
//!
//! Runs one stream session: frames from the source are queued into the
//! audio ring buffer and played on the output device (feature `playback`)
//! or pulled by a headless paced sink.
//!
//! Usage: `receiver [--config <path>]`

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use media_stream_receiver::{config::AppConfig, source::ToneSource, StreamSession};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting media stream receiver");

    let config_path = config_path_from_args();
    let config = AppConfig::load_or_default(config_path.as_deref())?;

    #[cfg(feature = "playback")]
    print_output_devices();

    let mut session = StreamSession::new(&config.audio)?;

    let source = ToneSource::new(&config.audio, &config.source);
    session.start_source(source, config.source.poll_interval())?;

    start_sink(&mut session)?;

    tracing::info!("Waiting for audio to buffer...");

    let mut stats_interval =
        tokio::time::interval(Duration::from_secs(config.stats_interval_secs.max(1)));
    // the first tick completes immediately
    stats_interval.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
            _ = stats_interval.tick() => {
                tracing::info!("{}", session.stats());

                #[cfg(feature = "playback")]
                if let Some(e) = session.check_sink_errors() {
                    tracing::warn!("Output stream error: {}", e);
                }

                if session.source_finished() {
                    tracing::info!("Source finished, shutting down");
                    break;
                }
            }
        }
    }

    session.shutdown();
    tracing::info!("Final: {}", session.stats());
    Ok(())
}

#[cfg(feature = "playback")]
fn start_sink(session: &mut StreamSession) -> Result<()> {
    if let Err(e) = session.start_playback() {
        tracing::warn!("Audio output unavailable ({}), using headless sink", e);
        session.start_headless()?;
    }
    Ok(())
}

#[cfg(not(feature = "playback"))]
fn start_sink(session: &mut StreamSession) -> Result<()> {
    session.start_headless()?;
    Ok(())
}

#[cfg(feature = "playback")]
fn print_output_devices() {
    use media_stream_receiver::audio::list_output_devices;

    println!("\n=== Available Output Devices ===");
    for device in list_output_devices() {
        let default_marker = if device.is_default { " [DEFAULT]" } else { "" };
        println!("  {}{}:", device.name, default_marker);
        println!("    Sample rates: {:?}", device.sample_rates);
        println!("    Channels: {:?}", device.channels);
    }
    println!();
}

fn config_path_from_args() -> Option<PathBuf> {
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            return args.next().map(PathBuf::from);
        }
    }
    None
}
