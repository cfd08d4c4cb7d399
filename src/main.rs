use std::{path::PathBuf, sync::Arc, time::Duration};

use assets::AssetCache;
use config::{Config, DEFAULT_CONFIG_PATH};
use device::{Deck, DeckDriver, find_device, keepalive_task};
use error::{Report, Reporter};
use input_listener::{AudioSources, input_listener};
use painter::Painter;
use remote::{Instance, ObsRemote, Remote};
use remote_listener::remote_listener;
use sync::synchronize;
use tokio::sync::mpsc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

#[cfg(not(target_os = "windows"))]
use tokio::signal::unix::{SignalKind, signal};

mod assets;
mod config;
mod device;
mod error;
mod input_listener;
mod inputs;
mod mappings;
mod painter;
mod remote;
mod remote_listener;
mod sync;
#[cfg(test)]
mod testing;

/// Time in-flight work gets to finish before the device is released
const GRACE_PERIOD: Duration = Duration::from_secs(1);

#[cfg(any(target_os = "linux", target_os = "macos"))]
async fn sigterm() -> Result<(), Box<dyn std::error::Error>> {
    let mut sig = signal(SignalKind::terminate())?;

    sig.recv().await;

    Ok(())
}

#[cfg(target_os = "windows")]
async fn sigterm() -> Result<(), Box<dyn std::error::Error>> {
    // Future that would never resolve, so select only acts on ctrl-c
    std::future::pending::<()>().await;

    Ok(())
}

/// Resolves on ctrl-c or SIGTERM
async fn termination() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {},
        _ = sigterm() => {},
    }
}

/// Logs reported errors until a termination signal arrives
async fn supervise(errors: &mut mpsc::Receiver<Report>) {
    let signal = termination();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            _ = &mut signal => break,
            report = errors.recv() => match report {
                Some(report) => log::error!("Event error: {}", report),
                None => {
                    log::warn!("Every listener has stopped, waiting for termination");
                    (&mut signal).await;
                    break;
                }
            },
        }
    }
}

/// Cancels every task, gives them [`GRACE_PERIOD`] to finish, then blanks and releases the device
async fn shutdown<D: DeckDriver>(deck: &Deck<D>, tracker: &TaskTracker, token: &CancellationToken) {
    token.cancel();
    tracker.close();

    log::info!("Waiting for tasks to finish");

    if tokio::time::timeout(GRACE_PERIOD, tracker.wait())
        .await
        .is_err()
    {
        log::warn!("Tasks still running after {:?}", GRACE_PERIOD);
    }

    if let Err(err) = deck.reset().await {
        log::error!("Failed to reset device: {}", err);
    }

    if let Err(err) = deck.close().await {
        log::error!("Failed to close device: {}", err);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = Config::load(&path)?;

    simplelog::TermLogger::init(
        if config.debug {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Stdout,
        simplelog::ColorChoice::Never,
    )?;

    let candidate = find_device(&config.device_serial).await?;
    config.check_rows(candidate.kind.rows())?;

    let assets = Arc::new(AssetCache::load(
        &config.asset_dir,
        candidate.kind.image_size(),
    )?);

    let (driver, keys) = device::open(&candidate, config.brightness).await?;
    let deck = Arc::new(Deck::new(driver));

    let mut instances = Vec::new();
    for (index, instance) in config.instances.iter().enumerate() {
        log::info!(
            "Connecting to instance {} at {}:{}",
            index,
            instance.host,
            instance.port
        );

        instances.push(Instance::new(index as u8, ObsRemote::connect(instance).await?));
    }

    // Subscribe before synchronizing so no change in between goes unpainted
    let mut streams = Vec::new();
    for instance in &instances {
        streams.push(instance.remote.events()?);
    }

    let painter = Painter::new(deck.clone(), assets);

    for (index, err) in synchronize(&painter, &instances, &config.mic_source).await {
        log::warn!(
            "Instance {} starts with stale keys until its next event: {}",
            index,
            err
        );
    }

    let (reporter, mut errors) = Reporter::channel();
    let token = CancellationToken::new();
    let tracker = TaskTracker::new();

    for (instance, events) in instances.iter().zip(streams) {
        tracker.spawn(remote_listener(
            instance.clone(),
            events,
            painter.clone(),
            config.mic_source.clone(),
            reporter.clone(),
            token.clone(),
        ));
    }

    tracker.spawn(input_listener(
        keys,
        instances,
        AudioSources {
            mic: config.mic_source.clone(),
            music: config.audio_source.clone(),
        },
        reporter.clone(),
        token.clone(),
    ));

    tracker.spawn(keepalive_task(deck.clone(), reporter, token.clone()));

    supervise(&mut errors).await;

    log::info!("Shutting down");

    shutdown(&deck, &tracker, &token).await;

    log::info!("Tasks are finished, exiting now");

    Ok(())
}
