use tokio_util::sync::CancellationToken;

use crate::{
    device::KeyReader,
    error::{BridgeError, Origin, Reporter},
    mappings::{Function, map_key},
    remote::{Instance, Remote, active_scene_number, scene_name},
};

/// The two audio sources the audio key switches between
#[derive(Debug, Clone)]
pub struct AudioSources {
    pub mic: String,
    pub music: String,
}

/// Turns key presses into commands for the instance owning the key row.
/// Key images are left alone, the remote's events repaint them once it
/// confirms the change.
pub async fn input_listener<K: KeyReader, R: Remote>(
    mut keys: K,
    instances: Vec<Instance<R>>,
    sources: AudioSources,
    reporter: Reporter,
    token: CancellationToken,
) {
    log::info!("Listening for key presses");

    loop {
        let events = tokio::select! {
            events = keys.read() => events,
            _ = token.cancelled() => break,
        };

        let events = match events {
            Ok(events) => events,
            Err(err) => {
                let lost = err.is_device_lost();
                reporter.report(Origin::Input, err);

                if lost {
                    break;
                }

                continue;
            }
        };

        for event in events.into_iter().filter(|event| event.pressed) {
            if let Err(err) = handle_press(&instances, &sources, event.key).await {
                reporter.report(Origin::Input, err);
            }
        }
    }

    log::info!("Stopping key listener");
}

async fn handle_press<R: Remote>(
    instances: &[Instance<R>],
    sources: &AudioSources,
    key: u8,
) -> Result<(), BridgeError> {
    let (row, function) = map_key(key);

    let Some(instance) = instances.iter().find(|instance| instance.index == row) else {
        log::debug!("Key {} belongs to no instance", key);
        return Ok(());
    };

    log::debug!("Key {} pressed: {:?} on instance {}", key, function, row);

    let remote = instance.remote.as_ref();

    match function {
        Function::StreamToggle => {
            if remote.is_streaming().await? {
                log::info!("Stopping stream of instance {}", row);
                remote.stop_streaming().await
            } else {
                log::info!("Starting stream of instance {}", row);
                remote.start_streaming().await
            }
        }
        Function::SceneSelect(slot) => {
            if active_scene_number(remote).await? == slot as usize {
                return Ok(());
            }

            let name = scene_name(remote, slot as usize).await?;
            log::info!("Switching instance {} to scene {}", row, name);

            remote.set_current_scene(&name).await
        }
        Function::AudioToggle => {
            // Mute first, so both sources are never live at once
            if remote.is_muted(&sources.mic).await? {
                remote.set_muted(&sources.music, true).await?;
                remote.set_muted(&sources.mic, false).await
            } else {
                remote.set_muted(&sources.mic, true).await?;
                remote.set_muted(&sources.music, false).await
            }
        }
    }
}
