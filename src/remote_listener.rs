use futures_lite::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::{
    device::DeckDriver,
    error::{BridgeError, Origin, Reporter},
    painter::Painter,
    remote::{EventStream, Instance, Remote, RemoteEvent, scene_number},
};

/// Translates the events of one instance into key images until cancelled
/// or until its event stream ends. Failures are reported, never fatal.
///
/// `events` should be subscribed before the row is synchronized, so nothing
/// emitted in between is lost. The OBS client ends its stream for good once
/// the listener lags too far behind, the row then stays frozen until the
/// bridge is restarted.
pub async fn remote_listener<D: DeckDriver, R: Remote>(
    instance: Instance<R>,
    mut events: EventStream,
    painter: Painter<D>,
    mic_source: String,
    reporter: Reporter,
    token: CancellationToken,
) {
    let origin = Origin::Remote(instance.index);

    log::info!("Listening for events of instance {}", instance.index);

    loop {
        let event = tokio::select! {
            event = events.next() => event,
            _ = token.cancelled() => break,
        };

        let Some(event) = event else {
            reporter.report(origin, BridgeError::EventStreamClosed(instance.index));
            break;
        };

        if let Err(err) = handle_event(&instance, &painter, &mic_source, event).await {
            reporter.report(origin, err);
        }
    }

    log::info!("Stopping instance {} event listener", instance.index);
}

async fn handle_event<D: DeckDriver, R: Remote>(
    instance: &Instance<R>,
    painter: &Painter<D>,
    mic_source: &str,
    event: RemoteEvent,
) -> Result<(), BridgeError> {
    log::debug!("Instance {} event: {:?}", instance.index, event);

    match event {
        RemoteEvent::StreamStarted => painter.stream(instance.index, true).await,
        RemoteEvent::StreamStopped => painter.stream(instance.index, false).await,
        RemoteEvent::SceneSwitched { name } => {
            let current = scene_number(instance.remote.as_ref(), &name).await?;

            painter.scenes(instance.index, current).await
        }
        RemoteEvent::SourceMuteChanged { source, muted } if source == mic_source => {
            painter.mic(instance.index, muted).await
        }
        RemoteEvent::Error { cause } => Err(BridgeError::RemoteEvent(cause)),
        // Heartbeats, other sources and unknown events have nothing to paint
        RemoteEvent::SourceMuteChanged { .. } | RemoteEvent::StreamStatus | RemoteEvent::Other => {
            Ok(())
        }
    }
}
