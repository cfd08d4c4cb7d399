use crate::{
    device::DeckDriver,
    error::BridgeError,
    painter::Painter,
    remote::{Instance, Remote, active_scene_number},
};

/// Paints one instance row from the remote's current state
pub async fn sync_instance<D: DeckDriver, R: Remote>(
    painter: &Painter<D>,
    instance: &Instance<R>,
    mic_source: &str,
) -> Result<(), BridgeError> {
    let remote = instance.remote.as_ref();

    let streaming = remote.is_streaming().await?;
    painter.stream(instance.index, streaming).await?;

    let current = active_scene_number(remote).await?;
    painter.scenes(instance.index, current).await?;

    let muted = remote.is_muted(mic_source).await?;
    painter.mic(instance.index, muted).await?;

    Ok(())
}

/// Runs [`sync_instance`] for every instance, one after another.
/// A failing instance is skipped, the rest are still painted, so one
/// unreachable instance never keeps the others from starting. Its row is
/// repainted by its listener on the next event.
/// Returns the failures with the index of their instance.
pub async fn synchronize<D: DeckDriver, R: Remote>(
    painter: &Painter<D>,
    instances: &[Instance<R>],
    mic_source: &str,
) -> Vec<(u8, BridgeError)> {
    let mut failures = Vec::new();

    for instance in instances {
        log::info!("Synchronizing instance {}", instance.index);

        if let Err(err) = sync_instance(painter, instance, mic_source).await {
            log::error!("Could not synchronize instance {}: {}", instance.index, err);
            failures.push((instance.index, err));
        }
    }

    failures
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        assets::Asset,
        device::Deck,
        testing::{FakeDriver, FakeRemote, asset_shade, test_assets},
    };

    const MIC: &str = "Mic/Aux";

    fn painter() -> (Painter<FakeDriver>, crate::testing::Calls) {
        let (driver, calls) = FakeDriver::new();

        (
            Painter::new(Arc::new(Deck::new(driver)), Arc::new(test_assets())),
            calls,
        )
    }

    #[tokio::test]
    async fn paints_current_scene_among_three() {
        let (painter, calls) = painter();
        let (remote, _events) = FakeRemote::new(&["Intro", "Game", "BRB"], "Game");
        let remote = remote.streaming(true).muted(MIC, true);

        let failures = synchronize(&painter, &[Instance::new(0, remote)], MIC).await;

        assert!(failures.is_empty());
        assert_eq!(
            *calls.lock().unwrap(),
            vec![
                (0, asset_shade(Asset::Live, true)),
                (1, asset_shade(Asset::Scene1, false)),
                (2, asset_shade(Asset::Scene2, true)),
                (3, asset_shade(Asset::Scene3, false)),
                (4, asset_shade(Asset::Mic, false)),
            ]
        );
    }

    #[tokio::test]
    async fn second_instance_paints_second_row() {
        let (painter, calls) = painter();
        let (first, _e1) = FakeRemote::new(&["A", "B", "C"], "A");
        let (second, _e2) = FakeRemote::new(&["A", "B", "C"], "C");

        let instances = [Instance::new(0, first), Instance::new(1, second)];
        synchronize(&painter, &instances, MIC).await;

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 10);
        assert_eq!(&calls[5..], &[
            (5, asset_shade(Asset::Live, false)),
            (6, asset_shade(Asset::Scene1, false)),
            (7, asset_shade(Asset::Scene2, false)),
            (8, asset_shade(Asset::Scene3, true)),
            (9, asset_shade(Asset::Mic, true)),
        ]);
    }

    #[tokio::test]
    async fn failing_instance_does_not_stop_the_others() {
        let (painter, calls) = painter();
        let (broken, _e1) = FakeRemote::new(&["A"], "Gone");
        let (healthy, _e2) = FakeRemote::new(&["A"], "A");

        let instances = [Instance::new(0, broken), Instance::new(1, healthy)];
        let failures = synchronize(&painter, &instances, MIC).await;

        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, 0);
        assert!(matches!(failures[0].1, BridgeError::SceneNotFound(_)));

        // Stream key of the broken row, then the full healthy row
        let keys: Vec<u8> = calls.lock().unwrap().iter().map(|c| c.0).collect();
        assert_eq!(keys, vec![0, 5, 6, 7, 8, 9]);
    }

    #[tokio::test]
    async fn scene_past_the_last_slot_darkens_all_scene_keys() {
        let (painter, calls) = painter();
        let (remote, _events) = FakeRemote::new(&["A", "B", "C", "D"], "D");

        sync_instance(&painter, &Instance::new(0, remote), MIC)
            .await
            .unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(&calls[1..4], &[
            (1, asset_shade(Asset::Scene1, false)),
            (2, asset_shade(Asset::Scene2, false)),
            (3, asset_shade(Asset::Scene3, false)),
        ]);
    }

    #[tokio::test]
    async fn unreachable_remote_aborts_before_painting() {
        let (painter, calls) = painter();
        let (remote, _events) = FakeRemote::new(&["A"], "A");

        let result = sync_instance(&painter, &Instance::new(0, remote.failing()), MIC).await;

        assert!(matches!(result, Err(BridgeError::RemoteCall(_))));
        assert!(calls.lock().unwrap().is_empty());
    }
}
