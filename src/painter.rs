use std::sync::Arc;

use crate::{
    assets::{Asset, AssetCache},
    device::{Deck, DeckDriver},
    error::BridgeError,
    mappings::{Function, SCENE_SLOTS, key_address},
};

/// Paints the keys of an instance row with the matching asset
pub struct Painter<D> {
    deck: Arc<Deck<D>>,
    assets: Arc<AssetCache>,
}

impl<D> Clone for Painter<D> {
    fn clone(&self) -> Self {
        Self {
            deck: self.deck.clone(),
            assets: self.assets.clone(),
        }
    }
}

impl<D: DeckDriver> Painter<D> {
    pub fn new(deck: Arc<Deck<D>>, assets: Arc<AssetCache>) -> Self {
        Self { deck, assets }
    }

    async fn paint(
        &self,
        instance: u8,
        function: Function,
        asset: Asset,
        state: bool,
    ) -> Result<(), BridgeError> {
        let image = self.assets.lookup(asset, state)?;

        self.deck
            .set_image(key_address(instance, function), image)
            .await
    }

    pub async fn stream(&self, instance: u8, streaming: bool) -> Result<(), BridgeError> {
        self.paint(instance, Function::StreamToggle, Asset::Live, streaming)
            .await
    }

    /// Lights the key of scene `current` (1-based) and darkens the others.
    /// A scene past the last slot leaves every scene key dark. Every key is
    /// attempted, the first failure is returned afterwards.
    pub async fn scenes(&self, instance: u8, current: usize) -> Result<(), BridgeError> {
        let mut result = Ok(());

        for (slot, asset) in (1..=SCENE_SLOTS).zip(Asset::SCENES) {
            let painted = self
                .paint(
                    instance,
                    Function::SceneSelect(slot),
                    asset,
                    slot as usize == current,
                )
                .await;

            if let Err(err) = painted {
                log::debug!("Scene key {} of instance {} not painted: {}", slot, instance, err);
                result = result.and(Err(err));
            }
        }

        result
    }

    /// The audio key shows the microphone as on while it is not muted
    pub async fn mic(&self, instance: u8, muted: bool) -> Result<(), BridgeError> {
        self.paint(instance, Function::AudioToggle, Asset::Mic, !muted)
            .await
    }
}
