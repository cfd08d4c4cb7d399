//! Remote production software: the client seam, its event model and the OBS implementation

use std::{future::Future, pin::Pin, sync::Arc};

use futures_lite::{Stream, StreamExt};
use obws::{
    Client,
    events::{Event, OutputState},
    requests::{inputs::InputId, scenes::SceneId},
};

use crate::{config::InstanceConfig, error::BridgeError};

/// Events pushed by a remote instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEvent {
    StreamStarted,
    StreamStopped,
    SceneSwitched { name: String },
    SourceMuteChanged { source: String, muted: bool },
    /// Periodic or transitional stream status, carries nothing to paint
    StreamStatus,
    Error { cause: String },
    Other,
}

pub type EventStream = Pin<Box<dyn Stream<Item = RemoteEvent> + Send>>;

/// Request/response calls and the event stream of one remote instance
pub trait Remote: Send + Sync + 'static {
    fn is_streaming(&self) -> impl Future<Output = Result<bool, BridgeError>> + Send;

    fn start_streaming(&self) -> impl Future<Output = Result<(), BridgeError>> + Send;

    fn stop_streaming(&self) -> impl Future<Output = Result<(), BridgeError>> + Send;

    fn current_scene(&self) -> impl Future<Output = Result<String, BridgeError>> + Send;

    /// Scene names, the order defines the 1-based scene numbering
    fn scene_list(&self) -> impl Future<Output = Result<Vec<String>, BridgeError>> + Send;

    fn set_current_scene(&self, name: &str)
    -> impl Future<Output = Result<(), BridgeError>> + Send;

    fn is_muted(&self, source: &str) -> impl Future<Output = Result<bool, BridgeError>> + Send;

    fn set_muted(
        &self,
        source: &str,
        muted: bool,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;

    fn events(&self) -> Result<EventStream, BridgeError>;
}

/// One managed remote connection, occupying key row `index`
pub struct Instance<R> {
    pub index: u8,
    pub remote: Arc<R>,
}

impl<R> Instance<R> {
    pub fn new(index: u8, remote: R) -> Self {
        Self {
            index,
            remote: Arc::new(remote),
        }
    }
}

impl<R> Clone for Instance<R> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            remote: self.remote.clone(),
        }
    }
}

/// 1-based number of the scene called `name`
pub async fn scene_number<R: Remote>(remote: &R, name: &str) -> Result<usize, BridgeError> {
    remote
        .scene_list()
        .await?
        .iter()
        .position(|scene| scene == name)
        .map(|index| index + 1)
        .ok_or_else(|| BridgeError::SceneNotFound(name.to_string()))
}

/// 1-based number of the scene currently on program
pub async fn active_scene_number<R: Remote>(remote: &R) -> Result<usize, BridgeError> {
    let current = remote.current_scene().await?;

    scene_number(remote, &current).await
}

/// Name of the scene with 1-based `number`
pub async fn scene_name<R: Remote>(remote: &R, number: usize) -> Result<String, BridgeError> {
    let index = number
        .checked_sub(1)
        .ok_or(BridgeError::SceneSlotEmpty(number))?;

    remote
        .scene_list()
        .await?
        .into_iter()
        .nth(index)
        .ok_or(BridgeError::SceneSlotEmpty(number))
}

/// Connection to an OBS websocket server
pub struct ObsRemote {
    client: Client,
}

impl ObsRemote {
    pub async fn connect(config: &InstanceConfig) -> Result<Self, BridgeError> {
        let client = Client::connect(&config.host, config.port, config.password.as_deref()).await?;

        Ok(Self { client })
    }
}

impl Remote for ObsRemote {
    async fn is_streaming(&self) -> Result<bool, BridgeError> {
        Ok(self.client.streaming().status().await?.active)
    }

    async fn start_streaming(&self) -> Result<(), BridgeError> {
        Ok(self.client.streaming().start().await?)
    }

    async fn stop_streaming(&self) -> Result<(), BridgeError> {
        Ok(self.client.streaming().stop().await?)
    }

    async fn current_scene(&self) -> Result<String, BridgeError> {
        Ok(self.client.scenes().current_program_scene().await?.id.name)
    }

    async fn scene_list(&self) -> Result<Vec<String>, BridgeError> {
        let mut scenes = self.client.scenes().list().await?.scenes;

        // OBS counts scene indices from the bottom of its scene list
        scenes.sort_by(|a, b| b.index.cmp(&a.index));

        Ok(scenes.into_iter().map(|scene| scene.id.name).collect())
    }

    async fn set_current_scene(&self, name: &str) -> Result<(), BridgeError> {
        Ok(self
            .client
            .scenes()
            .set_current_program_scene(SceneId::Name(name))
            .await?)
    }

    async fn is_muted(&self, source: &str) -> Result<bool, BridgeError> {
        Ok(self.client.inputs().muted(InputId::Name(source)).await?)
    }

    async fn set_muted(&self, source: &str, muted: bool) -> Result<(), BridgeError> {
        Ok(self
            .client
            .inputs()
            .set_muted(InputId::Name(source), muted)
            .await?)
    }

    fn events(&self) -> Result<EventStream, BridgeError> {
        let events = self.client.events()?;

        Ok(Box::pin(events.map(translate)))
    }
}

fn translate(event: Event) -> RemoteEvent {
    match event {
        Event::StreamStateChanged { state, .. } => match state {
            OutputState::Started => RemoteEvent::StreamStarted,
            OutputState::Stopped => RemoteEvent::StreamStopped,
            _ => RemoteEvent::StreamStatus,
        },
        Event::CurrentProgramSceneChanged { id } => RemoteEvent::SceneSwitched { name: id.name },
        Event::InputMuteStateChanged { id, muted } => RemoteEvent::SourceMuteChanged {
            source: id.name,
            muted,
        },
        Event::ExitStarted => RemoteEvent::Error {
            cause: "OBS is shutting down".to_string(),
        },
        _ => RemoteEvent::Other,
    }
}
