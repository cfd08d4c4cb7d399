//! Test doubles for the control surface and the remote instances

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use image::{DynamicImage, GrayImage, Luma};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    assets::{Asset, AssetCache},
    device::{DeckDriver, KeyEvent, KeyReader},
    error::BridgeError,
    remote::{EventStream, Remote, RemoteEvent},
};

/// 1x1 image whose single pixel identifies it
pub fn shade(value: u8) -> DynamicImage {
    DynamicImage::ImageLuma8(GrayImage::from_pixel(1, 1, Luma([value])))
}

pub fn asset_shade(asset: Asset, state: bool) -> u8 {
    let index = Asset::ALL.iter().position(|a| *a == asset).unwrap() as u8;

    10 + index * 2 + state as u8
}

/// Every asset in both states, each with a distinct shade
pub fn test_assets() -> AssetCache {
    let mut cache = AssetCache::default();

    for asset in Asset::ALL {
        for state in [true, false] {
            cache.insert(asset, state, shade(asset_shade(asset, state)));
        }
    }

    cache
}

/// `(key, shade)` of every image written
pub type Calls = Arc<Mutex<Vec<(u8, u8)>>>;

pub struct FakeDriver {
    calls: Calls,
    failing: HashSet<u8>,
    keepalives: Arc<AtomicUsize>,
    resets: Arc<AtomicUsize>,
}

impl FakeDriver {
    pub fn new() -> (Self, Calls) {
        let calls = Calls::default();

        let driver = Self {
            calls: calls.clone(),
            failing: HashSet::new(),
            keepalives: Arc::default(),
            resets: Arc::default(),
        };

        (driver, calls)
    }

    /// Writes to `key` fail from now on
    pub fn fail_key(&mut self, key: u8) {
        self.failing.insert(key);
    }

    pub fn keepalives(&self) -> Arc<AtomicUsize> {
        self.keepalives.clone()
    }

    pub fn resets(&self) -> Arc<AtomicUsize> {
        self.resets.clone()
    }
}

impl DeckDriver for FakeDriver {
    async fn set_image(&mut self, key: u8, image: &DynamicImage) -> Result<(), BridgeError> {
        // Give other tasks a chance to queue up on the lock
        tokio::task::yield_now().await;

        if self.failing.contains(&key) {
            return Err(BridgeError::DeviceWrite(format!("key {} is broken", key).into()));
        }

        let value = image.to_luma8().get_pixel(0, 0).0[0];
        self.calls.lock().unwrap().push((key, value));

        Ok(())
    }

    async fn reset(&mut self) -> Result<(), BridgeError> {
        self.resets.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn keep_alive(&mut self) -> Result<(), BridgeError> {
        self.keepalives.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        Ok(())
    }
}

/// Key reader fed from a channel. Blocks forever once the sender is gone.
pub struct FakeKeys {
    rx: mpsc::UnboundedReceiver<Result<Vec<KeyEvent>, BridgeError>>,
    drained: Option<CancellationToken>,
}

impl FakeKeys {
    pub fn new() -> (Self, mpsc::UnboundedSender<Result<Vec<KeyEvent>, BridgeError>>) {
        let (tx, rx) = mpsc::unbounded_channel();

        (Self { rx, drained: None }, tx)
    }

    /// Cancels `token` once every queued read was handed out and the sender is gone
    pub fn cancel_when_drained(mut self, token: CancellationToken) -> Self {
        self.drained = Some(token);
        self
    }
}

impl KeyReader for FakeKeys {
    async fn read(&mut self) -> Result<Vec<KeyEvent>, BridgeError> {
        match self.rx.recv().await {
            Some(result) => result,
            None => {
                if let Some(token) = &self.drained {
                    token.cancel();
                }
                std::future::pending().await
            }
        }
    }
}

pub fn press(key: u8) -> KeyEvent {
    KeyEvent { key, pressed: true }
}

pub fn release(key: u8) -> KeyEvent {
    KeyEvent {
        key,
        pressed: false,
    }
}

/// Commands a [`FakeRemote`] received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    StartStreaming,
    StopStreaming,
    SetScene(String),
    SetMuted(String, bool),
}

#[derive(Debug, Default)]
struct RemoteState {
    streaming: bool,
    scenes: Vec<String>,
    current: String,
    muted: HashMap<String, bool>,
    failing: bool,
}

/// In-memory remote instance. Commands update its state but emit no events,
/// tests push events through the sender returned by [`FakeRemote::new`].
pub struct FakeRemote {
    state: Mutex<RemoteState>,
    commands: Mutex<Vec<Command>>,
    events: Mutex<Option<mpsc::UnboundedReceiver<RemoteEvent>>>,
}

impl FakeRemote {
    pub fn new(scenes: &[&str], current: &str) -> (Self, mpsc::UnboundedSender<RemoteEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();

        let remote = Self {
            state: Mutex::new(RemoteState {
                scenes: scenes.iter().map(|s| s.to_string()).collect(),
                current: current.to_string(),
                ..Default::default()
            }),
            commands: Mutex::default(),
            events: Mutex::new(Some(rx)),
        };

        (remote, tx)
    }

    pub fn streaming(self, streaming: bool) -> Self {
        self.state.lock().unwrap().streaming = streaming;
        self
    }

    pub fn muted(self, source: &str, muted: bool) -> Self {
        self.state
            .lock()
            .unwrap()
            .muted
            .insert(source.to_string(), muted);
        self
    }

    /// Every call fails from now on
    pub fn failing(self) -> Self {
        self.state.lock().unwrap().failing = true;
        self
    }

    pub fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), BridgeError> {
        if self.state.lock().unwrap().failing {
            return Err(BridgeError::RemoteCall("connection refused".into()));
        }

        Ok(())
    }

    fn record(&self, command: Command) -> Result<(), BridgeError> {
        self.check()?;

        let mut state = self.state.lock().unwrap();
        match &command {
            Command::StartStreaming => state.streaming = true,
            Command::StopStreaming => state.streaming = false,
            Command::SetScene(name) => state.current = name.clone(),
            Command::SetMuted(source, muted) => {
                state.muted.insert(source.clone(), *muted);
            }
        }
        drop(state);

        self.commands.lock().unwrap().push(command);

        Ok(())
    }
}

impl Remote for FakeRemote {
    async fn is_streaming(&self) -> Result<bool, BridgeError> {
        self.check()?;
        Ok(self.state.lock().unwrap().streaming)
    }

    async fn start_streaming(&self) -> Result<(), BridgeError> {
        self.record(Command::StartStreaming)
    }

    async fn stop_streaming(&self) -> Result<(), BridgeError> {
        self.record(Command::StopStreaming)
    }

    async fn current_scene(&self) -> Result<String, BridgeError> {
        self.check()?;
        Ok(self.state.lock().unwrap().current.clone())
    }

    async fn scene_list(&self) -> Result<Vec<String>, BridgeError> {
        self.check()?;
        Ok(self.state.lock().unwrap().scenes.clone())
    }

    async fn set_current_scene(&self, name: &str) -> Result<(), BridgeError> {
        self.record(Command::SetScene(name.to_string()))
    }

    async fn is_muted(&self, source: &str) -> Result<bool, BridgeError> {
        self.check()?;
        Ok(self
            .state
            .lock()
            .unwrap()
            .muted
            .get(source)
            .copied()
            .unwrap_or(false))
    }

    async fn set_muted(&self, source: &str, muted: bool) -> Result<(), BridgeError> {
        self.record(Command::SetMuted(source.to_string(), muted))
    }

    fn events(&self) -> Result<EventStream, BridgeError> {
        let rx = self
            .events
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| BridgeError::RemoteCall("events already taken".into()))?;

        Ok(Box::pin(futures_lite::stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|event| (event, rx))
        })))
    }
}
