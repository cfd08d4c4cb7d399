use std::{future::Future, sync::Arc, time::Duration};

use image::DynamicImage;
use mirajazz::{
    device::{Device, list_devices},
    error::MirajazzError,
    state::{DeviceStateReader, DeviceStateUpdate},
    types::HidDeviceInfo,
};
use tokio::{sync::Mutex, time::interval};
use tokio_util::sync::CancellationToken;

use crate::{
    error::{BridgeError, Origin, Reporter},
    inputs::{logical_to_device, process_input_n1},
    mappings::{Kind, QUERIES, get_image_format_for_key},
};

const KEEPALIVE_PERIOD: Duration = Duration::from_secs(10);

/// Key press or release, `key` being the logical key index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: u8,
    pub pressed: bool,
}

/// Write side of a control surface. Not safe to use from several tasks at once,
/// [`Deck`] takes care of that.
pub trait DeckDriver: Send + 'static {
    fn set_image(
        &mut self,
        key: u8,
        image: &DynamicImage,
    ) -> impl Future<Output = Result<(), BridgeError>> + Send;

    /// Blanks every key
    fn reset(&mut self) -> impl Future<Output = Result<(), BridgeError>> + Send;

    fn keep_alive(&mut self) -> impl Future<Output = Result<(), BridgeError>> + Send;

    fn close(&mut self) -> impl Future<Output = Result<(), BridgeError>> + Send;
}

/// Read side of a control surface, used by a single listener
pub trait KeyReader: Send + 'static {
    fn read(&mut self) -> impl Future<Output = Result<Vec<KeyEvent>, BridgeError>> + Send;
}

/// Shared handle to the control surface. All writes go through one lock,
/// so calls are applied one at a time and in the order they were issued.
pub struct Deck<D> {
    driver: Mutex<D>,
}

impl<D: DeckDriver> Deck<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver: Mutex::new(driver),
        }
    }

    pub async fn set_image(&self, key: u8, image: &DynamicImage) -> Result<(), BridgeError> {
        log::debug!("Setting image for key {}", key);

        self.driver.lock().await.set_image(key, image).await
    }

    pub async fn reset(&self) -> Result<(), BridgeError> {
        self.driver.lock().await.reset().await
    }

    pub async fn keep_alive(&self) -> Result<(), BridgeError> {
        self.driver.lock().await.keep_alive().await
    }

    pub async fn close(&self) -> Result<(), BridgeError> {
        self.driver.lock().await.close().await
    }
}

/// Sends periodic keepalives to the device to maintain connection
pub async fn keepalive_task<D: DeckDriver>(
    deck: Arc<Deck<D>>,
    reporter: Reporter,
    token: CancellationToken,
) {
    let mut interval = interval(KEEPALIVE_PERIOD);

    loop {
        tokio::select! {
            _ = interval.tick() => {},
            _ = token.cancelled() => break,
        }

        log::debug!("Sending keepalive");

        if let Err(err) = deck.keep_alive().await {
            reporter.report(Origin::Device, err);
        }
    }

    log::info!("Keepalive task finished");
}

#[derive(Debug, Clone)]
pub struct CandidateDevice {
    pub serial: String,
    pub dev: HidDeviceInfo,
    pub kind: Kind,
}

/// Lists connected devices of known kinds and picks the one with `serial`
pub async fn find_device(serial: &str) -> Result<CandidateDevice, BridgeError> {
    log::info!("Looking for candidate devices");

    for dev in list_devices(&QUERIES).await? {
        let Some(kind) = Kind::from_vid_pid(dev.vendor_id, dev.product_id) else {
            continue;
        };

        let dev_serial = dev.serial_number.clone().unwrap_or_default();

        log::info!(
            "Found: {} ({} keys) - {}",
            kind.human_name(),
            kind.key_count(),
            dev_serial
        );

        if dev_serial.eq_ignore_ascii_case(serial) {
            log::info!("Control surface selected");

            return Ok(CandidateDevice {
                serial: dev_serial,
                dev: (*dev).clone(),
                kind,
            });
        }
    }

    Err(BridgeError::DeviceNotFound(serial.to_string()))
}

/// Connects to the device, switches it to software mode and blanks it
pub async fn open(
    candidate: &CandidateDevice,
    brightness: u8,
) -> Result<(MirajazzDriver, MirajazzKeys), BridgeError> {
    let device = Device::connect(
        &candidate.dev,
        candidate.kind.protocol_version(),
        candidate.kind.key_count(),
        candidate.kind.encoder_count(),
    )
    .await
    .inspect_err(|e| log::error!("Error while connecting to device: {e}"))?;

    // N1 requires software mode to be set for control
    if matches!(candidate.kind, Kind::N1) {
        device.set_mode(3).await?;
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    device.set_brightness(brightness).await?;
    device.clear_all_button_images().await?;
    device.flush().await?;

    let reader = device.get_reader(process_input_n1);

    log::info!(
        "Opened {} with serial {}",
        candidate.kind.human_name(),
        candidate.serial
    );

    Ok((
        MirajazzDriver {
            device,
            kind: candidate.kind.clone(),
        },
        MirajazzKeys { reader },
    ))
}

fn write_error(err: MirajazzError) -> BridgeError {
    BridgeError::DeviceWrite(Box::new(err))
}

pub struct MirajazzDriver {
    device: Device,
    kind: Kind,
}

impl DeckDriver for MirajazzDriver {
    async fn set_image(&mut self, key: u8, image: &DynamicImage) -> Result<(), BridgeError> {
        self.device
            .set_button_image(
                logical_to_device(key),
                get_image_format_for_key(&self.kind, key),
                image.clone(),
            )
            .await
            .map_err(write_error)?;
        self.device.flush().await.map_err(write_error)?;

        Ok(())
    }

    async fn reset(&mut self) -> Result<(), BridgeError> {
        self.device.clear_all_button_images().await?;
        self.device.flush().await?;

        Ok(())
    }

    async fn keep_alive(&mut self) -> Result<(), BridgeError> {
        Ok(self.device.keep_alive().await?)
    }

    async fn close(&mut self) -> Result<(), BridgeError> {
        Ok(self.device.shutdown().await?)
    }
}

pub struct MirajazzKeys {
    reader: Arc<DeviceStateReader>,
}

impl KeyReader for MirajazzKeys {
    async fn read(&mut self) -> Result<Vec<KeyEvent>, BridgeError> {
        let updates = self.reader.read(None).await?;

        Ok(updates
            .into_iter()
            .filter_map(|update| match update {
                DeviceStateUpdate::ButtonDown(key) => Some(KeyEvent { key, pressed: true }),
                DeviceStateUpdate::ButtonUp(key) => Some(KeyEvent {
                    key,
                    pressed: false,
                }),
                _ => None,
            })
            .collect())
    }
}
