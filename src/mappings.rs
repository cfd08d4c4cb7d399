use mirajazz::{
    device::DeviceQuery,
    types::{ImageFormat, ImageMirroring, ImageMode, ImageRotation},
};

pub const AJAZZ_VID: u16 = 0x0300;
pub const N1_PID: u16 = 0x3007;

pub const N1_QUERY: DeviceQuery = DeviceQuery::new(65440, 1, AJAZZ_VID, N1_PID);

pub const QUERIES: [DeviceQuery; 1] = [N1_QUERY];

/// Number of keys per row. One row belongs to one remote instance.
pub const ROW_WIDTH: u8 = 5;

/// Number of scene slots on a row
pub const SCENE_SLOTS: u8 = 3;

/// What a key does, determined by its column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    StreamToggle,
    /// 1-based scene slot, `1..=SCENE_SLOTS`
    SceneSelect(u8),
    AudioToggle,
}

impl Function {
    pub fn column(self) -> u8 {
        match self {
            Function::StreamToggle => 0,
            Function::SceneSelect(slot) => slot,
            Function::AudioToggle => ROW_WIDTH - 1,
        }
    }

    fn from_column(column: u8) -> Self {
        match column {
            0 => Function::StreamToggle,
            c if c <= SCENE_SLOTS => Function::SceneSelect(c),
            _ => Function::AudioToggle,
        }
    }
}

/// Splits a raw key index into the instance it belongs to and its function
pub fn map_key(raw: u8) -> (u8, Function) {
    (raw / ROW_WIDTH, Function::from_column(raw % ROW_WIDTH))
}

/// Inverse of [`map_key`]
pub fn key_address(instance: u8, function: Function) -> u8 {
    instance * ROW_WIDTH + function.column()
}

/// Returns correct image format for device kind and key
pub fn get_image_format_for_key(kind: &Kind, key: u8) -> ImageFormat {
    // Main grid keys are 96x96, top LCDs are 64x64
    let size = if key < kind.grid_key_count() { (96, 96) } else { (64, 64) };

    ImageFormat {
        mode: ImageMode::JPEG,
        size,
        rotation: ImageRotation::Rot0,
        mirror: ImageMirroring::None,
    }
}

#[derive(Debug, Clone)]
pub enum Kind {
    N1,
}

impl Kind {
    /// Matches devices VID+PID pairs to correct kinds
    pub fn from_vid_pid(vid: u16, pid: u16) -> Option<Self> {
        if vid == AJAZZ_VID && pid == N1_PID {
            Some(Kind::N1)
        } else {
            None
        }
    }

    pub fn protocol_version(&self) -> usize {
        3
    }

    /// Number of display keys, including the top LCDs
    pub fn key_count(&self) -> usize {
        18
    }

    /// Keys that take part in the row grid.
    /// N1: 15 main buttons, logical keys 0..=14. Top LCDs are 15..=17.
    pub fn grid_key_count(&self) -> u8 {
        15
    }

    /// How many instances fit on the device
    pub fn rows(&self) -> u8 {
        self.grid_key_count() / ROW_WIDTH
    }

    pub fn encoder_count(&self) -> usize {
        3
    }

    /// Side length assets get resized to
    pub fn image_size(&self) -> u32 {
        96
    }

    pub fn human_name(&self) -> String {
        "Ajazz N1".to_string()
    }
}
