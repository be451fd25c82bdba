use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};
use serde_valid::Validate;
use std::sync::Mutex;

#[derive(Clone, Copy, Debug, Default, Deserialize_repr, Eq, PartialEq, Serialize_repr)]
#[repr(u8)]
pub enum Mode {
    #[default]
    VuGreenRed = 0,
    VuRainbow = 1,
    Flash = 2,
}

impl Mode {
    pub fn from_int(value: i64) -> Option<Self> {
        match value {
            0 => Some(Mode::VuGreenRed),
            1 => Some(Mode::VuRainbow),
            2 => Some(Mode::Flash),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Mode::VuGreenRed => "VU green-red",
            Mode::VuRainbow => "VU rainbow",
            Mode::Flash => "flash",
        }
    }
}

/// Parameters shared by both VU meter modes
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VuParams {
    #[validate(minimum = 0)]
    #[validate(maximum = 100)]
    pub sensitivity: u8,
    #[validate(minimum = 0)]
    #[validate(maximum = 100)]
    pub brightness: u8,
    pub bg_color: String,
    #[validate(minimum = 0)]
    #[validate(maximum = 100)]
    pub bg_brightness: u8,
    #[validate(minimum = 0)]
    #[validate(maximum = 100)]
    pub smoothing: u8,
}

impl Default for VuParams {
    fn default() -> Self {
        VuParams {
            sensitivity: 70,
            brightness: 80,
            bg_color: String::from("#000000"),
            bg_brightness: 10,
            smoothing: 30,
        }
    }
}

/// Parameters of the beat flash mode
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FlashParams {
    #[validate(minimum = 0)]
    #[validate(maximum = 100)]
    pub sensitivity: u8,
    pub color: String,
    #[validate(minimum = 0)]
    #[validate(maximum = 100)]
    pub brightness: u8,
    #[validate(minimum = 0)]
    #[validate(maximum = 100)]
    pub smoothing: u8,
}

impl Default for FlashParams {
    fn default() -> Self {
        FlashParams {
            sensitivity: 80,
            color: String::from("#FFFFFF"),
            brightness: 100,
            smoothing: 10,
        }
    }
}

/// Complete panel state: the active mode plus one parameter block per mode
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Settings {
    pub mode: Mode,
    pub vu_green_red: VuParams,
    pub vu_rainbow: VuParams,
    pub flash: FlashParams,
}

/// Validated outcome of one form submission, carrying the parameters of
/// exactly the mode being activated
#[derive(Clone, Debug, PartialEq)]
pub enum SettingsUpdate {
    VuGreenRed(VuParams),
    VuRainbow(VuParams),
    Flash(FlashParams),
}

impl SettingsUpdate {
    pub fn mode(&self) -> Mode {
        match self {
            SettingsUpdate::VuGreenRed(_) => Mode::VuGreenRed,
            SettingsUpdate::VuRainbow(_) => Mode::VuRainbow,
            SettingsUpdate::Flash(_) => Mode::Flash,
        }
    }
}

/// Last settings the device accepted, shared across workers.
///
/// Written only after the device acknowledged an update; the lock is never
/// held across an await point.
#[derive(Debug, Default)]
pub struct SettingsStore {
    inner: Mutex<Settings>,
}

impl SettingsStore {
    pub fn snapshot(&self) -> Settings {
        self.inner.lock().unwrap().clone()
    }

    pub fn apply(&self, update: &SettingsUpdate) {
        let mut settings = self.inner.lock().unwrap();
        settings.mode = update.mode();
        match update {
            SettingsUpdate::VuGreenRed(params) => settings.vu_green_red = params.clone(),
            SettingsUpdate::VuRainbow(params) => settings.vu_rainbow = params.clone(),
            SettingsUpdate::Flash(params) => settings.flash = params.clone(),
        }
    }
}
