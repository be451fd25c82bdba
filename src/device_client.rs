use crate::{
    config::AppConfig,
    settings::{FlashParams, Mode, SettingsUpdate, VuParams},
};
use anyhow::{Context, Result};
use log::{info, warn};
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use trait_variant::make;

const SETTINGS_ENDPOINT: &str = "/settings";

/// Full URL of the settings endpoint on the given device host
pub fn settings_url(host: &str) -> String {
    format!("http://{host}{SETTINGS_ENDPOINT}")
}

/// Classified outcome of one settings push
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum DeviceReply {
    /// Device stored the new settings
    Success,
    /// Device reports the submitted settings were already active
    NoChange,
    /// Reply parsed, but the status field is missing or not a known value
    UnknownStatus { status: Option<String> },
    /// Reply body is not the expected JSON object
    Malformed,
    /// Device answered with a non-success HTTP status
    HttpError { status: u16 },
    ConnectionFailed,
    TimedOut,
}

impl DeviceReply {
    /// Whether the device took the settings, including "nothing changed"
    pub fn accepted(&self) -> bool {
        matches!(self, DeviceReply::Success | DeviceReply::NoChange)
    }
}

#[derive(Debug, Serialize)]
struct WireUpdate<'a> {
    mode: Mode,
    #[serde(skip_serializing_if = "Option::is_none")]
    vu_green_red: Option<&'a VuParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vu_rainbow: Option<&'a VuParams>,
    #[serde(skip_serializing_if = "Option::is_none")]
    flash: Option<&'a FlashParams>,
}

impl<'a> From<&'a SettingsUpdate> for WireUpdate<'a> {
    fn from(update: &'a SettingsUpdate) -> Self {
        let mut body = WireUpdate {
            mode: update.mode(),
            vu_green_red: None,
            vu_rainbow: None,
            flash: None,
        };

        match update {
            SettingsUpdate::VuGreenRed(params) => body.vu_green_red = Some(params),
            SettingsUpdate::VuRainbow(params) => body.vu_rainbow = Some(params),
            SettingsUpdate::Flash(params) => body.flash = Some(params),
        }

        body
    }
}

#[make(Send)]
#[cfg_attr(test, automock)]
pub trait DeviceClient {
    async fn push_settings(&self, update: &SettingsUpdate) -> DeviceReply;
}

#[derive(Clone)]
pub struct LedDeviceClient {
    client: Client,
    settings_url: String,
}

impl LedDeviceClient {
    pub fn new(host: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to create device http client")?;

        Ok(LedDeviceClient {
            client,
            settings_url: settings_url(host),
        })
    }

    pub fn from_config() -> Result<Self> {
        let device = &AppConfig::get().device;
        Self::new(&device.host, device.timeout)
    }
}

impl DeviceClient for LedDeviceClient {
    async fn push_settings(&self, update: &SettingsUpdate) -> DeviceReply {
        let url = &self.settings_url;
        let body = WireUpdate::from(update);
        info!("POST {url} with {} settings", update.mode().label());

        let response = match self.client.post(url).json(&body).send().await {
            Ok(response) => response,
            Err(e) if e.is_timeout() => {
                warn!("POST {url} timed out");
                return DeviceReply::TimedOut;
            }
            Err(e) => {
                warn!("POST {url} failed: {e}");
                return DeviceReply::ConnectionFailed;
            }
        };

        let status = response.status();
        if !status.is_success() {
            warn!("POST {url} returned {status}");
            return DeviceReply::HttpError {
                status: status.as_u16(),
            };
        }

        match response.text().await {
            Ok(text) => classify_reply(&text),
            Err(e) if e.is_timeout() => {
                warn!("POST {url} timed out while reading the reply");
                DeviceReply::TimedOut
            }
            Err(e) => {
                warn!("POST {url} reply could not be read: {e}");
                DeviceReply::ConnectionFailed
            }
        }
    }
}

/// Map the textual device reply onto a result kind.
///
/// The device answers `{"status": "ok"}` after storing new values and
/// `{"status": "no_change"}` when the submitted values were already active.
fn classify_reply(text: &str) -> DeviceReply {
    #[derive(Deserialize)]
    struct ReplyBody {
        status: Option<Value>,
    }

    let Ok(reply) = serde_json::from_str::<ReplyBody>(text) else {
        return DeviceReply::Malformed;
    };

    match reply.status {
        Some(Value::String(status)) if status == "ok" => DeviceReply::Success,
        Some(Value::String(status)) if status == "no_change" => DeviceReply::NoChange,
        Some(Value::String(status)) => DeviceReply::UnknownStatus {
            status: Some(status),
        },
        Some(other) => DeviceReply::UnknownStatus {
            status: Some(other.to_string()),
        },
        None => DeviceReply::UnknownStatus { status: None },
    }
}
