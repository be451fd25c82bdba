use crate::{
    config::AppConfig,
    device_client::{self, DeviceClient, DeviceReply},
    form,
    settings::{Settings, SettingsStore},
};
use actix_files::NamedFile;
use actix_session::Session;
use actix_web::{HttpResponse, Responder, http::header, web};
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const FLASH_KEY: &str = "flash";

/// Severity of a one-shot notification shown after a redirect
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Danger,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct FlashMessage {
    pub level: FlashLevel,
    pub text: String,
}

impl FlashMessage {
    fn new(level: FlashLevel, text: impl Into<String>) -> Self {
        FlashMessage {
            level,
            text: text.into(),
        }
    }
}

/// Payload of `GET /api/settings`: current state plus a pending flash message
#[derive(Debug, Deserialize, Serialize)]
pub struct SettingsView {
    pub settings: Settings,
    pub flash: Option<FlashMessage>,
}

#[derive(Clone)]
pub struct Api<Client>
where
    Client: DeviceClient,
{
    pub device: Client,
}

impl<Client> Api<Client>
where
    Client: DeviceClient,
{
    pub fn new(device: Client) -> Self {
        Api { device }
    }

    pub async fn index() -> actix_web::Result<NamedFile> {
        debug!("index() called");

        let path = AppConfig::get().ui.static_dir.join("index.html");
        Ok(NamedFile::open(path)?)
    }

    pub async fn settings(store: web::Data<SettingsStore>, session: Session) -> impl Responder {
        debug!("settings() called");

        let flash = session
            .remove_as::<FlashMessage>(FLASH_KEY)
            .and_then(Result::ok);

        HttpResponse::Ok().json(SettingsView {
            settings: store.snapshot(),
            flash,
        })
    }

    pub async fn update(
        form: web::Form<HashMap<String, String>>,
        api: web::Data<Self>,
        store: web::Data<SettingsStore>,
        session: Session,
    ) -> impl Responder {
        debug!("update() called");

        let flash = process_update(&form, &api.device, &store).await;

        if let Err(e) = session.insert(FLASH_KEY, &flash) {
            error!("failed to store flash message: {e}");
        }

        HttpResponse::Found()
            .append_header((header::LOCATION, "/"))
            .finish()
    }

    pub async fn version() -> impl Responder {
        HttpResponse::Ok().body(env!("CARGO_PKG_VERSION"))
    }
}

/// Register the panel routes on an app, for the binary and the tests alike
pub fn routes<Client: DeviceClient + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(Api::<Client>::index))
        .route("/api/settings", web::get().to(Api::<Client>::settings))
        .route("/update", web::post().to(Api::<Client>::update))
        .route("/version", web::get().to(Api::<Client>::version));
}

/// Run one settings submission end to end: validate the form, push the
/// settings to the device and derive the flash message for the panel. The
/// store only changes when the device accepted the update.
pub(crate) async fn process_update<Client: DeviceClient>(
    fields: &HashMap<String, String>,
    device: &Client,
    store: &SettingsStore,
) -> FlashMessage {
    let update = match form::parse_update(fields) {
        Ok(update) => update,
        Err(e) => {
            warn!("rejected settings submission: {e}");
            return FlashMessage::new(FlashLevel::Danger, format!("Invalid input: {e}."));
        }
    };

    let reply = device.push_settings(&update).await;

    if reply.accepted() {
        store.apply(&update);
    }

    reply_flash(&reply)
}

fn reply_flash(reply: &DeviceReply) -> FlashMessage {
    let device = &AppConfig::get().device;

    match reply {
        DeviceReply::Success => {
            FlashMessage::new(FlashLevel::Success, "Settings sent to the device.")
        }
        DeviceReply::NoChange => FlashMessage::new(
            FlashLevel::Info,
            "Settings sent, the device reports no change.",
        ),
        DeviceReply::UnknownStatus {
            status: Some(status),
        } => FlashMessage::new(
            FlashLevel::Warning,
            format!("Device answered with unexpected status \"{status}\"."),
        ),
        DeviceReply::UnknownStatus { status: None } => FlashMessage::new(
            FlashLevel::Warning,
            "Device reply did not include a status.",
        ),
        DeviceReply::Malformed => FlashMessage::new(
            FlashLevel::Warning,
            "Settings sent, but the device reply was not readable.",
        ),
        DeviceReply::HttpError { status } => FlashMessage::new(
            FlashLevel::Danger,
            format!("Device rejected the update with HTTP {status}."),
        ),
        DeviceReply::ConnectionFailed => FlashMessage::new(
            FlashLevel::Danger,
            format!(
                "Could not reach the device at {}.",
                device_client::settings_url(&device.host)
            ),
        ),
        DeviceReply::TimedOut => FlashMessage::new(
            FlashLevel::Danger,
            format!(
                "Device did not answer within {} seconds.",
                device.timeout.as_secs()
            ),
        ),
    }
}
