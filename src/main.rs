use actix_files::Files;
use actix_session::{
    SessionMiddleware,
    config::{BrowserSession, CookieContentSecurity},
    storage::CookieSessionStore,
};
use actix_web::{
    App, HttpServer,
    cookie::{Key, SameSite},
    dev::ServerHandle,
    web::Data,
};
use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use log::{debug, error, info};
use music_leds_ui::{
    api::{self, Api},
    config::AppConfig,
    device_client::{self, LedDeviceClient},
    settings::SettingsStore,
};
use std::io::Write;
use tokio::signal::unix::{SignalKind, signal};

type PanelApi = Api<LedDeviceClient>;

#[actix_web::main]
async fn main() {
    if let Err(e) = run().await {
        error!("application error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    initialize()?;

    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

    let device_client = LedDeviceClient::from_config().context("failed to create device client")?;

    let (server_handle, server_task) = run_server(device_client)?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            debug!("ctrl-c received");
        },
        _ = sigterm.recv() => {
            debug!("SIGTERM received");
        },
        result = server_task => {
            match result {
                Ok(Ok(())) => debug!("server stopped normally"),
                Ok(Err(e)) => error!("server stopped with error: {e}"),
                Err(e) => error!("server task panicked: {e}"),
            }
        },
    }

    server_handle.stop(true).await;
    info!("shutdown complete");

    Ok(())
}

fn initialize() -> Result<()> {
    log_panics::init();

    let mut builder = if cfg!(debug_assertions) {
        Builder::from_env(Env::default().default_filter_or("debug"))
    } else {
        Builder::from_env(Env::default().default_filter_or("info"))
    };

    builder.format(|f, record| match record.level() {
        log::Level::Error => {
            eprintln!("{}", record.args());
            Ok(())
        }
        _ => {
            writeln!(f, "{}", record.args())
        }
    });

    builder.target(Target::Stdout).init();

    info!("module version: {}", env!("CARGO_PKG_VERSION"));

    Ok(())
}

fn run_server(
    device_client: LedDeviceClient,
) -> Result<(
    ServerHandle,
    tokio::task::JoinHandle<Result<(), std::io::Error>>,
)> {
    let config = AppConfig::get();
    let static_dir = config.ui.static_dir.clone();
    let session_key = Key::generate();

    // One shared instance across all workers
    let api = Data::new(PanelApi::new(device_client));
    let store = Data::new(SettingsStore::default());

    info!(
        "panel listening on {}:{}, forwarding to {}",
        config.ui.bind_addr,
        config.ui.port,
        device_client::settings_url(&config.device.host)
    );

    let server = HttpServer::new(move || {
        App::new()
            .wrap(
                SessionMiddleware::builder(CookieSessionStore::default(), session_key.clone())
                    .cookie_name(String::from("music-leds-session"))
                    // the panel serves plain http on the lan, a secure cookie
                    // would never be sent back
                    .cookie_secure(false)
                    .session_lifecycle(BrowserSession::default())
                    .cookie_same_site(SameSite::Strict)
                    .cookie_content_security(CookieContentSecurity::Private)
                    .cookie_http_only(true)
                    .build(),
            )
            .app_data(api.clone())
            .app_data(store.clone())
            .configure(api::routes::<LedDeviceClient>)
            .service(Files::new("/static", static_dir.clone()))
    })
    .bind((config.ui.bind_addr.as_str(), config.ui.port))
    .context("failed to bind server")?
    .disable_signals()
    .run();

    Ok((server.handle(), tokio::spawn(server)))
}
