use anyhow::{Context, Result};
use std::{env, path::PathBuf, sync::OnceLock, time::Duration};

/// Application configuration loaded and validated at startup
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// UI server configuration
    pub ui: UiConfig,

    /// LED device client configuration
    pub device: DeviceConfig,
}

#[derive(Clone, Debug)]
pub struct UiConfig {
    pub bind_addr: String,
    pub port: u16,
    pub static_dir: PathBuf,
}

#[derive(Clone, Debug)]
pub struct DeviceConfig {
    /// Host (and optional port) of the LED controller, without scheme
    pub host: String,
    pub timeout: Duration,
}

impl AppConfig {
    /// Get or load the application configuration
    ///
    /// Returns a reference to the cached configuration. On first call, it loads
    /// and validates all configuration from environment variables. Subsequent
    /// calls return the cached instance.
    ///
    /// # Panics
    /// Panics if configuration loading fails. This is intentional as the
    /// application cannot function without valid configuration.
    pub fn get() -> &'static Self {
        static APP_CONFIG: OnceLock<AppConfig> = OnceLock::new();
        APP_CONFIG.get_or_init(|| {
            Self::load_internal().expect("failed to load application configuration")
        })
    }

    fn load_internal() -> Result<Self> {
        let ui = UiConfig::load()?;
        let device = DeviceConfig::load()?;

        Ok(Self { ui, device })
    }
}

impl UiConfig {
    fn load() -> Result<Self> {
        let bind_addr = env::var("UI_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = env::var("UI_PORT")
            .unwrap_or_else(|_| "5000".to_string())
            .parse::<u16>()
            .context("failed to parse UI_PORT: invalid format")?;

        let static_dir: PathBuf = env::var("STATIC_DIR")
            .unwrap_or_else(|_| "static".to_string())
            .into();

        anyhow::ensure!(
            static_dir.try_exists().unwrap_or(false),
            "failed to find static directory: {} is missing",
            static_dir.display()
        );

        Ok(Self {
            bind_addr,
            port,
            static_dir,
        })
    }
}

impl DeviceConfig {
    fn load() -> Result<Self> {
        let host = env::var("DEVICE_HOST").unwrap_or_else(|_| "music-leds.local".to_string());

        let timeout_secs = env::var("DEVICE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u64>()
            .context("failed to parse DEVICE_TIMEOUT_SECS: invalid format")?;

        Ok(Self {
            host,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
