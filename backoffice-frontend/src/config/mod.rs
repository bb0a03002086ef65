use integration_engine::EngineSettings;
use secrecy::Secret;
use serde::Deserialize;
use service_core::config::{configuration_directory, load_settings};
use service_core::error::AppError;
use service_core::observability::TelemetrySettings;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub engine: EngineSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// Signs the session cookie. Must be at least 64 bytes.
    pub session_secret: Secret<String>,
    #[serde(default)]
    pub secure_cookies: bool,
    #[serde(default = "default_session_idle_minutes")]
    pub session_idle_minutes: i64,
}

fn default_session_idle_minutes() -> i64 {
    60
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn session_idle(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.session_idle_minutes.max(0) as u64 * 60)
    }
}

pub fn get_configuration() -> Result<Settings, AppError> {
    let directory = configuration_directory("backoffice-frontend")?;
    load_settings(&directory)
}
