use serde::Deserialize;
use service_core::config::{load_layered, EnvOverride};
use service_core::error::AppError;

#[derive(Deserialize, Clone, Debug)]
pub struct Settings {
    pub server: ServerSettings,
    pub backend: BackendSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone, Debug)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,
    /// Mark the session cookie `Secure`. Enable behind HTTPS.
    #[serde(default)]
    pub secure_cookies: bool,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct BackendSettings {
    /// Base URL of the chat/auth REST backend. `BACKEND_URL` overrides it.
    #[serde(default = "default_backend_url")]
    pub url: String,
    #[serde(default = "default_custom_header_name")]
    pub custom_header_name: String,
    #[serde(default = "default_custom_header_value")]
    pub custom_header_value: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default)]
    pub endpoints: Endpoints,
}

/// Backend endpoint paths, relative to `backend.url`.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Endpoints {
    pub login: String,
    pub register: String,
    pub logout: String,
    pub refresh: String,
    pub current_user: String,
    pub change_password: String,
    pub prompt: String,
    pub conversation_message: String,
    pub conversation_history: String,
    pub conversation_list: String,
    pub conversation_delete: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            login: "/auth/login".to_string(),
            register: "/auth/register".to_string(),
            logout: "/auth/logout".to_string(),
            refresh: "/auth/refresh-token".to_string(),
            current_user: "/user/me".to_string(),
            change_password: "/user/change-password".to_string(),
            prompt: "/prompt".to_string(),
            conversation_message: "/api/chat/message".to_string(),
            conversation_history: "/api/chat/history".to_string(),
            conversation_list: "/api/chat/list".to_string(),
            conversation_delete: "/api/chat".to_string(),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct TelemetrySettings {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// OTLP collector endpoint; tracing stays local when unset.
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            otlp_endpoint: None,
        }
    }
}

impl BackendSettings {
    /// Settings pointing at `url` with every other field defaulted.
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            custom_header_name: default_custom_header_name(),
            custom_header_value: default_custom_header_value(),
            timeout_seconds: default_timeout_seconds(),
            endpoints: Endpoints::default(),
        }
    }
}

fn default_session_ttl_hours() -> i64 {
    24
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_static_dir() -> String {
    "chat-frontend/static".to_string()
}

fn default_backend_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_custom_header_name() -> String {
    "X-Custom-Header".to_string()
}

fn default_custom_header_value() -> String {
    "foobar".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

pub fn get_configuration() -> Result<Settings, AppError> {
    let base_path = std::env::current_dir()?;

    // Accept being started from the workspace root or from the crate directory
    let configuration_directory = if base_path.ends_with("chat-frontend") {
        base_path.join("config")
    } else {
        base_path.join("chat-frontend").join("config")
    };

    load_layered(
        &configuration_directory.join("base.yaml"),
        "APP",
        &[EnvOverride {
            key: "backend.url",
            env_var: "BACKEND_URL",
        }],
    )
}
