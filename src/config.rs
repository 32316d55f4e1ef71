use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub audio: AudioConfig,
    pub recognizer: RecognizerConfig,
    pub storage: StorageConfig,
    pub location: LocationConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// Operator consent for opening the microphone. Resolved once by the
    /// authorization gate at session start.
    pub capture_allowed: bool,
}

#[derive(Debug, Deserialize)]
pub struct RecognizerConfig {
    pub nats_url: String,
    /// BCP 47 locale tag for recognition
    pub locale: String,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub entries_path: String,
}

#[derive(Debug, Deserialize)]
pub struct LocationConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
