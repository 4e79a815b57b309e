//! Configuration module - environment variable parsing

use std::env;
use std::str::FromStr;
use std::time::Duration;

use uuid::Uuid;

/// Simulation knobs shared by prediction, coordinates and the send throttle
#[derive(Clone, Debug, PartialEq)]
pub struct SyncSettings {
    /// Edge length of one tile in pixels
    pub tile_size: f64,
    /// Character height in tiles (the render anchor is the feet)
    pub character_height: f64,
    /// Minimum gap between periodic position messages
    pub send_interval: Duration,
    /// Frame scheduling rate for the prediction loop
    pub frame_rate: u32,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            tile_size: 30.0,
            character_height: 2.0,
            send_interval: Duration::from_millis(50),
            frame_rate: 60,
        }
    }
}

impl SyncSettings {
    /// Wall-clock period between scheduled frames
    pub fn frame_period(&self) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(self.frame_rate.max(1)))
    }
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Game server host, used for the channel address
    pub server_host: String,
    /// Base URL of the HTTP API (bootstrap)
    pub api_base_url: String,
    /// Fixed WebSocket port on the game server
    pub ws_port: u16,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Prediction and rendering settings
    pub sync: SyncSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_host: "localhost".to_string(),
            api_base_url: "http://localhost:8000".to_string(),
            ws_port: 8000,
            log_level: "info".to_string(),
            sync: SyncSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SyncSettings::default();

        let server_host = lookup("SERVER_HOST").unwrap_or_else(|| "localhost".to_string());
        let ws_port = parse_var(&lookup, "WS_PORT", 8000u16)?;
        let api_base_url = lookup("API_BASE_URL")
            .unwrap_or_else(|| format!("http://{}:{}", server_host, ws_port))
            .trim_end_matches('/')
            .to_string();

        let tile_size = parse_var(&lookup, "TILE_SIZE", defaults.tile_size)?;
        if !(tile_size.is_finite() && tile_size > 0.0) {
            return Err(ConfigError::Invalid {
                var: "TILE_SIZE",
                value: tile_size.to_string(),
            });
        }

        let character_height = parse_var(&lookup, "CHARACTER_HEIGHT", defaults.character_height)?;
        let send_interval_ms = parse_var(
            &lookup,
            "SEND_INTERVAL_MS",
            defaults.send_interval.as_millis() as u64,
        )?;
        let frame_rate = parse_var(&lookup, "FRAME_RATE", defaults.frame_rate)?;
        if frame_rate == 0 {
            return Err(ConfigError::Invalid {
                var: "FRAME_RATE",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            server_host,
            api_base_url,
            ws_port,
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            sync: SyncSettings {
                tile_size,
                character_height,
                send_interval: Duration::from_millis(send_interval_ms),
                frame_rate,
            },
        })
    }

    /// Channel address for an assigned player
    pub fn ws_url(&self, player_id: Uuid) -> String {
        format!(
            "ws://{}:{}/ws/game/{}/",
            self.server_host, self.ws_port, player_id
        )
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(var) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value: raw }),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}
