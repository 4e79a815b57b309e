//! Game server HTTP API client (session bootstrap)

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::config::Config;
use crate::game::map::MapDescriptor;

/// Raw bootstrap response; the server sends `map: null` when its map is missing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub player_id: Uuid,
    pub map: Option<MapDescriptor>,
}

/// Everything a session needs before the channel can open
#[derive(Debug, Clone, PartialEq)]
pub struct SessionBootstrap {
    pub player_id: Uuid,
    pub map: MapDescriptor,
}

impl TryFrom<InitializeResponse> for SessionBootstrap {
    type Error = ApiError;

    fn try_from(response: InitializeResponse) -> Result<Self, Self::Error> {
        let map = response.map.ok_or(ApiError::MissingMap)?;
        Ok(Self {
            player_id: response.player_id,
            map,
        })
    }
}

/// Client for the game server's REST endpoints
#[derive(Clone)]
pub struct GameApiClient {
    client: Client,
    base_url: String,
}

impl GameApiClient {
    pub fn new(config: &Config) -> Self {
        Self::with_base_url(&config.api_base_url)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Get the URL for a game endpoint
    fn game_url(&self, endpoint: &str) -> String {
        format!("{}/api/game/{}/", self.base_url, endpoint)
    }

    /// Ask the server for a player id and the current map.
    ///
    /// Failures are logged here and returned; there is no retry.
    pub async fn initialize_session(&self) -> Result<SessionBootstrap, ApiError> {
        let result = self.fetch_initialize().await.and_then(SessionBootstrap::try_from);
        match &result {
            Ok(bootstrap) => info!(
                player_id = %bootstrap.player_id,
                map = %bootstrap.map.name,
                width = bootstrap.map.width,
                height = bootstrap.map.height,
                "Session initialized"
            ),
            Err(e) => error!(error = %e, "Error initializing game"),
        }
        result
    }

    async fn fetch_initialize(&self) -> Result<InitializeResponse, ApiError> {
        let url = self.game_url("initialize");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(ApiError::Request)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        response.json().await.map_err(ApiError::Parse)
    }
}

/// API errors
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Failed to parse response: {0}")]
    Parse(#[source] reqwest::Error),

    #[error("Server has no map loaded")]
    MissingMap,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_urls() {
        let api = GameApiClient::with_base_url("http://10.0.0.80:8000/");
        assert_eq!(
            api.game_url("initialize"),
            "http://10.0.0.80:8000/api/game/initialize/"
        );
    }

    #[test]
    fn null_map_is_a_bootstrap_failure() {
        let response: InitializeResponse = serde_json::from_str(
            r#"{"player_id": "6f1c2a7e-2b1d-4e59-9a51-0c1f3f4a9b10", "map": null}"#,
        )
        .unwrap();
        assert!(matches!(
            SessionBootstrap::try_from(response),
            Err(ApiError::MissingMap)
        ));
    }

    #[test]
    fn full_response_converts() {
        let response: InitializeResponse = serde_json::from_str(
            r#"{
                "player_id": "6f1c2a7e-2b1d-4e59-9a51-0c1f3f4a9b10",
                "map": {"name": "dunes", "width": 20, "height": 15, "tiles": []}
            }"#,
        )
        .unwrap();
        let bootstrap = SessionBootstrap::try_from(response).unwrap();
        assert_eq!(bootstrap.map.width, 20);
        assert_eq!(
            bootstrap.player_id.to_string(),
            "6f1c2a7e-2b1d-4e59-9a51-0c1f3f4a9b10"
        );
    }
}
