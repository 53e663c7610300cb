//! HTTP client for the desktop player's local `/query` endpoint.

use std::time::Duration;

use livesync_core::FetchError;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ENDPOINT: &str = "http://localhost:9863";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Body of `GET /query`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryResponse {
    pub player: PlayerInfo,
    pub track: Option<TrackInfo>,
}

impl QueryResponse {
    /// The current track, only while the player reports one.
    pub fn current_track(&self) -> Option<&TrackInfo> {
        self.track.as_ref().filter(|_| self.player.has_song)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlayerInfo {
    pub has_song: bool,
    pub is_paused: bool,
    pub volume_percent: f64,
    pub seekbar_current_position: f64,
    pub state_percent: f64,
    pub like_status: String,
    pub repeat_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackInfo {
    pub author: String,
    pub title: String,
    pub album: String,
    pub cover: String,
    pub duration: f64,
    pub url: String,
    pub id: String,
    pub is_video: bool,
    pub is_advertisement: bool,
    pub in_library: bool,
}

#[derive(Debug, Clone)]
pub struct MediaClient {
    http: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl MediaClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn query(&self) -> Result<QueryResponse, FetchError> {
        let url = format!("{}/query", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(FetchError::PermissionDenied(format!("{url}: {}", response.status())));
            }
            status => return Err(FetchError::Protocol(format!("{url}: {status}"))),
        }

        response
            .json::<QueryResponse>()
            .await
            .map_err(|e| map_reqwest_error(e, self.timeout))
    }
}

/// Map a transport error onto the failure taxonomy. A refused connection
/// means the player's server is down, which is treated as the source going
/// away.
pub(crate) fn map_reqwest_error(e: reqwest::Error, timeout: Duration) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout(timeout)
    } else if e.is_connect() {
        FetchError::SourceGone(e.to_string())
    } else {
        FetchError::Protocol(e.to_string())
    }
}
