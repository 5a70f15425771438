//! Data structures exchanged with the Spotify Web API

use serde::{Deserialize, Serialize};

/// Device currently attached to the player
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Device {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub volume_percent: Option<u32>,
}

/// Item (track or episode) being played
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlayingItem {
    #[serde(default)]
    pub uri: String,
    #[serde(default)]
    pub name: String,
}

/// Current playback state as returned by `GET /me/player`
///
/// The API answers 204 when no device is active; that case is reported as
/// the default (not playing) state.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PlayerState {
    #[serde(default)]
    pub is_playing: bool,
    #[serde(default)]
    pub device: Option<Device>,
    #[serde(default)]
    pub item: Option<PlayingItem>,
    #[serde(default)]
    pub progress_ms: Option<u64>,
}

/// Body of `PUT /me/player/play`
///
/// `uris` replaces the play context with an explicit list of items,
/// `context_uri` plays an album/playlist/artist context.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlayOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_uri: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uris: Vec<String>,
}

impl PlayOptions {
    pub fn items(uris: Vec<String>) -> Self {
        Self {
            uris,
            ..Default::default()
        }
    }

    pub fn context(uri: impl Into<String>) -> Self {
        Self {
            context_uri: Some(uri.into()),
            ..Default::default()
        }
    }
}

/// Token document returned by `POST /api/token`
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    pub scope: Option<String>,
}

/// Turns a bare track id into a `spotify:track:` URI; URIs pass through
pub fn item_uri(id: &str) -> String {
    to_uri(id, "track")
}

/// Turns a bare playlist id into a `spotify:playlist:` URI; URIs pass through
pub fn collection_uri(id: &str) -> String {
    to_uri(id, "playlist")
}

fn to_uri(id: &str, kind: &str) -> String {
    let id = id.trim();
    if id.contains(':') {
        id.to_string()
    } else {
        format!("spotify:{}:{}", kind, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_state_parsing() {
        let json = r#"{
            "device": {"id": "d1", "is_active": true, "name": "Kitchen", "type": "Speaker", "volume_percent": 40},
            "progress_ms": 1200,
            "is_playing": true,
            "item": {"uri": "spotify:track:4uLU6hMCjMI75M1A2tKUQC", "name": "Never Gonna Give You Up"}
        }"#;
        let state: PlayerState = serde_json::from_str(json).unwrap();
        assert!(state.is_playing);
        assert_eq!(state.device.unwrap().name, "Kitchen");
        assert_eq!(state.item.unwrap().uri, "spotify:track:4uLU6hMCjMI75M1A2tKUQC");
    }

    #[test]
    fn test_play_options_body() {
        let body = serde_json::to_value(PlayOptions::items(vec!["spotify:track:1".into()])).unwrap();
        assert_eq!(body, serde_json::json!({"uris": ["spotify:track:1"]}));

        let body = serde_json::to_value(PlayOptions::context("spotify:playlist:9")).unwrap();
        assert_eq!(body, serde_json::json!({"context_uri": "spotify:playlist:9"}));
    }

    #[test]
    fn test_uris() {
        assert_eq!(item_uri("4uLU6hMCjMI75M1A2tKUQC"), "spotify:track:4uLU6hMCjMI75M1A2tKUQC");
        assert_eq!(item_uri("spotify:episode:abc"), "spotify:episode:abc");
        assert_eq!(collection_uri("37i9dQZF1DX"), "spotify:playlist:37i9dQZF1DX");
        assert_eq!(collection_uri("spotify:album:xyz"), "spotify:album:xyz");
    }
}
