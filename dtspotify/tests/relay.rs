use dtsplayer::{Controller, Credential, OAuthApp, SpotifyConnector};
use dtspotify::{DtEvent, EventRelay};
use mockito::{Matcher, Mock, Server};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

fn controller(server: &Server, cancel: &CancellationToken) -> Controller {
    let http = reqwest::Client::new();
    let oauth = OAuthApp::with_http_client(http.clone(), "id", "secret", "http://localhost/login")
        .with_accounts_url(server.url());
    let connector = SpotifyConnector::new(http, format!("{}/v1", server.url()), oauth);
    Controller::spawn(connector, cancel.clone()).0
}

fn event(json: serde_json::Value) -> DtEvent {
    serde_json::from_value(json).unwrap()
}

async fn wait_matched(mock: &Mock) {
    timeout(Duration::from_secs(5), async {
        while !mock.matched_async().await {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await
    .expect("request reached Spotify");
}

#[tokio::test]
async fn sensor_events_drive_playback() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let play = server
        .mock("PUT", "/v1/me/player/play")
        .match_header("authorization", "Bearer live-token")
        .match_body(Matcher::Json(serde_json::json!({"context_uri": "spotify:playlist:37i9dQZF1DX"})))
        .with_status(204)
        .create_async()
        .await;
    let next = server
        .mock("POST", "/v1/me/player/next")
        .with_status(204)
        .create_async()
        .await;

    let cancel = CancellationToken::new();
    let controller = controller(&server, &cancel);
    let (tx, rx) = mpsc::channel(8);
    let relay = tokio::spawn(
        EventRelay::new(controller.clone(), rx, Duration::from_secs(5)).run(cancel.clone()),
    );

    controller
        .push_credential(Credential::expiring_in(
            "live-token",
            "refresh",
            Duration::from_secs(3600),
        ))
        .await;

    tx.send(event(serde_json::json!({
        "event": {"eventId": "e1", "eventType": "touch"},
        "labels": {"spotify_action": "play_playlist", "spotify_playlist": "37i9dQZF1DX"}
    })))
    .await?;
    tx.send(event(serde_json::json!({"labels": {"room": "hall"}})))
        .await?;
    tx.send(event(serde_json::json!({"labels": {"spotify_action": "next_song"}})))
        .await?;

    wait_matched(&play).await;
    wait_matched(&next).await;

    cancel.cancel();
    timeout(Duration::from_secs(5), relay).await???;
    Ok(())
}

#[tokio::test]
async fn relay_fails_when_spotify_never_gets_ready() {
    let server = Server::new_async().await;
    let cancel = CancellationToken::new();
    let controller = controller(&server, &cancel);
    let (_tx, rx) = mpsc::channel(8);

    let result = EventRelay::new(controller, rx, Duration::from_millis(100))
        .run(cancel.clone())
        .await;

    let err = result.expect_err("not ready in time");
    assert!(err.to_string().contains("not ready"));
    cancel.cancel();
}
