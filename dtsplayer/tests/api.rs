use dtsplayer::{
    Credential, OAuthApp, PlaybackClient, PlaybackConnector, SpotifyApi, SpotifyConnector,
    SpotifyError,
};
use mockito::{Matcher, Server};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

fn api(server: &Server, token: &str) -> SpotifyApi {
    SpotifyApi::with_http_client(Client::new(), format!("{}/v1", server.url()), token)
}

fn oauth(server: &Server) -> OAuthApp {
    OAuthApp::with_http_client(
        Client::new(),
        "client123",
        "secret456",
        "http://localhost:8080/login",
    )
    .with_accounts_url(server.url())
}

#[tokio::test]
async fn play_sends_bearer_token() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/v1/me/player/play")
        .match_header("authorization", "Bearer tok-1")
        .match_header("content-length", "0")
        .with_status(204)
        .create_async()
        .await;

    api(&server, "tok-1").play().await?;

    mock.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn skip_endpoints_use_post() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let next = server
        .mock("POST", "/v1/me/player/next")
        .with_status(204)
        .create_async()
        .await;
    let previous = server
        .mock("POST", "/v1/me/player/previous")
        .with_status(204)
        .create_async()
        .await;

    let api = api(&server, "tok");
    api.next().await?;
    api.previous().await?;

    next.assert_async().await;
    previous.assert_async().await;
    Ok(())
}

#[tokio::test]
async fn player_state_without_device_is_not_playing() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/me/player")
        .with_status(204)
        .create_async()
        .await;

    let state = api(&server, "tok").player_state().await?;
    assert!(!state.is_playing);
    assert!(state.device.is_none());
    Ok(())
}

#[tokio::test]
async fn player_state_is_parsed() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1/me/player")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "is_playing": true,
                "device": {"id": "d1", "name": "Salon", "type": "Speaker"},
                "item": {"uri": "spotify:track:1", "name": "Song"}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let state = api(&server, "tok").player_state().await?;
    assert!(state.is_playing);
    assert_eq!(state.device.map(|d| d.name), Some("Salon".to_string()));
    Ok(())
}

#[tokio::test]
async fn error_status_is_typed() {
    let mut server = Server::new_async().await;
    server
        .mock("PUT", "/v1/me/player/pause")
        .with_status(404)
        .with_body(
            json!({"error": {"status": 404, "message": "Player command failed: No active device found"}})
                .to_string(),
        )
        .create_async()
        .await;
    server
        .mock("PUT", "/v1/me/player/play")
        .with_status(401)
        .with_body(json!({"error": {"status": 401, "message": "The access token expired"}}).to_string())
        .create_async()
        .await;

    let api = api(&server, "tok");
    match api.pause().await {
        Err(SpotifyError::NotFound(message)) => assert!(message.contains("No active device")),
        other => panic!("unexpected result: {:?}", other),
    }
    assert!(api.play().await.unwrap_err().is_auth_error());
}

#[tokio::test]
async fn exchange_code_builds_credential() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/api/token")
        .match_header("authorization", Matcher::Regex("^Basic ".into()))
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
            Matcher::UrlEncoded("code".into(), "the-code".into()),
            Matcher::UrlEncoded("redirect_uri".into(), "http://localhost:8080/login".into()),
        ]))
        .with_status(200)
        .with_body(
            json!({
                "access_token": "access-1",
                "token_type": "Bearer",
                "expires_in": 3600,
                "refresh_token": "refresh-1",
                "scope": "user-read-playback-state"
            })
            .to_string(),
        )
        .create_async()
        .await;

    let credential = oauth(&server).exchange_code("the-code").await?;

    mock.assert_async().await;
    assert_eq!(credential.access_token(), "access-1");
    assert_eq!(credential.refresh_token(), "refresh-1");
    assert!(credential.remaining() > Duration::from_secs(3500));
    Ok(())
}

#[tokio::test]
async fn rejected_code_is_an_oauth_error() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/token")
        .with_status(400)
        .with_body(json!({"error": "invalid_grant", "error_description": "Invalid authorization code"}).to_string())
        .create_async()
        .await;

    match oauth(&server).exchange_code("bad").await {
        Err(SpotifyError::OAuth(message)) => assert!(message.contains("invalid_grant")),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[tokio::test]
async fn refresh_keeps_refresh_token_when_omitted() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/api/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
            Matcher::UrlEncoded("refresh_token".into(), "refresh-1".into()),
        ]))
        .with_status(200)
        .with_body(json!({"access_token": "access-2", "token_type": "Bearer", "expires_in": 3600}).to_string())
        .create_async()
        .await;

    let old = Credential::expiring_in("access-1", "refresh-1", Duration::from_secs(10));
    let credential = oauth(&server).refresh(&old).await?;

    assert_eq!(credential.access_token(), "access-2");
    assert_eq!(credential.refresh_token(), "refresh-1");
    Ok(())
}

#[tokio::test]
async fn client_refreshes_expiring_token_before_request() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let refresh = server
        .mock("POST", "/api/token")
        .with_status(200)
        .with_body(
            json!({"access_token": "fresh", "expires_in": 3600, "refresh_token": "refresh-2"})
                .to_string(),
        )
        .create_async()
        .await;
    let play = server
        .mock("PUT", "/v1/me/player/play")
        .match_header("authorization", "Bearer fresh")
        .with_status(204)
        .create_async()
        .await;

    let connector = SpotifyConnector::new(Client::new(), format!("{}/v1", server.url()), oauth(&server));
    let mut client = connector.connect(Credential::expiring_in(
        "stale",
        "refresh-1",
        Duration::from_secs(5),
    ));

    client.play().await?;
    let credential = client.credential().await;

    refresh.assert_async().await;
    play.assert_async().await;
    assert_eq!(credential.access_token(), "fresh");
    assert_eq!(credential.refresh_token(), "refresh-2");
    Ok(())
}

#[tokio::test]
async fn client_plays_items_and_collections_by_uri() -> anyhow::Result<()> {
    let mut server = Server::new_async().await;
    let item = server
        .mock("PUT", "/v1/me/player/play")
        .match_body(Matcher::Json(json!({"uris": ["spotify:track:4uLU6hMCjMI75M1A2tKUQC"]})))
        .with_status(204)
        .create_async()
        .await;
    let collection = server
        .mock("PUT", "/v1/me/player/play")
        .match_body(Matcher::Json(json!({"context_uri": "spotify:playlist:37i9dQZF1DX"})))
        .with_status(204)
        .create_async()
        .await;

    let connector = SpotifyConnector::new(Client::new(), format!("{}/v1", server.url()), oauth(&server));
    let mut client = connector.connect(Credential::expiring_in(
        "tok",
        "refresh",
        Duration::from_secs(3600),
    ));

    client.play_item("4uLU6hMCjMI75M1A2tKUQC").await?;
    client.play_collection("37i9dQZF1DX").await?;

    item.assert_async().await;
    collection.assert_async().await;
    Ok(())
}
