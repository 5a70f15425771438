//! Login URL delivery to a Slack-compatible incoming webhook

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

#[derive(Debug, Serialize)]
struct SlackMessage<'a> {
    text: &'a str,
}

/// Posts `{"text": login_url}` to the messaging webhook
pub async fn post_login_url(http: &reqwest::Client, slack_url: &str, login_url: &str) -> Result<()> {
    http.post(slack_url)
        .json(&SlackMessage { text: login_url })
        .send()
        .await
        .context("Failed to reach messaging webhook")?
        .error_for_status()
        .context("Messaging webhook rejected the login URL")?;

    info!("Spotify login URL posted to messaging webhook");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    #[tokio::test]
    async fn test_posts_login_url() -> Result<()> {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/services/T000/B000/XXXX")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(serde_json::json!({
                "text": "https://accounts.spotify.com/authorize?state=abc"
            })))
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        post_login_url(
            &reqwest::Client::new(),
            &format!("{}/services/T000/B000/XXXX", server.url()),
            "https://accounts.spotify.com/authorize?state=abc",
        )
        .await?;

        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_post_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/hook")
            .with_status(404)
            .with_body("no_service")
            .create_async()
            .await;

        let result = post_login_url(
            &reqwest::Client::new(),
            &format!("{}/hook", server.url()),
            "https://example.org",
        )
        .await;
        assert!(result.is_err());
    }
}
