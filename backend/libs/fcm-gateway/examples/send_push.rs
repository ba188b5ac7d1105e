//! Send one push (or a topic subscription) using configuration from the environment.
//!
//! ```text
//! FCM_CREDENTIALS_PATH=service-account.json \
//!     cargo run -p fcm-gateway --example send_push -- <project-id> <device-token> [topic]
//! ```

use fcm_gateway::{FcmClient, FcmConfig, FcmError, RequestOptions};
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), FcmError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,fcm_gateway=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(project_id), Some(device_token)) = (args.next(), args.next()) else {
        return Err(FcmError::Config(
            "usage: send_push <project-id> <device-token> [topic]".into(),
        ));
    };
    let topic = args.next();

    let config = FcmConfig::from_env()?;
    let client = FcmClient::new(project_id, &config).await?;

    if let Some(topic) = topic {
        let response = client
            .subscribe(&topic, &[device_token.as_str()], RequestOptions::new())
            .await?;
        tracing::info!(status = response.status(), body = %response.text(), "Subscribed");
        return Ok(());
    }

    let message = json!({
        "message": {
            "token": device_token,
            "notification": { "title": "test title", "body": "test body" }
        }
    });

    match client.push(message, RequestOptions::new()).await {
        Ok(response) => {
            tracing::info!(status = response.status(), json = ?response.json()?, "Push sent");
            Ok(())
        }
        Err(e @ FcmError::Server(_)) => {
            tracing::warn!(error = %e, "FCM unavailable, retry later");
            Err(e)
        }
        Err(e) => Err(e),
    }
}
