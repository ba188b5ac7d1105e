//! FCM Gateway
//!
//! Client for the Firebase Cloud Messaging HTTP v1 API.
//!
//! It handles:
//! - OAuth2 access tokens from a Google service account, cached and refreshed
//!   inline when they are about to expire
//! - Single message delivery (`messages:send`)
//! - Topic subscription management through the instance-ID API
//! - Batched delivery over the multipart/mixed `/batch` endpoint
//! - Mapping HTTP and transport failures onto [`FcmError`]
//!
//! ```rust,no_run
//! use fcm_gateway::{FcmClient, FcmConfig, RequestOptions};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), fcm_gateway::FcmError> {
//! let config = FcmConfig::default().with_credentials_file("service-account.json");
//! let client = FcmClient::new("my-project", &config).await?;
//!
//! let response = client
//!     .push(
//!         json!({ "message": { "topic": "news", "notification": { "title": "Hi" } } }),
//!         RequestOptions::new(),
//!     )
//!     .await?;
//! println!("{:?}", response.json()?);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod client;
pub mod config;
pub mod errors;
pub mod request;
pub mod response;
pub mod service_account;
pub mod status;
pub mod token;
pub mod transport;

pub use client::{FcmClient, FcmClientBuilder};
pub use config::{CredentialSource, FcmConfig, ProxyConfig};
pub use errors::{FcmError, HttpErrorResponse};
pub use request::{OutboundRequest, PushBody, RequestOptions};
pub use response::{BatchResponse, JsonResponse};
pub use service_account::{ServiceAccountKey, ServiceAccountTokenProvider};
pub use status::{classify, ErrorKind};
pub use token::{AccessToken, TokenProvider};
pub use transport::{HttpTransport, RawResponse, ReqwestTransport};
