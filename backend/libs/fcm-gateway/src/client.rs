use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::FcmConfig;
use crate::errors::FcmError;
use crate::request::{
    build_batch_request, build_push_request, build_subscription_request, OutboundRequest,
    PushBody, RequestOptions, SubscriptionAction,
};
use crate::response::{BatchResponse, JsonResponse};
use crate::service_account::ServiceAccountTokenProvider;
use crate::status::classify;
use crate::token::{CachedToken, TokenManager, TokenProvider};
use crate::transport::{HttpTransport, RawResponse, ReqwestTransport};

/// Firebase Cloud Messaging Client
///
/// Sends pushes, manages topic subscriptions and delivers multipart batches
/// through the FCM HTTP v1 API. The bearer token is refreshed inline before
/// each call when it is within five minutes of expiring. Calls are single
/// attempts: classified HTTP errors and transport faults are returned to the
/// caller as-is.
pub struct FcmClient {
    project_id: String,
    config: FcmConfig,
    tokens: TokenManager,
    transport: Arc<dyn HttpTransport>,
}

impl FcmClient {
    /// Create new FCM client
    ///
    /// # Arguments
    /// * `project_id` - Firebase project ID
    /// * `config` - copied into the client; later changes to it have no effect
    pub async fn new(project_id: impl Into<String>, config: &FcmConfig) -> Result<Self, FcmError> {
        Self::builder(project_id, config).build().await
    }

    pub fn builder(project_id: impl Into<String>, config: &FcmConfig) -> FcmClientBuilder {
        FcmClientBuilder {
            project_id: project_id.into(),
            config: config.clone(),
            transport: None,
            token_provider: None,
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn config(&self) -> &FcmConfig {
        &self.config
    }

    /// Currently cached bearer token
    pub fn access_token(&self) -> String {
        self.tokens.current().access_token
    }

    pub fn credential(&self) -> CachedToken {
        self.tokens.current()
    }

    /// Send a single message via `messages:send`
    pub async fn push(
        &self,
        body: impl Into<PushBody>,
        options: RequestOptions,
    ) -> Result<JsonResponse, FcmError> {
        let body = body.into();
        let access_token = self.tokens.ensure_fresh().await?;
        let request =
            build_push_request(&self.config, &self.project_id, &body, &access_token, &options)?;

        let raw = self.dispatch("push", request).await?;
        Ok(JsonResponse::new(raw))
    }

    /// Subscribe instance IDs to a topic (`/topics/` is prefixed if missing)
    pub async fn subscribe<S: AsRef<str>>(
        &self,
        topic: &str,
        instance_ids: &[S],
        options: RequestOptions,
    ) -> Result<JsonResponse, FcmError> {
        self.manage_topic(SubscriptionAction::Subscribe, topic, instance_ids, options)
            .await
    }

    /// Unsubscribe instance IDs from a topic
    pub async fn unsubscribe<S: AsRef<str>>(
        &self,
        topic: &str,
        instance_ids: &[S],
        options: RequestOptions,
    ) -> Result<JsonResponse, FcmError> {
        self.manage_topic(SubscriptionAction::Unsubscribe, topic, instance_ids, options)
            .await
    }

    /// Send several messages in one multipart request.
    ///
    /// Items of the returned response line up with `payloads` by position.
    pub async fn batch_push<I, P>(
        &self,
        payloads: I,
        options: RequestOptions,
    ) -> Result<BatchResponse, FcmError>
    where
        I: IntoIterator<Item = P>,
        P: Into<PushBody>,
    {
        let payloads: Vec<PushBody> = payloads.into_iter().map(Into::into).collect();
        let access_token = self.tokens.ensure_fresh().await?;
        let request = build_batch_request(
            &self.config,
            &self.project_id,
            &payloads,
            &access_token,
            &options,
        )?;

        let raw = self.dispatch("batch", request).await?;
        let response = BatchResponse::from_raw(raw).map_err(|e| {
            warn!(parts = payloads.len(), error = %e, "Failed to decode FCM batch response");
            e
        })?;

        debug!(
            parts = payloads.len(),
            success_count = response.success_count(),
            failure_count = response.failure_count(),
            "FCM batch delivered"
        );
        Ok(response)
    }

    async fn manage_topic<S: AsRef<str>>(
        &self,
        action: SubscriptionAction,
        topic: &str,
        instance_ids: &[S],
        options: RequestOptions,
    ) -> Result<JsonResponse, FcmError> {
        let access_token = self.tokens.ensure_fresh().await?;
        let request = build_subscription_request(
            &self.config,
            action,
            topic,
            instance_ids,
            &access_token,
            &options,
        )?;

        let endpoint = match action {
            SubscriptionAction::Subscribe => "subscribe",
            SubscriptionAction::Unsubscribe => "unsubscribe",
        };
        let raw = self.dispatch(endpoint, request).await?;
        Ok(JsonResponse::new(raw))
    }

    async fn dispatch(
        &self,
        endpoint: &'static str,
        request: OutboundRequest,
    ) -> Result<RawResponse, FcmError> {
        debug!(endpoint, url = %request.url, "Sending FCM request");

        let raw = self.transport.send(request).await.map_err(|e| {
            warn!(endpoint, error = %e, "FCM request did not complete");
            match e {
                FcmError::Network(_) => e,
                other => FcmError::Network(other.to_string()),
            }
        })?;

        if let Some(kind) = classify(raw.status) {
            let body = String::from_utf8_lossy(&raw.body).into_owned();
            warn!(endpoint, status = raw.status, %kind, "FCM API error");
            return Err(FcmError::from_response(kind, raw.headers, body));
        }

        Ok(raw)
    }
}

/// Builder for [`FcmClient`], mainly to swap the transport or token source
pub struct FcmClientBuilder {
    project_id: String,
    config: FcmConfig,
    transport: Option<Arc<dyn HttpTransport>>,
    token_provider: Option<Arc<dyn TokenProvider>>,
}

impl FcmClientBuilder {
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn token_provider(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Build the client, fetching the first access token
    pub async fn build(self) -> Result<FcmClient, FcmError> {
        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(ReqwestTransport::from_config(&self.config)?),
        };
        let provider = match self.token_provider {
            Some(provider) => provider,
            None => Arc::new(ServiceAccountTokenProvider::from_config(&self.config)?),
        };

        let tokens = TokenManager::new(provider).await?;

        info!(project_id = %self.project_id, domain = %self.config.domain, "Initialized FCM client");

        Ok(FcmClient {
            project_id: self.project_id,
            config: self.config,
            tokens,
            transport,
        })
    }
}
