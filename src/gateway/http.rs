//! HTTP implementation of [`ChatGateway`] over `reqwest`.

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, RequestBuilder, Response};
use serde_json::Value;
use url::Url;

use crate::domain::{
    ConversationId, GatewayConfig, GatewayError, GatewayResult, RouteStyle,
};

use super::envelope::{
    ConversationRecord, Envelope, ListPayload, MessageRecord, NewConversation, NewMessage,
    SendReply,
};
use super::{ChatGateway, GatewayFuture};

/// Longest body excerpt kept in a status error.
const MAX_REASON_CHARS: usize = 200;

/// Gateway that talks JSON over HTTP.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: Url,
    routes: RouteStyle,
}

impl HttpGateway {
    /// Create a gateway from connection settings.
    ///
    /// # Errors
    /// Returns an error if the config is invalid or the HTTP client cannot be built.
    pub fn new(config: &GatewayConfig) -> GatewayResult<Self> {
        config.validate()?;

        let mut base_url = config.parsed_base_url()?;
        // Endpoints are joined relative to the base, so keep any path prefix.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            client: Self::build_client(config)?,
            base_url,
            routes: config.routes,
        })
    }

    /// Build an HTTP client with JSON headers and the configured timeouts.
    fn build_client(config: &GatewayConfig) -> GatewayResult<reqwest::Client> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Ok(ua) = HeaderValue::from_str(&config.user_agent) {
            headers.insert(USER_AGENT, ua);
        }

        reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| GatewayError::InvalidConfig(format!("HTTP client: {e}")))
    }

    /// Base URL every endpoint is resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> GatewayResult<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn conversations_url(&self) -> GatewayResult<Url> {
        self.endpoint("api/conversations")
    }

    fn conversation_url(&self, id: &ConversationId) -> GatewayResult<Url> {
        let mut url = self.conversations_url()?;
        match self.routes {
            RouteStyle::Proxy => {
                url.query_pairs_mut().append_pair("id", id.as_str());
            }
            RouteStyle::Backend => push_segment(&mut url, id.as_str())?,
        }
        Ok(url)
    }

    fn messages_url(&self) -> GatewayResult<Url> {
        self.endpoint("api/messages")
    }

    fn conversation_messages_url(&self, conversation_id: &ConversationId) -> GatewayResult<Url> {
        let mut url = self.messages_url()?;
        match self.routes {
            RouteStyle::Proxy => {
                url.query_pairs_mut()
                    .append_pair("conversationId", conversation_id.as_str());
            }
            RouteStyle::Backend => push_segment(&mut url, conversation_id.as_str())?,
        }
        Ok(url)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        tracing::debug!("{method} {url}");
        self.client.request(method, url)
    }

    /// Send a request and decode the body as JSON.
    async fn fetch_json(&self, request: RequestBuilder) -> GatewayResult<Value> {
        let response = request.send().await?;
        read_json(response).await
    }
}

fn push_segment(url: &mut Url, segment: &str) -> GatewayResult<()> {
    url.path_segments_mut()
        .map_err(|()| GatewayError::InvalidConfig("base URL cannot carry path segments".to_string()))?
        .pop_if_empty()
        .push(segment);
    Ok(())
}

/// Check the status and decode the body.
async fn read_json(response: Response) -> GatewayResult<Value> {
    let status = response.status();
    let bytes = response.bytes().await?;

    if !status.is_success() {
        let reason = status_reason(&bytes)
            .or_else(|| status.canonical_reason().map(str::to_string))
            .unwrap_or_else(|| "unknown status".to_string());
        return Err(GatewayError::Status {
            status: status.as_u16(),
            reason,
        });
    }

    Ok(serde_json::from_slice(&bytes)?)
}

/// Pull a message out of an error body, falling back to a text excerpt.
fn status_reason(body: &[u8]) -> Option<String> {
    if let Ok(value) = serde_json::from_slice::<Value>(body) {
        for key in ["message", "error"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return Some(text.to_string());
            }
        }
    }

    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.chars().take(MAX_REASON_CHARS).collect())
    }
}

impl ChatGateway for HttpGateway {
    fn list_conversations(&self) -> GatewayFuture<'_, GatewayResult<ListPayload<ConversationRecord>>> {
        Box::pin(async move {
            let url = self.conversations_url()?;
            let body = self.fetch_json(self.request(Method::GET, url)).await?;
            ListPayload::from_value(body)
        })
    }

    fn create_conversation(
        &self,
        title: &str,
    ) -> GatewayFuture<'_, GatewayResult<Envelope<ConversationRecord>>> {
        let body = NewConversation {
            title: title.to_string(),
        };
        Box::pin(async move {
            let url = self.conversations_url()?;
            let value = self
                .fetch_json(self.request(Method::POST, url).json(&body))
                .await?;
            Envelope::from_value(value)
        })
    }

    fn delete_conversation(
        &self,
        id: &ConversationId,
    ) -> GatewayFuture<'_, GatewayResult<Envelope<Value>>> {
        let id = id.clone();
        Box::pin(async move {
            let url = self.conversation_url(&id)?;
            let value = self.fetch_json(self.request(Method::DELETE, url)).await?;
            Envelope::from_value(value)
        })
    }

    fn list_messages(
        &self,
        conversation_id: &ConversationId,
    ) -> GatewayFuture<'_, GatewayResult<ListPayload<MessageRecord>>> {
        let conversation_id = conversation_id.clone();
        Box::pin(async move {
            let url = self.conversation_messages_url(&conversation_id)?;
            let body = self.fetch_json(self.request(Method::GET, url)).await?;
            ListPayload::from_value(body)
        })
    }

    fn send_message(&self, message: NewMessage) -> GatewayFuture<'_, GatewayResult<Envelope<SendReply>>> {
        Box::pin(async move {
            let url = self.messages_url()?;
            let value = self
                .fetch_json(self.request(Method::POST, url).json(&message))
                .await?;
            Envelope::from_value(value)
        })
    }
}
