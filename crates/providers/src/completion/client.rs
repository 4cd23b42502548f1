use crate::config::CompletionConfig;
use dsc_core::llm::{ChatError, ChatOpts, ChatResult, Message, ModelClient, Role};
use reqwest::{header, Client, StatusCode};
use tokio::time::Duration;
use tracing::{error, info};

#[derive(Clone)]
pub struct CompletionClient {
    http: Client,
    cfg: CompletionConfig,
}

impl CompletionClient {
    pub fn new(cfg: CompletionConfig) -> anyhow::Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", cfg.api_key))?,
        );
        let mut builder = Client::builder()
            .default_headers(headers)
            .use_rustls_tls()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(2)
            .timeout(cfg.timeout);
        if let Some(p) = &cfg.proxy {
            builder = builder.proxy(reqwest::Proxy::all(p)?);
        }
        let http = builder.build()?;
        Ok(Self { http, cfg })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.cfg.base_url.trim_end_matches('/'))
    }
}

pub(crate) fn map_messages(msgs: &[Message]) -> Vec<serde_json::Value> {
    msgs.iter()
        .map(|m| {
            let role = match m.role {
                Role::User => "user",
                Role::Assistant => "assistant",
                Role::System => "system",
            };
            serde_json::json!({"role": role, "content": m.content})
        })
        .collect()
}

pub(crate) fn request_body(msgs: &[Message], opts: &ChatOpts) -> serde_json::Value {
    serde_json::json!({
        "model": opts.model,
        "messages": map_messages(msgs),
        "stream": false,
        "temperature": opts.temperature,
        "max_tokens": opts.max_tokens,
    })
}

pub(crate) fn parse_response(v: &serde_json::Value) -> Result<ChatResult, ChatError> {
    let choice = &v["choices"][0];
    let Some(text) = choice["message"]["content"].as_str() else {
        return Err(ChatError::Protocol(format!("no message content in response: {}", v)));
    };
    let as_u32 = |x: &serde_json::Value| x.as_u64().map(|n| n as u32);
    Ok(ChatResult {
        text: text.to_string(),
        finish_reason: choice["finish_reason"].as_str().map(str::to_string),
        prompt_tokens: as_u32(&v["usage"]["prompt_tokens"]),
        completion_tokens: as_u32(&v["usage"]["completion_tokens"]),
    })
}

#[allow(async_fn_in_trait)]
impl ModelClient for CompletionClient {
    async fn send_chat(&self, msgs: &[Message], opts: &ChatOpts) -> Result<ChatResult, ChatError> {
        let url = self.endpoint();
        info!(target: "providers::completion", "send chat model={} url={}", opts.model, url);
        let resp = self
            .http
            .post(url)
            .json(&request_body(msgs, opts))
            .send()
            .await
            .map_err(map_reqwest_err)?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.ok();
            error!(target: "providers::completion", "non-200 status={} body={:?}", status, body);
            return Err(map_status_err(status, body));
        }
        let v: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| ChatError::Decode(e.to_string()))?;
        let res = parse_response(&v)?;
        info!(
            target: "providers::completion",
            "chat done chars={} prompt_tokens={:?} completion_tokens={:?}",
            res.text.len(),
            res.prompt_tokens,
            res.completion_tokens
        );
        Ok(res)
    }
}

fn map_reqwest_err(e: reqwest::Error) -> ChatError {
    if e.is_timeout() {
        ChatError::Timeout(e.to_string())
    } else if e.is_request() || e.is_connect() {
        ChatError::Network(e.to_string())
    } else {
        ChatError::Other(e.to_string())
    }
}

fn map_status_err(status: StatusCode, body: Option<String>) -> ChatError {
    let s = format!("{} {}", status.as_u16(), body.unwrap_or_default());
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ChatError::Auth(s),
        StatusCode::TOO_MANY_REQUESTS => ChatError::RateLimit(s),
        StatusCode::INTERNAL_SERVER_ERROR
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => ChatError::Network(s),
        _ => ChatError::Other(s),
    }
}
