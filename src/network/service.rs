use std::time::Duration;

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use tracing::debug;

use crate::core::error::{HarnessError, Result};
use crate::network::envelope::ResponseEnvelope;
use crate::network::middleware::TraceMiddleware;

/// 最大重定向跟随次数
const MAX_REDIRECTS: usize = 10;

/// 传输层构建参数
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub timeout: Duration,
    /// 是否附带 `Accept: application/json`
    pub accept_json: bool,
    pub bearer_token: Option<String>,
}

impl ClientSettings {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            accept_json: false,
            bearer_token: None,
        }
    }

    pub fn accept_json(mut self) -> Self {
        self.accept_json = true;
        self
    }

    pub fn bearer(mut self, token: Option<&str>) -> Self {
        self.bearer_token = token.map(str::to_string);
        self
    }

    fn default_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if self.accept_json {
            headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        }
        if let Some(token) = &self.bearer_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| HarnessError::Config(format!("API_TOKEN is not a valid header value: {}", e)))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }
}

/// 请求体
#[derive(Debug, Clone)]
pub enum RequestBody {
    Json(serde_json::Value),
    Raw { bytes: Bytes, content_type: String },
}

/// HTTP 传输服务
///
/// 每个实例持有独立的连接池，实例释放时连接随之关闭。
#[derive(Clone)]
pub struct HttpService {
    client: ClientWithMiddleware,
}

impl HttpService {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .default_headers(settings.default_headers()?)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(settings.timeout)
            .build()?;

        let client = ClientBuilder::new(client).with(TraceMiddleware).build();
        Ok(Self { client })
    }

    /// 执行单次请求，无重试
    ///
    /// 4xx/5xx 作为普通信封返回，只有传输失败才返回错误。
    pub async fn execute(
        &self,
        method: Method,
        url: &str,
        body: Option<RequestBody>,
        headers: Option<&HeaderMap>,
    ) -> Result<ResponseEnvelope> {
        let mut rb = self.client.request(method.clone(), url);

        // 调用方显式给出的 Content-Type 优先
        let explicit_ct = headers.is_some_and(|h| h.contains_key(CONTENT_TYPE));
        if let Some(extra) = headers {
            rb = rb.headers(extra.clone());
        }

        rb = match body {
            Some(RequestBody::Json(value)) => {
                let rb = if explicit_ct { rb } else { rb.header(CONTENT_TYPE, "application/json") };
                rb.body(serde_json::to_vec(&value)?)
            }
            Some(RequestBody::Raw { bytes, content_type }) => {
                let rb = if explicit_ct { rb } else { rb.header(CONTENT_TYPE, content_type) };
                rb.body(bytes)
            }
            None => rb,
        };

        let resp = rb.send().await?;
        let envelope = ResponseEnvelope::read(method, resp).await?;
        debug!("{} {} -> {} ({} bytes)", envelope.method(), envelope.url(), envelope.status(), envelope.body().len());
        Ok(envelope)
    }
}
