use bytes::Bytes;
use reqwest::header::HeaderMap;
use serde_json::Value;

use crate::core::config::{ApiConfig, UploadConfig, normalize_base_url};
use crate::core::error::Result;
use crate::core::model::{EndpointDescriptor, HttpMethod};
use crate::network::envelope::ResponseEnvelope;
use crate::network::service::{ClientSettings, HttpService, RequestBody};

/// 面向被测 API 的 HTTP 客户端封装
///
/// 相对路径基于 `base_url` 解析，绝对 URL (如预签名上传地址) 原样使用。
#[derive(Clone)]
pub struct ApiClient {
    base_url: Option<String>,
    http: HttpService,
}

impl ApiClient {
    /// 构造 API 客户端，非法的基准 URL 在任何网络调用之前失败
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let base_url = normalize_base_url(&api.base_url)?;
        let settings = ClientSettings::new(api.timeout())
            .accept_json()
            .bearer(api.bearer_token());

        Ok(Self {
            base_url: Some(base_url),
            http: HttpService::new(&settings)?,
        })
    }

    /// 构造直传存储客户端：无基准 URL，不携带鉴权头
    pub fn uploader(upload: &UploadConfig) -> Result<Self> {
        Ok(Self {
            base_url: None,
            http: HttpService::new(&ClientSettings::new(upload.timeout()))?,
        })
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    /// 解析请求目标
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }

        match &self.base_url {
            Some(base) if path.starts_with('/') => format!("{}{}", base, path),
            Some(base) => format!("{}/{}", base, path),
            None => path.to_string(),
        }
    }

    /// 通用请求入口
    pub async fn request(
        &self,
        method: HttpMethod,
        path: &str,
        json: Option<&Value>,
        headers: Option<&HeaderMap>,
    ) -> Result<ResponseEnvelope> {
        let url = self.resolve(path);
        let body = json.cloned().map(RequestBody::Json);
        self.http.execute(method.into(), &url, body, headers).await
    }

    pub async fn get(&self, path: &str) -> Result<ResponseEnvelope> {
        self.request(HttpMethod::Get, path, None, None).await
    }

    pub async fn post_json(&self, path: &str, body: &Value) -> Result<ResponseEnvelope> {
        self.request(HttpMethod::Post, path, Some(body), None).await
    }

    /// 按接口描述符发起请求
    pub async fn call(
        &self,
        endpoint: &EndpointDescriptor,
        params: &[(&str, &str)],
        json: Option<&Value>,
    ) -> Result<ResponseEnvelope> {
        let path = endpoint.render(params);
        self.request(endpoint.method, &path, json, None).await
    }

    /// 发送原始字节 (预签名上传)
    pub async fn send_bytes(
        &self,
        method: HttpMethod,
        url: &str,
        content: Bytes,
        content_type: &str,
    ) -> Result<ResponseEnvelope> {
        let url = self.resolve(url);
        let body = RequestBody::Raw {
            bytes: content,
            content_type: content_type.to_string(),
        };
        self.http.execute(method.into(), &url, Some(body), None).await
    }
}
