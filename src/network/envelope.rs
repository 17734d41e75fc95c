//! 响应信封 (Response Envelope)
//!
//! 一次 HTTP 调用的只读快照：状态码、头部、原始字节以及可选的 JSON 解析结果。

use std::borrow::Cow;

use bytes::Bytes;
use indexmap::IndexMap;
use reqwest::Method;
use reqwest::header::{CONTENT_TYPE, HeaderMap};
use serde_json::Value;

use crate::core::error::{ContractViolation, Result};
use crate::utils::truncate_chars;

#[derive(Debug, Clone)]
pub struct ResponseEnvelope {
    method: Method,
    url: String,
    status: u16,
    headers: HeaderMap,
    body: Bytes,
    json: Option<Value>,
}

impl ResponseEnvelope {
    /// 由已读取的响应各部分构造，JSON 内容类型时尝试解析 body
    pub fn new(method: Method, url: impl Into<String>, status: u16, headers: HeaderMap, body: Bytes) -> Self {
        let json = if is_json_content_type(&headers) {
            serde_json::from_slice(&body).ok()
        } else {
            None
        };

        Self {
            method,
            url: url.into(),
            status,
            headers,
            body,
            json,
        }
    }

    /// 读取完整响应体并构造信封
    pub async fn read(method: Method, resp: reqwest::Response) -> Result<Self> {
        let url = resp.url().to_string();
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp.bytes().await?;
        Ok(Self::new(method, url, status, headers, body))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// 大小写不敏感的头部读取，非 ASCII 值视为缺失
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.contains_key(name)
    }

    pub fn content_type(&self) -> &str {
        self.header(CONTENT_TYPE.as_str()).unwrap_or_default()
    }

    pub fn is_json_content(&self) -> bool {
        is_json_content_type(&self.headers)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// 已解析的 JSON (仅当内容类型为 JSON 且解析成功)
    pub fn json(&self) -> Option<&Value> {
        self.json.as_ref()
    }

    /// 要求 body 为 JSON，否则视为契约违规
    ///
    /// 内容类型缺失但 body 本身是合法 JSON 时同样接受。
    pub fn require_json(&self, label: &str) -> Result<Value> {
        if let Some(v) = &self.json {
            return Ok(v.clone());
        }
        serde_json::from_slice(&self.body).map_err(|_| {
            ContractViolation::MalformedBody {
                label: label.to_string(),
            }
            .into()
        })
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// 前 `max_chars` 个字符的文本预览
    pub fn text_preview(&self, max_chars: usize) -> String {
        truncate_chars(&self.text(), max_chars)
    }

    /// 头部的有序字符串映射 (用于报告)
    pub fn headers_map(&self) -> IndexMap<String, String> {
        let mut map = IndexMap::new();
        for (name, value) in &self.headers {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            map.entry(name.as_str().to_string())
                .and_modify(|existing: &mut String| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }
        map
    }

    pub fn is_status(&self, codes: &[u16]) -> bool {
        codes.contains(&self.status)
    }
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.to_ascii_lowercase().contains("json"))
        .unwrap_or(false)
}
