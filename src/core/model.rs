//! 领域模型：接口描述符与任务状态

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// 单个路径段中需要转义的字符
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// 套件使用的 HTTP 动词
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl From<HttpMethod> for reqwest::Method {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
        }
    }
}

/// 接口描述符：方法 + 路径模板 + 期望的成功状态码
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub method: HttpMethod,
    pub path: &'static str,
    pub expected: &'static [u16],
}

impl EndpointDescriptor {
    pub const fn new(method: HttpMethod, path: &'static str, expected: &'static [u16]) -> Self {
        Self {
            method,
            path,
            expected,
        }
    }

    /// 渲染路径模板，`{name}` 占位符的值按单个路径段转义
    pub fn render(&self, params: &[(&str, &str)]) -> String {
        params.iter().fold(self.path.to_string(), |path, (name, value)| {
            let encoded = utf8_percent_encode(value, PATH_SEGMENT).to_string();
            path.replace(&format!("{{{}}}", name), &encoded)
        })
    }

    /// 日志/报告用标签，例如 `POST /jobs`
    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

pub mod endpoints {
    use super::{EndpointDescriptor, HttpMethod};

    pub const HEALTH: EndpointDescriptor = EndpointDescriptor::new(HttpMethod::Get, "/health", &[200]);
    pub const READY: EndpointDescriptor = EndpointDescriptor::new(HttpMethod::Get, "/ready", &[200, 503]);
    pub const PRESIGNED: EndpointDescriptor =
        EndpointDescriptor::new(HttpMethod::Post, "/uploads/presigned", &[200, 201]);
    pub const CREATE_JOB: EndpointDescriptor = EndpointDescriptor::new(HttpMethod::Post, "/jobs", &[200, 201]);
    pub const JOB_STATUS: EndpointDescriptor =
        EndpointDescriptor::new(HttpMethod::Get, "/jobs/{id}/status", &[200]);
    pub const OPENAPI: EndpointDescriptor = EndpointDescriptor::new(HttpMethod::Get, "/openapi.json", &[200]);
    pub const DOCS: EndpointDescriptor = EndpointDescriptor::new(HttpMethod::Get, "/docs", &[200]);

    /// 直传存储成功状态码
    pub const UPLOAD_OK: &[u16] = &[200, 201, 204];
}

/// 终态标记 (大小写不敏感)
pub const TERMINAL_STATUSES: &[&str] = &["done", "completed", "finished", "success", "failed", "error"];

/// 成功终态标记
pub const SUCCESS_STATUSES: &[&str] = &["done", "completed", "finished", "success"];

pub fn is_terminal_status(status: &str) -> bool {
    let status = status.trim();
    TERMINAL_STATUSES.iter().any(|t| t.eq_ignore_ascii_case(status))
}

pub fn is_success_status(status: &str) -> bool {
    let status = status.trim();
    SUCCESS_STATUSES.iter().any(|t| t.eq_ignore_ascii_case(status))
}

/// 由存储桶与对象键拼出 `gs://bucket/key`
pub fn gcs_url(bucket: &str, key: &str) -> String {
    format!("gs://{}/{}", bucket, key)
}
