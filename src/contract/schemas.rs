//! 被测接口的响应契约
//!
//! 字段默认可选，仅在接口契约保证存在时才声明为必填。

use serde::Serialize;
use serde_json::{Map, Value};

use crate::contract::validator::{FieldKind, Schema, ValidatedInstance};
use crate::core::error::{ContractViolation, SchemaValidationError};
use crate::core::model::{self, HttpMethod};

/// 类型化的响应投影
pub trait Contract: Sized {
    fn schema() -> Schema;

    fn from_instance(instance: ValidatedInstance) -> Self;

    fn parse(body: &Value) -> Result<Self, SchemaValidationError> {
        let instance = Self::schema().validate(body)?;
        Ok(Self::from_instance(instance))
    }
}

/// `GET /health`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthResponse {
    pub status: Option<String>,
    pub ok: Option<bool>,
    pub detail: Option<Value>,
}

impl Contract for HealthResponse {
    fn schema() -> Schema {
        Schema::new("HealthResponse")
            .optional("status", FieldKind::String)
            .optional("ok", FieldKind::Bool)
            .optional("detail", FieldKind::Any)
    }

    fn from_instance(v: ValidatedInstance) -> Self {
        Self {
            status: v.string("status"),
            ok: v.bool("ok"),
            detail: v.get("detail").cloned(),
        }
    }
}

/// `GET /ready`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReadyResponse {
    pub status: Option<String>,
    pub ok: Option<bool>,
}

impl Contract for ReadyResponse {
    fn schema() -> Schema {
        Schema::new("ReadyResponse")
            .optional("status", FieldKind::String)
            .optional("ok", FieldKind::Bool)
    }

    fn from_instance(v: ValidatedInstance) -> Self {
        Self {
            status: v.string("status"),
            ok: v.bool("ok"),
        }
    }
}

/// `POST /uploads/presigned` 成功响应
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PresignedUpload {
    pub bucket: String,
    pub key: String,
    pub upload_url: String,
    pub method: String,
    pub expires_in: i64,
}

impl Contract for PresignedUpload {
    fn schema() -> Schema {
        Schema::new("PresignedUpload")
            .required("bucket", FieldKind::String)
            .required("key", FieldKind::String)
            .required("upload_url", FieldKind::AbsoluteUrl)
            .required("method", FieldKind::String)
            .required("expires_in", FieldKind::Integer { min: Some(1) })
    }

    fn from_instance(v: ValidatedInstance) -> Self {
        Self {
            bucket: v.string("bucket").unwrap_or_default(),
            key: v.string("key").unwrap_or_default(),
            upload_url: v.string("upload_url").unwrap_or_default(),
            method: v.string("method").unwrap_or_default(),
            expires_in: v.i64("expires_in").unwrap_or_default(),
        }
    }
}

impl PresignedUpload {
    /// 上传方法，大小写不敏感，仅接受 PUT / POST
    pub fn upload_method(&self) -> Result<HttpMethod, ContractViolation> {
        match self.method.trim().parse::<HttpMethod>() {
            Ok(m @ (HttpMethod::Put | HttpMethod::Post)) => Ok(m),
            _ => Err(ContractViolation::UnsupportedMethod(self.method.to_uppercase())),
        }
    }

    /// `gs://bucket/key`
    pub fn gcs_url(&self) -> String {
        model::gcs_url(&self.bucket, &self.key)
    }
}

/// 对象键不得包含 `..` 或以 `/` 开头
pub fn is_sanitized_key(key: &str) -> bool {
    !key.contains("..") && !key.starts_with('/')
}

/// `POST /jobs` 成功响应
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CreateJobResponse {
    pub job_id: Option<String>,
    pub id: Option<String>,
}

impl Contract for CreateJobResponse {
    fn schema() -> Schema {
        Schema::new("CreateJobResponse")
            .optional("job_id", FieldKind::String)
            .optional("id", FieldKind::String)
    }

    fn from_instance(v: ValidatedInstance) -> Self {
        Self {
            job_id: v.string("job_id"),
            id: v.string("id"),
        }
    }
}

impl CreateJobResponse {
    /// 首个非空的任务标识
    pub fn resolved_id(&self) -> Result<&str, SchemaValidationError> {
        [self.job_id.as_deref(), self.id.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.trim().is_empty())
            .ok_or_else(|| SchemaValidationError::MissingField {
                aliases: vec!["job_id".into(), "id".into()],
            })
    }
}

/// `GET /jobs/{id}/status`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct JobStatusResponse {
    /// 来自 `status` 或 `state`
    pub status: Option<String>,
    pub result: Option<Map<String, Value>>,
    pub error: Option<Value>,
}

impl Contract for JobStatusResponse {
    fn schema() -> Schema {
        Schema::new("JobStatusResponse")
            .group("status", &["status", "state"], FieldKind::String, false)
            .optional("result", FieldKind::Object)
            .optional("error", FieldKind::Any)
    }

    fn from_instance(v: ValidatedInstance) -> Self {
        Self {
            status: v.string("status"),
            result: v.get("result").and_then(Value::as_object).cloned(),
            error: v.get("error").cloned(),
        }
    }
}

impl JobStatusResponse {
    /// 小写化的状态，缺失时为空串
    pub fn normalized_status(&self) -> String {
        self.status.as_deref().unwrap_or_default().trim().to_lowercase()
    }

    pub fn is_terminal(&self) -> bool {
        model::is_terminal_status(&self.normalized_status())
    }

    pub fn is_success(&self) -> bool {
        model::is_success_status(&self.normalized_status())
    }
}

/// `GET /openapi.json`，只要求存在顶层 `paths`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OpenApiDocument {
    pub paths: Map<String, Value>,
    pub title: Option<String>,
}

impl Contract for OpenApiDocument {
    fn schema() -> Schema {
        Schema::new("OpenApiDocument")
            .required("paths", FieldKind::Object)
            .optional("info", FieldKind::Object)
    }

    fn from_instance(v: ValidatedInstance) -> Self {
        Self {
            paths: v.get("paths").and_then(Value::as_object).cloned().unwrap_or_default(),
            title: v
                .get("info")
                .and_then(|i| i.get("title"))
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

/// 422 响应的 `detail` 是否提到指定字段
pub fn detail_mentions(body: &Value, field: &str) -> bool {
    match body.get("detail") {
        Some(Value::Array(items)) => items.iter().any(|item| item.to_string().contains(field)),
        Some(Value::String(s)) => s.contains(field),
        Some(other) => other.to_string().contains(field),
        None => false,
    }
}
