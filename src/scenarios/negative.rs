//! 负向用例：非法输入必须被拒绝，或被安全地处理
//!
//! 401/403 在未配置令牌的环境下同样视为预期拒绝。

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::contract::assertions::{assert_status, ensure, is_auth_rejection, validate_body};
use crate::contract::schemas::{self, CreateJobResponse, JobStatusResponse};
use crate::core::error::Result;
use crate::core::model::{EndpointDescriptor, endpoints};
use crate::engine::context::ScenarioContext;
use crate::interfaces::scenario::{Scenario, tags};

use super::workflow;

const NEGATIVE_TAGS: &[&str] = &[tags::NEGATIVE];

/// 只断言状态码的拒绝探测
pub struct RejectionProbe {
    id: &'static str,
    description: &'static str,
    endpoint: EndpointDescriptor,
    params: &'static [(&'static str, &'static str)],
    payload: Option<Value>,
    accepted: &'static [u16],
    /// 422 JSON 响应的 `detail` 必须提到该字段
    detail_field: Option<&'static str>,
}

impl RejectionProbe {
    pub fn new(id: &'static str, description: &'static str, endpoint: EndpointDescriptor) -> Self {
        Self {
            id,
            description,
            endpoint,
            params: &[],
            payload: None,
            accepted: &[400, 401, 403, 422],
            detail_field: None,
        }
    }

    pub fn params(mut self, params: &'static [(&'static str, &'static str)]) -> Self {
        self.params = params;
        self
    }

    pub fn payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn accepted(mut self, codes: &'static [u16]) -> Self {
        self.accepted = codes;
        self
    }

    pub fn detail_mentions(mut self, field: &'static str) -> Self {
        self.detail_field = Some(field);
        self
    }

    pub fn missing_filename() -> Self {
        Self::new(
            "neg_presigned_missing_filename",
            "缺少 filename 的预签名请求被拒绝",
            endpoints::PRESIGNED,
        )
        .payload(json!({ "content_type": "image/jpeg" }))
    }

    pub fn bad_content_type() -> Self {
        Self::new(
            "neg_presigned_bad_content_type",
            "非法 content_type 被拒绝或被容忍",
            endpoints::PRESIGNED,
        )
        .payload(json!({ "filename": "x.jpg", "content_type": "nope/not-a-type" }))
        .accepted(&[200, 201, 400, 401, 403, 422])
    }

    pub fn jobs_missing_gcs_url() -> Self {
        Self::new("neg_jobs_missing_gcs_url", "POST /jobs 必须提供 gcs_url", endpoints::CREATE_JOB)
            .payload(json!({}))
            .accepted(&[401, 403, 422])
            .detail_mentions("gcs_url")
    }

    pub fn jobs_gcs_url_wrong_type() -> Self {
        Self::new(
            "neg_jobs_gcs_url_wrong_type",
            "gcs_url 必须是字符串",
            endpoints::CREATE_JOB,
        )
        .payload(json!({ "gcs_url": 123 }))
    }

    pub fn unknown_job_status() -> Self {
        Self::new(
            "neg_status_unknown_job",
            "不存在的任务不应返回 200",
            endpoints::JOB_STATUS,
        )
        .params(&[("id", "this-job-does-not-exist")])
        .accepted(&[400, 401, 403, 404, 422])
    }
}

#[async_trait]
impl Scenario for RejectionProbe {
    fn id(&self) -> &str {
        self.id
    }

    fn description(&self) -> &str {
        self.description
    }

    fn tags(&self) -> &[&'static str] {
        NEGATIVE_TAGS
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let resp = ctx
            .api
            .call(&self.endpoint, self.params, self.payload.as_ref())
            .await?;
        assert_status(&resp, self.accepted, self.id, &mut ctx.artifacts)?;
        debug!("[{}] 收到 {}", self.id, resp.status());

        if let Some(field) = self.detail_field
            && resp.status() == 422
            && resp.is_json_content()
        {
            let body = resp.require_json(self.id)?;
            let mentioned = schemas::detail_mentions(&body, field);
            if !mentioned {
                ctx.artifacts.add_from_response(self.id, &resp);
            }
            ensure(
                mentioned,
                format!("422 detail does not mention `{}`", field),
                &mut ctx.artifacts,
            )?;
        }
        Ok(())
    }
}

/// 空文件名：若被接受，返回的预签名信息必须可用
pub struct PresignedEmptyFilename;

#[async_trait]
impl Scenario for PresignedEmptyFilename {
    fn id(&self) -> &str {
        "neg_presigned_empty_filename"
    }

    fn description(&self) -> &str {
        "空 filename 被拒绝，或返回非空的 upload_url/key/bucket"
    }

    fn tags(&self) -> &[&'static str] {
        NEGATIVE_TAGS
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let payload = json!({ "filename": "", "content_type": "image/jpeg" });
        let resp = workflow::request_presigned(ctx, &payload).await?;
        if is_auth_rejection(&resp) {
            return Ok(());
        }

        if !resp.is_status(endpoints::PRESIGNED.expected) {
            return assert_status(&resp, &[400, 422], self.id(), &mut ctx.artifacts);
        }

        ctx.artifacts.add_from_response("presigned", &resp);
        let body = resp.require_json("presigned")?;
        for field in ["upload_url", "key", "bucket"] {
            ensure(
                !non_blank(&body, field).is_empty(),
                format!("`{}` must not be empty even if filename is empty", field),
                &mut ctx.artifacts,
            )?;
        }
        Ok(())
    }
}

/// 路径穿越文件名：拒绝，或返回清洗过的 key
pub struct PresignedPathTraversal;

#[async_trait]
impl Scenario for PresignedPathTraversal {
    fn id(&self) -> &str {
        "neg_presigned_path_traversal"
    }

    fn description(&self) -> &str {
        "../ 文件名被拒绝，或 key 不含 .. 且不以 / 开头"
    }

    fn tags(&self) -> &[&'static str] {
        NEGATIVE_TAGS
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let payload = json!({ "filename": "../evil.jpg", "content_type": "image/jpeg" });
        let resp = workflow::request_presigned(ctx, &payload).await?;
        if is_auth_rejection(&resp) {
            return Ok(());
        }

        if !resp.is_status(endpoints::PRESIGNED.expected) {
            return assert_status(&resp, &[400, 422], self.id(), &mut ctx.artifacts);
        }

        let body = resp.require_json("presigned")?;
        let key = body.get("key").map(value_text).unwrap_or_default();
        info!("路径穿越文件名被接受，key = {:?}", key);
        ctx.artifacts.add_kv("returned_key", &json!({ "key": key }));
        ensure(
            schemas::is_sanitized_key(&key),
            format!("Unsanitized key returned: {}", key),
            &mut ctx.artifacts,
        )
    }
}

/// 空 gcs_url：若被接受，任务不能立即报告成功
pub struct JobsEmptyGcsUrl;

#[async_trait]
impl Scenario for JobsEmptyGcsUrl {
    fn id(&self) -> &str {
        "neg_jobs_empty_gcs_url"
    }

    fn description(&self) -> &str {
        "空 gcs_url 被拒绝，或创建的任务不会立即成功"
    }

    fn tags(&self) -> &[&'static str] {
        NEGATIVE_TAGS
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let resp = ctx
            .api
            .call(&endpoints::CREATE_JOB, &[], Some(&json!({ "gcs_url": "" })))
            .await?;
        if is_auth_rejection(&resp) {
            return Ok(());
        }

        if !resp.is_status(endpoints::CREATE_JOB.expected) {
            return assert_status(&resp, &[400, 422], self.id(), &mut ctx.artifacts);
        }

        let job = validate_body::<CreateJobResponse>(&resp, "create_job", &mut ctx.artifacts)?;
        let job_id = match job.resolved_id() {
            Ok(id) => id.to_string(),
            Err(e) => {
                ctx.artifacts.add_from_response("create_job_missing_id", &resp);
                return Err(e.into());
            }
        };

        let status = ctx
            .api
            .call(&endpoints::JOB_STATUS, &[("id", job_id.as_str())], None)
            .await?;
        if is_auth_rejection(&status) {
            return Ok(());
        }
        assert_status(&status, endpoints::JOB_STATUS.expected, "job_status", &mut ctx.artifacts)?;
        let observed = validate_body::<JobStatusResponse>(&status, "job_status", &mut ctx.artifacts)?;

        ensure(
            !observed.is_success(),
            format!(
                "Empty gcs_url produced successful status: {}",
                observed.normalized_status()
            ),
            &mut ctx.artifacts,
        )
    }
}

/// 字段的文本形式，缺失或 null 时为空串
fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn non_blank(body: &Value, field: &str) -> String {
    body.get(field).map(value_text).unwrap_or_default().trim().to_string()
}
