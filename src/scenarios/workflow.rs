//! 上传与任务处理流程的公共步骤：presign → upload → create-job → poll

use bytes::Bytes;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::contract::assertions::{assert_status, skip_if_auth_required, validate_body};
use crate::contract::schemas::{Contract, CreateJobResponse, JobStatusResponse, PresignedUpload};
use crate::core::error::{HarnessError, Result};
use crate::core::model::endpoints;
use crate::engine::context::ScenarioContext;
use crate::engine::poller::{PollOutcome, poll_until_terminal};
use crate::network::envelope::ResponseEnvelope;

/// 发起预签名请求，不做任何断言
pub async fn request_presigned(ctx: &ScenarioContext, payload: &Value) -> Result<ResponseEnvelope> {
    ctx.api.call(&endpoints::PRESIGNED, &[], Some(payload)).await
}

/// 获取预签名上传地址
///
/// 401/403 跳过；422 记录响应后失败 (请求体与 API schema 不符)。
pub async fn presign(ctx: &mut ScenarioContext, filename: &str, content_type: &str) -> Result<PresignedUpload> {
    let payload = json!({ "filename": filename, "content_type": content_type });
    let resp = request_presigned(ctx, &payload).await?;

    skip_if_auth_required(&resp, &endpoints::PRESIGNED.label(), &mut ctx.artifacts)?;

    if resp.status() == 422 {
        ctx.artifacts.add_from_response("presigned_422", &resp);
        return Err(HarnessError::invariant(
            "POST /uploads/presigned returned 422: payload does not match API schema",
        ));
    }

    assert_status(&resp, endpoints::PRESIGNED.expected, "presigned", &mut ctx.artifacts)?;
    validate_body::<PresignedUpload>(&resp, "presigned", &mut ctx.artifacts)
}

/// 通过预签名地址直传文件
///
/// 返回上传响应，由调用方决定如何断言。
pub async fn upload_raw(
    ctx: &mut ScenarioContext,
    presigned: &PresignedUpload,
    content: Bytes,
    content_type: &str,
) -> Result<ResponseEnvelope> {
    let method = match presigned.upload_method() {
        Ok(m) => m,
        Err(e) => {
            ctx.artifacts.add_text("upload_error", &e);
            return Err(e.into());
        }
    };

    debug!("上传 {} 字节: {} {}", content.len(), method, presigned.upload_url);
    ctx.uploader
        .send_bytes(method, &presigned.upload_url, content, content_type)
        .await
}

/// 直传并断言成功 (200/201/204)
pub async fn upload(
    ctx: &mut ScenarioContext,
    presigned: &PresignedUpload,
    content: Bytes,
    content_type: &str,
) -> Result<ResponseEnvelope> {
    let resp = upload_raw(ctx, presigned, content, content_type).await?;
    assert_status(&resp, endpoints::UPLOAD_OK, "upload_failed", &mut ctx.artifacts)?;
    Ok(resp)
}

/// 创建任务并返回任务标识
pub async fn create_job(ctx: &mut ScenarioContext, gcs_url: &str) -> Result<String> {
    let resp = ctx
        .api
        .call(&endpoints::CREATE_JOB, &[], Some(&json!({ "gcs_url": gcs_url })))
        .await?;

    skip_if_auth_required(&resp, &endpoints::CREATE_JOB.label(), &mut ctx.artifacts)?;
    assert_status(&resp, endpoints::CREATE_JOB.expected, "create_job", &mut ctx.artifacts)?;

    let job = validate_body::<CreateJobResponse>(&resp, "create_job", &mut ctx.artifacts)?;
    match job.resolved_id() {
        Ok(id) => {
            info!("任务已创建: {}", id);
            Ok(id.to_string())
        }
        Err(e) => {
            ctx.artifacts.add_from_response("create_job_missing_id", &resp);
            Err(e.into())
        }
    }
}

/// 单次状态观测
#[derive(Debug, Clone)]
pub struct StatusObservation {
    pub envelope: ResponseEnvelope,
    /// 仅当 200 且 body 符合契约时存在
    pub status: Option<JobStatusResponse>,
}

impl StatusObservation {
    fn from_envelope(envelope: ResponseEnvelope) -> Self {
        let status = if envelope.status() == 200 {
            envelope
                .require_json("job_status")
                .ok()
                .and_then(|body| JobStatusResponse::parse(&body).ok())
        } else {
            None
        };
        Self { envelope, status }
    }

    /// 终态，或已无继续轮询的意义 (状态码异常/结构不符)
    fn should_stop(&self) -> bool {
        self.status.as_ref().is_none_or(JobStatusResponse::is_terminal)
    }
}

/// 获取一次任务状态 (含断言)
pub async fn fetch_job_status(ctx: &mut ScenarioContext, job_id: &str) -> Result<JobStatusResponse> {
    let resp = ctx.api.call(&endpoints::JOB_STATUS, &[("id", job_id)], None).await?;
    skip_if_auth_required(&resp, &endpoints::JOB_STATUS.label(), &mut ctx.artifacts)?;
    assert_status(&resp, endpoints::JOB_STATUS.expected, "job_status", &mut ctx.artifacts)?;
    validate_body::<JobStatusResponse>(&resp, "job_status", &mut ctx.artifacts)
}

/// 轮询任务状态直到终态或超时
///
/// 轮询中途 401/403 视为无法判定；状态码异常或结构不符立即停止并按契约违规处理。
pub async fn wait_for_job(ctx: &mut ScenarioContext, job_id: &str) -> Result<PollOutcome<JobStatusResponse>> {
    let path = endpoints::JOB_STATUS.render(&[("id", job_id)]);
    let endpoint = endpoints::JOB_STATUS.label();
    let api = ctx.api.clone();
    let events = ctx.events.clone();
    let mut attempt = 0usize;

    let outcome = poll_until_terminal(
        || {
            attempt += 1;
            let api = api.clone();
            let path = path.clone();
            let endpoint = endpoint.clone();
            let events = events.clone();
            let job_id = job_id.to_string();
            let attempt = attempt;
            async move {
                let resp = api.get(&path).await?;
                if matches!(resp.status(), 401 | 403) {
                    return Err(HarnessError::auth_required(endpoint));
                }
                let obs = StatusObservation::from_envelope(resp);
                if let Some(events) = &events {
                    let status = obs.status.as_ref().and_then(|s| s.status.as_deref());
                    events.poll_progress(&job_id, attempt, status);
                }
                Ok(obs)
            }
        },
        StatusObservation::should_stop,
        ctx.poll_settings(),
    )
    .await;

    let outcome = match outcome {
        Ok(o) => o,
        Err(e) => {
            if let Some(reason) = e.skip_reason() {
                ctx.artifacts.add_text("skip_reason", reason);
            }
            return Err(e);
        }
    };

    // 停止原因可能是异常响应，此处补做断言以记录制品
    let last = match outcome {
        PollOutcome::Terminal(obs) => PollOutcome::Terminal(checked_status(ctx, &obs)?),
        PollOutcome::Pending(obs) => PollOutcome::Pending(checked_status(ctx, &obs)?),
        PollOutcome::NoObservation => PollOutcome::NoObservation,
    };

    ctx.artifacts.add_json(
        "job_poll_result",
        &json!({
            "job_id": job_id,
            "terminal": last.is_terminal(),
            "last": last.last(),
        }),
    );
    Ok(last)
}

fn checked_status(ctx: &mut ScenarioContext, obs: &StatusObservation) -> Result<JobStatusResponse> {
    assert_status(&obs.envelope, endpoints::JOB_STATUS.expected, "job_status", &mut ctx.artifacts)?;
    match &obs.status {
        Some(s) => Ok(s.clone()),
        None => validate_body::<JobStatusResponse>(&obs.envelope, "job_status", &mut ctx.artifacts),
    }
}

/// 最小合法 JPEG
pub fn dummy_jpeg() -> Bytes {
    Bytes::from_static(b"\xFF\xD8\xFF\xD9")
}
