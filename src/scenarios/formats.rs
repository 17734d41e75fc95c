//! 多种文件格式的预签名直传
//!
//! 样本只带格式的魔数头，不是有效的媒体文件；关注的是上传链路与接口对
//! content_type/filename 的处理。所有细节写入制品，方便在报告里对照。

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::json;
use tracing::info;

use crate::contract::assertions::{assert_status, validate_body};
use crate::contract::schemas::PresignedUpload;
use crate::core::error::{HarnessError, Result, SkipReason};
use crate::core::model::endpoints;
use crate::engine::context::ScenarioContext;
use crate::interfaces::scenario::{Scenario, tags};
use crate::utils::{hex_prefix, truncate_chars};

use super::workflow;

/// 上传结果中 body 预览的字符上限
const UPLOAD_PREVIEW_CHARS: usize = 800;
/// 错误 body 预览的字符上限
const ERROR_PREVIEW_CHARS: usize = 800;
const HEX_PREFIX_BYTES: usize = 16;

const FORMAT_TAGS: &[&str] = &[tags::E2E, tags::UPLOAD];

pub struct UploadFormat {
    id: String,
    case: &'static str,
    filename: &'static str,
    content_type: &'static str,
    content: Bytes,
}

impl UploadFormat {
    pub fn new(case: &'static str, filename: &'static str, content_type: &'static str, content: Vec<u8>) -> Self {
        Self {
            id: format!("upload_format_{}", case),
            case,
            filename,
            content_type,
            content: Bytes::from(content),
        }
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    fn name(&self, suffix: &str) -> String {
        format!("{}_{}", self.case, suffix)
    }

    fn file_details(&self) -> serde_json::Value {
        json!({
            "filename": self.filename,
            "content_type": self.content_type,
            "bytes_len": self.content.len(),
            "first_bytes_hex": hex_prefix(&self.content, HEX_PREFIX_BYTES),
            "blake3": blake3::hash(&self.content).to_hex().to_string(),
        })
    }
}

/// 魔数头 + 零填充 + 尾部标记
fn padded(head: &[u8], zeros: usize, tail: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(head.len() + zeros + tail.len());
    out.extend_from_slice(head);
    out.resize(head.len() + zeros, 0);
    out.extend_from_slice(tail);
    out
}

/// 八种样本格式
pub fn samples() -> Vec<UploadFormat> {
    vec![
        UploadFormat::new(
            "video_mp4",
            "sample.mp4",
            "video/mp4",
            padded(b"\x00\x00\x00\x18ftypmp42", 64, b""),
        ),
        UploadFormat::new("audio_mp3", "sample.mp3", "audio/mpeg", padded(b"ID3", 64, b"")),
        UploadFormat::new(
            "audio_wav",
            "sample.wav",
            "audio/wav",
            padded(b"RIFF", 64, b"WAVE"),
        ),
        UploadFormat::new("random_pdf", "sample.pdf", "application/pdf", b"%PDF-1.7\n%EOF\n".to_vec()),
        UploadFormat::new(
            "random_zip",
            "sample.zip",
            "application/zip",
            padded(b"PK\x03\x04", 64, b""),
        ),
        UploadFormat::new(
            "random_bin",
            "sample.bin",
            "application/octet-stream",
            b"\xDE\xAD\xBE\xEF".repeat(16),
        ),
        UploadFormat::new("random_txt", "sample.txt", "text/plain", b"hello from jobprobe\n".to_vec()),
        UploadFormat::new(
            "random_exe",
            "sample.exe",
            "application/vnd.microsoft.portable-executable",
            padded(b"MZ", 64, b""),
        ),
    ]
}

#[async_trait]
impl Scenario for UploadFormat {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "按格式申请预签名并直传，记录被接受或被拒绝的细节"
    }

    fn tags(&self) -> &[&'static str] {
        FORMAT_TAGS
    }

    async fn run(&self, ctx: &mut ScenarioContext) -> Result<()> {
        // 1. 预签名
        let payload = json!({ "filename": self.filename, "content_type": self.content_type });
        ctx.artifacts.add_kv(self.name("presigned_request"), &payload);

        let resp = workflow::request_presigned(ctx, &payload).await?;
        ctx.artifacts.add_kv(
            self.name("presigned_response_meta"),
            &json!({ "status_code": resp.status(), "headers": resp.headers_map() }),
        );

        if matches!(resp.status(), 401 | 403) {
            let reason = SkipReason::AuthRequired {
                endpoint: endpoints::PRESIGNED.label(),
            };
            ctx.artifacts.add_text(self.name("skip_reason"), &reason);
            return Err(HarnessError::Inconclusive(reason));
        }

        // 接口按类型拒绝同样是有效信号
        if matches!(resp.status(), 400 | 422) {
            match resp.json() {
                Some(body) => ctx.artifacts.add_json(self.name("presigned_error_body"), body),
                None => ctx
                    .artifacts
                    .add_text(self.name("presigned_error_body"), resp.text_preview(ERROR_PREVIEW_CHARS)),
            }
            info!("[{}] 格式被拒绝: {}", self.case, resp.status());
            return Ok(());
        }

        let label = self.name("presigned");
        assert_status(&resp, endpoints::PRESIGNED.expected, &label, &mut ctx.artifacts)?;
        if let Some(body) = resp.json() {
            ctx.artifacts.add_json(self.name("presigned_response_body"), body);
        }
        let presigned = validate_body::<PresignedUpload>(&resp, &label, &mut ctx.artifacts)?;

        // 2. 解析结果与文件细节
        ctx.artifacts.add_kv(
            self.name("presigned_parsed"),
            &json!({
                "upload_url": presigned.upload_url,
                "method": presigned.method.to_uppercase(),
                "bucket": presigned.bucket,
                "key": presigned.key,
                "expires_in": presigned.expires_in,
            }),
        );
        ctx.artifacts.add_kv(self.name("file"), &self.file_details());

        // 3. 直传
        let uploaded = workflow::upload_raw(ctx, &presigned, self.content.clone(), self.content_type).await?;
        ctx.artifacts.add_kv(
            self.name("upload_result"),
            &json!({
                "status_code": uploaded.status(),
                "headers": uploaded.headers_map(),
                "body_preview": truncate_chars(&uploaded.text(), UPLOAD_PREVIEW_CHARS),
            }),
        );

        // 预签名已发放但上传失败，视为失败
        assert_status(&uploaded, endpoints::UPLOAD_OK, &self.name("upload"), &mut ctx.artifacts)
    }
}
