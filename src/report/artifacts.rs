//! 制品记录器 (Artifact Recorder)
//!
//! 单个场景执行期间按名称累积 JSON / 文本记录，场景结束后由 Runner 一次性刷入报告。
//! 记录操作永不失败：无法序列化的数据退化为字符串表示。

use std::fmt;

use serde::Serialize;
use serde_json::{Value, json};
use strum::Display;

use crate::network::envelope::ResponseEnvelope;

/// 响应 body 文本预览上限 (字符)
pub const BODY_PREVIEW_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ArtifactKind {
    Json,
    Text,
}

impl ArtifactKind {
    pub fn extension(&self) -> &'static str {
        match self {
            ArtifactKind::Json => "json",
            ArtifactKind::Text => "txt",
        }
    }
}

/// 单条制品记录，加入后不可变
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub name: String,
    pub payload: Value,
}

impl Artifact {
    /// 写入报告时的文本内容
    pub fn render(&self) -> String {
        match (&self.kind, &self.payload) {
            (ArtifactKind::Text, Value::String(s)) => s.clone(),
            (ArtifactKind::Text, other) => other.to_string(),
            (ArtifactKind::Json, v) => serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string()),
        }
    }
}

/// 仅追加的有序记录器，允许重名
#[derive(Debug, Default)]
pub struct ArtifactRecorder {
    records: Vec<Artifact>,
}

impl ArtifactRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, kind: ArtifactKind, name: impl Into<String>, payload: Value) {
        let payload = match (kind, payload) {
            (ArtifactKind::Text, Value::String(s)) => Value::String(s),
            (ArtifactKind::Text, other) => Value::String(other.to_string()),
            (ArtifactKind::Json, v) => v,
        };
        self.records.push(Artifact {
            kind,
            name: name.into(),
            payload,
        });
    }

    /// 记录任意可序列化数据，失败时退化为 `{"repr": "..."}`
    pub fn add_json<T>(&mut self, name: impl Into<String>, data: &T)
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        self.add(ArtifactKind::Json, name, safe_json(data));
    }

    pub fn add_text(&mut self, name: impl Into<String>, text: impl fmt::Display) {
        self.add(ArtifactKind::Text, name, Value::String(text.to_string()));
    }

    /// 键值对记录，与 `add_json` 相同
    pub fn add_kv<T>(&mut self, name: impl Into<String>, data: &T)
    where
        T: Serialize + fmt::Debug + ?Sized,
    {
        self.add_json(name, data);
    }

    /// 记录一次 HTTP 调用：`{name}_meta` 与 `{name}_body`
    pub fn add_from_response(&mut self, name: &str, envelope: &ResponseEnvelope) {
        self.add(
            ArtifactKind::Json,
            format!("{}_meta", name),
            json!({
                "method": envelope.method().as_str(),
                "url": envelope.url(),
                "status_code": envelope.status(),
                "headers": envelope.headers_map(),
            }),
        );

        let parsed = envelope
            .json()
            .cloned()
            .or_else(|| serde_json::from_slice::<Value>(envelope.body()).ok());

        match parsed {
            Some(body) => self.add(ArtifactKind::Json, format!("{}_body", name), body),
            None => self.add_text(format!("{}_body", name), envelope.text_preview(BODY_PREVIEW_CHARS)),
        }
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 交出全部记录，记录器随之消耗 (保证只刷新一次)
    pub fn into_artifacts(self) -> Vec<Artifact> {
        self.records
    }
}

fn safe_json<T>(data: &T) -> Value
where
    T: Serialize + fmt::Debug + ?Sized,
{
    serde_json::to_value(data).unwrap_or_else(|_| json!({ "repr": format!("{:?}", data) }))
}
