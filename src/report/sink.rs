//! 报告输出端 (Report Sinks)
//!
//! 每个场景结束时接收一次该场景的全部制品。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::core::error::Result;
use crate::report::artifacts::Artifact;
use crate::report::summary::SuiteReport;

/// 场景结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "lowercase")]
pub enum Outcome {
    Passed,
    Failed(String),
    Skipped(String),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "PASSED",
            Outcome::Failed(_) => "FAILED",
            Outcome::Skipped(_) => "SKIPPED",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }
}

/// 报告输出端接口
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// 附加单个场景的结果与制品，每个场景只调用一次
    async fn attach(&self, scenario: &str, outcome: &Outcome, artifacts: Vec<Artifact>) -> Result<()>;

    /// 套件结束
    async fn finalize(&self, _report: &SuiteReport) -> Result<()> {
        Ok(())
    }
}

/// 丢弃一切
#[derive(Debug, Default)]
pub struct NullSink;

#[async_trait]
impl ReportSink for NullSink {
    async fn attach(&self, _scenario: &str, _outcome: &Outcome, _artifacts: Vec<Artifact>) -> Result<()> {
        Ok(())
    }
}

/// 文件系统输出端
///
/// 目录结构：`<root>/<scenario>/NN_<name>.json|txt`，外加 `outcome.json` 与顶层 `summary.json`。
#[derive(Debug, Clone)]
pub struct FileReportSink {
    root: PathBuf,
}

impl FileReportSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn scenario_dir(&self, scenario: &str) -> PathBuf {
        self.root.join(sanitize_file_name(scenario))
    }
}

#[async_trait]
impl ReportSink for FileReportSink {
    async fn attach(&self, scenario: &str, outcome: &Outcome, artifacts: Vec<Artifact>) -> Result<()> {
        let dir = self.scenario_dir(scenario);
        // 清掉上一次运行留下的制品
        match tokio::fs::remove_dir_all(&dir).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => return Err(e.into()),
            _ => {}
        }
        tokio::fs::create_dir_all(&dir).await?;

        // 序号前缀保证顺序，并让重名记录各自成文件
        for (i, artifact) in artifacts.iter().enumerate() {
            let file = format!(
                "{:02}_{}.{}",
                i + 1,
                sanitize_file_name(&artifact.name),
                artifact.kind.extension()
            );
            tokio::fs::write(dir.join(file), artifact.render()).await?;
        }

        let meta = json!({
            "scenario": scenario,
            "result": outcome,
            "artifacts": artifacts.len(),
        });
        tokio::fs::write(dir.join("outcome.json"), serde_json::to_vec_pretty(&meta)?).await?;
        debug!("已写入 {} 条制品: {}", artifacts.len(), dir.display());
        Ok(())
    }

    async fn finalize(&self, report: &SuiteReport) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join("summary.json");
        tokio::fs::write(&path, serde_json::to_vec_pretty(report)?).await?;
        debug!("报告摘要: {}", path.display());
        Ok(())
    }
}

/// 内存输出端，保存每个场景的结果与制品
#[derive(Debug, Default)]
pub struct MemorySink {
    entries: Mutex<Vec<(String, Outcome, Vec<Artifact>)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(String, Outcome, Vec<Artifact>)> {
        self.entries.lock().clone()
    }

    pub fn get(&self, scenario: &str) -> Option<(Outcome, Vec<Artifact>)> {
        self.entries
            .lock()
            .iter()
            .find(|(id, _, _)| id == scenario)
            .map(|(_, o, a)| (o.clone(), a.clone()))
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn attach(&self, scenario: &str, outcome: &Outcome, artifacts: Vec<Artifact>) -> Result<()> {
        self.entries
            .lock()
            .push((scenario.to_string(), outcome.clone(), artifacts));
        Ok(())
    }
}

fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() { "unnamed".to_string() } else { cleaned }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::artifacts::ArtifactRecorder;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("upload_format_video_mp4"), "upload_format_video_mp4");
        assert_eq!(sanitize_file_name("../etc/passwd"), "_etc_passwd");
        assert_eq!(sanitize_file_name("a b/c"), "a_b_c");
        assert_eq!(sanitize_file_name(".."), "unnamed");
    }

    #[test]
    fn outcome_serializes_with_reason() {
        let v = serde_json::to_value(Outcome::Skipped("auth".into())).unwrap();
        assert_eq!(v, json!({"outcome": "skipped", "reason": "auth"}));
        let v = serde_json::to_value(Outcome::Passed).unwrap();
        assert_eq!(v, json!({"outcome": "passed"}));
    }

    #[tokio::test]
    async fn file_sink_writes_one_file_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileReportSink::new(dir.path());

        let mut rec = ArtifactRecorder::new();
        rec.add_json("request", &json!({"filename": "x.jpg"}));
        rec.add_text("note", "hello");
        rec.add_text("note", "again");

        sink.attach("presigned_shape", &Outcome::Passed, rec.into_artifacts())
            .await
            .unwrap();

        let scenario = sink.scenario_dir("presigned_shape");
        let body = std::fs::read_to_string(scenario.join("01_request.json")).unwrap();
        assert!(body.contains("\"filename\": \"x.jpg\""));
        assert_eq!(std::fs::read_to_string(scenario.join("02_note.txt")).unwrap(), "hello");
        assert_eq!(std::fs::read_to_string(scenario.join("03_note.txt")).unwrap(), "again");
        assert!(scenario.join("outcome.json").exists());
    }

    #[tokio::test]
    async fn rerun_replaces_previous_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileReportSink::new(dir.path());

        let mut rec = ArtifactRecorder::new();
        rec.add_text("docs_meta", "status=500");
        rec.add_text("docs_body", "boom");
        rec.add_text("error", "unexpected status");
        sink.attach("docs", &Outcome::Failed("boom".into()), rec.into_artifacts())
            .await
            .unwrap();

        sink.attach("docs", &Outcome::Passed, Vec::new()).await.unwrap();

        let mut names: Vec<String> = std::fs::read_dir(sink.scenario_dir("docs"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["outcome.json"]);
    }
}
