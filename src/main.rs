//! 应用程序入口 (Application Entrypoint)
//!
//! 负责 CLI 指令解析、日志初始化、配置加载与套件执行。

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing_subscriber::fmt::MakeWriter;

use jobprobe::contract::assertions::assert_status;
use jobprobe::contract::openapi;
use jobprobe::core::config::HarnessConfig;
use jobprobe::core::event::create_event_channel;
use jobprobe::core::model::{HttpMethod, endpoints};
use jobprobe::engine::{ScenarioContext, SuiteRunner};
use jobprobe::network::ApiClient;
use jobprobe::report::{ArtifactRecorder, FileReportSink};
use jobprobe::scenarios::{ScenarioFilter, ScenarioRegistry, workflow};
use jobprobe::ui::{Ui, get_multi};

/// 进度条感知的日志写入器
///
/// 日志经由 `MultiProgress` 输出，不破坏进度条的渲染布局。
struct IndicatifWriter;

impl io::Write for IndicatifWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let _ = get_multi().println(s.trim_end());
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for IndicatifWriter {
    type Writer = IndicatifWriter;

    fn make_writer(&self) -> Self::Writer {
        IndicatifWriter
    }
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// 配置文件路径 (默认 ./jobprobe.toml，可不存在)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 执行测试套件
    Run {
        /// 仅执行标识包含该子串的场景
        #[arg(long)]
        only: Option<String>,
        /// 仅执行带该标签的场景
        #[arg(long)]
        tag: Option<String>,
        /// 报告输出目录
        #[arg(long)]
        report_dir: Option<PathBuf>,
    },
    /// 列出全部场景
    List,
    /// 列出 OpenAPI 文档中的接口
    Endpoints,
    /// 查看单个接口的请求体定义
    Inspect {
        #[arg(long)]
        path: String,
        #[arg(long, default_value = "post")]
        method: String,
        /// 同时输出 components.schemas 中的定义
        #[arg(long)]
        schema: Option<String>,
        /// 发送空 JSON 对象，输出服务端的校验错误
        #[arg(long)]
        probe: bool,
    },
    /// 通过预签名地址上传本地文件
    Upload {
        file: PathBuf,
        /// 缺省时根据扩展名推断
        #[arg(long)]
        content_type: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe {
            std::env::set_var("RUST_LOG", "info");
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(IndicatifWriter)
        .with_target(false)
        .with_ansi(true)
        .init();

    let cli = Cli::parse();
    let config = HarnessConfig::load(cli.config.as_deref()).context("failed to load configuration")?;

    match cli.command {
        Commands::Run { only, tag, report_dir } => {
            let failed = run_suite(config, ScenarioFilter { only, tag }, report_dir).await?;
            if failed {
                std::process::exit(1);
            }
        }
        Commands::List => {
            for scenario in ScenarioRegistry::standard().all() {
                println!(
                    "{:<36} [{}] {}",
                    scenario.id(),
                    scenario.tags().join(","),
                    scenario.description()
                );
            }
        }
        Commands::Endpoints => {
            let api = ApiClient::new(&config.api)?;
            let doc = fetch_openapi(&api).await?;
            let items = openapi::list_endpoints(&doc);
            println!("BASE_URL: {}", config.api.base_url);
            println!("Total endpoints: {}", items.len());
            for (method, path) in items {
                println!("{:<7} {}", method, path);
            }
        }
        Commands::Inspect {
            path,
            method,
            schema,
            probe,
        } => inspect(&config, &path, &method, schema.as_deref(), probe).await?,
        Commands::Upload { file, content_type } => upload(config, &file, content_type).await?,
    }

    Ok(())
}

/// 执行套件，返回是否存在失败场景
async fn run_suite(mut config: HarnessConfig, filter: ScenarioFilter, report_dir: Option<PathBuf>) -> anyhow::Result<bool> {
    if let Some(dir) = report_dir {
        config.report.dir = dir.to_string_lossy().into_owned();
    }
    let config = Arc::new(config);

    let scenarios = ScenarioRegistry::standard().select(&filter);
    if scenarios.is_empty() {
        bail!("no scenario matches the given filter");
    }

    let (event_sender, event_receiver) = create_event_channel();
    let ui_handle = Ui::run(event_receiver);

    let report = {
        let sink = Arc::new(FileReportSink::new(&config.report.dir));
        let runner = SuiteRunner::new(config.clone(), sink).with_events(event_sender);

        tokio::select! {
            report = runner.run(&scenarios) => report?,
            _ = tokio::signal::ctrl_c() => bail!("interrupted"),
        }
    };

    // 发送端随 runner 释放后，UI 循环自然结束
    let _ = ui_handle.await;

    tracing::info!("报告目录: {}", config.report.dir);
    Ok(!report.is_success())
}

async fn fetch_openapi(api: &ApiClient) -> anyhow::Result<Value> {
    let resp = api.call(&endpoints::OPENAPI, &[], None).await?;
    let mut artifacts = ArtifactRecorder::new();
    assert_status(&resp, endpoints::OPENAPI.expected, "openapi", &mut artifacts)?;
    Ok(resp.require_json("openapi")?)
}

async fn inspect(
    config: &HarnessConfig,
    path: &str,
    method: &str,
    schema: Option<&str>,
    probe: bool,
) -> anyhow::Result<()> {
    let api = ApiClient::new(&config.api)?;
    let doc = fetch_openapi(&api).await?;

    let Some(op) = openapi::describe_operation(&doc, path, method) else {
        bail!("{} {} not found in OpenAPI paths", method.to_uppercase(), path);
    };
    println!("{}", serde_json::to_string_pretty(&op)?);

    if let Some(name) = schema {
        match openapi::component_schema(&doc, name) {
            Some(s) => println!("\n{}:\n{}", name, serde_json::to_string_pretty(s)?),
            None => println!("\n{}: not found in components.schemas", name),
        }
    }

    if probe {
        let method = method
            .parse::<HttpMethod>()
            .with_context(|| format!("unsupported method for probe: {}", method))?;
        let resp = api.request(method, path, Some(&json!({})), None).await?;
        println!("\nprobe {} {} {{}} -> {}", op.method, path, resp.status());
        match resp.json() {
            Some(body) => println!("{}", serde_json::to_string_pretty(body)?),
            None => println!("{}", resp.text_preview(2000)),
        }
    }
    Ok(())
}

async fn upload(config: HarnessConfig, file: &Path, content_type: Option<String>) -> anyhow::Result<()> {
    let content = tokio::fs::read(file)
        .await
        .with_context(|| format!("failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .context("file path has no file name")?;
    let content_type =
        content_type.unwrap_or_else(|| mime_guess::from_path(file).first_or_octet_stream().to_string());

    let mut ctx = ScenarioContext::new(Arc::new(config))?;
    let presigned = workflow::presign(&mut ctx, &filename, &content_type).await?;
    let resp = workflow::upload(&mut ctx, &presigned, Bytes::from(content), &content_type).await?;

    println!("uploaded {} ({}) -> HTTP {}", filename, content_type, resp.status());
    println!("{}", presigned.gcs_url());
    Ok(())
}
