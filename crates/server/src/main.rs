#![deny(warnings)]

use anyhow::Context;
use clap::Parser;
use emotisense_core::classifier::SidecarEmotionClassifier;
use emotisense_core::config::{
    resolve_optional_string, resolve_parsed, resolve_string_with_default, AnalysisConfig,
    AppConfig, ClassifierConfig, Env, StdEnv, UploadPolicy, DEFAULT_BIND_ADDR,
    DEFAULT_CLASSIFIER_COMMAND, DEFAULT_CLASSIFIER_SCRIPT, DEFAULT_DETECTOR_BACKEND,
    DEFAULT_FRAME_STRIDE, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_SAMPLE_RATE_HZ,
    DEFAULT_TIMELINE_SEGMENTS, ENV_BIND_ADDR, ENV_CLASSIFIER_COMMAND, ENV_CLASSIFIER_SCRIPT,
    ENV_DETECTOR_BACKEND, ENV_FRAME_STRIDE, ENV_MAX_UPLOAD_BYTES, ENV_SCRATCH_DIR,
};
use emotisense_core::decode::MediaBackend;
use emotisense_core::pipeline::Analyzer;
use emotisense_server::{router, AppState};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "emotisense")]
#[command(about = "Facial emotion and vocal tone coaching for uploaded videos")]
struct Args {
    /// Address to listen on.
    #[arg(long)]
    bind: Option<String>,

    #[arg(long)]
    max_upload_bytes: Option<usize>,

    /// Comma-separated list of accepted upload extensions.
    #[arg(long, value_delimiter = ',', default_value = "mp4")]
    allowed_extensions: Vec<String>,

    /// Where uploads and extracted audio live while a request runs.
    #[arg(long)]
    scratch_dir: Option<String>,

    /// Classify every Nth frame.
    #[arg(long)]
    frame_stride: Option<u64>,

    #[arg(long, default_value_t = DEFAULT_TIMELINE_SEGMENTS)]
    timeline_segments: usize,

    #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE_HZ)]
    sample_rate_hz: u32,

    /// Interpreter or executable for the classifier sidecar.
    #[arg(long)]
    classifier_cmd: Option<String>,

    #[arg(long, env = ENV_CLASSIFIER_SCRIPT, default_value = DEFAULT_CLASSIFIER_SCRIPT)]
    classifier_script: String,

    #[arg(long)]
    detector_backend: Option<String>,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let env = StdEnv;
    let cfg = build_config(args, &env)?;

    tracing::info!(
        bind = %cfg.bind_addr,
        scratch_dir = %cfg.scratch_dir.display(),
        max_upload_bytes = cfg.upload.max_bytes,
        frame_stride = cfg.analysis.frame_stride,
        classifier = %cfg.classifier.command,
        "config loaded"
    );

    serve(cfg).await
}

async fn serve(cfg: AppConfig) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(cfg.scratch_dir())
        .await
        .with_context(|| format!("creating scratch dir {}", cfg.scratch_dir().display()))?;

    let backend = media_backend().await?;
    let classifier = Arc::new(SidecarEmotionClassifier::new(cfg.classifier.clone()));
    let analyzer = Analyzer::new(backend, classifier, cfg.analysis, cfg.scratch_dir.clone());
    let state = AppState::new(analyzer, cfg.upload.clone(), cfg.scratch_dir.clone());

    let listener = tokio::net::TcpListener::bind(cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("shut down");
    Ok(())
}

#[cfg(feature = "ffmpeg-sidecar")]
async fn media_backend() -> anyhow::Result<Arc<dyn MediaBackend>> {
    use emotisense_core::decode::FfmpegBackend;

    let backend = tokio::task::spawn_blocking(FfmpegBackend::ensure_available)
        .await
        .context("ffmpeg setup task failed")?
        .context("ffmpeg is required")?;
    Ok(Arc::new(backend))
}

#[cfg(not(feature = "ffmpeg-sidecar"))]
async fn media_backend() -> anyhow::Result<Arc<dyn MediaBackend>> {
    anyhow::bail!("built without the ffmpeg-sidecar feature, no media backend available")
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt().with_env_filter(filter).init();
    Ok(())
}

fn build_config(args: Args, env: &impl Env) -> anyhow::Result<AppConfig> {
    let bind = resolve_string_with_default(args.bind, ENV_BIND_ADDR, env, DEFAULT_BIND_ADDR);
    let bind_addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("invalid bind address: {bind}"))?;

    let max_bytes = resolve_parsed(
        args.max_upload_bytes,
        ENV_MAX_UPLOAD_BYTES,
        env,
        DEFAULT_MAX_UPLOAD_BYTES,
    )?;
    let upload = UploadPolicy::new(max_bytes, &args.allowed_extensions)?;

    let scratch_dir = resolve_optional_string(args.scratch_dir, ENV_SCRATCH_DIR, env)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::temp_dir().join("emotisense"));

    let frame_stride =
        resolve_parsed(args.frame_stride, ENV_FRAME_STRIDE, env, DEFAULT_FRAME_STRIDE)?;
    let analysis =
        AnalysisConfig::new(frame_stride, args.timeline_segments, args.sample_rate_hz)?;

    let classifier = ClassifierConfig {
        command: resolve_string_with_default(
            args.classifier_cmd,
            ENV_CLASSIFIER_COMMAND,
            env,
            DEFAULT_CLASSIFIER_COMMAND,
        ),
        args: vec![resolve_string_with_default(
            Some(args.classifier_script),
            ENV_CLASSIFIER_SCRIPT,
            env,
            DEFAULT_CLASSIFIER_SCRIPT,
        )],
        detector_backend: resolve_string_with_default(
            args.detector_backend,
            ENV_DETECTOR_BACKEND,
            env,
            DEFAULT_DETECTOR_BACKEND,
        ),
    };

    Ok(AppConfig {
        bind_addr,
        upload,
        scratch_dir,
        analysis,
        classifier,
    })
}
