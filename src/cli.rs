use crate::{
    bridge::{AnalysisType, DirectTransport, ImagePayload, Transport, select_transport},
    bundle::{Platform, stage_runtime},
    compress::compress,
    config::Config,
    model::AnalysisResult,
    pipeline::Pipeline,
    prompt::build_prompt,
    raw::RawAnalysis,
    store::Store,
    util::{ensure_dir, looks_like_url, now_rfc3339},
};
use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "design-prompt")]
#[command(about = "Screenshot analysis bridge and HTML/SCSS prompt builder")]
pub struct Args {
    #[command(subcommand)]
    pub cmd: Command,

    /// Path to config TOML. If omitted, uses ./design-prompt.toml if present.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace/debug/info/warn/error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Doctor {},
    Analyze {
        #[arg(long)]
        kind: AnalysisType,
        /// Image file or data: URL.
        #[arg(long)]
        image: String,
    },
    Compress {
        #[arg(long)]
        input: PathBuf,
    },
    Prompt {
        #[arg(long)]
        input: PathBuf,
        /// Treat the input as raw analyser output and compress it first.
        #[arg(long)]
        raw: bool,
    },
    Run {
        #[arg(long)]
        image: String,
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    StageRuntime {
        #[arg(long)]
        platform: Option<Platform>,
    },
    /// Print projects, categories, tags and the current selection.
    Library {},
}

pub fn dispatch(args: Args) -> Result<()> {
    let cfg = match resolve_config_path(args.config.as_deref()) {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };

    match &args.cmd {
        Command::Doctor {} => with_logging(&args, &cfg, || doctor(&cfg)),
        Command::Analyze { kind, image } => with_logging(&args, &cfg, || analyze(&cfg, *kind, image)),
        Command::Compress { input } => with_logging(&args, &cfg, || compress_cmd(&cfg, input)),
        Command::Prompt { input, raw } => {
            with_logging(&args, &cfg, || prompt_cmd(&cfg, input, *raw))
        }
        Command::StageRuntime { platform } => with_logging(&args, &cfg, || {
            stage(&cfg, platform.unwrap_or_else(Platform::current))
        }),
        Command::Library {} => with_logging(&args, &cfg, || library(&cfg)),
        Command::Run { image, out_dir } => run(&args, &cfg, image, out_dir.as_deref()),
    }
}

fn with_logging(args: &Args, cfg: &Config, f: impl FnOnce() -> Result<()>) -> Result<()> {
    let log_path = resolve_log_path(cfg, None);
    let _guard = init_logging(args, cfg, log_path.as_deref())?;
    f().inspect_err(|e| error!("{e:#}"))
}

fn resolve_config_path(user: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = user {
        return Some(p.to_path_buf());
    }
    ["design-prompt.toml", "design-prompt.example.toml"]
        .into_iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
}

fn init_logging(args: &Args, cfg: &Config, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .as_deref()
        .unwrap_or(cfg.logging.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout carries command output; logs go to stderr.
    let stderr_layer = if cfg.logging.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn doctor(cfg: &Config) -> Result<()> {
    let direct = match DirectTransport::new(cfg) {
        Ok(t) => {
            let probe = t.probe();
            serde_json::json!({
                "python_exe": t.python_exe(),
                "script": t.script(),
                "timeout_ms": t.timeout().as_millis() as u64,
                "python_version": probe.as_ref().ok(),
                "probe_error": probe.as_ref().err().map(|e| e.to_string()),
            })
        }
        Err(e) => serde_json::json!({ "error": format!("{e:#}") }),
    };

    let diag = serde_json::json!({
        "configured_transport": cfg.bridge.transport,
        "direct": direct,
        "file_transport": {
            "exchange_dir": cfg.file_transport.exchange_dir,
            "server_script": Path::new(&cfg.bridge.scripts_dir).join(&cfg.file_transport.server_script),
            "polling_interval_ms": cfg.file_transport.polling_interval_ms,
        },
        "analyses": cfg.pipeline.analyses,
    });
    println!("{}", serde_json::to_string_pretty(&diag)?);
    Ok(())
}

fn analyze(cfg: &Config, kind: AnalysisType, image: &str) -> Result<()> {
    let payload = load_image(cfg, image)?;
    let transport = select_transport(cfg)?;
    let value = transport
        .analyze(kind, &payload)
        .with_context(|| format!("{kind} via {} transport", transport.name()))?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn stage(cfg: &Config, platform: Platform) -> Result<()> {
    let report = stage_runtime(&cfg.bundle, platform)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn library(cfg: &Config) -> Result<()> {
    let store = Store::from_config(&cfg.store)?;
    let snapshot = serde_json::json!({
        "data_dir": store.root(),
        "projects": store.list_projects()?,
        "active_project": store.active_project(),
        "categories": store.categories()?,
        "tags": store.tags(),
        "selected_category": store.selected_category(),
        "selected_tags": store.selected_tags(),
    });
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

fn compress_cmd(cfg: &Config, input: &Path) -> Result<()> {
    let raw: RawAnalysis = read_json(input)?;
    let doc = compress(&cfg.compress, &raw);
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

fn prompt_cmd(cfg: &Config, input: &Path, raw: bool) -> Result<()> {
    let doc: AnalysisResult = if raw {
        compress(&cfg.compress, &read_json::<RawAnalysis>(input)?)
    } else {
        read_json(input)?
    };
    println!("{}", build_prompt(Some(&doc)));
    Ok(())
}

fn run(args: &Args, cfg: &Config, image: &str, out_override: Option<&Path>) -> Result<()> {
    let payload = load_image(cfg, image)?;
    let image_sha = crate::util::sha256_hex(payload.bytes());
    let job_id = image_sha[..16].to_string();

    let out_root = out_override
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(&cfg.output.out_dir));
    let job_dir = out_root.join(&job_id);
    ensure_dir(&job_dir)?;

    let log_path = resolve_log_path(cfg, Some(&job_dir));
    let _guard = init_logging(args, cfg, log_path.as_deref())?;

    info!("job_id={job_id} out={}", job_dir.display());
    run_job(cfg, &payload, &job_id, &job_dir).inspect_err(|e| error!("{e:#}"))
}

fn run_job(cfg: &Config, payload: &ImagePayload, job_id: &str, job_dir: &Path) -> Result<()> {
    if cfg.debug.dump_effective_config {
        let raw = toml::to_string(cfg).with_context(|| "serializing effective config")?;
        std::fs::write(job_dir.join("effective-config.toml"), raw)?;
    }

    let transport = select_transport(cfg)?;
    let pipeline = Pipeline::new(cfg, transport)?;

    let started = now_rfc3339();
    let result = pipeline.run_job(payload)?;

    if cfg.output.write_raw_json {
        std::fs::write(
            job_dir.join("raw.json"),
            serde_json::to_string_pretty(&result.raw)?,
        )?;
    }

    if cfg.output.write_compressed_json {
        std::fs::write(
            job_dir.join("compressed.json"),
            serde_json::to_string_pretty(&result.compressed)?,
        )?;
    }

    if cfg.output.write_prompt {
        std::fs::write(job_dir.join(&cfg.output.prompt_filename), &result.prompt)?;
    }

    if cfg.output.write_report_json {
        std::fs::write(
            job_dir.join(&cfg.output.report_filename),
            serde_json::to_string_pretty(&result.report)?,
        )?;
    }

    let failed: Vec<&str> = result.report.failed().map(|a| a.kind.as_str()).collect();
    if !failed.is_empty() {
        warn!("analyses failed: {}", failed.join(", "));
    }

    if cfg.output.print_summary {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "job_id": job_id,
                "job_dir": job_dir,
                "transport": result.report.transport,
                "started": started,
                "finished": now_rfc3339(),
                "failed_analyses": failed,
                "status": if failed.is_empty() { "ok" } else { "partial" },
            }))?
        );
    }

    Ok(())
}

fn load_image(cfg: &Config, input: &str) -> Result<ImagePayload> {
    if cfg.security.reject_url_inputs && looks_like_url(input) {
        return Err(anyhow!("URL inputs are disabled: {input}"));
    }
    if input.trim_start().starts_with("data:") {
        return ImagePayload::from_data_url(input).with_context(|| "decoding data URL");
    }
    let path = Path::new(input);
    if !path.exists() {
        return Err(anyhow!("image does not exist: {}", path.display()));
    }
    ImagePayload::from_file(path).with_context(|| format!("reading image: {}", path.display()))
}

fn resolve_log_path(cfg: &Config, job_dir: Option<&Path>) -> Option<PathBuf> {
    if !cfg.logging.write_to_file {
        return None;
    }

    if !cfg.logging.file_path.is_empty() {
        return Some(PathBuf::from(&cfg.logging.file_path));
    }

    if let Some(job_dir) = job_dir {
        return Some(job_dir.join("design-prompt.log"));
    }

    Some(PathBuf::from(&cfg.output.out_dir).join("design-prompt.log"))
}
