use crate::{
    bridge::{AnalysisType, ImagePayload, Transport},
    compress::compress,
    config::Config,
    model::AnalysisResult,
    prompt::build_prompt,
    raw::RawAnalysis,
    report::{AnalysisOutcome, JobReport},
    util::{now_rfc3339, sha256_hex},
};
use anyhow::{Context, Result, anyhow};
use std::time::Instant;
use tracing::{debug, info, warn};

pub struct Pipeline<T: Transport> {
    cfg: Config,
    analyses: Vec<AnalysisType>,
    transport: T,
}

pub struct JobOutput {
    pub raw: RawAnalysis,
    pub compressed: AnalysisResult,
    pub prompt: String,
    pub report: JobReport,
}

impl<T: Transport> Pipeline<T> {
    pub fn new(cfg: &Config, transport: T) -> Result<Self> {
        let analyses = cfg
            .pipeline
            .analyses
            .iter()
            .map(|s| s.parse::<AnalysisType>())
            .collect::<Result<Vec<_>>>()
            .with_context(|| "parsing pipeline.analyses")?;
        if analyses.is_empty() {
            return Err(anyhow!("pipeline.analyses is empty"));
        }
        Ok(Self {
            cfg: cfg.clone(),
            analyses,
            transport,
        })
    }

    pub fn analyses(&self) -> &[AnalysisType] {
        &self.analyses
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn run_job(&self, image: &ImagePayload) -> Result<JobOutput> {
        let started = now_rfc3339();
        let image_sha256 = sha256_hex(image.bytes());
        info!(
            "job image={} format={} transport={} analyses={}",
            &image_sha256[..12],
            image.format(),
            self.transport.name(),
            self.analyses.len()
        );

        let mut raw = RawAnalysis::default();
        let mut outcomes = Vec::with_capacity(self.analyses.len());

        for &kind in &self.analyses {
            let t0 = Instant::now();
            let res = self.transport.analyze(kind, image);
            let elapsed_ms = u64::try_from(t0.elapsed().as_millis()).unwrap_or(u64::MAX);

            match res {
                Ok(value) => {
                    debug!("{kind} ok in {elapsed_ms} ms");
                    raw.absorb(kind, value);
                    outcomes.push(AnalysisOutcome::success(kind, elapsed_ms));
                }
                Err(err) => {
                    if self.cfg.pipeline.fail_fast {
                        return Err(err).with_context(|| format!("analysis {kind} failed"));
                    }
                    warn!("{kind} failed ({}): {err}", err.kind());
                    outcomes.push(AnalysisOutcome::failure(kind, elapsed_ms, &err));
                }
            }
        }

        let compressed = compress(&self.cfg.compress, &raw);
        let prompt = build_prompt(Some(&compressed));
        info!(
            "compressed colors={} text_blocks={} prompt_chars={}",
            compressed.colors().len(),
            compressed.text_blocks().len(),
            prompt.chars().count()
        );

        let report = JobReport {
            transport: self.transport.name().to_string(),
            image_sha256,
            image_format: image.format().to_string(),
            started,
            finished: now_rfc3339(),
            analyses: outcomes,
        };

        Ok(JobOutput {
            raw,
            compressed,
            prompt,
            report,
        })
    }
}
