//! Bridge to the external image analyser.
//!
//! Two transports implement [`Transport`]: [`DirectTransport`] runs one
//! subprocess per request, [`FileTransport`] exchanges JSON files with a
//! long-running server. [`select_transport`] picks one from config.

mod direct;
mod error;
mod file;
mod image;

pub use direct::DirectTransport;
pub use error::BridgeError;
pub use file::{Callback, FileTransport, ResponseFile};
pub use image::{ImagePayload, TempImage};

use crate::config::Config;
use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    ExtractColors,
    ExtractText,
    AnalyzeLayout,
    AnalyzeSections,
    DetectSections,
    DetectCards,
    DetectFeatures,
}

impl AnalysisType {
    pub const ALL: [AnalysisType; 7] = [
        AnalysisType::ExtractColors,
        AnalysisType::ExtractText,
        AnalysisType::AnalyzeLayout,
        AnalysisType::AnalyzeSections,
        AnalysisType::DetectSections,
        AnalysisType::DetectCards,
        AnalysisType::DetectFeatures,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisType::ExtractColors => "extract_colors",
            AnalysisType::ExtractText => "extract_text",
            AnalysisType::AnalyzeLayout => "analyze_layout",
            AnalysisType::AnalyzeSections => "analyze_sections",
            AnalysisType::DetectSections => "detect_sections",
            AnalysisType::DetectCards => "detect_cards",
            AnalysisType::DetectFeatures => "detect_features",
        }
    }
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        AnalysisType::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| anyhow!("unknown analysis type: {s}"))
    }
}

/// One request/response exchange with the analyser.
pub trait Transport {
    fn name(&self) -> &'static str;

    fn analyze(&self, kind: AnalysisType, image: &ImagePayload) -> Result<Value, BridgeError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn analyze(&self, kind: AnalysisType, image: &ImagePayload) -> Result<Value, BridgeError> {
        (**self).analyze(kind, image)
    }
}

/// `direct`, `file`, or `auto` (direct when the interpreter probes OK,
/// file exchange otherwise).
pub fn select_transport(cfg: &Config) -> Result<Box<dyn Transport>> {
    match cfg.bridge.transport.trim().to_ascii_lowercase().as_str() {
        "direct" => Ok(Box::new(DirectTransport::new(cfg)?)),
        "file" => Ok(Box::new(start_file(cfg)?)),
        "auto" | "" => {
            match DirectTransport::new(cfg).map_err(|e| e.to_string()).and_then(|t| {
                t.probe().map(|v| (t, v)).map_err(|e| e.to_string())
            }) {
                Ok((t, version)) => {
                    info!("direct transport selected ({version})");
                    Ok(Box::new(t))
                }
                Err(reason) => {
                    warn!("direct transport unavailable, using file exchange: {reason}");
                    Ok(Box::new(start_file(cfg)?))
                }
            }
        }
        other => Err(anyhow!("unknown bridge.transport: {other}")),
    }
}

fn start_file(cfg: &Config) -> Result<FileTransport> {
    let transport = FileTransport::new(cfg)?;
    transport.start()?;
    info!(
        dir = %transport.exchange_dir().display(),
        "file transport selected"
    );
    Ok(transport)
}
