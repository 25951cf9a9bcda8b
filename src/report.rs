use crate::bridge::{AnalysisType, BridgeError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobReport {
    pub transport: String,
    pub image_sha256: String,
    pub image_format: String,
    pub started: String,
    pub finished: String,
    pub analyses: Vec<AnalysisOutcome>,
}

impl JobReport {
    pub fn failed(&self) -> impl Iterator<Item = &AnalysisOutcome> {
        self.analyses.iter().filter(|a| !a.ok)
    }

    pub fn all_ok(&self) -> bool {
        self.analyses.iter().all(|a| a.ok)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub kind: AnalysisType,
    pub ok: bool,
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AnalysisOutcome {
    pub fn success(kind: AnalysisType, elapsed_ms: u64) -> Self {
        Self {
            kind,
            ok: true,
            elapsed_ms,
            error_kind: None,
            error: None,
        }
    }

    pub fn failure(kind: AnalysisType, elapsed_ms: u64, err: &BridgeError) -> Self {
        Self {
            kind,
            ok: false,
            elapsed_ms,
            error_kind: Some(err.kind().to_string()),
            error: Some(err.to_string()),
        }
    }
}
