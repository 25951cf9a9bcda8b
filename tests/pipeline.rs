use design_prompt::{
    bridge::{AnalysisType, BridgeError, ImagePayload, Transport},
    config::Config,
    pipeline::Pipeline,
    util::sha256_hex,
};
use serde_json::{Value, json};
use std::cell::RefCell;

/// Canned analyser answers; `extract_text` fails when `fail_text` is set.
struct Scripted {
    fail_text: bool,
    seen: RefCell<Vec<AnalysisType>>,
}

impl Scripted {
    fn new(fail_text: bool) -> Self {
        Self {
            fail_text,
            seen: RefCell::new(Vec::new()),
        }
    }
}

impl Transport for Scripted {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn analyze(&self, kind: AnalysisType, _image: &ImagePayload) -> Result<Value, BridgeError> {
        self.seen.borrow_mut().push(kind);
        match kind {
            AnalysisType::ExtractColors => Ok(json!({ "colors": [
                { "hex": "#ffffff", "rgb": "rgb(255,255,255)", "ratio": 0.7 },
                { "hex": "#222222", "rgb": "rgb(34,34,34)", "ratio": 0.2 }
            ] })),
            AnalysisType::ExtractText if self.fail_text => {
                Err(BridgeError::Timeout { timeout_ms: 10 })
            }
            AnalysisType::ExtractText => Ok(json!({ "textBlocks": [
                { "text": "Start your free trial", "fontSize": 40 }
            ] })),
            AnalysisType::AnalyzeLayout => Ok(json!({ "layoutType": "vertical_scroll", "width": 1280, "height": 2400 })),
            AnalysisType::AnalyzeSections => Ok(json!([
                { "type": "hero", "position": "top", "height": 600 },
                { "type": "cta", "position": "bottom", "height": 200 }
            ])),
            AnalysisType::DetectFeatures => Ok(json!([
                { "type": "button", "position": { "x": 100, "y": 400, "width": 200, "height": 48 } }
            ])),
            _ => Ok(json!({})),
        }
    }
}

fn image() -> ImagePayload {
    ImagePayload::from_bytes(b"fake png".to_vec(), "png")
}

#[test]
fn runs_configured_analyses_in_order() {
    let cfg = Config::default();
    let pipeline = Pipeline::new(&cfg, Scripted::new(false)).expect("pipeline");
    let out = pipeline.run_job(&image()).expect("job");

    assert_eq!(
        *pipeline.transport().seen.borrow(),
        vec![
            AnalysisType::ExtractColors,
            AnalysisType::ExtractText,
            AnalysisType::AnalyzeLayout,
            AnalysisType::AnalyzeSections,
            AnalysisType::DetectFeatures,
        ]
    );
    assert!(out.report.all_ok());
    assert_eq!(out.report.transport, "scripted");
    assert_eq!(out.report.image_sha256, sha256_hex(b"fake png"));
    assert_eq!(out.raw.colors.len(), 2);
    assert_eq!(out.compressed.text_blocks()[0].role(), "heading");
    assert!(out.prompt.contains("landing page website"));
    assert!(out.prompt.contains("from top to bottom"));
    assert!(out.prompt.contains("1 button"));
}

#[test]
fn failed_analysis_is_recorded_and_skipped() {
    let cfg = Config::default();
    let pipeline = Pipeline::new(&cfg, Scripted::new(true)).expect("pipeline");
    let out = pipeline.run_job(&image()).expect("job");

    let failed: Vec<_> = out.report.failed().collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].kind, AnalysisType::ExtractText);
    assert_eq!(failed[0].error_kind.as_deref(), Some("process_timeout"));
    assert!(out.compressed.text_blocks().is_empty());
    assert!(out.prompt.contains("No text content is available."));
    assert_eq!(pipeline.transport().seen.borrow().len(), 5);
}

#[test]
fn fail_fast_stops_at_first_error() {
    let mut cfg = Config::default();
    cfg.pipeline.fail_fast = true;
    let pipeline = Pipeline::new(&cfg, Scripted::new(true)).expect("pipeline");
    let err = pipeline.run_job(&image()).err().expect("should fail");
    assert!(format!("{err:#}").contains("extract_text"));
    assert_eq!(pipeline.transport().seen.borrow().len(), 2);
}

#[test]
fn unknown_analysis_names_are_rejected() {
    let mut cfg = Config::default();
    cfg.pipeline.analyses = vec!["extract_colors".into(), "read_minds".into()];
    assert!(Pipeline::new(&cfg, Scripted::new(false)).is_err());
}

#[test]
fn report_serializes_outcomes() {
    let cfg = Config::default();
    let pipeline = Pipeline::new(&cfg, Scripted::new(true)).expect("pipeline");
    let out = pipeline.run_job(&image()).expect("job");
    let v = serde_json::to_value(&out.report).expect("report json");
    assert_eq!(v["analyses"][1]["kind"], "extract_text");
    assert_eq!(v["analyses"][1]["ok"], false);
    assert!(v["analyses"][0].get("error").is_none());
}
