#![cfg(unix)]

use design_prompt::{
    bridge::{AnalysisType, BridgeError, DirectTransport, ImagePayload, Transport},
    config::Config,
};
use std::path::Path;
use std::time::{Duration, Instant};
use tempfile::TempDir;

struct Fixture {
    scripts: TempDir,
    temp: TempDir,
    cfg: Config,
}

fn fixture(body: &str) -> Fixture {
    let scripts = TempDir::new().expect("scripts dir");
    let temp = TempDir::new().expect("temp dir");
    std::fs::write(scripts.path().join("analyzer.sh"), body).expect("write script");

    let mut cfg = Config::default();
    cfg.bridge.python_exe = "/bin/sh".into();
    cfg.bridge.scripts_dir = scripts.path().display().to_string();
    cfg.bridge.analyzer_script = "analyzer.sh".into();
    cfg.bridge.temp_dir = temp.path().display().to_string();
    cfg.bridge.timeout_ms = 5_000;
    cfg.security.pin_scripts_dir = false;
    Fixture { scripts, temp, cfg }
}

fn image() -> ImagePayload {
    ImagePayload::from_bytes(vec![0x89, b'P', b'N', b'G'], "png")
}

fn dir_is_empty(p: &Path) -> bool {
    std::fs::read_dir(p).expect("read_dir").next().is_none()
}

#[test]
fn success_returns_parsed_json_and_removes_temp_image() {
    let fx = fixture(
        r#"[ "$1" = "--type" ] && [ "$3" = "--input" ] && [ -f "$4" ] || exit 9
echo "{\"type\": \"$2\", \"format\": \"$6\"}"
"#,
    );
    let t = DirectTransport::new(&fx.cfg).expect("transport");
    let v = t
        .analyze(AnalysisType::ExtractColors, &image())
        .expect("analysis");
    assert_eq!(v["type"], "extract_colors");
    assert_eq!(v["format"], "json");
    assert!(dir_is_empty(fx.temp.path()));
    assert!(fx.scripts.path().join("analyzer.sh").exists());
}

#[test]
fn configured_env_reaches_the_process() {
    let mut fx = fixture("echo \"{\\\"v\\\": \\\"$DP_TEST_VALUE\\\"}\"\n");
    fx.cfg
        .bridge
        .env
        .insert("DP_TEST_VALUE".into(), "from-config".into());
    let t = DirectTransport::new(&fx.cfg).expect("transport");
    let v = t.analyze(AnalysisType::ExtractText, &image()).expect("analysis");
    assert_eq!(v["v"], "from-config");
}

#[test]
fn non_zero_exit_carries_code_and_stderr() {
    let fx = fixture("echo boom >&2\nexit 3\n");
    let t = DirectTransport::new(&fx.cfg).expect("transport");
    let err = t
        .analyze(AnalysisType::AnalyzeLayout, &image())
        .expect_err("should fail");
    match &err {
        BridgeError::ExitNonZero { code, stderr } => {
            assert_eq!(*code, Some(3));
            assert_eq!(stderr, "boom");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.kind(), "process_exit_non_zero");
    assert!(dir_is_empty(fx.temp.path()));
}

#[test]
fn unparsable_stdout_is_a_parse_error() {
    let fx = fixture("echo 'definitely not json'\n");
    let t = DirectTransport::new(&fx.cfg).expect("transport");
    let err = t
        .analyze(AnalysisType::DetectCards, &image())
        .expect_err("should fail");
    assert_eq!(err.kind(), "response_parse_error");
    assert!(err.to_string().contains("definitely not json"));
}

#[test]
fn error_field_becomes_remote_error() {
    let fx = fixture("echo '{\"error\": \"unsupported image\"}'\n");
    let t = DirectTransport::new(&fx.cfg).expect("transport");
    let err = t
        .analyze(AnalysisType::DetectFeatures, &image())
        .expect_err("should fail");
    assert!(matches!(err, BridgeError::Remote(ref m) if m == "unsupported image"));
}

#[test]
fn timeout_kills_process_and_cleans_up() {
    let mut fx = fixture("exec sleep 10\n");
    fx.cfg.bridge.timeout_ms = 300;
    let t = DirectTransport::new(&fx.cfg).expect("transport");

    let started = Instant::now();
    let err = t
        .analyze(AnalysisType::ExtractColors, &image())
        .expect_err("should time out");
    let elapsed = started.elapsed();

    assert!(err.is_timeout());
    assert_eq!(err.kind(), "process_timeout");
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
    assert!(dir_is_empty(fx.temp.path()));
}

#[test]
fn timed_out_process_is_gone() {
    let mut fx = fixture("echo $$ > \"$(dirname \"$0\")/pid\"\nexec sleep 10\n");
    fx.cfg.bridge.timeout_ms = 300;
    let t = DirectTransport::new(&fx.cfg).expect("transport");

    let err = t
        .analyze(AnalysisType::ExtractColors, &image())
        .expect_err("should time out");
    assert!(err.is_timeout());

    let pid = std::fs::read_to_string(fx.scripts.path().join("pid")).expect("pid file");
    let pid = pid.trim();
    assert!(!pid.is_empty());
    let alive = std::process::Command::new("/bin/sh")
        .arg("-c")
        .arg(format!("kill -0 {pid} 2>/dev/null"))
        .status()
        .expect("kill -0");
    assert!(!alive.success(), "process {pid} still running");
}

#[test]
fn background_process_holding_stdout_cannot_outlive_timeout() {
    let mut fx = fixture("sleep 5 &\necho '{}'\n");
    fx.cfg.bridge.timeout_ms = 300;
    let t = DirectTransport::new(&fx.cfg).expect("transport");

    let started = Instant::now();
    let err = t
        .analyze(AnalysisType::ExtractColors, &image())
        .expect_err("should time out");
    let elapsed = started.elapsed();

    assert!(err.is_timeout());
    assert!(elapsed < Duration::from_secs(3), "took {elapsed:?}");
    assert!(dir_is_empty(fx.temp.path()));
}

#[test]
fn pinned_scripts_dir_outside_cwd_is_rejected() {
    let mut fx = fixture("echo '{}'\n");
    fx.cfg.security.pin_scripts_dir = true;
    assert!(DirectTransport::new(&fx.cfg).is_err());
}

#[test]
fn missing_script_is_rejected() {
    let mut fx = fixture("echo '{}'\n");
    fx.cfg.bridge.analyzer_script = "nope.sh".into();
    let err = DirectTransport::new(&fx.cfg).err().expect("should fail");
    assert!(err.to_string().contains("missing analyzer script"));
}

#[test]
fn spawn_failure_is_typed() {
    let mut fx = fixture("echo '{}'\n");
    fx.cfg.bridge.python_exe = "/nonexistent/interpreter".into();
    let t = DirectTransport::new(&fx.cfg).expect("transport");
    let err = t
        .analyze(AnalysisType::ExtractColors, &image())
        .expect_err("should fail");
    assert_eq!(err.kind(), "spawn_failed");
    assert!(dir_is_empty(fx.temp.path()));
}
