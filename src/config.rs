use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bridge: Bridge,
    #[serde(default)]
    pub file_transport: FileTransport,
    #[serde(default)]
    pub compress: Compress,
    #[serde(default)]
    pub pipeline: Pipeline,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub bundle: Bundle,
    #[serde(default)]
    pub store: Store,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub debug: Debug,
    #[serde(default)]
    pub security: Security,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: Config = toml::from_str(&raw).with_context(|| "parsing TOML")?;
        Ok(cfg)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Bridge {
    /// Interpreter path, or "auto" to consult DESIGN_PROMPT_PYTHON and fall back to python3.
    pub python_exe: String,
    pub scripts_dir: String,
    pub analyzer_script: String,
    /// "direct", "file" or "auto".
    pub transport: String,
    pub timeout_ms: u64,
    /// Empty means the system temp directory.
    pub temp_dir: String,
    pub temp_prefix: String,
    pub output_format: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}
impl Default for Bridge {
    fn default() -> Self {
        Self {
            python_exe: "auto".into(),
            scripts_dir: "scripts".into(),
            analyzer_script: "image_analyzer.py".into(),
            transport: "auto".into(),
            timeout_ms: 30_000,
            temp_dir: "".into(),
            temp_prefix: "design-prompt-image".into(),
            output_format: "json".into(),
            env: Default::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileTransport {
    pub exchange_dir: String,
    pub server_script: String,
    pub polling_interval_ms: u64,
    pub call_timeout_ms: u64,
}
impl Default for FileTransport {
    fn default() -> Self {
        Self {
            exchange_dir: ".design-prompt-exchange".into(),
            server_script: "file_output.py".into(),
            polling_interval_ms: 500,
            call_timeout_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Compress {
    pub max_colors: usize,
    pub max_sections: usize,
    pub max_text_blocks: usize,
    pub max_main_elements: usize,
    pub normalize_unicode: bool,
    pub default_width: u32,
    pub default_height: u32,
}
impl Default for Compress {
    fn default() -> Self {
        Self {
            max_colors: 8,
            max_sections: 12,
            max_text_blocks: 40,
            max_main_elements: 10,
            normalize_unicode: true,
            default_width: 1200,
            default_height: 800,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Pipeline {
    pub analyses: Vec<String>,
    pub fail_fast: bool,
}
impl Default for Pipeline {
    fn default() -> Self {
        Self {
            analyses: vec![
                "extract_colors".into(),
                "extract_text".into(),
                "analyze_layout".into(),
                "analyze_sections".into(),
                "detect_features".into(),
            ],
            fail_fast: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub out_dir: String,
    pub write_raw_json: bool,
    pub write_compressed_json: bool,
    pub write_prompt: bool,
    pub write_report_json: bool,
    pub prompt_filename: String,
    pub report_filename: String,
    pub print_summary: bool,
}
impl Default for Output {
    fn default() -> Self {
        Self {
            out_dir: "out".into(),
            write_raw_json: true,
            write_compressed_json: true,
            write_prompt: true,
            write_report_json: true,
            prompt_filename: "prompt.md".into(),
            report_filename: "report.json".into(),
            print_summary: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Bundle {
    pub executable_stem: String,
    pub source_dirs: Vec<String>,
    pub release_dir: String,
}
impl Default for Bundle {
    fn default() -> Self {
        Self {
            executable_stem: "python_server".into(),
            source_dirs: vec!["dist".into(), "build".into(), ".".into()],
            release_dir: "release".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Store {
    /// Root for projects, categories, tags and per-project data. `~/` is expanded.
    pub data_dir: String,
}
impl Default for Store {
    fn default() -> Self {
        Self {
            data_dir: "~/.design-prompt".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Logging {
    pub level: String,
    pub json: bool,
    pub write_to_file: bool,
    pub file_path: String,
}
impl Default for Logging {
    fn default() -> Self {
        Self {
            level: "info".into(),
            json: false,
            write_to_file: false,
            file_path: "".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Debug {
    pub keep_python_stderr: bool,
    pub dump_effective_config: bool,
}
impl Default for Debug {
    fn default() -> Self {
        Self {
            keep_python_stderr: true,
            dump_effective_config: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Security {
    pub reject_url_inputs: bool,
    pub pin_scripts_dir: bool,
}
impl Default for Security {
    fn default() -> Self {
        Self {
            reject_url_inputs: true,
            pin_scripts_dir: true,
        }
    }
}
