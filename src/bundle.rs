//! Copies the standalone analyser executable into packaged app directories.

use crate::config::Bundle;
use crate::util::ensure_dir;
use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    Macos,
    Windows,
}

const LINUX_DIRS: &[&str] = &[
    "linux-unpacked",
    "linux-ia32-unpacked",
    "linux-x64-unpacked",
    "linux-armv7l-unpacked",
    "linux-arm64-unpacked",
];
const WINDOWS_DIRS: &[&str] = &["win-unpacked", "win-ia32-unpacked", "win-x64-unpacked"];
const MAC_DIRS: &[&str] = &[
    "mac",
    "mac-arm64",
    "mac-universal",
    "mac-x64",
    "mac-universal-x64-temp",
    "mac-universal-arm64-temp",
];

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else if cfg!(target_os = "macos") {
            Platform::Macos
        } else {
            Platform::Linux
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Macos => "macos",
            Platform::Windows => "windows",
        }
    }

    pub fn executable_name(self, stem: &str) -> String {
        match self {
            Platform::Windows => format!("{stem}.exe"),
            _ => stem.to_string(),
        }
    }

    /// Resource directories of every unpacked build present under `release_dir`.
    pub fn app_dirs(self, release_dir: &Path) -> Result<Vec<PathBuf>> {
        let mut dirs = Vec::new();
        match self {
            Platform::Linux | Platform::Windows => {
                let names = if self == Platform::Linux {
                    LINUX_DIRS
                } else {
                    WINDOWS_DIRS
                };
                for name in names {
                    let p = release_dir.join(name).join("resources").join("app");
                    if p.is_dir() {
                        dirs.push(p);
                    }
                }
            }
            Platform::Macos => {
                for name in MAC_DIRS {
                    let parent = release_dir.join(name);
                    if !parent.is_dir() {
                        continue;
                    }
                    let mut bundles = std::fs::read_dir(&parent)
                        .with_context(|| format!("read_dir {}", parent.display()))?
                        .filter_map(|e| e.ok())
                        .map(|e| e.path())
                        .filter(|p| p.extension().is_some_and(|ext| ext == "app"))
                        .collect::<Vec<_>>();
                    bundles.sort();
                    for bundle in bundles {
                        let p = bundle.join("Contents").join("Resources").join("app");
                        if p.is_dir() {
                            dirs.push(p);
                        }
                    }
                }
            }
        }
        Ok(dirs)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "macos" | "mac" | "darwin" => Ok(Platform::Macos),
            "windows" | "win" | "win32" => Ok(Platform::Windows),
            other => Err(anyhow!("unknown platform: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub platform: Platform,
    pub source: PathBuf,
    pub copied: Vec<PathBuf>,
}

pub fn find_executable(cfg: &Bundle, target: Platform) -> Option<PathBuf> {
    let name = target.executable_name(&cfg.executable_stem);
    cfg.source_dirs
        .iter()
        .map(|d| Path::new(d).join(&name))
        .find(|p| p.is_file())
}

pub fn stage_runtime(cfg: &Bundle, target: Platform) -> Result<StageReport> {
    let source = find_executable(cfg, target).ok_or_else(|| {
        anyhow!(
            "{} not found in any of: {}",
            target.executable_name(&cfg.executable_stem),
            cfg.source_dirs.join(", ")
        )
    })?;
    info!("staging {} for {target}", source.display());

    let release_dir = Path::new(&cfg.release_dir);
    let app_dirs = target.app_dirs(release_dir)?;
    if app_dirs.is_empty() {
        warn!("no unpacked app directories under {}", release_dir.display());
    }

    let file_name = target.executable_name(&cfg.executable_stem);
    let mut copied = Vec::with_capacity(app_dirs.len());
    for dir in app_dirs {
        ensure_dir(&dir)?;
        let dest = dir.join(&file_name);
        std::fs::copy(&source, &dest)
            .with_context(|| format!("copy {} -> {}", source.display(), dest.display()))?;
        if target != Platform::Windows {
            make_executable(&dest)?;
        }
        info!("copied -> {}", dest.display());
        copied.push(dest);
    }

    Ok(StageReport {
        platform: target,
        source,
        copied,
    })
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .with_context(|| format!("chmod 755 {}", path.display()))
}

#[cfg(not(unix))]
fn make_executable(path: &Path) -> Result<()> {
    warn!("cannot set executable bit on this host: {}", path.display());
    Ok(())
}
