use super::BridgeError;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use regex::Regex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

static DATA_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:image/([A-Za-z0-9.+-]+);base64,").expect("static data URL pattern")
});

/// Decoded image bytes plus the format they were declared with.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    bytes: Vec<u8>,
    format: String,
}

impl ImagePayload {
    pub fn from_bytes(bytes: Vec<u8>, format: impl Into<String>) -> Self {
        Self {
            bytes,
            format: format.into().to_ascii_lowercase(),
        }
    }

    /// Accepts `data:image/<fmt>;base64,<data>` or bare base64 (assumed PNG).
    pub fn from_data_url(s: &str) -> Result<Self, BridgeError> {
        let s = s.trim();
        let (format, data) = match DATA_URL_RE.captures(s) {
            Some(caps) => {
                let header_len = caps.get(0).map(|m| m.end()).unwrap_or(0);
                let format = caps.get(1).map(|m| m.as_str()).unwrap_or("png");
                (format.to_string(), &s[header_len..])
            }
            None if s.starts_with("data:") => {
                return Err(BridgeError::InvalidImage(
                    "data URL is not a base64 image".into(),
                ));
            }
            None => ("png".to_string(), s),
        };
        let compact: String = data.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = STANDARD
            .decode(compact.as_bytes())
            .map_err(|e| BridgeError::InvalidImage(e.to_string()))?;
        if bytes.is_empty() {
            return Err(BridgeError::InvalidImage("image payload is empty".into()));
        }
        Ok(Self::from_bytes(bytes, format))
    }

    pub fn from_file(path: &Path) -> Result<Self, BridgeError> {
        let bytes = std::fs::read(path)
            .map_err(|e| BridgeError::io(format!("reading image {}", path.display()), e))?;
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| match e.to_ascii_lowercase().as_str() {
                "jpg" => "jpeg".to_string(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| "png".to_string());
        Ok(Self::from_bytes(bytes, format))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn extension(&self) -> &str {
        match self.format.as_str() {
            "jpeg" => "jpg",
            "svg+xml" => "svg",
            other => other,
        }
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "data:image/{};base64,{}",
            self.format,
            STANDARD.encode(&self.bytes)
        )
    }
}

/// An image written to a uniquely named temp file, removed when dropped.
#[derive(Debug)]
pub struct TempImage {
    path: PathBuf,
}

impl TempImage {
    pub fn write(dir: &Path, prefix: &str, payload: &ImagePayload) -> Result<Self, BridgeError> {
        std::fs::create_dir_all(dir)
            .map_err(|e| BridgeError::io(format!("create temp dir {}", dir.display()), e))?;

        let millis = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let nonce = uuid::Uuid::new_v4().simple().to_string();
        let path = dir.join(format!(
            "{prefix}-{millis}-{}.{}",
            &nonce[..8],
            payload.extension()
        ));

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| BridgeError::io(format!("create temp image {}", path.display()), e))?;
        // Constructed before writing so a failed write still cleans up.
        let guard = Self { path };
        file.write_all(payload.bytes())
            .map_err(|e| BridgeError::io(format!("write temp image {}", guard.path.display()), e))?;
        debug!("wrote temp image {}", guard.path.display());
        Ok(guard)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempImage {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("removed temp image {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("failed to remove temp image {}: {e}", self.path.display()),
        }
    }
}
