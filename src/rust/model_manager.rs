use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

pub const MODEL_FILE: &str = "model.onnx";
pub const TOKENIZER_FILE: &str = "tokenizer.json";

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Unsupported artifact location scheme '{0}' (expected a path, file:// or http(s)://)")]
    UnsupportedScheme(String),
    #[error("Artifact file not found: {0}")]
    NotFound(PathBuf),
    #[error("Artifacts at {0} are not fetched yet; call ModelManager::fetch() first")]
    NotFetched(String),
    #[error("Download error: {0}")]
    DownloadError(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Artifact verification failed")]
    VerificationFailed,
    #[error("Hash mismatch: expected {expected}, got {actual} for {file_type} file")]
    HashMismatch {
        file_type: String,
        expected: String,
        actual: String,
    },
}

/// Where a model bundle lives: a local directory or a remote base URL.
///
/// Either way the bundle consists of `model.onnx` and `tokenizer.json`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactLocation {
    Local(PathBuf),
    Remote(String),
}

impl ArtifactLocation {
    pub fn parse(location: &str) -> Result<Self, ArtifactError> {
        let location = location.trim();
        if location.starts_with("http://") || location.starts_with("https://") {
            return Ok(Self::Remote(location.trim_end_matches('/').to_string()));
        }
        if let Some(path) = location.strip_prefix("file://") {
            return Ok(Self::Local(PathBuf::from(path)));
        }
        if let Some((scheme, _)) = location.split_once("://") {
            return Err(ArtifactError::UnsupportedScheme(scheme.to_string()));
        }
        Ok(Self::Local(PathBuf::from(location)))
    }

    fn file_url(base: &str, file: &str) -> String {
        format!("{}/{}", base, file)
    }
}

impl fmt::Display for ArtifactLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(path) => write!(f, "{}", path.display()),
            Self::Remote(url) => f.write_str(url),
        }
    }
}

/// Resolved on-disk files of an artifact bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub tokenizer: PathBuf,
}

impl ArtifactPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            model: dir.join(MODEL_FILE),
            tokenizer: dir.join(TOKENIZER_FILE),
        }
    }

    pub fn exist(&self) -> bool {
        self.model.exists() && self.tokenizer.exists()
    }
}

/// Optional SHA-256 digests (lowercase hex) checked when fetching remote artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpectedHashes {
    pub model: Option<String>,
    pub tokenizer: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ModelManager {
    models_dir: PathBuf,
    download_lock: Arc<Mutex<()>>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

impl ModelManager {
    /// Creates a new ModelManager with the default models directory
    pub fn new_default() -> io::Result<Self> {
        Self::new(Self::get_default_models_dir())
    }

    /// Returns the default models directory path
    pub fn get_default_models_dir() -> PathBuf {
        Self::models_dir_from(env::var("SENTIMENT_ADAPTER_CACHE").ok())
    }

    fn models_dir_from(cache_override: Option<String>) -> PathBuf {
        // 1. Check environment variable
        if let Some(path) = cache_override {
            return PathBuf::from(path).join("models");
        }

        // 2. Use platform-specific cache directory
        if let Some(cache_dir) = dirs::cache_dir() {
            return cache_dir.join("sentiment-adapter").join("models");
        }

        // 3. Fallback to user's home directory
        if let Some(home_dir) = dirs::home_dir() {
            return home_dir.join(".cache").join("sentiment-adapter").join("models");
        }

        env::temp_dir().join("sentiment-adapter").join("models")
    }

    pub fn new<P: AsRef<Path>>(models_dir: P) -> io::Result<Self> {
        let models_dir = models_dir.as_ref().to_path_buf();
        fs::create_dir_all(&models_dir)?;
        Ok(Self {
            models_dir,
            download_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Cache directory for a remote bundle, keyed by the digest of its base URL.
    pub fn cache_dir_for(&self, url: &str) -> PathBuf {
        let digest = sha256_hex(url.as_bytes());
        self.models_dir.join(&digest[..16])
    }

    /// Maps a location to its on-disk files without touching the network.
    pub fn resolve(&self, location: &ArtifactLocation) -> Result<ArtifactPaths, ArtifactError> {
        match location {
            ArtifactLocation::Local(dir) => Self::resolve_local(dir),
            ArtifactLocation::Remote(url) => {
                let paths = ArtifactPaths::in_dir(&self.cache_dir_for(url));
                if !paths.exist() {
                    return Err(ArtifactError::NotFetched(url.clone()));
                }
                log::debug!("Resolved cached artifacts for {} in {:?}", url, paths.model.parent());
                Ok(paths)
            }
        }
    }

    /// Resolves a local bundle directory. Needs no cache directory.
    pub fn resolve_local(dir: &Path) -> Result<ArtifactPaths, ArtifactError> {
        let paths = ArtifactPaths::in_dir(dir);
        for path in [&paths.model, &paths.tokenizer] {
            if !path.exists() {
                return Err(ArtifactError::NotFound(path.clone()));
            }
        }
        log::debug!("Resolved local artifacts in {:?}", dir);
        Ok(paths)
    }

    pub fn is_fetched(&self, location: &ArtifactLocation) -> bool {
        self.resolve(location).is_ok()
    }

    /// Downloads a remote bundle into the cache, reusing files that already verify.
    ///
    /// Local locations only need to exist. On failure the partial cache entry is removed.
    pub async fn fetch(
        &self,
        location: &ArtifactLocation,
        hashes: &ExpectedHashes,
    ) -> Result<ArtifactPaths, ArtifactError> {
        let url = match location {
            ArtifactLocation::Local(_) => return self.resolve(location),
            ArtifactLocation::Remote(url) => url,
        };
        let _lock = self.download_lock.lock().await;

        let dir = self.cache_dir_for(url);
        log::info!("Fetching artifacts from {} into {:?}", url, dir);
        fs::create_dir_all(&dir)?;
        let paths = ArtifactPaths::in_dir(&dir);

        let files = [
            (MODEL_FILE, &paths.model, hashes.model.as_deref(), "model"),
            (TOKENIZER_FILE, &paths.tokenizer, hashes.tokenizer.as_deref(), "tokenizer"),
        ];
        for (file, path, expected_hash, file_type) in files {
            let file_url = ArtifactLocation::file_url(url, file);
            if let Err(e) = self.ensure_file(&file_url, path, expected_hash, file_type).await {
                log::error!("Failed to fetch {} from {}: {}", file_type, file_url, e);
                // Only the failing file is dropped; files that verified stay cached
                if path.exists() {
                    if let Err(rm) = fs::remove_file(path) {
                        log::warn!("Failed to remove partial {} file {:?}: {}", file_type, path, rm);
                    }
                }
                return Err(e);
            }
        }

        log::info!("Model and tokenizer ready to use");
        Ok(paths)
    }

    async fn ensure_file(
        &self,
        url: &str,
        path: &Path,
        expected_hash: Option<&str>,
        file_type: &str,
    ) -> Result<(), ArtifactError> {
        if path.exists() {
            match expected_hash {
                None => {
                    log::info!("{} file already cached at {:?}", file_type, path);
                    return Ok(());
                }
                Some(expected) if self.verify_file(path, expected)? => {
                    log::info!("Existing {} file verified successfully", file_type);
                    return Ok(());
                }
                Some(_) => log::warn!("{} file verification failed, redownloading", file_type),
            }
        }
        self.download_and_verify_file(url, path, expected_hash, file_type).await
    }

    fn verify_file(&self, path: &Path, expected_hash: &str) -> Result<bool, ArtifactError> {
        let bytes = fs::read(path)?;
        let hash = sha256_hex(&bytes);
        log::debug!("Verifying {:?}: calculated {}, expected {}", path, hash, expected_hash);
        Ok(hash.eq_ignore_ascii_case(expected_hash))
    }

    /// Checks cached files of a location against expected hashes.
    ///
    /// Returns `false` when files are missing; entries without an expected hash pass.
    pub fn verify(&self, location: &ArtifactLocation, hashes: &ExpectedHashes) -> Result<bool, ArtifactError> {
        let paths = match self.resolve(location) {
            Ok(paths) => paths,
            Err(ArtifactError::NotFound(_)) | Err(ArtifactError::NotFetched(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        let model_ok = match hashes.model.as_deref() {
            Some(expected) => self.verify_file(&paths.model, expected)?,
            None => true,
        };
        let tokenizer_ok = match hashes.tokenizer.as_deref() {
            Some(expected) => self.verify_file(&paths.tokenizer, expected)?,
            None => true,
        };
        log::info!("Verification results: model={}, tokenizer={}", model_ok, tokenizer_ok);
        Ok(model_ok && tokenizer_ok)
    }

    async fn download_and_verify_file(
        &self,
        url: &str,
        path: &Path,
        expected_hash: Option<&str>,
        file_type: &str,
    ) -> Result<(), ArtifactError> {
        log::info!("Downloading {} file from {} to {:?}", file_type, url, path);
        let response = reqwest::get(url).await?.error_for_status()?;
        let bytes = response.bytes().await?;
        log::info!("Downloaded {} bytes", bytes.len());

        if let Some(expected) = expected_hash {
            let hash = sha256_hex(&bytes);
            if !hash.eq_ignore_ascii_case(expected) {
                log::error!("{} hash mismatch: expected {}, got {}", file_type, expected, hash);
                return Err(ArtifactError::HashMismatch {
                    file_type: file_type.to_string(),
                    expected: expected.to_string(),
                    actual: hash,
                });
            }
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, &bytes)?;

        if let Some(expected) = expected_hash {
            if !self.verify_file(path, expected)? {
                return Err(ArtifactError::VerificationFailed);
            }
        }

        log::info!("{} file downloaded successfully", file_type);
        Ok(())
    }

    /// Removes a cached remote bundle. Local locations are never deleted.
    pub fn remove(&self, location: &ArtifactLocation) -> Result<(), ArtifactError> {
        if let ArtifactLocation::Remote(url) = location {
            let paths = ArtifactPaths::in_dir(&self.cache_dir_for(url));
            for path in [&paths.model, &paths.tokenizer] {
                if path.exists() {
                    fs::remove_file(path)?;
                }
            }
        }
        Ok(())
    }
}
