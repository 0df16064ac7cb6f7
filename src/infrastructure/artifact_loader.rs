//! File-backed model artifact loader.
//!
//! The artifact is read at most once per loader on success and then shared
//! read-only by every request. Concurrent first callers serialize on an init
//! lock so only one of them touches the file. Failed loads are not cached.

use crate::application::ml::pipeline::{ARTIFACT_FORMAT_VERSION, ModelArtifact};
use crate::domain::errors::LoadError;
use crate::domain::ports::{ModelProvider, PricePredictor};
use crate::infrastructure::observability::Metrics;
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;
use tracing::{error, info, warn};

pub struct ArtifactLoader {
    path: PathBuf,
    cached: OnceLock<Arc<ModelArtifact>>,
    init_lock: Mutex<()>,
    reads: AtomicUsize,
    metrics: Option<Metrics>,
}

impl ArtifactLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: OnceLock::new(),
            init_lock: Mutex::new(()),
            reads: AtomicUsize::new(0),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of times the artifact file has been opened and parsed
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn is_loaded(&self) -> bool {
        self.cached.get().is_some()
    }

    /// Returns the cached artifact, reading it from disk on first success.
    pub fn load(&self) -> Result<Arc<ModelArtifact>, LoadError> {
        if let Some(artifact) = self.cached.get() {
            return Ok(artifact.clone());
        }

        // A poisoned lock only means another loader thread panicked; the
        // cache itself is still consistent.
        let _guard = self
            .init_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(artifact) = self.cached.get() {
            return Ok(artifact.clone());
        }

        let started = Instant::now();
        match self.read_artifact() {
            Ok(artifact) => {
                let artifact = Arc::new(artifact);
                let _ = self.cached.set(artifact.clone());
                info!(
                    "Successfully loaded model {} from {:?} in {:?}",
                    artifact.version(),
                    self.path,
                    started.elapsed()
                );
                self.record_outcome("loaded");
                Ok(artifact)
            }
            Err(err) => {
                match &err {
                    LoadError::ArtifactNotFound { .. } => {
                        warn!("Model artifact not found at {:?}", self.path);
                        self.record_outcome("not_found");
                    }
                    LoadError::ArtifactCorrupt { reason, .. } => {
                        error!("Failed to load model artifact {:?}: {}", self.path, reason);
                        self.record_outcome("corrupt");
                    }
                }
                Err(err)
            }
        }
    }

    fn read_artifact(&self) -> Result<ModelArtifact, LoadError> {
        if !self.path.exists() {
            return Err(LoadError::ArtifactNotFound {
                path: self.path.clone(),
            });
        }

        self.reads.fetch_add(1, Ordering::SeqCst);

        let file = File::open(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LoadError::ArtifactNotFound {
                path: self.path.clone(),
            },
            _ => self.corrupt(format!("cannot open file: {}", e)),
        })?;

        let artifact: ModelArtifact = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| self.corrupt(format!("deserialization failed: {}", e)))?;

        if artifact.format_version() != ARTIFACT_FORMAT_VERSION {
            return Err(self.corrupt(format!(
                "unsupported format version {} (expected {})",
                artifact.format_version(),
                ARTIFACT_FORMAT_VERSION
            )));
        }

        artifact
            .validate()
            .map_err(|e| self.corrupt(format!("inconsistent fitted state: {}", e)))?;

        Ok(artifact)
    }

    fn corrupt(&self, reason: String) -> LoadError {
        LoadError::ArtifactCorrupt {
            path: self.path.clone(),
            reason,
        }
    }

    fn record_outcome(&self, outcome: &str) {
        if let Some(metrics) = &self.metrics {
            metrics.inc_model_loads(outcome);
            metrics
                .model_loaded
                .set(if self.is_loaded() { 1.0 } else { 0.0 });
        }
    }
}

impl ModelProvider for ArtifactLoader {
    fn model(&self) -> Result<Arc<dyn PricePredictor>, LoadError> {
        let artifact: Arc<dyn PricePredictor> = self.load()?;
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::sync::atomic::AtomicU64;

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let unique_id = TEST_COUNTER.fetch_add(1, Ordering::SeqCst);
        let dir = std::env::temp_dir().join(format!(
            "autovalue_loader_{}_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0),
            unique_id
        ));
        fs::create_dir_all(&dir).expect("Failed to create test temp dir");
        dir
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let dir = temp_dir();
        let metrics = Metrics::new().unwrap();
        let loader = ArtifactLoader::new(dir.join("absent.json")).with_metrics(metrics.clone());

        let err = loader.load().err().unwrap();
        assert!(matches!(err, LoadError::ArtifactNotFound { .. }));
        assert_eq!(loader.read_count(), 0);
        assert!(!loader.is_loaded());
        assert!(metrics.render().contains("not_found"));

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_garbage_file_is_corrupt() {
        let dir = temp_dir();
        let path = dir.join("model.json");
        fs::write(&path, b"\x00\x01 not json").unwrap();
        let loader = ArtifactLoader::new(&path);

        let err = loader.load().err().unwrap();
        assert!(matches!(err, LoadError::ArtifactCorrupt { .. }));
        assert_eq!(loader.read_count(), 1);

        // Failures are not cached; the next call reads again
        assert!(loader.load().is_err());
        assert_eq!(loader.read_count(), 2);

        fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_model_provider_surfaces_load_error() {
        let dir = temp_dir();
        let loader = ArtifactLoader::new(dir.join("absent.json"));
        assert_eq!(loader.path(), dir.join("absent.json"));
        assert!(loader.model().is_err());
        fs::remove_dir_all(dir).ok();
    }
}
