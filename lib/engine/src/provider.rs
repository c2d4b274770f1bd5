//! Embedding provider
//!
//! Turns normalized text into fixed-length vectors, hiding the cost of model
//! acquisition. The underlying model is process-wide state initialized
//! exactly once on first use; if initialization fails the provider enters a
//! degraded mode in which `embed`/`embed_batch` return the unavailable
//! sentinel instead of erroring, and the failure is recorded once rather
//! than re-attempted on every call.

use std::sync::OnceLock;

use fastembed::{EmbeddingModel as FastembedModel, InitOptions, TextEmbedding};
use parking_lot::Mutex;
use tracing::{info, warn};

use attrmap_core::Vector;

/// A loaded embedding model
///
/// Implementations embed batches of already-normalized strings, one vector
/// per input, in input order.
pub trait TextEncoder: Send {
    fn encode(&mut self, texts: &[String]) -> anyhow::Result<Vec<Vector>>;
}

/// Model acquisition strategy
///
/// Separated from [`EmbeddingProvider`] so tests can inject encoders that
/// return fixed vectors or fail deterministically.
pub trait ModelLoader: Send + Sync {
    /// Short identifier used in log output
    fn describe(&self) -> String;

    fn load(&self) -> anyhow::Result<Box<dyn TextEncoder>>;
}

/// Loads a pretrained sentence-embedding model through fastembed (ONNX)
///
/// The model id is matched case-insensitively against the supported model
/// set, with or without a repository prefix ("sentence-transformers/
/// all-MiniLM-L6-v2" and "all-minilm-l6-v2" both resolve).
#[derive(Debug, Clone)]
pub struct FastembedLoader {
    model_id: String,
}

impl FastembedLoader {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            model_id: model_id.into(),
        }
    }
}

fn model_from_id(id: &str) -> Option<FastembedModel> {
    let short = id.trim().rsplit('/').next().unwrap_or(id).to_ascii_lowercase();
    match short.as_str() {
        "all-minilm-l6-v2" => Some(FastembedModel::AllMiniLML6V2),
        "all-minilm-l12-v2" => Some(FastembedModel::AllMiniLML12V2),
        "bge-small-en-v1.5" => Some(FastembedModel::BGESmallENV15),
        "bge-base-en-v1.5" => Some(FastembedModel::BGEBaseENV15),
        "bge-large-en-v1.5" => Some(FastembedModel::BGELargeENV15),
        "nomic-embed-text-v1.5" => Some(FastembedModel::NomicEmbedTextV15),
        "paraphrase-multilingual-minilm-l12-v2" => {
            Some(FastembedModel::ParaphraseMLMiniLML12V2)
        }
        "multilingual-e5-small" => Some(FastembedModel::MultilingualE5Small),
        _ => None,
    }
}

impl ModelLoader for FastembedLoader {
    fn describe(&self) -> String {
        self.model_id.clone()
    }

    fn load(&self) -> anyhow::Result<Box<dyn TextEncoder>> {
        let model = model_from_id(&self.model_id).ok_or_else(|| {
            anyhow::anyhow!("unknown embedding model id '{}'", self.model_id)
        })?;
        let embedding =
            TextEmbedding::try_new(InitOptions::new(model).with_show_download_progress(false))?;
        Ok(Box::new(FastembedEncoder { inner: embedding }))
    }
}

struct FastembedEncoder {
    inner: TextEmbedding,
}

impl TextEncoder for FastembedEncoder {
    fn encode(&mut self, texts: &[String]) -> anyhow::Result<Vec<Vector>> {
        let embeddings = self.inner.embed(texts.to_vec(), None)?;
        Ok(embeddings.into_iter().map(Vector::new).collect())
    }
}

/// Loader used when embedding matching is switched off in configuration;
/// the provider starts degraded without attempting any model download
#[derive(Debug, Clone, Copy)]
pub struct DisabledLoader;

impl ModelLoader for DisabledLoader {
    fn describe(&self) -> String {
        "disabled".to_string()
    }

    fn load(&self) -> anyhow::Result<Box<dyn TextEncoder>> {
        Err(anyhow::anyhow!("embedding matching disabled by configuration"))
    }
}

/// Process-wide lazily-initialized embedding model
///
/// Explicitly constructed and injectable; exactly one initialization attempt
/// occurs even under concurrent first use, and all callers observe its
/// outcome. `None` from `embed`/`embed_batch` is the degraded-mode sentinel.
pub struct EmbeddingProvider {
    loader: Box<dyn ModelLoader>,
    state: OnceLock<Option<Mutex<Box<dyn TextEncoder>>>>,
}

impl EmbeddingProvider {
    pub fn new(loader: Box<dyn ModelLoader>) -> Self {
        Self {
            loader,
            state: OnceLock::new(),
        }
    }

    /// Provider backed by a fastembed pretrained model
    pub fn fastembed(model_id: impl Into<String>) -> Self {
        Self::new(Box::new(FastembedLoader::new(model_id)))
    }

    /// Provider that is degraded from the start
    pub fn disabled() -> Self {
        Self::new(Box::new(DisabledLoader))
    }

    fn encoder(&self) -> Option<&Mutex<Box<dyn TextEncoder>>> {
        self.state
            .get_or_init(|| {
                info!(model = %self.loader.describe(), "loading embedding model");
                match self.loader.load() {
                    Ok(encoder) => {
                        info!("embedding model loaded");
                        Some(Mutex::new(encoder))
                    }
                    Err(e) => {
                        warn!(
                            model = %self.loader.describe(),
                            "embedding model unavailable, degrading to exact matching only: {e:#}"
                        );
                        None
                    }
                }
            })
            .as_ref()
    }

    /// Whether the model is usable; triggers initialization on first call
    pub fn is_available(&self) -> bool {
        self.encoder().is_some()
    }

    /// Embed a single already-normalized string
    pub fn embed(&self, text: &str) -> Option<Vector> {
        self.embed_batch(std::slice::from_ref(&text.to_string()))
            .and_then(|mut vectors| vectors.pop())
    }

    /// Embed a batch, one vector per input in input order
    pub fn embed_batch(&self, texts: &[String]) -> Option<Vec<Vector>> {
        if texts.is_empty() {
            return Some(Vec::new());
        }
        let encoder = self.encoder()?;
        let mut guard = encoder.lock();
        match guard.encode(texts) {
            Ok(vectors) if vectors.len() == texts.len() => Some(vectors),
            Ok(vectors) => {
                warn!(
                    expected = texts.len(),
                    got = vectors.len(),
                    "embedding backend returned a mismatched batch"
                );
                None
            }
            Err(e) => {
                warn!("embedding failed: {e:#}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct StubEncoder;

    impl TextEncoder for StubEncoder {
        fn encode(&mut self, texts: &[String]) -> anyhow::Result<Vec<Vector>> {
            Ok(texts
                .iter()
                .map(|t| Vector::new(vec![t.len() as f32, 1.0]))
                .collect())
        }
    }

    struct CountingLoader {
        loads: Arc<AtomicUsize>,
        fail: bool,
    }

    impl ModelLoader for CountingLoader {
        fn describe(&self) -> String {
            "counting-stub".to_string()
        }

        fn load(&self) -> anyhow::Result<Box<dyn TextEncoder>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                anyhow::bail!("model artifact missing");
            }
            Ok(Box::new(StubEncoder))
        }
    }

    #[test]
    fn test_embed_batch_preserves_order() {
        let provider = EmbeddingProvider::new(Box::new(CountingLoader {
            loads: Arc::new(AtomicUsize::new(0)),
            fail: false,
        }));
        let vectors = provider
            .embed_batch(&["a".to_string(), "abc".to_string()])
            .unwrap();
        assert_eq!(vectors[0].as_slice()[0], 1.0);
        assert_eq!(vectors[1].as_slice()[0], 3.0);
    }

    #[test]
    fn test_initialization_happens_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let provider = EmbeddingProvider::new(Box::new(CountingLoader {
            loads: loads.clone(),
            fail: false,
        }));
        provider.embed("first");
        provider.embed("second");
        assert!(provider.is_available());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_initialization_is_not_retried() {
        let loads = Arc::new(AtomicUsize::new(0));
        let provider = EmbeddingProvider::new(Box::new(CountingLoader {
            loads: loads.clone(),
            fail: true,
        }));
        assert_eq!(provider.embed("query"), None);
        assert_eq!(provider.embed("query"), None);
        assert!(!provider.is_available());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disabled_provider_is_degraded() {
        let provider = EmbeddingProvider::disabled();
        assert!(!provider.is_available());
        assert_eq!(provider.embed_batch(&["x".to_string()]), None);
    }

    #[test]
    fn test_empty_batch_short_circuits() {
        // no model work for an empty batch, even on a degraded provider
        let provider = EmbeddingProvider::disabled();
        assert_eq!(provider.embed_batch(&[]), Some(Vec::new()));
    }

    #[test]
    fn test_model_id_resolution() {
        assert!(model_from_id("all-minilm-l6-v2").is_some());
        assert!(model_from_id("sentence-transformers/all-MiniLM-L6-v2").is_some());
        assert!(model_from_id("BGE-Small-EN-v1.5").is_some());
        assert!(model_from_id("made-up-model").is_none());
    }
}
