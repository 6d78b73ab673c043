use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;

type Loader<M> = Box<dyn Fn(&Path) -> anyhow::Result<M> + Send + Sync>;

/// Process-scoped holder of a loaded model.
///
/// The model is loaded on first use (or by [`preload`](Self::preload)) and
/// shared read-only afterwards. Loading happens while the slot lock is held,
/// so concurrent first callers wait for a single load. The instance is only
/// replaced by [`reload`](Self::reload) and is dropped with the cache.
pub struct ModelCache<M> {
    path: PathBuf,
    loader: Loader<M>,
    slot: Mutex<Option<Arc<M>>>,
}

impl<M> fmt::Debug for ModelCache<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelCache")
            .field("path", &self.path)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl<M> ModelCache<M> {
    pub fn new<P, F>(path: P, loader: F) -> Self
    where
        P: AsRef<Path>,
        F: Fn(&Path) -> anyhow::Result<M> + Send + Sync + 'static,
    {
        Self {
            path: path.as_ref().to_path_buf(),
            loader: Box::new(loader),
            slot: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the cached model, loading it if this is the first use.
    pub fn get(&self) -> anyhow::Result<Arc<M>> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("model cache lock poisoned"))?;
        if let Some(model) = slot.as_ref() {
            return Ok(model.clone());
        }
        let model = Arc::new(self.load()?);
        *slot = Some(model.clone());
        Ok(model)
    }

    pub fn preload(&self) -> anyhow::Result<()> {
        self.get().map(|_| ())
    }

    /// Load the artifact again and replace the cached instance.
    /// Callers still holding the previous instance keep using it.
    pub fn reload(&self) -> anyhow::Result<Arc<M>> {
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow::anyhow!("model cache lock poisoned"))?;
        let model = Arc::new(self.load()?);
        *slot = Some(model.clone());
        Ok(model)
    }

    pub fn is_loaded(&self) -> bool {
        self.slot.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    fn load(&self) -> anyhow::Result<M> {
        log::info!("Loading model from {:?}", self.path);
        (self.loader)(&self.path)
            .with_context(|| format!("Failed to load model {:?}", self.path))
    }
}
