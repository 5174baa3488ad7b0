//! Asynchronous listing loading.
//!
//! Fixture files can be large and Brotli compressed, so they are decoded on a
//! background thread while the GUI keeps painting.

use docview::fixture::{generate, GeneratorConfig};
use docview::{InMemorySource, JsonListingSource};
use eframe::egui;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;

pub enum LoadResult {
    Success {
        source: JsonListingSource,
        path: PathBuf,
    },
    Error(String),
    /// Nothing finished since the last check
    None,
}

pub struct AsyncLoader {
    in_progress: Arc<Mutex<bool>>,
    receiver: Option<Receiver<Result<JsonListingSource, String>>>,
    pending_path: Option<PathBuf>,
}

impl AsyncLoader {
    pub fn new() -> Self {
        Self {
            in_progress: Arc::new(Mutex::new(false)),
            receiver: None,
            pending_path: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        *self.in_progress.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn pending_path(&self) -> Option<&PathBuf> {
        self.pending_path.as_ref()
    }

    /// Starts decoding a listing on a background thread.
    ///
    /// # Arguments
    /// * `path` - A `.json` or Brotli-compressed `.json.br` fixture
    /// * `ctx` - Repainted when decoding finishes
    ///
    /// # Examples
    /// ```ignore
    /// loader.start_listing_load(PathBuf::from("listing.json.br"), ctx);
    /// // later, once per frame:
    /// if let LoadResult::Success { source, path } = loader.check_completion() { /* ... */ }
    /// ```
    pub fn start_listing_load(&mut self, path: PathBuf, ctx: &egui::Context) {
        let (sender, receiver) = channel();
        self.receiver = Some(receiver);
        *self.in_progress.lock().unwrap_or_else(|e| e.into_inner()) = true;
        self.pending_path = Some(path.clone());

        let in_progress = Arc::clone(&self.in_progress);
        let ctx = ctx.clone();
        tracing::info!(path = %path.display(), "loading listing");

        thread::spawn(move || {
            let result = JsonListingSource::open(&path).map_err(|e| format!("{:#}", e));
            let _ = sender.send(result);
            *in_progress.lock().unwrap_or_else(|e| e.into_inner()) = false;
            ctx.request_repaint();
        });
    }

    /// Builds a generated tree for one category. Synchronous; generation is
    /// fast for the default shape.
    pub fn generated_listing(seed: u64) -> (InMemorySource, String) {
        let fixture = generate(&GeneratorConfig {
            seed,
            ..GeneratorConfig::default()
        });
        let root = fixture.root.clone();
        (InMemorySource::from(fixture), root)
    }

    /// Checks whether a background load finished.
    ///
    /// # Returns
    /// `LoadResult::None` while loading or idle, otherwise the decoded source
    /// with its path, or the error text
    pub fn check_completion(&mut self) -> LoadResult {
        let Some(receiver) = &self.receiver else {
            return LoadResult::None;
        };
        let Ok(result) = receiver.try_recv() else {
            return LoadResult::None;
        };

        self.receiver = None;
        let path = self.pending_path.take();
        match (result, path) {
            (Ok(source), Some(path)) => LoadResult::Success { source, path },
            (Ok(_), None) => LoadResult::Error("listing finished without a path".to_string()),
            (Err(message), _) => LoadResult::Error(message),
        }
    }
}

impl Default for AsyncLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idle_loader_reports_nothing() {
        let mut loader = AsyncLoader::new();
        assert!(!loader.is_loading());
        assert!(matches!(loader.check_completion(), LoadResult::None));
    }

    #[test]
    fn test_generated_listing_has_root() {
        let (source, root) = AsyncLoader::generated_listing(3);
        assert!(source.folder(&root).is_some());
        assert!(source.folder_count() > 1);
    }
}
