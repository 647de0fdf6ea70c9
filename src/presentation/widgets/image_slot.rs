//! Image state of a reusable list cell.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::domain::entities::{Bitmap, ImageStatus, LoadedImage};
use crate::domain::errors::LoadError;
use crate::infrastructure::image::ImageLoader;

/// Identifier of a slot within its table.
pub type SlotId = u64;

/// Result of a load, addressed to the slot that asked for it.
#[derive(Debug, Clone)]
pub struct SlotImageEvent {
    /// Target slot.
    pub slot: SlotId,
    /// URL the slot was bound to when the load started.
    pub url: String,
    /// Bind generation the load belongs to.
    pub generation: u64,
    /// Load outcome.
    pub result: Result<LoadedImage, LoadError>,
}

#[derive(Debug, Default)]
struct Binding {
    url: Option<String>,
    generation: u64,
}

impl Binding {
    fn matches(&self, url: &str, generation: u64) -> bool {
        self.generation == generation && self.url.as_deref() == Some(url)
    }
}

/// Image state owned by one list cell.
///
/// The load task only holds a weak reference to the binding, so a dropped or
/// rebound slot never receives a result meant for an earlier URL.
#[derive(Debug)]
pub struct LoadSlot {
    id: SlotId,
    binding: Arc<Mutex<Binding>>,
    task: Option<JoinHandle<()>>,
    bitmap: Option<Bitmap>,
    status: ImageStatus,
}

impl LoadSlot {
    /// Creates an unbound slot.
    #[must_use]
    pub fn new(id: SlotId) -> Self {
        Self {
            id,
            binding: Arc::new(Mutex::new(Binding::default())),
            task: None,
            bitmap: None,
            status: ImageStatus::NotStarted,
        }
    }

    /// Starts showing `url`, replacing whatever the slot was bound to.
    pub fn bind(
        &mut self,
        url: impl Into<String>,
        loader: &ImageLoader,
        events: &mpsc::UnboundedSender<SlotImageEvent>,
    ) {
        self.cancel();
        let url = url.into();

        let generation = {
            let mut binding = self.binding.lock();
            binding.generation += 1;
            binding.url = Some(url.clone());
            binding.generation
        };
        self.bitmap = None;
        self.status = ImageStatus::Loading;

        let binding = Arc::downgrade(&self.binding);
        let loader = loader.clone();
        let events = events.clone();
        let slot = self.id;

        self.task = Some(tokio::spawn(async move {
            let result = loader.load(&url).await;
            if !Self::still_bound(&binding, &url, generation) {
                trace!(slot, url = %url, "Dropping result for rebound slot");
                return;
            }
            if matches!(result, Err(LoadError::Cancelled)) {
                return;
            }
            let _ = events.send(SlotImageEvent {
                slot,
                url,
                generation,
                result,
            });
        }));
    }

    fn still_bound(binding: &Weak<Mutex<Binding>>, url: &str, generation: u64) -> bool {
        binding
            .upgrade()
            .is_some_and(|binding| binding.lock().matches(url, generation))
    }

    /// Applies a finished load. Returns false if the event is stale.
    pub fn apply(&mut self, event: SlotImageEvent) -> bool {
        if event.slot != self.id || !self.binding.lock().matches(&event.url, event.generation) {
            trace!(slot = self.id, url = %event.url, "Ignoring stale image event");
            return false;
        }

        self.task = None;
        match event.result {
            Ok(loaded) => {
                self.bitmap = Some(loaded.bitmap);
                self.status = ImageStatus::Ready;
            }
            Err(e) if e.is_cancelled() => return false,
            Err(e) => {
                self.bitmap = None;
                self.status = ImageStatus::Failed(e.to_string());
            }
        }
        true
    }

    /// Unbinds the slot so the cell can show another item.
    pub fn prepare_for_reuse(&mut self) {
        self.cancel();
        let mut binding = self.binding.lock();
        binding.generation += 1;
        binding.url = None;
        drop(binding);
        self.bitmap = None;
        self.status = ImageStatus::NotStarted;
    }

    fn cancel(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    /// Slot ID.
    #[must_use]
    pub const fn id(&self) -> SlotId {
        self.id
    }

    /// Currently bound URL.
    #[must_use]
    pub fn url(&self) -> Option<String> {
        self.binding.lock().url.clone()
    }

    /// Image to draw, if loaded.
    #[must_use]
    pub const fn bitmap(&self) -> Option<&Bitmap> {
        self.bitmap.as_ref()
    }

    /// Load status.
    #[must_use]
    pub const fn status(&self) -> &ImageStatus {
        &self.status
    }
}

impl Drop for LoadSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
