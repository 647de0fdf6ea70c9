//! Owner of every image slot of a list, and router of their load results.

use std::collections::HashMap;

use tokio::sync::mpsc;
use tracing::trace;

use super::image_slot::{LoadSlot, SlotId, SlotImageEvent};
use crate::infrastructure::image::ImageLoader;

/// Slots by ID plus the channel their loads report on.
///
/// Results are only applied by [`SlotTable::dispatch`], [`SlotTable::drain`] and
/// [`SlotTable::next_event`], so the owner decides which task touches slot state.
#[derive(Debug)]
pub struct SlotTable {
    loader: ImageLoader,
    slots: HashMap<SlotId, LoadSlot>,
    next_id: SlotId,
    events_tx: mpsc::UnboundedSender<SlotImageEvent>,
    events_rx: mpsc::UnboundedReceiver<SlotImageEvent>,
}

impl SlotTable {
    /// Creates an empty table loading through `loader`.
    #[must_use]
    pub fn new(loader: ImageLoader) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            loader,
            slots: HashMap::new(),
            next_id: 0,
            events_tx,
            events_rx,
        }
    }

    /// Adds an unbound slot.
    pub fn create_slot(&mut self) -> SlotId {
        let id = self.next_id;
        self.next_id += 1;
        self.slots.insert(id, LoadSlot::new(id));
        id
    }

    /// Binds slot `id` to `url`. Returns false for an unknown slot.
    pub fn bind(&mut self, id: SlotId, url: impl Into<String>) -> bool {
        let Some(slot) = self.slots.get_mut(&id) else {
            return false;
        };
        slot.bind(url, &self.loader, &self.events_tx);
        true
    }

    /// Unbinds slot `id` for reuse.
    pub fn prepare_for_reuse(&mut self, id: SlotId) {
        if let Some(slot) = self.slots.get_mut(&id) {
            slot.prepare_for_reuse();
        }
    }

    /// Drops slot `id`, cancelling its load.
    pub fn release(&mut self, id: SlotId) {
        self.slots.remove(&id);
    }

    /// Returns slot `id`.
    #[must_use]
    pub fn slot(&self, id: SlotId) -> Option<&LoadSlot> {
        self.slots.get(&id)
    }

    /// Number of slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if there are no slots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Routes one event to its slot. Returns true if it was applied.
    pub fn dispatch(&mut self, event: SlotImageEvent) -> bool {
        match self.slots.get_mut(&event.slot) {
            Some(slot) => slot.apply(event),
            None => {
                trace!(slot = event.slot, "Image event for released slot");
                false
            }
        }
    }

    /// Applies every event already queued. Returns how many were applied.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if self.dispatch(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Waits for the next event and applies it. Returns the slot it targeted
    /// and whether it was applied.
    pub async fn next_event(&mut self) -> Option<(SlotId, bool)> {
        let event = self.events_rx.recv().await?;
        let slot = event.slot;
        Some((slot, self.dispatch(event)))
    }

    /// Returns true if any slot is still loading.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.slots.values().any(|slot| slot.status().is_loading())
    }
}
