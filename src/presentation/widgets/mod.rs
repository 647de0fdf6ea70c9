mod image_slot;
mod slot_table;

pub use image_slot::{LoadSlot, SlotId, SlotImageEvent};
pub use slot_table::SlotTable;
