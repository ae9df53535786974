use crate::events::NarrationEvent;

pub trait NarrationRuntime: narration_storage::StorageRuntime {
    fn emit(&self, event: NarrationEvent);
}
