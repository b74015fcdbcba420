use std::sync::atomic::{AtomicU16, Ordering};
use tracing::info;

/// Process-local bus context.
///
/// Owns the publisher-id counter: ids are unique within one `Bus` only
/// (id 0 is reserved, the counter starts at 1). Two `Bus` values in one
/// process hand out independent id sequences; nothing is coordinated
/// across processes.
pub struct Bus {
    name: String,
    next_pub_id: AtomicU16,
}

impl Bus {
    pub fn new(name: &str) -> Self {
        info!(app = name, "basalt bus context initialized");
        Self {
            name: name.to_string(),
            next_pub_id: AtomicU16::new(1),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn alloc_pub_id(&self) -> u16 {
        self.next_pub_id.fetch_add(1, Ordering::Relaxed)
    }
}
