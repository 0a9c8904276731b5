//! Delivery of flushed batches to the endpoint

pub mod http;
pub mod memory;
pub mod wire;

pub use http::{HttpPushClient, PUSH_ENDPOINT_V1};
pub use memory::MemoryPushClient;
pub use wire::{encode_push_request, PushRequest, PushStream};

use crate::core::{LogRecord, Result};

/// Transport for one batch at a time
///
/// Owned exclusively by the flush worker, so implementations need `Send`
/// but not `Sync`. A returned error discards the batch; there is no retry.
pub trait PushClient: Send {
    /// Deliver `records` in one call
    fn push(&mut self, records: &[LogRecord]) -> Result<()>;

    /// Name used in diagnostics
    fn name(&self) -> &str;
}
