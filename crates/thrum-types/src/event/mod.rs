pub mod envelope;
pub mod payload;

pub use envelope::{EventRecord, SCHEMA_VERSION};
pub use payload::EventPayload;
