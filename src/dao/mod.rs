/// Strictly increasing server timestamps shared by the store backends.
pub mod clock;
/// Event and request persistence behind the [`event_store::EventStore`] trait.
pub mod event_store;
/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
