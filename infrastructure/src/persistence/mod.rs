//! Record persistence: [`JsonlPersistenceStore`] implements the
//! [`PersistenceStore`](ratchet_application::PersistenceStore) port.

mod jsonl_store;

pub use jsonl_store::JsonlPersistenceStore;
