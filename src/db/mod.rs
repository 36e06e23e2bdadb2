pub mod connection;
pub mod job_store;
pub mod memory;
pub mod migrations;
pub mod models;

pub use job_store::{JobPatch, JobStore, NewJob, PgJobStore, StoreError};
pub use memory::MemoryJobStore;
