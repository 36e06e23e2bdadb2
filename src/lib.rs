pub mod api;
pub mod config;
pub mod db;
pub mod events;
pub mod remote;
pub mod shutdown;
pub mod worker;
