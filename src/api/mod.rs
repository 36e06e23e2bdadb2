pub mod health;
pub mod identity;
pub mod job;
pub mod validation;
