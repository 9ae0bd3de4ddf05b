pub mod applier;
pub mod error;
pub mod ports;
