pub mod listener;
pub mod ocs;

pub use listener::CommandListener;
pub use ocs::OcsClient;
