pub mod listener;
pub mod publisher;
pub mod tracker;

pub use listener::ResultListener;
pub use publisher::BusCommandSink;
pub use tracker::InFlight;
