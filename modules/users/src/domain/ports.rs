use async_trait::async_trait;
use plugkit_bus::Command;

/// Output port: announce a committed state change to the followers.
#[async_trait]
pub trait CommandSink: Send + Sync + 'static {
    async fn send(&self, command: Command) -> anyhow::Result<()>;
}
