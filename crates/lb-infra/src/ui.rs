/// Sink for user-facing progress messages.
pub trait Ui: Send + Sync + 'static {
    fn info(&self, message: &str);
}

/// Emits progress through `tracing` under the `lb::ui` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingUi;

impl Ui for TracingUi {
    fn info(&self, message: &str) {
        tracing::info!(target: "lb::ui", "{message}");
    }
}
