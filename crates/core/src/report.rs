//! Progress callbacks for whatever UI drives a session.

/// Receives status updates while a session runs.
///
/// Mirrors a small popup: a main status line, a secondary line, a final
/// result (with whether the trigger control should be usable again) and a
/// note shown next to the trigger control.
pub trait ProgressReporter: Send + Sync {
    fn status(&self, text: &str);

    fn status_secondary(&self, _text: &str) {}

    /// Terminal message of the session.
    fn result(&self, message: &str, reenable_control: bool);

    fn button_note(&self, _text: &str) {}
}

/// Discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullReporter;

impl ProgressReporter for NullReporter {
    fn status(&self, _text: &str) {}

    fn result(&self, _message: &str, _reenable_control: bool) {}
}

/// Forwards updates to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ProgressReporter for TracingReporter {
    fn status(&self, text: &str) {
        tracing::info!(status = text);
    }

    fn status_secondary(&self, text: &str) {
        tracing::debug!(status = text);
    }

    fn result(&self, message: &str, reenable_control: bool) {
        tracing::info!(reenable_control, "{}", message);
    }
}
