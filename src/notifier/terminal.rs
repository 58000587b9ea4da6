use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::NotifyError;
use crate::notifier::Notifier;

/// Writes messages to the log instead of a chat. Used for dry runs.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn channel(&self) -> &str {
        "terminal"
    }

    fn send<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<(), Report<NotifyError>>> {
        Box::pin(async move {
            tracing::info!(channel = "terminal", "BRIEFING:\n{text}");
            Ok(())
        })
    }
}
