pub mod telegram;
pub mod terminal;

use error_stack::Report;
use futures::future::BoxFuture;

use crate::error::NotifyError;

/// Sink for briefing messages.
pub trait Notifier: Send + Sync {
    fn channel(&self) -> &str;

    fn send<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<(), Report<NotifyError>>>;
}

/// Send `text` and log any failure. Delivery problems never reach the caller.
pub async fn deliver(notifier: &dyn Notifier, text: &str) -> bool {
    match notifier.send(text).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = ?e, channel = notifier.channel(), "message delivery failed");
            false
        }
    }
}
