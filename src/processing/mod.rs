pub mod dispatcher;
pub mod webhook_log;

pub use dispatcher::{DispatchOutcome, EventDispatcher};
pub use webhook_log::{WebhookLog, WebhookLogEntry};
