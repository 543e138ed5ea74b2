//! Telegram chat bot: command parsing, execution and update polling.

pub mod commands;
pub mod handler;
pub mod poller;

pub use commands::{parse, BotCommand};
pub use handler::{BotHandler, BotReply};
pub use poller::BotPoller;
