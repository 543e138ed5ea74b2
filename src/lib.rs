//! Relay between a Freshdesk helpdesk and Telegram chats.
//!
//! Helpdesk webhooks are turned into chat notifications, monitoring tickets
//! are correlated so an UP alert closes the matching DOWN tickets, and a chat
//! bot lets agents browse and update tickets.

pub mod api;
pub mod bot;
pub mod config;
pub mod correlation;
pub mod error;
pub mod gateway;
pub mod metrics;
pub mod models;
pub mod notifications;
pub mod processing;
pub mod state;

pub use error::{AppError, Result};
