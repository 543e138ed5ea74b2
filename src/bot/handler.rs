use crate::bot::commands::BotCommand;
use crate::error::AppError;
use crate::gateway::HelpdeskApi;
use crate::metrics::BOT_COMMANDS_TOTAL;
use crate::models::{OutgoingMessage, RecipientId, ReplyKeyboard, TicketPriority, TicketStatus};
use crate::state::{RecipientRegistry, SessionRegistry, UserId};
use std::fmt::Write;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

/// A reply sent back to the chat that issued a command
pub type BotReply = OutgoingMessage;

const NO_TICKET_SELECTED: &str =
    "❌ No ticket selected. Please send a ticket number first (e.g., 41305)";

const SUBJECT_PREVIEW_CHARS: usize = 40;

/// Executes parsed bot commands against the helpdesk and local registries
pub struct BotHandler {
    helpdesk: Arc<dyn HelpdeskApi>,
    recipients: RecipientRegistry,
    sessions: SessionRegistry,
    webhook_url: Option<String>,
    started_at: Instant,
}

fn main_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::new(&[&["/help", "/status"], &["/tickets", "/open"], &["/agents"]])
}

fn welcome_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::new(&[&["/help", "/settings"], &["/status", "/tickets"]])
}

fn ticket_keyboard() -> ReplyKeyboard {
    ReplyKeyboard::new(&[
        &["status open", "status pending"],
        &["status resolved", "status closed"],
        &["priority low", "priority high"],
        &["Back to menu"],
    ])
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// First 40 characters of a subject, with "..." when cut
pub(crate) fn preview(subject: &str) -> String {
    if subject.chars().count() > SUBJECT_PREVIEW_CHARS {
        let cut: String = subject.chars().take(SUBJECT_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        subject.to_string()
    }
}

fn help_text() -> &'static str {
    "📚 Available Commands:

/start - Start the bot (register for notifications)
/help - Show this help menu
/status - Check bot and Freshdesk status
/tickets - Get all tickets
/open - Show only OPEN/PENDING tickets
/agents - List active agents
/test - Send test notification

🎯 UPDATE TICKETS BY NUMBER:

Simply send a ticket number to view and update it:
  123            → View ticket #123

Update by replying with:
  status resolved    (open/pending/resolved/closed)
  priority high      (low/medium/high/urgent)
  note Your text     (add private note)
  comment Message    (add public comment)

🔔 Notifications:
Receive automatic updates about:
• New tickets created
• Ticket updates and comments
• Status changes
• Agent assignments"
}

fn tips_text() -> &'static str {
    "💡 Quick tips:
• Send a ticket number (e.g., \"123\" or \"#123\") to view and update it
• Use /help for all commands

📝 Or type a command like:
  status resolved
  priority high
  note Your note here"
}

impl BotHandler {
    pub fn new(
        helpdesk: Arc<dyn HelpdeskApi>,
        recipients: RecipientRegistry,
        sessions: SessionRegistry,
        webhook_url: Option<String>,
    ) -> Self {
        Self {
            helpdesk,
            recipients,
            sessions,
            webhook_url,
            started_at: Instant::now(),
        }
    }

    /// Run one command and build the reply; failures become apology replies
    pub async fn handle(
        &self,
        chat_id: RecipientId,
        user_id: UserId,
        command: BotCommand,
    ) -> BotReply {
        BOT_COMMANDS_TOTAL
            .with_label_values(&[command.name()])
            .inc();

        match command {
            BotCommand::Start => self.start(chat_id, user_id),
            BotCommand::Help => OutgoingMessage::text(help_text()),
            BotCommand::Status => self.status().await,
            BotCommand::Settings => self.settings(user_id),
            BotCommand::Tickets => self.tickets().await,
            BotCommand::Open => self.open_tickets().await,
            BotCommand::Agents => self.agents().await,
            BotCommand::Test => self.test_notification(user_id),
            BotCommand::Debug => self.debug().await,
            BotCommand::ViewTicket(ticket_id) => self.view_ticket(user_id, ticket_id).await,
            BotCommand::SetStatus(value) => self.set_status(user_id, &value).await,
            BotCommand::SetPriority(value) => self.set_priority(user_id, &value).await,
            BotCommand::AddNote(body) => self.add_note(user_id, &body).await,
            BotCommand::AddComment(body) => self.add_comment(user_id, &body).await,
            BotCommand::HelpHint => OutgoingMessage::text("Use /help to see available commands."),
            BotCommand::BackToMenu => {
                OutgoingMessage::text("🏠 Main Menu").with_keyboard(main_keyboard())
            }
            BotCommand::Unrecognized => OutgoingMessage::text(tips_text()),
        }
    }

    fn start(&self, chat_id: RecipientId, user_id: UserId) -> BotReply {
        self.sessions.ensure_settings(user_id);
        self.recipients.register(chat_id);

        info!(user_id, chat_id, "✅ User started bot and registered for notifications");

        OutgoingMessage::text(
            "🎉 Welcome to the Freshdesk relay bot!

I'm your Freshdesk notification assistant. I'll send you real-time updates about:
• New tickets
• Ticket updates
• Assigned tickets
• Status changes

Use /help to see all available commands.",
        )
        .with_keyboard(welcome_keyboard())
    }

    async fn status(&self) -> BotReply {
        let connected = self.helpdesk.check_connection().await;
        let (icon, label) = if connected {
            ("🟢", "Connected")
        } else {
            ("🔴", "Disconnected")
        };

        OutgoingMessage::text(format!(
            "✅ Bot Status\n\nTelegram Bot: 🟢 Connected\nFreshdesk API: {} {}\n\nUptime: {}s\nBot Version: {}",
            icon,
            label,
            self.started_at.elapsed().as_secs(),
            env!("CARGO_PKG_VERSION")
        ))
    }

    fn settings(&self, user_id: UserId) -> BotReply {
        let settings = self.sessions.settings(user_id).unwrap_or_default();
        let list_or_all = |items: &[String]| {
            if items.is_empty() {
                "All".to_string()
            } else {
                items.join(", ")
            }
        };

        OutgoingMessage::text(format!(
            "⚙️ Notification Settings\n\nCurrent Preferences:\n• Notifications: {}\n• Filter by Status: {}\n• Filter by Priority: {}\n\nTo modify settings, contact your administrator.",
            if settings.notifications { "✅" } else { "❌" },
            list_or_all(&settings.filter_status),
            list_or_all(&settings.filter_priority)
        ))
    }

    async fn tickets(&self) -> BotReply {
        let tickets = match self.helpdesk.recent_tickets(100).await {
            Ok(tickets) => tickets,
            Err(e) => {
                error!(error = %e, "Tickets fetch error");
                return OutgoingMessage::text("❌ Error fetching tickets. Please try again later.");
            }
        };

        if tickets.is_empty() {
            return OutgoingMessage::text("No tickets found.");
        }

        let open = tickets.iter().filter(|t| t.status.is_open()).count();
        let mut message = format!(
            "📋 All Tickets (Total: {})\nOpen: {} | Closed: {}\n\n<b>All Tickets:</b>\n\n",
            tickets.len(),
            open,
            tickets.len() - open
        );

        for ticket in &tickets {
            let emoji = match ticket.status {
                TicketStatus::Open | TicketStatus::Pending => "🔴",
                _ => "✅",
            };
            let _ = writeln!(
                message,
                "{} #{} - {}\n   Status: {} | Priority: {}",
                emoji,
                ticket.id,
                escape_html(&preview(&ticket.subject)),
                ticket.status,
                ticket.priority
            );
        }

        OutgoingMessage::text(message).html()
    }

    async fn open_tickets(&self) -> BotReply {
        let tickets = match self.helpdesk.recent_tickets(50).await {
            Ok(tickets) => tickets,
            Err(e) => {
                error!(error = %e, "Open tickets fetch error");
                return OutgoingMessage::text(
                    "❌ Error fetching open tickets. Please try again later.",
                );
            }
        };

        let open: Vec<_> = tickets.iter().filter(|t| t.status.is_open()).collect();
        if open.is_empty() {
            return OutgoingMessage::text("✅ No open tickets! All tickets are resolved.");
        }

        let mut message = format!("🔴 OPEN TICKETS ({} total)\n\n", open.len());
        for (index, ticket) in open.iter().enumerate() {
            let _ = writeln!(
                message,
                "{}. #{} - {}\n   Status: {} | Priority: {}",
                index + 1,
                ticket.id,
                ticket.subject,
                ticket.status,
                ticket.priority
            );
        }

        OutgoingMessage::text(message)
    }

    async fn agents(&self) -> BotReply {
        let agents = match self.helpdesk.agents().await {
            Ok(agents) => agents,
            Err(e) => {
                error!(error = %e, "Agents fetch error");
                return OutgoingMessage::text("❌ Error fetching agents. Please try again later.");
            }
        };

        if agents.is_empty() {
            return OutgoingMessage::text("No agents found.");
        }

        let mut message = String::from("👥 Active Agents:\n\n");
        for (index, agent) in agents.iter().enumerate() {
            let _ = writeln!(
                message,
                "{}. {}\n   Email: {}\n   Status: {}\n",
                index + 1,
                agent.name,
                agent.email,
                if agent.available { "🟢 Available" } else { "🔴 Busy" }
            );
        }

        OutgoingMessage::text(message)
    }

    fn test_notification(&self, user_id: UserId) -> BotReply {
        let webhook_url = self
            .webhook_url
            .clone()
            .unwrap_or_else(|| "(WEBHOOK_URL not configured)".to_string());

        info!(user_id, "Test notification sent");

        OutgoingMessage::text(format!(
            "🧪 TEST NOTIFICATION\n\nThis is a test notification from the Telegram Bot.\nIf you received this message, notifications are working!\n\nWebhook URL: {}\nStatus: ✅ Ready to receive Freshdesk events\n\nNext step: Create a ticket in Freshdesk to test webhook integration.",
            webhook_url
        ))
    }

    async fn debug(&self) -> BotReply {
        let tickets = match self.helpdesk.recent_tickets(100).await {
            Ok(tickets) => tickets,
            Err(e) => {
                error!(error = %e, "Debug error");
                return OutgoingMessage::text(format!("❌ Debug error: {}", e));
            }
        };

        if tickets.is_empty() {
            return OutgoingMessage::text("⚠️ No tickets found in Freshdesk.");
        }

        let mut message = format!(
            "✅ Found {} tickets\n\nFirst 10 ticket IDs:\n",
            tickets.len()
        );
        for (index, ticket) in tickets.iter().take(10).enumerate() {
            let _ = writeln!(message, "{}. #{} - {}", index + 1, ticket.id, ticket.subject);
        }
        message.push_str(
            "\n📝 Try looking up one of these tickets by sending its ID (e.g., send the number without #)",
        );

        OutgoingMessage::text(message)
    }

    async fn view_ticket(&self, user_id: UserId, ticket_id: u64) -> BotReply {
        let ticket = match self.helpdesk.get_ticket(ticket_id).await {
            Ok(ticket) => ticket,
            Err(AppError::NotFound(_)) => {
                return OutgoingMessage::text(format!(
                    "❌ Ticket #{} not found in Freshdesk.\n\nTry /tickets to see all available tickets.",
                    ticket_id
                ));
            }
            Err(AppError::Authentication(_)) => {
                return OutgoingMessage::text(
                    "❌ Authentication error. Please check Freshdesk API key.",
                );
            }
            Err(e) => {
                error!(ticket_id, error = %e, "Error fetching ticket");
                return OutgoingMessage::text(format!(
                    "❌ Error fetching ticket #{}. Please try again later.\n\nTry /tickets to see all available tickets.",
                    ticket_id
                ));
            }
        };

        self.sessions.select_ticket(user_id, ticket.id);

        let created = ticket
            .created_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "N/A".to_string());

        OutgoingMessage::text(format!(
            "📋 Ticket #{}\n\nSubject: {}\nStatus: {}\nPriority: {}\nCreated: {}\n\n🔧 Update this ticket by replying with:\n• status open/pending/resolved/closed\n• priority low/medium/high/urgent\n• note Your note here\n• comment Your comment here\n\nExamples:\n  status resolved\n  priority high\n  note Updated by bot",
            ticket.id, ticket.subject, ticket.status, ticket.priority, created
        ))
        .with_keyboard(ticket_keyboard())
    }

    async fn set_status(&self, user_id: UserId, value: &str) -> BotReply {
        let Some(ticket_id) = self.sessions.current_ticket(user_id) else {
            return OutgoingMessage::text(NO_TICKET_SELECTED);
        };

        let Some(status) = TicketStatus::parse_input(value) else {
            return OutgoingMessage::text(format!(
                "❌ Unknown status \"{}\". Use open, pending, resolved or closed.",
                value
            ));
        };

        match self.helpdesk.update_status(ticket_id, status).await {
            Ok(()) => {
                info!(user_id, ticket_id, status = %status, "User updated ticket status");
                OutgoingMessage::text(format!(
                    "✅ Ticket #{} status updated to \"{}\"",
                    ticket_id, status
                ))
            }
            Err(e) => {
                error!(user_id, ticket_id, error = %e, "Error updating ticket status");
                OutgoingMessage::text(format!("❌ Error updating ticket status: {}", e))
            }
        }
    }

    async fn set_priority(&self, user_id: UserId, value: &str) -> BotReply {
        let Some(ticket_id) = self.sessions.current_ticket(user_id) else {
            return OutgoingMessage::text(NO_TICKET_SELECTED);
        };

        let Some(priority) = TicketPriority::parse_input(value) else {
            return OutgoingMessage::text(format!(
                "❌ Unknown priority \"{}\". Use low, medium, high or urgent.",
                value
            ));
        };

        match self.helpdesk.update_priority(ticket_id, priority).await {
            Ok(()) => {
                info!(user_id, ticket_id, priority = %priority, "User updated ticket priority");
                OutgoingMessage::text(format!(
                    "✅ Ticket #{} priority updated to \"{}\"",
                    ticket_id, priority
                ))
            }
            Err(e) => {
                error!(user_id, ticket_id, error = %e, "Error updating priority");
                OutgoingMessage::text(format!("❌ Error updating priority: {}", e))
            }
        }
    }

    async fn add_note(&self, user_id: UserId, body: &str) -> BotReply {
        let Some(ticket_id) = self.sessions.current_ticket(user_id) else {
            return OutgoingMessage::text(NO_TICKET_SELECTED);
        };

        match self.helpdesk.add_note(ticket_id, body, true).await {
            Ok(()) => {
                info!(user_id, ticket_id, "User added note to ticket");
                OutgoingMessage::text(format!("✅ Note added to ticket #{}", ticket_id))
            }
            Err(e) => {
                error!(user_id, ticket_id, error = %e, "Error adding note");
                OutgoingMessage::text(format!("❌ Error adding note: {}", e))
            }
        }
    }

    async fn add_comment(&self, user_id: UserId, body: &str) -> BotReply {
        let Some(ticket_id) = self.sessions.current_ticket(user_id) else {
            return OutgoingMessage::text(NO_TICKET_SELECTED);
        };

        match self.helpdesk.add_reply(ticket_id, body).await {
            Ok(()) => {
                info!(user_id, ticket_id, "User added comment to ticket");
                OutgoingMessage::text(format!("✅ Comment added to ticket #{}", ticket_id))
            }
            Err(e) => {
                error!(user_id, ticket_id, error = %e, "Error adding comment");
                OutgoingMessage::text(format!("❌ Error adding comment: {}", e))
            }
        }
    }
}
