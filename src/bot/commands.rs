use once_cell::sync::Lazy;
use regex::Regex;

static TICKET_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#?(\d+)$").expect("valid ticket number pattern"));

/// A chat message interpreted as a bot command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    Status,
    Settings,
    Tickets,
    Open,
    Agents,
    Test,
    Debug,
    /// `status <value>` for the current ticket
    SetStatus(String),
    /// `priority <value>` for the current ticket
    SetPriority(String),
    /// `note <text>`, a private note on the current ticket
    AddNote(String),
    /// `comment <text>`, a public reply on the current ticket
    AddComment(String),
    /// A bare ticket number, `123` or `#123`
    ViewTicket(u64),
    HelpHint,
    BackToMenu,
    Unrecognized,
}

impl BotCommand {
    /// Metric label
    pub fn name(&self) -> &'static str {
        match self {
            BotCommand::Start => "start",
            BotCommand::Help => "help",
            BotCommand::Status => "status",
            BotCommand::Settings => "settings",
            BotCommand::Tickets => "tickets",
            BotCommand::Open => "open",
            BotCommand::Agents => "agents",
            BotCommand::Test => "test",
            BotCommand::Debug => "debug",
            BotCommand::SetStatus(_) => "set_status",
            BotCommand::SetPriority(_) => "set_priority",
            BotCommand::AddNote(_) => "add_note",
            BotCommand::AddComment(_) => "add_comment",
            BotCommand::ViewTicket(_) => "view_ticket",
            BotCommand::HelpHint => "help_hint",
            BotCommand::BackToMenu => "back_to_menu",
            BotCommand::Unrecognized => "unrecognized",
        }
    }
}

/// Parse a chat message
///
/// Slash commands may carry an `@botname` suffix; when `bot_username` is
/// known, commands addressed to another bot are not recognized.
pub fn parse(text: &str, bot_username: Option<&str>) -> BotCommand {
    let trimmed = text.trim();

    if let Some(command) = trimmed.strip_prefix('/') {
        return parse_slash(command, bot_username);
    }

    let updates: [(&str, fn(String) -> BotCommand); 4] = [
        ("status ", BotCommand::SetStatus),
        ("priority ", BotCommand::SetPriority),
        ("note ", BotCommand::AddNote),
        ("comment ", BotCommand::AddComment),
    ];

    for (prefix, build) in updates {
        if let Some(argument) = strip_prefix_ignore_case(text.trim_start(), prefix) {
            let argument = argument.trim();
            if argument.is_empty() {
                return BotCommand::Unrecognized;
            }
            return build(argument.to_string());
        }
    }

    if let Some(caps) = TICKET_NUMBER.captures(trimmed) {
        return match caps[1].parse::<u64>() {
            Ok(id) => BotCommand::ViewTicket(id),
            Err(_) => BotCommand::Unrecognized,
        };
    }

    let lowered = trimmed.to_lowercase();
    if lowered.contains("help") {
        return BotCommand::HelpHint;
    }
    if lowered == "back to menu" {
        return BotCommand::BackToMenu;
    }

    BotCommand::Unrecognized
}

fn parse_slash(command: &str, bot_username: Option<&str>) -> BotCommand {
    let word = command.split_whitespace().next().unwrap_or_default();
    let (name, target) = match word.split_once('@') {
        Some((name, target)) => (name, Some(target)),
        None => (word, None),
    };

    if let (Some(target), Some(username)) = (target, bot_username) {
        if !target.eq_ignore_ascii_case(username.trim_start_matches('@')) {
            return BotCommand::Unrecognized;
        }
    }

    match name {
        "start" => BotCommand::Start,
        "help" => BotCommand::Help,
        "status" => BotCommand::Status,
        "settings" => BotCommand::Settings,
        "tickets" => BotCommand::Tickets,
        "open" => BotCommand::Open,
        "agents" => BotCommand::Agents,
        "test" => BotCommand::Test,
        "debug" => BotCommand::Debug,
        _ => BotCommand::Unrecognized,
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&text[prefix.len()..])
    } else {
        None
    }
}
