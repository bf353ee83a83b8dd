//! Command surface
//!
//! Parses `/name[@bot] args` text into a [`Command`] and callback data into a
//! [`MenuAction`]. Execution lives in [`Relay`](crate::relay::Relay).

use crate::format::{MessageButton, OutboundMessage};
use serde::{Deserialize, Serialize};

/// Known commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Greet, reload the allow-list, show the main menu
    Start,
    /// Show help
    Help,
    /// Show current settings
    Settings,
    /// Replace the custom context
    SetContext,
    /// Change the model
    SetModel,
    /// Change the temperature
    SetTemperature,
    /// Change the completion token cap
    SetMaxTokens,
    /// Discard the whole session
    ResetChat,
    /// Clear history only
    ClearHistory,
    /// Dump every stored session
    ShowContext,
}

impl CommandKind {
    /// Look up a command by name. Matching is case-insensitive.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name.to_ascii_lowercase().as_str() {
            "start" => Self::Start,
            "help" => Self::Help,
            "settings" => Self::Settings,
            "setcontext" => Self::SetContext,
            "setmodel" => Self::SetModel,
            "settemperature" => Self::SetTemperature,
            "setmaxtokens" => Self::SetMaxTokens,
            "resetchat" | "resetcontext" => Self::ResetChat,
            "clearhistory" => Self::ClearHistory,
            "showcontext" => Self::ShowContext,
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical command name
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Help => "help",
            Self::Settings => "settings",
            Self::SetContext => "setcontext",
            Self::SetModel => "setmodel",
            Self::SetTemperature => "settemperature",
            Self::SetMaxTokens => "setmaxtokens",
            Self::ResetChat => "resetchat",
            Self::ClearHistory => "clearhistory",
            Self::ShowContext => "showcontext",
        }
    }

    /// Usage hint shown for a missing or malformed argument
    #[must_use]
    pub fn usage(self) -> Option<&'static str> {
        match self {
            Self::SetContext => Some("Usage: /setcontext <text>"),
            Self::SetModel => Some("Usage: /setmodel <model>"),
            Self::SetTemperature => Some("Usage: /settemperature <float>"),
            Self::SetMaxTokens => Some("Usage: /setmaxtokens <int>"),
            _ => None,
        }
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Which command
    pub kind: CommandKind,
    /// Everything after the command name, trimmed
    pub args: String,
    /// Bot named by a `/name@bot` suffix
    pub addressee: Option<String>,
}

impl Command {
    /// Parse command text. Returns `None` for plain text and unknown commands.
    ///
    /// A `@bot` suffix on the name is kept in `addressee`.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.trim_start().strip_prefix('/')?;
        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        let (name, addressee) = match head.split_once('@') {
            Some((name, bot)) => (name, Some(bot.to_string())),
            None => (head, None),
        };

        Some(Self {
            kind: CommandKind::from_name(name)?,
            args: args.to_string(),
            addressee,
        })
    }

    /// Whether this command is meant for `bot_username`.
    ///
    /// Commands without a suffix are for every bot. With no known username,
    /// any suffix is accepted.
    #[must_use]
    pub fn is_for(&self, bot_username: Option<&str>) -> bool {
        match (&self.addressee, bot_username) {
            (Some(addressee), Some(username)) => {
                addressee.eq_ignore_ascii_case(username.trim_start_matches('@'))
            }
            _ => true,
        }
    }
}

/// Whether `text` looks like a slash command, known or not
#[must_use]
pub fn is_command(text: &str) -> bool {
    text.trim_start().starts_with('/')
}

/// Inline menu actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuAction {
    /// Show settings
    Settings,
    /// Show help
    Help,
    /// Reset the session
    ResetContext,
}

impl MenuAction {
    /// Parse callback data
    #[must_use]
    pub fn from_callback(data: &str) -> Option<Self> {
        match data {
            "settings" => Some(Self::Settings),
            "help" => Some(Self::Help),
            "reset_context" => Some(Self::ResetContext),
            _ => None,
        }
    }

    /// Callback data carried by the button
    #[must_use]
    pub fn callback_data(self) -> &'static str {
        match self {
            Self::Settings => "settings",
            Self::Help => "help",
            Self::ResetContext => "reset_context",
        }
    }
}

/// Help text listing every command
pub const HELP_TEXT: &str = "Available commands:\n\
/start - Start the bot and show the menu\n\
/help - Show this help\n\
/settings - Show your current settings\n\
/setcontext <text> - Set the assistant's context\n\
/setmodel <model> - Change the model\n\
/settemperature <float> - Change the temperature\n\
/setmaxtokens <int> - Change the response token limit\n\
/resetchat - Reset your context, settings and history\n\
/clearhistory - Clear the conversation history\n\
/showcontext - Show your stored session data";

/// Greeting for `/start`, with the main menu
#[must_use]
pub fn main_menu(first_name: &str) -> OutboundMessage {
    let greeting = if first_name.is_empty() {
        "Hi! I'm a chat bot. Pick an action below or just send me a message.".to_string()
    } else {
        format!(
            "Hi, {}! I'm a chat bot. Pick an action below or just send me a message.",
            first_name
        )
    };
    OutboundMessage::text(greeting)
        .with_button(MessageButton::callback("Settings", MenuAction::Settings.callback_data()))
        .with_button(MessageButton::callback("Help", MenuAction::Help.callback_data()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_args() {
        let cmd = Command::parse("/setmodel gpt-4").unwrap();
        assert_eq!(cmd.kind, CommandKind::SetModel);
        assert_eq!(cmd.args, "gpt-4");
    }

    #[test]
    fn test_parse_without_args() {
        let cmd = Command::parse("/settings").unwrap();
        assert_eq!(cmd.kind, CommandKind::Settings);
        assert!(cmd.args.is_empty());
    }

    #[test]
    fn test_parse_bot_suffix() {
        let cmd = Command::parse("/setcontext@parley_bot You are a poet").unwrap();
        assert_eq!(cmd.kind, CommandKind::SetContext);
        assert_eq!(cmd.args, "You are a poet");
        assert_eq!(cmd.addressee.as_deref(), Some("parley_bot"));
    }

    #[test]
    fn test_is_for_bot() {
        let cmd = Command::parse("/resetchat@Parley_Bot").unwrap();
        assert!(cmd.is_for(Some("parley_bot")));
        assert!(cmd.is_for(None));

        let other = Command::parse("/resetchat@other_bot").unwrap();
        assert_eq!(other.kind, CommandKind::ResetChat);
        assert!(!other.is_for(Some("parley_bot")));

        assert!(Command::parse("/resetchat").unwrap().is_for(Some("parley_bot")));
    }

    #[test]
    fn test_parse_keeps_multiline_args() {
        let cmd = Command::parse("/setcontext line one\nline two").unwrap();
        assert_eq!(cmd.args, "line one\nline two");
    }

    #[test]
    fn test_reset_alias() {
        assert_eq!(Command::parse("/resetcontext").unwrap().kind, CommandKind::ResetChat);
        assert_eq!(Command::parse("/resetchat").unwrap().kind, CommandKind::ResetChat);
    }

    #[test]
    fn test_unknown_and_plain() {
        assert_eq!(Command::parse("/frobnicate"), None);
        assert_eq!(Command::parse("hello"), None);
        assert_eq!(Command::parse(""), None);
        assert!(is_command("/frobnicate"));
        assert!(!is_command("hello /start"));
    }

    #[test]
    fn test_name_roundtrip() {
        for kind in [
            CommandKind::Start,
            CommandKind::Help,
            CommandKind::Settings,
            CommandKind::SetContext,
            CommandKind::SetModel,
            CommandKind::SetTemperature,
            CommandKind::SetMaxTokens,
            CommandKind::ResetChat,
            CommandKind::ClearHistory,
            CommandKind::ShowContext,
        ] {
            assert_eq!(CommandKind::from_name(kind.name()), Some(kind));
            assert!(HELP_TEXT.contains(&format!("/{}", kind.name())));
        }
    }

    #[test]
    fn test_menu_actions() {
        assert_eq!(MenuAction::from_callback("reset_context"), Some(MenuAction::ResetContext));
        assert_eq!(MenuAction::from_callback("nope"), None);
    }

    #[test]
    fn test_main_menu_buttons() {
        let menu = main_menu("Ann");
        assert!(menu.text.contains("Ann"));
        let data: Vec<&str> = menu.buttons.iter().map(|b| b.callback_data.as_str()).collect();
        assert_eq!(data, vec!["settings", "help"]);
    }
}
