//! Bot command parsing.

/// A `/command` found at the start of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandInvocation<'a> {
    /// Command name without the slash.
    pub name: &'a str,
    /// `@botname` suffix, if the command was addressed to a specific bot.
    pub mention: Option<&'a str>,
    /// Everything after the command, leading whitespace trimmed.
    pub args: &'a str,
}

impl<'a> CommandInvocation<'a> {
    /// Whitespace separated arguments.
    pub fn arg_list(&self) -> Vec<&'a str> {
        self.args.split_whitespace().collect()
    }

    /// First argument plus the rest of the text after it.
    pub fn split_first_arg(&self) -> Option<(&'a str, &'a str)> {
        let args = self.args.trim();
        if args.is_empty() {
            return None;
        }
        match args.split_once(char::is_whitespace) {
            Some((first, rest)) => Some((first, rest.trim())),
            None => Some((args, "")),
        }
    }

    /// Whether this command is meant for the bot with the given username.
    pub fn is_addressed_to(&self, bot_username: &str) -> bool {
        self.mention
            .map(|mention| mention.eq_ignore_ascii_case(bot_username))
            .unwrap_or(true)
    }
}

/// Parse `/name[@bot] args...`.
pub fn parse_command(text: &str) -> Option<CommandInvocation<'_>> {
    let rest = text.strip_prefix('/')?;
    let (head, args) = match rest.find(char::is_whitespace) {
        Some(idx) => (&rest[..idx], rest[idx..].trim_start()),
        None => (rest, ""),
    };

    let (name, mention) = match head.split_once('@') {
        Some((name, mention)) => (name, Some(mention)),
        None => (head, None),
    };

    if name.is_empty() {
        return None;
    }

    Some(CommandInvocation {
        name,
        mention,
        args,
    })
}
