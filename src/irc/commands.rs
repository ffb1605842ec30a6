//! Outbound line formatting.
//!
//! Builds the raw protocol lines the Connection enqueues. Nothing here
//! touches the transport; see [`Connection::writeln`](super::connection::Connection::writeln).

use crate::error::{EngineError, Result};
use irc::client::prelude::Message;

/// Default PRIVMSG payload chunk size, in characters.
pub const DEFAULT_CHUNK_LEN: usize = 400;

/// One channel or an ordered list of channels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channels(Vec<String>);

impl Channels {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    fn joined(&self) -> String {
        self.0.join(",")
    }
}

impl From<&str> for Channels {
    fn from(channel: &str) -> Self {
        Channels(vec![channel.to_string()])
    }
}

impl From<String> for Channels {
    fn from(channel: String) -> Self {
        Channels(vec![channel])
    }
}

impl From<Vec<String>> for Channels {
    fn from(channels: Vec<String>) -> Self {
        Channels(channels)
    }
}

impl From<Vec<&str>> for Channels {
    fn from(channels: Vec<&str>) -> Self {
        Channels(channels.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Channels {
    fn from(channels: &[&str]) -> Self {
        Channels(channels.iter().map(|c| c.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Channels {
    fn from(channels: [&str; N]) -> Self {
        Channels(channels.iter().map(|c| c.to_string()).collect())
    }
}

pub fn pass_line(password: &str) -> String {
    format!("PASS {}", password)
}

pub fn user_line(user: &str, mode: &str, realname: &str) -> String {
    format!("USER {0} {1} {0} :{2}", user, mode, realname)
}

pub fn nick_line(nick: &str) -> String {
    format!("NICK {}", nick)
}

pub fn join_line(channels: &Channels) -> String {
    format!("JOIN {}", channels.joined())
}

pub fn part_line(channels: &Channels) -> String {
    format!("PART {}", channels.joined())
}

/// Split `message` into PRIVMSG lines of at most `chunk_len` characters of
/// payload each. Counts characters, not wire bytes. An empty message yields
/// no lines.
pub fn privmsg_lines(target: &str, message: &str, chunk_len: usize) -> Vec<String> {
    let chunk_len = chunk_len.max(1);
    let chars: Vec<char> = message.chars().collect();
    chars
        .chunks(chunk_len)
        .map(|chunk| format!("PRIVMSG {} :{}", target, chunk.iter().collect::<String>()))
        .collect()
}

/// Format an arbitrary verb: `NAME a b :last`.
///
/// The name is upper-cased, every argument but the last is space-joined and
/// the last one is sent as the trailing parameter. With no arguments the
/// line is the bare verb.
pub fn format_command(name: &str, args: &[&str]) -> String {
    let verb = name.to_uppercase();
    match args.split_last() {
        None => verb,
        Some((last, [])) => format!("{} :{}", verb, last),
        Some((last, init)) => format!("{} {} :{}", verb, init.join(" "), last),
    }
}

/// Hand a framed line to the message codec. The engine never calls this
/// itself; listeners on `raw` use it to get a structured message.
pub fn parse_message(line: &str) -> Result<Message> {
    line.parse::<Message>().map_err(|e| EngineError::Parse {
        line: line.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_lines() {
        assert_eq!(pass_line("hunter2"), "PASS hunter2");
        assert_eq!(user_line("crab", "+i", "Ferris the Crab"), "USER crab +i crab :Ferris the Crab");
        assert_eq!(nick_line("ferris"), "NICK ferris");
    }

    #[test]
    fn join_accepts_single_and_list() {
        assert_eq!(join_line(&"#rust".into()), "JOIN #rust");
        assert_eq!(join_line(&["#rust", "#irc"].into()), "JOIN #rust,#irc");
        assert_eq!(part_line(&vec!["#a".to_string(), "#b".to_string()].into()), "PART #a,#b");
    }

    #[test]
    fn say_chunks_950_chars_into_three_lines() {
        let message = "x".repeat(950);
        let lines = privmsg_lines("#chan", &message, DEFAULT_CHUNK_LEN);
        assert_eq!(lines.len(), 3);
        let prefix = "PRIVMSG #chan :";
        let lengths: Vec<usize> = lines
            .iter()
            .map(|l| {
                assert!(l.starts_with(prefix));
                l[prefix.len()..].len()
            })
            .collect();
        assert_eq!(lengths, vec![400, 400, 150]);
    }

    #[test]
    fn say_counts_characters_not_bytes() {
        let message = "é".repeat(5);
        let lines = privmsg_lines("bob", &message, 2);
        assert_eq!(lines, vec!["PRIVMSG bob :éé", "PRIVMSG bob :éé", "PRIVMSG bob :é"]);
    }

    #[test]
    fn say_empty_message_sends_nothing() {
        assert!(privmsg_lines("#chan", "", DEFAULT_CHUNK_LEN).is_empty());
    }

    #[test]
    fn catch_all_formatting() {
        assert_eq!(format_command("mode", &["#chan", "+o", "alice"]), "MODE #chan +o :alice");
        assert_eq!(format_command("topic", &["#rust", "new topic here"]), "TOPIC #rust :new topic here");
        assert_eq!(format_command("quit", &["bye now"]), "QUIT :bye now");
        assert_eq!(format_command("lusers", &[]), "LUSERS");
    }

    #[test]
    fn parse_message_delegates_to_codec() {
        let msg = parse_message(":nick!user@host PRIVMSG #chan :hello there").unwrap();
        assert_eq!(msg.source_nickname(), Some("nick"));
        assert!(parse_message("").is_err());
    }
}
