//! Hostmask resolution.
//!
//! `nick!user@host` becomes a structured [`Identity`]; anything else (a
//! server name, a bare nick) degrades to an identity with only `host` set.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub nick: Option<String>,
    pub user: Option<String>,
    pub host: String,
}

impl Identity {
    pub fn new(nick: impl Into<String>, user: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            nick: Some(nick.into()),
            user: Some(user.into()),
            host: host.into(),
        }
    }

    /// Split on the first `!`, then the first `@` after it. Total: never fails.
    pub fn from_hostmask(s: &str) -> Self {
        if s.contains('!') && s.contains('@') {
            if let Some((nick, userhost)) = s.split_once('!') {
                if let Some((user, host)) = userhost.split_once('@') {
                    return Self::new(nick, user, host);
                }
            }
        }
        Self {
            nick: None,
            user: None,
            host: s.to_string(),
        }
    }

    /// `nick!user@host`, or just the host for a degraded identity.
    pub fn hostmask(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.nick, &self.user) {
            (Some(nick), Some(user)) => write!(f, "{}!{}@{}", nick, user, self.host),
            _ => f.write_str(&self.host),
        }
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self::from_hostmask(s)
    }
}

/// A message source as seen by listeners: either a full user identity or the
/// raw string when it carries no identity structure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserRef {
    Identity(Identity),
    Bare(String),
}

pub fn resolve_user(s: &str) -> UserRef {
    if !s.contains('!') || !s.contains('@') {
        return UserRef::Bare(s.to_string());
    }
    UserRef::Identity(Identity::from_hostmask(s))
}
