//! Application-level chat message conventions

/// A message received from a named connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatMessage<'a> {
    /// Public chat text for everyone else
    Public(&'a str),
    /// `<recipient>: <text>`, split on the first colon
    Private { recipient: &'a str, text: &'a str },
}

impl<'a> ChatMessage<'a> {
    pub fn parse(payload: &'a str) -> Self {
        match payload.split_once(':') {
            Some((recipient, text)) => Self::Private {
                recipient: recipient.trim(),
                text: text.trim(),
            },
            None => Self::Public(payload),
        }
    }
}

pub fn welcome(name: &str) -> String {
    format!("Welcome, {}!", name)
}

pub fn joined(name: &str) -> String {
    format!("{} joined", name)
}

pub fn disconnected(name: &str) -> String {
    format!("{} has disconnected.", name)
}

pub fn public(sender: &str, text: &str) -> String {
    format!("{}: {}", sender, text)
}

pub fn private(sender: &str, text: &str) -> String {
    format!("(Private) {}: {}", sender, text)
}

pub fn private_confirmation(recipient: &str, text: &str) -> String {
    format!("To {}: {}", recipient, text)
}

pub fn recipient_not_found(recipient: &str) -> String {
    format!("User '{}' not found!", recipient)
}
