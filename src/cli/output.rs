//! Terminal output for the server's subcommands.
//!
//! Every line is rendered to a `String` first, so the plain form can be
//! asserted in tests and the colored form only differs in styling.

use owo_colors::OwoColorize;

/// Kind of a status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Done,
    Note,
    Warn,
    Fail,
}

impl Status {
    fn tag(self) -> &'static str {
        match self {
            Status::Done => "ok",
            Status::Note => "note",
            Status::Warn => "warn",
            Status::Fail => "fail",
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Output {
    colored: bool,
}

impl Output {
    pub fn new(colored: bool) -> Self {
        Self { colored }
    }

    pub fn status_line(&self, status: Status, text: &str) -> String {
        let tag = format!("{:>5}", status.tag());
        if !self.colored {
            return format!("{} {}", tag, text);
        }
        let tag = match status {
            Status::Done => tag.green().bold().to_string(),
            Status::Note => tag.cyan().to_string(),
            Status::Warn => tag.yellow().bold().to_string(),
            Status::Fail => tag.red().bold().to_string(),
        };
        format!("{} {}", tag, text)
    }

    pub fn heading_line(&self, title: &str) -> String {
        let version = format!("edudesk-server {}", env!("CARGO_PKG_VERSION"));
        if self.colored {
            format!("{} {}", title.bold(), version.dimmed())
        } else {
            format!("{} ({})", title, version)
        }
    }

    pub fn field_line(&self, key: &str, value: &str) -> String {
        if self.colored {
            format!("{:>16}  {}", key.dimmed(), value)
        } else {
            format!("{:>16}  {}", key, value)
        }
    }

    /// Failures go to stderr, everything else to stdout.
    pub fn status(&self, status: Status, text: &str) {
        let line = self.status_line(status, text);
        match status {
            Status::Fail => eprintln!("{}", line),
            _ => println!("{}", line),
        }
    }

    pub fn heading(&self, title: &str) {
        println!("{}", self.heading_line(title));
    }

    pub fn field(&self, key: &str, value: &str) {
        println!("{}", self.field_line(key, value));
    }

    /// A command the user is expected to run next.
    pub fn shell(&self, command: &str) {
        println!("      $ {}", command);
    }
}
