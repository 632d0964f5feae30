//! Composable validation status with ordered messages and an optional result.

use serde::Serialize;

/// Severity of a single status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// One entry in a status, in the order it was reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub severity: Severity,
    pub text: String,
}

impl StatusMessage {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
        }
    }
}

/// Aggregated outcome of running event handlers around a commit.
///
/// A status is valid exactly when it carries no error-severity message, so
/// validity can never disagree with the message list. Messages keep the order
/// in which they were added; combining two statuses appends the other's
/// messages after this one's.
///
/// The optional result carries the commit output once the commit has run.
#[derive(Debug, Clone, Serialize)]
pub struct Status<T = ()> {
    messages: Vec<StatusMessage>,
    result: Option<T>,
}

impl<T> Default for Status<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Status<T> {
    /// Creates an empty, valid status.
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            result: None,
        }
    }

    /// Creates an invalid status carrying a single error message.
    pub fn error(text: impl Into<String>) -> Self {
        let mut status = Self::new();
        status.add_error(text);
        status
    }

    /// A status is valid while it holds no error-severity message.
    pub fn is_valid(&self) -> bool {
        self.messages
            .iter()
            .all(|m| m.severity != Severity::Error)
    }

    /// Appends an error message, making the status invalid.
    pub fn add_error(&mut self, text: impl Into<String>) -> &mut Self {
        self.messages.push(StatusMessage::new(Severity::Error, text));
        self
    }

    /// Appends a warning message; validity is unaffected.
    pub fn add_warning(&mut self, text: impl Into<String>) -> &mut Self {
        self.messages
            .push(StatusMessage::new(Severity::Warning, text));
        self
    }

    /// Appends an informational message.
    pub fn add_message(&mut self, text: impl Into<String>) -> &mut Self {
        self.messages.push(StatusMessage::new(Severity::Info, text));
        self
    }

    /// All messages in the order they were reported.
    pub fn messages(&self) -> &[StatusMessage] {
        &self.messages
    }

    /// Merges another status of the same result type into this one.
    ///
    /// Messages are appended in order and validity is the conjunction of
    /// both. The other status's result replaces this one's only when it was
    /// explicitly set.
    pub fn combine(&mut self, other: Status<T>) -> &mut Self {
        self.messages.extend(other.messages);
        if other.result.is_some() {
            self.result = other.result;
        }
        self
    }

    /// Merges only the messages of a status with a different result type.
    ///
    /// Used when folding handler statuses (which carry no commit output) into
    /// the typed commit status; any result on `other` is discarded.
    pub fn combine_messages<U>(&mut self, other: Status<U>) -> &mut Self {
        self.messages.extend(other.messages);
        self
    }

    /// Sets the result value.
    pub fn set_result(&mut self, value: T) -> &mut Self {
        self.result = Some(value);
        self
    }

    /// The result value, if the commit has produced one.
    pub fn result(&self) -> Option<&T> {
        self.result.as_ref()
    }

    /// Consumes the status, yielding the result value if set.
    pub fn into_result(self) -> Option<T> {
        self.result
    }

    /// All error texts joined with newlines, for display to callers.
    pub fn all_errors(&self) -> String {
        self.messages
            .iter()
            .filter(|m| m.severity == Severity::Error)
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Rewrites every error entry as a warning, keeping order and text.
    ///
    /// Applied to after-commit handler outcomes: the durable write has
    /// already happened, so nothing they report may invalidate the result.
    pub fn downgrade_errors(mut self) -> Self {
        for message in &mut self.messages {
            if message.severity == Severity::Error {
                message.severity = Severity::Warning;
            }
        }
        self
    }
}

impl Status<()> {
    /// Converts a unit status into one carrying a commit result.
    pub fn with_result<R>(self, value: R) -> Status<R> {
        Status {
            messages: self.messages,
            result: Some(value),
        }
    }

    /// Converts a unit status into a typed one with no result set.
    pub fn without_result<R>(self) -> Status<R> {
        Status {
            messages: self.messages,
            result: None,
        }
    }
}
