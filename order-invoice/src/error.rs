use std::fmt::{Debug, Display};

use crate::validate::ValidationError;

pub struct Error {
    kind: ErrorKind,
    context: Vec<String>,
}

pub enum ErrorKind {
    Io(std::io::Error),
    Validation(ValidationError),
    Template(minijinja::Error),
    FantocciniNewSession(fantoccini::error::NewSessionError),
    FantocciniCmdError(fantoccini::error::CmdError),
    FantocciniPrintError(fantoccini::error::PrintConfigurationError),
    Render(String),
    Fetch(reqwest::Error),
    Asset(String),
    Address(lettre::address::AddressError),
    Message(lettre::error::Error),
    Smtp(lettre::transport::smtp::Error),
    Transport(String),
    Other(String),
}

/// Where in the request pipeline an error belongs. Decides how the error is surfaced to the
/// caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// The order was rejected before anything was rendered or sent
    Validation,
    /// A decorative asset could not be loaded. Never fatal for an invoice
    AssetFetch,
    /// The document could not be produced
    Render,
    /// The mail could not be handed to the transport
    Transport,
    Internal,
}

pub trait AddContext<T> {
    fn add_context(self, ctx: &str) -> Result<T, Error>;
}

impl Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut context = self.context.clone();
        context.reverse();
        let context = if context.is_empty() {
            String::from("no context")
        } else {
            context.join(" -> ")
        };
        write!(f, "{context}")
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error {
            context: vec![value.to_string()],
            kind: ErrorKind::Io(value),
        }
    }
}

impl From<ValidationError> for Error {
    fn from(value: ValidationError) -> Self {
        Error {
            context: vec![value.to_string()],
            kind: ErrorKind::Validation(value),
        }
    }
}

impl From<minijinja::Error> for Error {
    fn from(value: minijinja::Error) -> Self {
        Error {
            context: vec![value.to_string()],
            kind: ErrorKind::Template(value),
        }
    }
}

impl From<fantoccini::error::PrintConfigurationError> for Error {
    fn from(value: fantoccini::error::PrintConfigurationError) -> Self {
        Error {
            context: vec![format!("{:?}", value)],
            kind: ErrorKind::FantocciniPrintError(value),
        }
    }
}

impl From<fantoccini::error::NewSessionError> for Error {
    fn from(value: fantoccini::error::NewSessionError) -> Self {
        Error {
            context: vec![format!("{:?}", value)],
            kind: ErrorKind::FantocciniNewSession(value),
        }
    }
}

impl From<fantoccini::error::CmdError> for Error {
    fn from(value: fantoccini::error::CmdError) -> Self {
        Error {
            context: vec![format!("{:?}", value)],
            kind: ErrorKind::FantocciniCmdError(value),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error {
            context: vec![value.to_string()],
            kind: ErrorKind::Fetch(value),
        }
    }
}

impl From<lettre::address::AddressError> for Error {
    fn from(value: lettre::address::AddressError) -> Self {
        Error {
            context: vec![value.to_string()],
            kind: ErrorKind::Address(value),
        }
    }
}

impl From<lettre::error::Error> for Error {
    fn from(value: lettre::error::Error) -> Self {
        Error {
            context: vec![value.to_string()],
            kind: ErrorKind::Message(value),
        }
    }
}

impl From<lettre::transport::smtp::Error> for Error {
    fn from(value: lettre::transport::smtp::Error) -> Self {
        Error {
            context: vec![value.to_string()],
            kind: ErrorKind::Smtp(value),
        }
    }
}

impl From<String> for Error {
    fn from(value: String) -> Self {
        Error {
            context: vec![value.to_string()],
            kind: ErrorKind::Other(value),
        }
    }
}

impl Error {
    /// Build an error for a document that could not be drawn or serialized
    pub fn render(message: impl Into<String>) -> Error {
        let message = message.into();
        Error {
            context: vec![message.clone()],
            kind: ErrorKind::Render(message),
        }
    }

    /// Build an error for an asset that was read but cannot be used
    pub fn asset(message: impl Into<String>) -> Error {
        let message = message.into();
        Error {
            context: vec![message.clone()],
            kind: ErrorKind::Asset(message),
        }
    }

    /// Build an error for a mail the transport refused
    pub fn transport(message: impl Into<String>) -> Error {
        let message = message.into();
        Error {
            context: vec![message.clone()],
            kind: ErrorKind::Transport(message),
        }
    }

    /// Add more context to the given error. This context will ultimately be displayed to the
    /// caller and could be useful for correcting bad input or filing a help ticket.
    ///
    /// Generally a single layer of context should be added for every level that an error is
    /// surfaced. If the error is surfaced all the way to the HTTP response, then all the context
    /// will be displayed in reverse order
    ///
    /// # Arguments
    /// * `context` - Any additional information that would be useful for the caller to see if
    /// the error is surfaced to them
    pub fn add_context(self, context: &str) -> Error {
        let mut existing = self.context.clone();
        existing.push(context.to_string());
        Self {
            context: existing,
            ..self
        }
    }

    /// The validation failure behind this error, if the order itself was rejected
    pub fn validation(&self) -> Option<&ValidationError> {
        match &self.kind {
            ErrorKind::Validation(e) => Some(e),
            _ => None,
        }
    }

    pub fn category(&self) -> Category {
        match &self.kind {
            ErrorKind::Validation(_) => Category::Validation,
            ErrorKind::Fetch(_) | ErrorKind::Asset(_) => Category::AssetFetch,
            ErrorKind::Template(_)
            | ErrorKind::Render(_)
            | ErrorKind::FantocciniNewSession(_)
            | ErrorKind::FantocciniCmdError(_)
            | ErrorKind::FantocciniPrintError(_) => Category::Render,
            ErrorKind::Address(_)
            | ErrorKind::Message(_)
            | ErrorKind::Smtp(_)
            | ErrorKind::Transport(_) => Category::Transport,
            ErrorKind::Io(_) | ErrorKind::Other(_) => Category::Internal,
        }
    }
}

impl<T> AddContext<T> for Result<T, Error> {
    fn add_context(self, ctx: &str) -> Result<T, Error> {
        match self {
            Ok(d) => Ok(d),
            Err(e) => Err(e.add_context(ctx)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_is_displayed_outermost_first() {
        let err = Error::from(String::from("disk full"))
            .add_context("writing pdf")
            .add_context("sending invoice");
        assert_eq!(err.to_string(), "sending invoice -> writing pdf -> disk full");
    }

    #[test]
    fn validation_errors_keep_their_reason() {
        let err = Error::from(ValidationError::NoValidProducts).add_context("validating order");
        assert_eq!(err.category(), Category::Validation);
        assert_eq!(
            err.validation().map(|v| v.to_string()),
            Some(String::from("No valid products"))
        );
    }

    #[test]
    fn render_errors_are_categorized() {
        let err = Error::render("bad coordinates");
        assert_eq!(err.category(), Category::Render);
        assert!(err.validation().is_none());
    }
}
