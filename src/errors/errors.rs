use std::fmt::Display;

use thiserror::Error;

use crate::Position;

#[derive(Debug, Clone, PartialEq)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_error_name(&self) -> &str {
        self.internal_error.get_error_name()
    }

    pub fn get_tip(&self) -> ErrorTip {
        self.internal_error.get_tip()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.internal_error.message())
    }
}

impl std::error::Error for Error {}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErrorImpl {
    #[error("{call:?} is a macro call written in a different story format's syntax")]
    LegacyMacroCall { call: String },
    #[error("{operator:?} is not a valid operator")]
    IncorrectOperator { operator: String },
    #[error("unknown lexing mode {name:?}")]
    UnknownMode { name: String },
}

impl ErrorImpl {
    pub fn get_error_name(&self) -> &'static str {
        match self {
            ErrorImpl::LegacyMacroCall { .. } => "LegacyMacroCall",
            ErrorImpl::IncorrectOperator { .. } => "IncorrectOperator",
            ErrorImpl::UnknownMode { .. } => "UnknownMode",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match self {
            ErrorImpl::LegacyMacroCall { .. } => ErrorTip::Suggestion(String::from(
                "Macro calls here are written like (name: value) rather than <<name value>>",
            )),
            ErrorImpl::IncorrectOperator { operator } => match operator.as_str() {
                "=>" => ErrorTip::Suggestion(String::from("Did you mean '>='?")),
                "=<" => ErrorTip::Suggestion(String::from("Did you mean '<='?")),
                "==" => ErrorTip::Suggestion(String::from("Please say 'is' rather than '=='")),
                "!=" | "<>" | "><" => {
                    ErrorTip::Suggestion(format!("Please say 'is not' rather than '{}'", operator))
                }
                "=" => ErrorTip::Suggestion(String::from(
                    "Please say 'to' or 'into' to set a value, or 'is' to compare values",
                )),
                _ => ErrorTip::None,
            },
            ErrorImpl::UnknownMode { .. } => ErrorTip::Suggestion(String::from(
                "Expected one of: start, macro, string, verbatim",
            )),
        }
    }

    /// The human-readable text carried by error tokens: the error itself,
    /// followed by its tip when there is one.
    pub fn message(&self) -> String {
        match self.get_tip() {
            ErrorTip::None => self.to_string(),
            ErrorTip::Suggestion(tip) => format!("{}. {}", self, tip),
        }
    }
}
