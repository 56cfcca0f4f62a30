//! Unit tests for error handling.
//!
//! This module contains tests for error types and error reporting.

use crate::errors::errors::{Error, ErrorImpl, ErrorTip};
use crate::Position;
use std::sync::Arc;

#[test]
fn test_error_creation() {
    let error = Error::new(
        ErrorImpl::LegacyMacroCall {
            call: "<<set $a to 1>>".to_string(),
        },
        Position(10, Arc::from("Start")),
    );

    assert_eq!(error.get_error_name(), "LegacyMacroCall");
}

#[test]
fn test_error_position() {
    let pos = Position(42, Arc::from("Start"));
    let error = Error::new(
        ErrorImpl::IncorrectOperator {
            operator: "=".to_string(),
        },
        pos.clone(),
    );

    assert_eq!(error.get_position().0, 42);
    assert_eq!(&*error.get_position().1, "Start");
}

#[test]
fn test_unknown_mode_error() {
    let error = Error::new(
        ErrorImpl::UnknownMode {
            name: "prose".to_string(),
        },
        Position::null(),
    );

    assert_eq!(error.get_error_name(), "UnknownMode");
    assert_eq!(error.to_string(), "unknown lexing mode \"prose\". Expected one of: start, macro, string, verbatim");
}

#[test]
fn test_incorrect_operator_tips() {
    let tip = |operator: &str| {
        ErrorImpl::IncorrectOperator {
            operator: operator.to_string(),
        }
        .get_tip()
        .to_string()
    };

    assert_eq!(tip("=>"), "Did you mean '>='?");
    assert_eq!(tip("=<"), "Did you mean '<='?");
    assert_eq!(tip("<>"), "Please say 'is not' rather than '<>'");
    assert!(tip("=").contains("'to'"));
}

#[test]
fn test_error_tip_none() {
    let error = ErrorImpl::IncorrectOperator {
        operator: "%%".to_string(),
    };

    assert!(matches!(error.get_tip(), ErrorTip::None));
    assert_eq!(error.message(), "\"%%\" is not a valid operator");
}

#[test]
fn test_error_tip_display() {
    let tip = ErrorTip::Suggestion("Try this instead".to_string());
    assert_eq!(tip.to_string(), "Try this instead");

    let tip = ErrorTip::None;
    assert_eq!(tip.to_string(), "");
}

#[test]
fn test_legacy_macro_message() {
    let error = ErrorImpl::LegacyMacroCall {
        call: "<<if $x>>".to_string(),
    };

    assert!(error
        .message()
        .starts_with("\"<<if $x>>\" is a macro call written in a different story format's syntax. "));
}
