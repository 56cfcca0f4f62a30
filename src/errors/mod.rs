//! Error types for the lexer.
//!
//! The lexer itself never fails: malformed markup is demoted to text, and a
//! few known-bad spellings become `Error` tokens. This module defines:
//!
//! - The messages and tips those error tokens carry
//! - A positioned `Error` wrapper used to report them
//! - The error returned when parsing an unknown lexing mode name

pub mod errors;

#[cfg(test)]
mod tests;
