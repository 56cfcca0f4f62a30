//! Lexical analysis of passage markup.
//!
//! This module turns passage source into a token tree. It handles:
//!
//! - Terminal patterns for markup and macro syntax (`patterns`)
//! - The ordered rule table, grouped into modes (`rules`)
//! - Scanning, pairing of fronts with backs, and folding (`lexer`)
//! - The token tree and its queries (`tokens`)

pub mod lexer;
pub mod patterns;
pub mod rules;
pub mod tokens;

#[cfg(test)]
mod property_tests;
