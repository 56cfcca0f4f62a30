//! Integration tests for the public lexing API.
//!
//! These tests drive the crate the way its consumers do: lexing whole
//! passages, querying the resulting tree, and serializing it to JSON.

use std::{sync::Arc, thread};

use passage_lexer::{lex, lex_with_options, LexOptions, Mode, Token, TokenKind};

const PASSAGE: &str = "\
# The Cellar
You are in a //dark// cellar.
(set: $lamp to true)
(if: $lamp is true)[You see [[a door->Hallway]].]
* a crate
* a barrel
";

fn find_all(token: &Token, kind: TokenKind) -> Vec<&Token> {
    let mut found = vec![];
    let mut pending = vec![token];
    while let Some(current) = pending.pop() {
        if current.kind == kind {
            found.push(current);
        }
        pending.extend(current.children.iter().map(|child| child.as_ref()));
    }
    found
}

#[test]
fn test_lex_full_passage() {
    let tree = lex(PASSAGE);

    assert_eq!(tree.text, PASSAGE);
    assert_eq!(tree.children[0].kind, TokenKind::Heading);
    assert_eq!(find_all(&tree, TokenKind::Italic).len(), 1);
    assert_eq!(find_all(&tree, TokenKind::Macro).len(), 2);
    assert_eq!(find_all(&tree, TokenKind::Hook).len(), 1);
    assert_eq!(find_all(&tree, TokenKind::Bulleted).len(), 2);

    let links = find_all(&tree, TokenKind::TwineLink);
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].fields.passage.as_deref(), Some("Hallway"));

    assert!(tree.errors().is_empty());
}

#[test]
fn test_offsets_index_the_source() {
    let tree = lex(PASSAGE);
    let chars: Vec<char> = PASSAGE.chars().collect();

    for leaf in tree.leaves() {
        let text: String = chars[leaf.start..leaf.end].iter().collect();
        assert_eq!(text, leaf.text);
    }
}

#[test]
fn test_token_at_finds_link_text() {
    let tree = lex(PASSAGE);
    let offset = PASSAGE.find("door").map(|byte| PASSAGE[..byte].chars().count()).unwrap();

    let path: Vec<TokenKind> = tree.path_at(offset).iter().map(|token| token.kind).collect();
    assert_eq!(path, vec![TokenKind::Text, TokenKind::TwineLink, TokenKind::Hook, TokenKind::Root]);
}

#[test]
fn test_json_shape() {
    let tree = lex_with_options("(a: 2s)", &LexOptions::default().place("Cellar"));
    let json = serde_json::to_value(&tree).unwrap();

    assert_eq!(json["type"], "root");
    assert_eq!(json["place"], "Cellar");
    assert_eq!(json["innerText"], "(a: 2s)");

    let call = &json["children"][0];
    assert_eq!(call["type"], "macro");
    assert_eq!(call["name"], "a");
    assert_eq!(call["start"], 0);
    assert_eq!(call["end"], 7);

    let time = &call["children"][1];
    assert_eq!(time["type"], "cssTime");
    assert_eq!(time["value"], 2000.0);
    assert!(time.get("innerText").is_none());
    assert!(time.get("colour").is_none());
}

#[test]
fn test_error_tokens_in_json() {
    let tree = lex("(set: $a = 1)");
    let json = serde_json::to_value(&tree).unwrap();

    let error = &json["children"][0]["children"][3];
    assert_eq!(error["type"], "error");
    assert_eq!(
        error["message"],
        "\"=\" is not a valid operator. Please say 'to' or 'into' to set a value, or 'is' to compare values"
    );
}

#[test]
fn test_mode_option() {
    let tree = lex_with_options("$a + 1", &LexOptions::default().start_mode("macro".parse::<Mode>().unwrap()));

    assert!(tree.every_leaf(|leaf| leaf.kind != TokenKind::Text));
}

#[test]
fn test_lex_from_many_threads() {
    let handles: Vec<_> = (0..8)
        .map(|i| thread::spawn(move || lex(&format!("''{}'' [x]", i))))
        .collect();

    for handle in handles {
        let tree = handle.join().unwrap();
        assert_eq!(tree.children[0].kind, TokenKind::Bold);
    }
}

#[test]
fn test_trees_are_shareable() {
    let tree = Arc::new(lex(PASSAGE));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || tree.leaves().len())
        })
        .collect();

    let expected = tree.leaves().len();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
