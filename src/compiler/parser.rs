use pomelo::pomelo;

use super::error::ScriptError;
use crate::ast::{Node, TagNode};

pub struct ParseContext {
    pub nodes: Vec<Node>,
}

impl ParseContext {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }
}

/// Converts a lexed integer literal (optionally signed, decimal or 0x hex).
fn parse_int(text: &str) -> Option<i64> {
    let (negative, rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };

    let value = match rest.strip_prefix("0x") {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => rest.parse::<i64>().ok()?,
    };

    Some(if negative { -value } else { value })
}

pomelo! {
    %include { use super::*; }

    %extra_argument ParseContext;

    // token types

    %type Ident String;
    %type Int String;
    %type Text String;

    // errors

    %error ScriptError;

    %syntax_error { Err(ScriptError::SyntaxError) }

    %parse_fail { ScriptError::ParseFail }
    %stack_overflow { ScriptError::ParseStackOverflow }

    // grammar

    program ::= elements(e) { extra.nodes = e };

    %type elements Vec<Node>;
    elements ::= { Vec::new() };
    elements ::= elements(mut v) element(n) { v.push(n); v };

    %type element Node;
    element ::= Text(t) { Node::Text(t) };
    element ::= tag(t) { Node::Tag(t) };

    %type tag TagNode;
    tag ::= LBracket Ident(name) atoms(a) RBracket {
        let (idents, ints, children) = a;
        TagNode { name, idents, ints, children }
    };

    %type atoms (Vec<String>, Vec<i64>, Option<Vec<Node>>);
    atoms ::= { (Vec::new(), Vec::new(), None) };
    atoms ::= atoms(mut a) Ident(i) { a.0.push(i); a };
    atoms ::= atoms(mut a) Int(i) {
        match parse_int(&i) {
            Some(value) => {
                a.1.push(value);
                a
            }
            None => return Err(ScriptError::IntLiteralFormat(i)),
        }
    };
    atoms ::= atoms(mut a) sub_block(b) { a.2 = Some(b); a };

    %type sub_block Vec<Node>;
    sub_block ::= LBracket elements(e) RBracket { e };
}

pub use parser::*;

#[cfg(test)]
mod tests {
    use crate::ast::Node;
    use crate::compiler::{parse_source, ScriptError};

    #[test]
    fn test_parse_tag_shapes() -> Result<(), ScriptError> {
        let nodes = parse_source("[dlg hi [Bob]]Hello[n]world[e]")?;

        assert_eq!(nodes.len(), 5);

        match &nodes[0] {
            Node::Tag(tag) => {
                assert_eq!(tag.name, "dlg");
                assert_eq!(tag.idents, vec!["hi".to_string()]);
                assert_eq!(
                    tag.children,
                    Some(vec![Node::Text("Bob".to_string())])
                );
            }
            other => panic!("expected dlg tag, got {other:?}"),
        }

        assert_eq!(nodes[1], Node::Text("Hello".to_string()));
        assert_eq!(nodes[3], Node::Text("world".to_string()));

        Ok(())
    }

    #[test]
    fn test_parse_int_literals() -> Result<(), ScriptError> {
        let nodes = parse_source("[dlg w][f 2 0x1F -1][e]")?;

        match &nodes[1] {
            Node::Tag(tag) => {
                assert_eq!(tag.name, "f");
                assert_eq!(tag.ints, vec![2, 0x1F, -1]);
            }
            other => panic!("expected f tag, got {other:?}"),
        }

        Ok(())
    }

    #[test]
    fn test_parse_speaker_with_inline_tag() -> Result<(), ScriptError> {
        let nodes = parse_source("[dlg w [[f 1 2]Bob]][e]")?;

        match &nodes[0] {
            Node::Tag(tag) => {
                let children = tag.children.as_ref().unwrap();
                assert_eq!(children.len(), 2);
                assert!(matches!(&children[0], Node::Tag(inner) if inner.name == "f"));
                assert_eq!(children[1], Node::Text("Bob".to_string()));
            }
            other => panic!("expected dlg tag, got {other:?}"),
        }

        Ok(())
    }

    #[test]
    fn test_unbalanced_bracket_is_a_syntax_error() {
        assert!(parse_source("[dlg hi").is_err());
        assert!(parse_source("[dlg hi]]extra[e]").is_err());
    }

    #[test]
    fn test_oversized_int_literal_is_an_error() {
        let result = parse_source("[dlg w][f 0 0 99999999999999999999999][e]");

        assert!(matches!(
            result,
            Err(ScriptError::IntLiteralFormat(text)) if text == "99999999999999999999999"
        ));
    }
}
