use lexgen_util::Loc;

use crate::ast::Node;
use crate::diagnostics::DiagnosticSink;
use crate::model::MessageScript;

use super::emitter::{compile_nodes, CompilerOptions};
use super::{Lexer, ParseContext, Parser, ScriptError};

fn locate(err: ScriptError, loc: Loc) -> ScriptError {
    match err {
        ScriptError::SyntaxError => ScriptError::Syntax {
            line: loc.line + 1,
            col: loc.col + 1,
        },
        other => other,
    }
}

/// Runs the grammar front-end over source text, yielding the neutral
/// parse tree the emitter consumes.
pub fn parse_source(source: &str) -> Result<Vec<Node>, ScriptError> {
    use lexgen_util::LexerErrorKind;

    let lexer = Lexer::new(source);
    let mut parser = Parser::new(ParseContext::new());

    let mut last_loc = Loc {
        line: 0,
        col: 0,
        byte_idx: 0,
    };

    for tok in lexer {
        match tok {
            Ok((loc, tok, _)) => {
                last_loc = loc;

                if let Err(err) = parser.parse(tok) {
                    return Err(locate(err, loc));
                }
            }

            Err(err) => match err.kind {
                LexerErrorKind::InvalidToken => {
                    return Err(ScriptError::LexError {
                        line: err.location.line + 1,
                        col: err.location.col + 1,
                    })
                }
                LexerErrorKind::Custom(_) => unreachable!("the lexer has no custom errors"),
            },
        }
    }

    match parser.end_of_input() {
        Ok((_, parse_ctx)) => Ok(parse_ctx.nodes),
        Err(err) => Err(locate(err, last_loc)),
    }
}

/// Parse and compile in one step, raising after diagnostics accumulate.
pub fn compile_source(
    source: &str,
    opts: &CompilerOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<MessageScript, ScriptError> {
    let nodes = parse_source(source)?;

    compile_nodes(&nodes, opts, sink).map_err(ScriptError::from)
}
