use std::fmt;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("Unknown tag [{0}]")]
    UnknownTag(String),

    #[error("Tag [{0}] expects integer literal arguments")]
    IntLiteralFormat(String),

    #[error("Value {1} does not fit the {2} argument of [{0}]")]
    ArgOutOfRange(String, i64, &'static str),

    #[error("Tag [{tag}] takes {expected} arguments but got {got}")]
    TagArgumentCount {
        tag: String,
        expected: usize,
        got: usize,
    },

    #[error("Window tag [{0}] needs an identifier")]
    MissingWindowIdentifier(&'static str),

    #[error("Content before the first window tag")]
    ContentOutsideWindow,
}

#[derive(Debug, Error)]
pub struct CompileErrors(pub Vec<CompileError>);

impl fmt::Display for CompileErrors {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for e in &self.0 {
            writeln!(f, "{}", e)?;
        }

        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Compile errors:\n{0}")]
    CompileErrors(#[from] CompileErrors),

    #[error("Unrecognized input at line {line}, column {col}")]
    LexError { line: u32, col: u32 },

    #[error("Integer literal '{0}' is not a valid 64-bit value")]
    IntLiteralFormat(String),

    #[error("Syntax error")]
    SyntaxError,

    #[error("Syntax error at line {line}, column {col}")]
    Syntax { line: u32, col: u32 },

    #[error("Fatal syntax error")]
    ParseFail,

    #[error("Fatal parse error: stack overflow")]
    ParseStackOverflow,
}
