use std::mem;

use encoding_rs::Encoding;

use crate::ast::{Node, TagNode};
use crate::diagnostics::DiagnosticSink;
use crate::library::FunctionLibrary;
use crate::model::{
    DialogueWindow, FormatVersion, Line, MessageScript, SelectionWindow, Speaker, Token, Window,
    IDENTIFIER_LEN,
};

use super::error::{CompileError, CompileErrors};

pub struct CompilerOptions<'a> {
    pub library: Option<&'a FunctionLibrary>,
    /// Byte encoding for non-ASCII free text; without one such text is
    /// dropped with a warning.
    pub encoding: Option<&'static Encoding>,
    /// Raise ArgOutOfRange instead of truncating oversized integers.
    pub strict_args: bool,
    pub version: FormatVersion,
    pub user_id: i16,
}

impl Default for CompilerOptions<'_> {
    fn default() -> Self {
        Self {
            library: None,
            encoding: None,
            strict_args: false,
            version: FormatVersion::Version1,
            user_id: 0,
        }
    }
}

enum PendingKind {
    Dialogue { speaker: Option<Speaker> },
    Selection,
}

struct PendingWindow {
    kind: PendingKind,
    identifier: String,
    lines: Vec<Line>,
    tokens: Vec<Token>,
}

impl PendingWindow {
    fn into_window(self) -> Window {
        match self.kind {
            PendingKind::Dialogue { speaker } => Window::Dialogue(DialogueWindow {
                identifier: self.identifier,
                speaker,
                lines: self.lines,
            }),

            PendingKind::Selection => Window::Selection(SelectionWindow {
                identifier: self.identifier,
                lines: self.lines,
                field_18: 0,
                field_1c: 0,
                field_1e: 0,
            }),
        }
    }
}

struct Emit<'a, 'b> {
    opts: &'a CompilerOptions<'a>,
    sink: &'b mut dyn DiagnosticSink,
    windows: Vec<Window>,
    current: Option<PendingWindow>,
    err: Vec<CompileError>,
}

impl<'a, 'b> Emit<'a, 'b> {
    fn new(opts: &'a CompilerOptions<'a>, sink: &'b mut dyn DiagnosticSink) -> Self {
        Self {
            opts,
            sink,
            windows: Vec::new(),
            current: None,
            err: Vec::new(),
        }
    }

    fn error(&mut self, error: CompileError) {
        self.sink.error(error.to_string());
        self.err.push(error);
    }

    fn narrow_i16(&mut self, tag: &str, value: i64) -> i16 {
        if i16::try_from(value).is_err() {
            if self.opts.strict_args {
                self.error(CompileError::ArgOutOfRange(tag.to_string(), value, "i16"));
            } else {
                self.sink
                    .trace(format!("[{tag}]: truncating {value} to 16 bits"));
            }
        }

        value as i16
    }

    fn narrow_to(&mut self, tag: &str, value: i64, max: i64, what: &'static str) -> u8 {
        if value < 0 || value > max {
            if self.opts.strict_args {
                self.error(CompileError::ArgOutOfRange(tag.to_string(), value, what));
            } else {
                self.sink
                    .trace(format!("[{tag}]: truncating {value} to a {what}"));
            }
        }

        (value as u8) & (max as u8)
    }

    fn encode_text(&mut self, text: &str) -> Vec<u8> {
        match self.opts.encoding {
            Some(encoding) => {
                let (bytes, _, had_errors) = encoding.encode(text);

                if had_errors {
                    self.sink.warning(format!(
                        "text {text:?} is not fully representable in {}",
                        encoding.name()
                    ));
                }

                bytes.into_owned()
            }

            None => {
                if !text.is_ascii() {
                    self.sink.warning(format!(
                        "dropping non-ASCII characters from {text:?}; configure an encoding or use [x]"
                    ));
                }

                text.chars()
                    .filter(|c| c.is_ascii())
                    .map(|c| c as u8)
                    .collect()
            }
        }
    }

    /// Free text keeps its bytes except bare line breaks, which belong to
    /// the source layout rather than the window content.
    fn text_bytes(&mut self, text: &str) -> Vec<u8> {
        let stripped: String = text.chars().filter(|&c| c != '\r' && c != '\n').collect();

        if stripped.is_empty() {
            Vec::new()
        } else {
            self.encode_text(&stripped)
        }
    }

    fn clamp_identifier(&mut self, identifier: &str) -> String {
        let mut clamped: String = identifier.chars().filter(|c| c.is_ascii()).collect();

        if clamped.len() > IDENTIFIER_LEN {
            clamped.truncate(IDENTIFIER_LEN);

            self.sink.warning(format!(
                "identifier '{identifier}' truncated to {IDENTIFIER_LEN} bytes"
            ));
        }

        clamped
    }

    /// Translates one non-structural tag into a token. Returns None after
    /// reporting an error.
    fn token_for_tag(&mut self, tag: &TagNode) -> Option<Token> {
        if !tag.idents.is_empty() {
            self.error(CompileError::IntLiteralFormat(tag.name.clone()));
            return None;
        }

        match tag.name.to_ascii_lowercase().as_str() {
            "n" => Some(Token::NewLine),

            "x" => {
                if tag.ints.len() != 2 {
                    self.error(CompileError::TagArgumentCount {
                        tag: tag.name.clone(),
                        expected: 2,
                        got: tag.ints.len(),
                    });
                    return None;
                }

                let high = self.narrow_to(&tag.name, tag.ints[0], 0xFF, "u8");
                let low = self.narrow_to(&tag.name, tag.ints[1], 0xFF, "u8");

                Some(Token::CodePoint { high, low })
            }

            "f" => {
                if tag.ints.len() < 2 {
                    self.error(CompileError::TagArgumentCount {
                        tag: tag.name.clone(),
                        expected: 2,
                        got: tag.ints.len(),
                    });
                    return None;
                }

                let table_index = self.narrow_to(&tag.name, tag.ints[0], 0x07, "table index");
                let function_index =
                    self.narrow_to(&tag.name, tag.ints[1], 0x1F, "function index");

                let args = tag.ints[2..]
                    .iter()
                    .map(|&arg| self.narrow_i16(&tag.name, arg))
                    .collect();

                Some(Token::function(table_index, function_index, args))
            }

            _ => self.library_tag(tag),
        }
    }

    fn library_tag(&mut self, tag: &TagNode) -> Option<Token> {
        /* library names match case-sensitively, unlike the reserved tags */

        let Some((table_index, function)) = self
            .opts
            .library
            .and_then(|library| library.find_by_name(&tag.name))
        else {
            self.error(CompileError::UnknownTag(tag.name.clone()));
            return None;
        };

        let function_index = function.index;
        let expected = function.parameters.len();

        if tag.ints.len() != expected {
            self.error(CompileError::TagArgumentCount {
                tag: tag.name.clone(),
                expected,
                got: tag.ints.len(),
            });
            return None;
        }

        let args = tag
            .ints
            .iter()
            .map(|&arg| self.narrow_i16(&tag.name, arg))
            .collect();

        Some(Token::function(table_index, function_index, args))
    }

    fn speaker_from_nodes(&mut self, nodes: &[Node]) -> Option<Speaker> {
        let mut lines: Vec<Line> = Vec::new();
        let mut tokens: Vec<Token> = Vec::new();

        for node in nodes {
            match node {
                Node::Text(text) => {
                    let bytes = self.text_bytes(text);

                    if !bytes.is_empty() {
                        tokens.push(Token::Text(bytes));
                    }
                }

                Node::Tag(tag) if tag.name.eq_ignore_ascii_case("e") => {
                    lines.push(Line::new(mem::take(&mut tokens)));
                }

                Node::Tag(tag) => {
                    if let Some(token) = self.token_for_tag(tag) {
                        tokens.push(token);
                    }
                }
            }
        }

        if !tokens.is_empty() {
            lines.push(Line::new(tokens));
        }

        if lines.len() > 1 {
            self.sink
                .warning("speaker block has more than one line; extras ignored".to_string());
        }

        let first = lines.into_iter().next()?;

        /* a lone integer in the block selects a run-time speaker slot */

        if let [Token::Text(bytes)] = &first.tokens[..] {
            if let Some(index) = std::str::from_utf8(bytes)
                .ok()
                .and_then(|text| text.trim().parse::<i64>().ok())
            {
                if u16::try_from(index).is_err() && self.opts.strict_args {
                    self.error(CompileError::ArgOutOfRange("dlg".to_string(), index, "u16"));
                }

                return Some(Speaker::VariableIndex(index as u16));
            }
        }

        Some(Speaker::Named(first))
    }

    fn flush_window(&mut self) {
        let Some(mut pending) = self.current.take() else {
            return;
        };

        if !pending.tokens.is_empty() {
            self.sink.warning(format!(
                "window '{}' does not end with [e]; keeping trailing tokens as a final line",
                pending.identifier
            ));

            pending.lines.push(Line::new(mem::take(&mut pending.tokens)));
        }

        self.windows.push(pending.into_window());
    }

    fn begin_window(&mut self, tag: &TagNode, kind_name: &'static str) {
        self.flush_window();

        let identifier = match tag.idents.first() {
            Some(identifier) => self.clamp_identifier(identifier),
            None => {
                self.error(CompileError::MissingWindowIdentifier(kind_name));
                String::new()
            }
        };

        let kind = if kind_name == "dlg" {
            let speaker = tag
                .children
                .as_ref()
                .and_then(|nodes| self.speaker_from_nodes(nodes));

            PendingKind::Dialogue { speaker }
        } else {
            if tag.children.is_some() {
                self.sink
                    .warning("selection windows take no speaker block".to_string());
            }

            PendingKind::Selection
        };

        self.current = Some(PendingWindow {
            kind,
            identifier,
            lines: Vec::new(),
            tokens: Vec::new(),
        });
    }

    fn tag(&mut self, tag: &TagNode) {
        match tag.name.as_str() {
            "dlg" => return self.begin_window(tag, "dlg"),
            "sel" => return self.begin_window(tag, "sel"),
            _ => {}
        }

        if tag.name.eq_ignore_ascii_case("e") {
            match &mut self.current {
                Some(current) => {
                    let tokens = mem::take(&mut current.tokens);
                    current.lines.push(Line::new(tokens));
                }
                None => self.error(CompileError::ContentOutsideWindow),
            }

            return;
        }

        let Some(token) = self.token_for_tag(tag) else {
            return;
        };

        match &mut self.current {
            Some(current) => current.tokens.push(token),
            None => self.error(CompileError::ContentOutsideWindow),
        }
    }

    fn node(&mut self, node: &Node) {
        match node {
            Node::Text(text) => {
                let bytes = self.text_bytes(text);

                if bytes.is_empty() {
                    return;
                }

                match &mut self.current {
                    Some(current) => current.tokens.push(Token::Text(bytes)),
                    None => self.error(CompileError::ContentOutsideWindow),
                }
            }

            Node::Tag(tag) => self.tag(tag),
        }
    }

    fn end(mut self) -> Result<MessageScript, CompileErrors> {
        self.flush_window();

        if !self.err.is_empty() {
            return Err(CompileErrors(self.err));
        }

        let mut script = MessageScript::new(self.opts.user_id, self.opts.version);
        script.windows = self.windows;
        Ok(script)
    }
}

/// Compiles a parse tree into a script, accumulating every error before
/// failing.
pub fn compile_nodes(
    nodes: &[Node],
    opts: &CompilerOptions,
    sink: &mut dyn DiagnosticSink,
) -> Result<MessageScript, CompileErrors> {
    let mut emit = Emit::new(opts, sink);

    for node in nodes {
        emit.node(node);
    }

    emit.end()
}
