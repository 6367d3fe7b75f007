use std::io::{self, Write};

use thiserror::Error;

use crate::library::{FunctionLibrary, UNUSED_FUNCTION_NAME};
use crate::model::{FunctionToken, Line, MessageScript, Speaker, Token, Window};

#[derive(Debug, Error)]
pub enum DecompileError {
    #[error("IO Error: {0}")]
    IoError(#[from] io::Error),
}

/// Turns model windows back into tag surface syntax.
///
/// Owns its text sink for its lifetime, like a reader owns its stream.
pub struct Decompiler<'a, W> {
    out: W,
    library: Option<&'a FunctionLibrary>,
    omit_unused: bool,
}

impl<'a, W: Write> Decompiler<'a, W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            library: None,
            omit_unused: false,
        }
    }

    pub fn with_library(mut self, library: &'a FunctionLibrary) -> Self {
        self.library = Some(library);
        self
    }

    /// Drop function tokens whose library name is the @Unused sentinel.
    pub fn omit_unused(mut self, omit: bool) -> Self {
        self.omit_unused = omit;
        self
    }

    pub fn decompile(&mut self, script: &MessageScript) -> Result<(), DecompileError> {
        for window in &script.windows {
            self.window(window)?;
        }

        Ok(())
    }

    fn window(&mut self, window: &Window) -> Result<(), DecompileError> {
        match window {
            Window::Dialogue(dlg) => {
                match &dlg.speaker {
                    None => writeln!(self.out, "[dlg {}]", dlg.identifier)?,

                    Some(Speaker::VariableIndex(index)) => {
                        writeln!(self.out, "[dlg {} [{}]]", dlg.identifier, index)?
                    }

                    Some(Speaker::Named(line)) => {
                        write!(self.out, "[dlg {} [", dlg.identifier)?;
                        self.tokens(&line.tokens)?;
                        writeln!(self.out, "]]")?;
                    }
                }

                self.lines(&dlg.lines)
            }

            Window::Selection(sel) => {
                writeln!(self.out, "[sel {}]", sel.identifier)?;
                self.lines(&sel.lines)
            }
        }
    }

    fn lines(&mut self, lines: &[Line]) -> Result<(), DecompileError> {
        for line in lines {
            self.tokens(&line.tokens)?;
            writeln!(self.out, "[e]")?;
        }

        Ok(())
    }

    fn tokens(&mut self, tokens: &[Token]) -> Result<(), DecompileError> {
        for token in tokens {
            match token {
                Token::Text(bytes) => self.text(bytes)?,
                Token::Function(function) => self.function(function)?,
                Token::NewLine => write!(self.out, "[n]")?,
                Token::CodePoint { high, low } => {
                    write!(self.out, "[x 0x{high:02X} 0x{low:02X}]")?
                }
            }
        }

        Ok(())
    }

    /// Text bytes pass through, except the conveniences the compiler can
    /// reverse: 0x0A becomes [n] and two-byte characters become [x ..] so
    /// the emitted source stays ASCII.
    fn text(&mut self, bytes: &[u8]) -> Result<(), DecompileError> {
        let mut pos = 0;

        while pos < bytes.len() {
            let byte = bytes[pos];

            if byte == 0x0A {
                write!(self.out, "[n]")?;
                pos += 1;
            } else if byte & 0x80 != 0 {
                let low = bytes.get(pos + 1).copied().unwrap_or(0);
                write!(self.out, "[x 0x{byte:02X} 0x{low:02X}]")?;
                pos += 2;
            } else {
                self.out.write_all(&[byte])?;
                pos += 1;
            }
        }

        Ok(())
    }

    fn function(&mut self, function: &FunctionToken) -> Result<(), DecompileError> {
        let named = self
            .library
            .and_then(|library| library.find_by_index(function.table_index, function.function_index));

        match named {
            Some(entry) if self.omit_unused && entry.name == UNUSED_FUNCTION_NAME => Ok(()),

            Some(entry) => {
                write!(self.out, "[{}", entry.name)?;

                for arg in &function.args {
                    write!(self.out, " {arg}")?;
                }

                write!(self.out, "]")?;
                Ok(())
            }

            None => {
                write!(
                    self.out,
                    "[f {} {}",
                    function.table_index, function.function_index
                )?;

                for arg in &function.args {
                    write!(self.out, " {arg}")?;
                }

                write!(self.out, "]")?;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::library::{LibraryFunction, MessageLibrary};
    use crate::model::{DialogueWindow, FormatVersion, SelectionWindow};

    use super::*;

    fn decompile_to_string(script: &MessageScript) -> String {
        let mut out = Vec::new();
        Decompiler::new(&mut out).decompile(script).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_decompile_variable_speaker_and_raw_function() {
        let mut script = MessageScript::new(0, FormatVersion::Version1);

        let mut window = DialogueWindow::new("w");
        window.speaker = Some(Speaker::VariableIndex(3));
        window
            .lines
            .push(Line::new(vec![Token::function(0, 2, vec![100])]));
        script.windows.push(Window::Dialogue(window));

        assert_eq!(
            decompile_to_string(&script),
            "[dlg w [3]]\n[f 0 2 100][e]\n"
        );
    }

    #[test]
    fn test_decompile_named_speaker() {
        let mut script = MessageScript::new(0, FormatVersion::Version1);

        let mut window = DialogueWindow::new("hi");
        window.speaker = Some(Speaker::Named(Line::new(vec![Token::text(*b"Bob")])));
        window.lines.push(Line::new(vec![
            Token::text(*b"Hello"),
            Token::NewLine,
            Token::text(*b"world"),
        ]));
        script.windows.push(Window::Dialogue(window));

        assert_eq!(
            decompile_to_string(&script),
            "[dlg hi [Bob]]\nHello[n]world[e]\n"
        );
    }

    #[test]
    fn test_decompile_selection() {
        let mut script = MessageScript::new(0, FormatVersion::Version1);

        let mut window = SelectionWindow::new("pick");
        window.lines.push(Line::new(vec![Token::text(*b"Yes")]));
        window.lines.push(Line::new(vec![Token::text(*b"No")]));
        script.windows.push(Window::Selection(window));

        assert_eq!(
            decompile_to_string(&script),
            "[sel pick]\nYes[e]\nNo[e]\n"
        );
    }

    #[test]
    fn test_decompile_escapes_text_bytes() {
        let mut script = MessageScript::new(0, FormatVersion::Version1);

        let mut window = DialogueWindow::new("w");
        window
            .lines
            .push(Line::new(vec![Token::text(vec![0x41, 0x0A, 0x81, 0x40])]));
        script.windows.push(Window::Dialogue(window));

        assert_eq!(
            decompile_to_string(&script),
            "[dlg w]\nA[n][x 0x81 0x40][e]\n"
        );
    }

    #[test]
    fn test_library_names_and_unused_suppression() {
        let library = FunctionLibrary::new(vec![MessageLibrary {
            name: "System".to_string(),
            index: 0,
            functions: vec![
                LibraryFunction {
                    name: "wait".to_string(),
                    index: 2,
                    parameters: vec!["frames".to_string()],
                },
                LibraryFunction {
                    name: UNUSED_FUNCTION_NAME.to_string(),
                    index: 3,
                    parameters: vec![],
                },
            ],
        }]);

        let mut script = MessageScript::new(0, FormatVersion::Version1);
        let mut window = DialogueWindow::new("w");
        window.lines.push(Line::new(vec![
            Token::function(0, 2, vec![30]),
            Token::function(0, 3, vec![]),
        ]));
        script.windows.push(Window::Dialogue(window));

        let mut out = Vec::new();
        Decompiler::new(&mut out)
            .with_library(&library)
            .omit_unused(true)
            .decompile(&script)
            .unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "[dlg w]\n[wait 30][e]\n");
    }
}
