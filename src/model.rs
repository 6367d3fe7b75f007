use crate::binary::Endian;

/// Identifiers are stored as fixed-size NUL-padded ASCII on disk.
pub const IDENTIFIER_LEN: usize = 24;

/// speaker_id value marking a dialogue window with no speaker at all.
pub const NO_SPEAKER: u16 = 0xFFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatVersion {
    Version1,
    Version1BigEndian,
}

impl FormatVersion {
    pub fn endian(self) -> Endian {
        match self {
            FormatVersion::Version1 => Endian::Little,
            FormatVersion::Version1BigEndian => Endian::Big,
        }
    }

    pub fn from_endian(endian: Endian) -> Self {
        match endian {
            Endian::Little => FormatVersion::Version1,
            Endian::Big => FormatVersion::Version1BigEndian,
        }
    }
}

/// Header and speaker-table fields with no known semantics.
///
/// They are never interpreted, only carried so re-encoding a read script
/// reproduces them verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservedFields {
    pub file_type: u8,
    pub compressed: bool,
    pub field_0c: i32,
    pub relocated: bool,
    pub field_1e: i16,
    pub speaker_field_08: i32,
    pub speaker_field_0c: i32,
}

impl Default for ReservedFields {
    fn default() -> Self {
        Self {
            file_type: 7,
            compressed: false,
            field_0c: 0,
            relocated: false,
            field_1e: 0,
            speaker_field_08: 0,
            speaker_field_0c: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageScript {
    pub user_id: i16,
    pub version: FormatVersion,
    pub windows: Vec<Window>,
    pub reserved: ReservedFields,
}

impl MessageScript {
    pub fn new(user_id: i16, version: FormatVersion) -> Self {
        Self {
            user_id,
            version,
            windows: Vec::new(),
            reserved: ReservedFields::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Window {
    Dialogue(DialogueWindow),
    Selection(SelectionWindow),
}

impl Window {
    pub fn identifier(&self) -> &str {
        match self {
            Window::Dialogue(dlg) => &dlg.identifier,
            Window::Selection(sel) => &sel.identifier,
        }
    }

    pub fn lines(&self) -> &[Line] {
        match self {
            Window::Dialogue(dlg) => &dlg.lines,
            Window::Selection(sel) => &sel.lines,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueWindow {
    pub identifier: String,
    pub speaker: Option<Speaker>,
    pub lines: Vec<Line>,
}

impl DialogueWindow {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            speaker: None,
            lines: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionWindow {
    pub identifier: String,
    pub lines: Vec<Line>,
    pub field_18: i16,
    pub field_1c: i16,
    pub field_1e: i16,
}

impl SelectionWindow {
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            lines: Vec::new(),
            field_18: 0,
            field_1c: 0,
            field_1e: 0,
        }
    }
}

/// Who is speaking in a dialogue window.
///
/// `Named` speaker names are full token lines so they can carry inline
/// function tags. `VariableIndex` is substituted by the game at run time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Speaker {
    Named(Line),
    VariableIndex(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Line {
    pub tokens: Vec<Token>,
}

impl Line {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A run of character bytes in the game's text encoding.
    Text(Vec<u8>),
    Function(FunctionToken),
    /// Surface-level line break within a window line.
    NewLine,
    /// An explicit two-byte character escape.
    CodePoint { high: u8, low: u8 },
}

impl Token {
    pub fn text(bytes: impl Into<Vec<u8>>) -> Self {
        Token::Text(bytes.into())
    }

    pub fn function(table_index: u8, function_index: u8, args: Vec<i16>) -> Self {
        Token::Function(FunctionToken {
            table_index,
            function_index,
            args,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionToken {
    /// 0..=7
    pub table_index: u8,
    /// 0..=31
    pub function_index: u8,
    pub args: Vec<i16>,
}
