pub mod lift;
pub mod reader;
pub mod tokens;
pub mod writer;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use thiserror::Error;

use crate::model::{MessageScript, IDENTIFIER_LEN};

pub use tokens::{decode_line, encode_line, encode_tokens, TokenError};

/// Fixed header size; all body offsets are relative to the byte after it.
pub const HEADER_SIZE: usize = 32;

pub const MAGIC_V1: &[u8; 4] = b"MSG1";
/// Historic magic still accepted on read.
pub const MAGIC_V0: &[u8; 4] = b"MSG0";
/// The version-1 magic as seen through the other byte order.
pub const MAGIC_V1_REVERSED: &[u8; 4] = b"1GSM";

pub const WINDOW_TYPE_DIALOGUE: i32 = 0;
pub const WINDOW_TYPE_SELECTION: i32 = 1;

/// Byte order of a container, decided by its magic at run time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    pub fn read_u16(self, buf: &[u8]) -> u16 {
        match self {
            Endian::Little => LittleEndian::read_u16(buf),
            Endian::Big => BigEndian::read_u16(buf),
        }
    }

    pub fn read_i16(self, buf: &[u8]) -> i16 {
        match self {
            Endian::Little => LittleEndian::read_i16(buf),
            Endian::Big => BigEndian::read_i16(buf),
        }
    }

    pub fn read_i32(self, buf: &[u8]) -> i32 {
        match self {
            Endian::Little => LittleEndian::read_i32(buf),
            Endian::Big => BigEndian::read_i32(buf),
        }
    }

    pub fn write_u16(self, buf: &mut [u8], val: u16) {
        match self {
            Endian::Little => LittleEndian::write_u16(buf, val),
            Endian::Big => BigEndian::write_u16(buf, val),
        }
    }

    pub fn write_i16(self, buf: &mut [u8], val: i16) {
        match self {
            Endian::Little => LittleEndian::write_i16(buf, val),
            Endian::Big => BigEndian::write_i16(buf, val),
        }
    }

    pub fn write_i32(self, buf: &mut [u8], val: i32) {
        match self {
            Endian::Little => LittleEndian::write_i32(buf, val),
            Endian::Big => BigEndian::write_i32(buf, val),
        }
    }

    pub fn write_u32(self, buf: &mut [u8], val: u32) {
        match self {
            Endian::Little => LittleEndian::write_u32(buf, val),
            Endian::Big => BigEndian::write_u32(buf, val),
        }
    }
}

#[derive(Debug, Error)]
pub enum BinaryError {
    #[error("Header magic matches neither forward nor reversed form")]
    InvalidHeaderMagic,

    #[error("Stream too small: needed {needed} bytes at offset {offset}")]
    StreamTooSmall { offset: usize, needed: usize },

    #[error("Unknown window type {0}")]
    UnknownWindowType(i32),

    #[error("Identifier '{0}' exceeds {IDENTIFIER_LEN} bytes")]
    IdentifierTooLong(String),

    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Raw container form: disk layout with offsets exactly as stored.
#[derive(Debug, Clone)]
pub struct RawScript {
    pub endian: Endian,
    pub file_type: u8,
    pub compressed: bool,
    pub user_id: i16,
    pub field_0c: i32,
    pub relocated: bool,
    pub field_1e: i16,
    /// Relocation bytes as read; regenerated from scratch on write.
    pub relocation: Vec<u8>,
    pub windows: Vec<RawWindow>,
    /// Speaker names without their NUL terminators; None for null entries.
    pub speakers: Vec<Option<Vec<u8>>>,
    pub speaker_field_08: i32,
    pub speaker_field_0c: i32,
}

#[derive(Debug, Clone)]
pub enum RawWindow {
    Dialogue(RawDialogue),
    Selection(RawSelection),
}

#[derive(Debug, Clone)]
pub struct RawDialogue {
    pub identifier: [u8; IDENTIFIER_LEN],
    pub speaker_id: u16,
    /// Start offsets as stored (absolute within the body area).
    pub line_offsets: Vec<i32>,
    pub text_buffer: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct RawSelection {
    pub identifier: [u8; IDENTIFIER_LEN],
    pub field_18: i16,
    pub field_1c: i16,
    pub field_1e: i16,
    pub option_offsets: Vec<i32>,
    pub text_buffer: Vec<u8>,
}

impl RawWindow {
    pub fn window_type(&self) -> i32 {
        match self {
            RawWindow::Dialogue(_) => WINDOW_TYPE_DIALOGUE,
            RawWindow::Selection(_) => WINDOW_TYPE_SELECTION,
        }
    }
}

/// Parses a container and lifts it into the mutable model.
pub fn decode_script(data: &[u8]) -> Result<MessageScript, BinaryError> {
    decode_script_with_hint(data, None)
}

/// Like `decode_script`, but lets the caller override the byte order a
/// forward magic implies (big-endian containers with an unswapped magic).
pub fn decode_script_with_hint(
    data: &[u8],
    hint: Option<Endian>,
) -> Result<MessageScript, BinaryError> {
    let raw = reader::decode_raw_with_hint(data, hint)?;
    lift::lift_script(&raw)
}

/// Lowers the model and serializes it into container bytes.
pub fn encode_script(script: &MessageScript) -> Result<Vec<u8>, BinaryError> {
    let raw = lift::lower_script(script)?;
    Ok(writer::encode_raw(&raw))
}
