use log::{debug, trace};

use crate::model::IDENTIFIER_LEN;

use super::{
    BinaryError, Endian, RawDialogue, RawScript, RawSelection, RawWindow, HEADER_SIZE, MAGIC_V0,
    MAGIC_V1, MAGIC_V1_REVERSED, WINDOW_TYPE_DIALOGUE, WINDOW_TYPE_SELECTION,
};

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
}

impl<'a> Cursor<'a> {
    fn at(data: &'a [u8], pos: usize, endian: Endian) -> Self {
        Self { data, pos, endian }
    }

    fn need(&self, count: usize) -> Result<(), BinaryError> {
        if self.pos + count > self.data.len() {
            Err(BinaryError::StreamTooSmall {
                offset: self.pos,
                needed: count,
            })
        } else {
            Ok(())
        }
    }

    fn read_u8(&mut self) -> Result<u8, BinaryError> {
        self.need(1)?;
        self.pos += 1;
        Ok(self.data[self.pos - 1])
    }

    fn read_i16(&mut self) -> Result<i16, BinaryError> {
        self.need(2)?;
        self.pos += 2;
        Ok(self.endian.read_i16(&self.data[self.pos - 2..]))
    }

    fn read_u16(&mut self) -> Result<u16, BinaryError> {
        self.need(2)?;
        self.pos += 2;
        Ok(self.endian.read_u16(&self.data[self.pos - 2..]))
    }

    fn read_i32(&mut self) -> Result<i32, BinaryError> {
        self.need(4)?;
        self.pos += 4;
        Ok(self.endian.read_i32(&self.data[self.pos - 4..]))
    }

    fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], BinaryError> {
        self.need(count)?;
        self.pos += count;
        Ok(&self.data[self.pos - count..self.pos])
    }
}

/// Converts a stored count or offset into usize, rejecting negatives.
fn stored_len(value: i32, offset: usize) -> Result<usize, BinaryError> {
    usize::try_from(value).map_err(|_| BinaryError::StreamTooSmall { offset, needed: 0 })
}

fn resolve_endian(magic: &[u8], hint: Option<Endian>) -> Result<Endian, BinaryError> {
    if magic == MAGIC_V1 || magic == MAGIC_V0 {
        /* a caller hint flips the interpretation of a forward magic */
        Ok(hint.unwrap_or(Endian::Little))
    } else if magic == MAGIC_V1_REVERSED {
        Ok(Endian::Big)
    } else {
        Err(BinaryError::InvalidHeaderMagic)
    }
}

/// Parses a container into the raw model, deciding endianness from the magic.
pub fn decode_raw(data: &[u8]) -> Result<RawScript, BinaryError> {
    decode_raw_with_hint(data, None)
}

pub fn decode_raw_with_hint(
    data: &[u8],
    hint: Option<Endian>,
) -> Result<RawScript, BinaryError> {
    if data.len() < HEADER_SIZE {
        return Err(BinaryError::StreamTooSmall {
            offset: 0,
            needed: HEADER_SIZE,
        });
    }

    let endian = resolve_endian(&data[0x08..0x0C], hint)?;

    let mut head = Cursor::at(data, 0, endian);

    let file_type = head.read_u8()?;
    let compressed = head.read_u8()? != 0;
    let user_id = head.read_i16()?;
    let file_size = head.read_i32()?;
    head.read_bytes(4)?; /* magic, already inspected */
    let field_0c = head.read_i32()?;
    let relocation_table_offset = head.read_i32()?;
    let relocation_table_size = head.read_i32()?;
    let window_count = head.read_i32()?;
    let relocated = head.read_i16()? != 0;
    let field_1e = head.read_i16()?;

    debug!(
        "container: {window_count} windows, {file_size} bytes, {endian:?} byte order"
    );

    if field_0c != 0 {
        trace!("header field_0C is {field_0c:#010X}");
    }

    if field_1e != 0 {
        trace!("header field_1E is {field_1e:#06X}");
    }

    let relocation = if relocation_table_offset != 0 {
        let offset = stored_len(relocation_table_offset, 0x10)?;
        let size = stored_len(relocation_table_size, 0x14)?;

        Cursor::at(data, offset, endian).read_bytes(size)?.to_vec()
    } else {
        Vec::new()
    };

    let window_count = stored_len(window_count, 0x18)?;

    let mut table = Cursor::at(data, HEADER_SIZE, endian);
    let mut windows = Vec::with_capacity(window_count);

    for _ in 0..window_count {
        let window_type = table.read_i32()?;
        let window_offset = table.read_i32()?;

        if window_offset == 0 {
            trace!("skipping null window table entry");
            continue;
        }

        let offset = HEADER_SIZE + stored_len(window_offset, table.pos - 4)?;
        let mut body = Cursor::at(data, offset, endian);

        let window = match window_type {
            WINDOW_TYPE_DIALOGUE => RawWindow::Dialogue(read_dialogue(&mut body)?),
            WINDOW_TYPE_SELECTION => RawWindow::Selection(read_selection(&mut body)?),
            other => return Err(BinaryError::UnknownWindowType(other)),
        };

        windows.push(window);
    }

    /* the speaker table header sits right after the window table */

    let speaker_name_array_offset = table.read_i32()?;
    let speaker_count = stored_len(table.read_i32()?, table.pos - 4)?;
    let speaker_field_08 = table.read_i32()?;
    let speaker_field_0c = table.read_i32()?;

    if speaker_field_08 != 0 || speaker_field_0c != 0 {
        trace!(
            "speaker table reserved fields: {speaker_field_08:#010X} {speaker_field_0c:#010X}"
        );
    }

    let mut speakers = Vec::with_capacity(speaker_count);

    if speaker_count > 0 {
        let array_offset = HEADER_SIZE + stored_len(speaker_name_array_offset, 0)?;
        let mut names = Cursor::at(data, array_offset, endian);

        for _ in 0..speaker_count {
            let name_offset = names.read_i32()?;

            if name_offset == 0 {
                speakers.push(None);
                continue;
            }

            let start = HEADER_SIZE + stored_len(name_offset, names.pos - 4)?;

            if start >= data.len() {
                return Err(BinaryError::StreamTooSmall {
                    offset: start,
                    needed: 1,
                });
            }

            let tail = &data[start..];
            let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
            speakers.push(Some(tail[..end].to_vec()));
        }
    }

    Ok(RawScript {
        endian,
        file_type,
        compressed,
        user_id,
        field_0c,
        relocated,
        field_1e,
        relocation,
        windows,
        speakers,
        speaker_field_08,
        speaker_field_0c,
    })
}

fn read_identifier(body: &mut Cursor) -> Result<[u8; IDENTIFIER_LEN], BinaryError> {
    let mut identifier = [0u8; IDENTIFIER_LEN];
    identifier.copy_from_slice(body.read_bytes(IDENTIFIER_LEN)?);
    Ok(identifier)
}

fn read_line_table(body: &mut Cursor, count: usize) -> Result<(Vec<i32>, Vec<u8>), BinaryError> {
    let mut offsets = Vec::with_capacity(count);

    for _ in 0..count {
        offsets.push(body.read_i32()?);
    }

    let size = stored_len(body.read_i32()?, body.pos - 4)?;
    let buffer = body.read_bytes(size)?.to_vec();

    Ok((offsets, buffer))
}

fn read_dialogue(body: &mut Cursor) -> Result<RawDialogue, BinaryError> {
    let identifier = read_identifier(body)?;
    let line_count = body.read_i16()?;
    let speaker_id = body.read_u16()?;

    let (line_offsets, text_buffer) = if line_count > 0 {
        read_line_table(body, line_count as usize)?
    } else {
        (Vec::new(), Vec::new())
    };

    Ok(RawDialogue {
        identifier,
        speaker_id,
        line_offsets,
        text_buffer,
    })
}

fn read_selection(body: &mut Cursor) -> Result<RawSelection, BinaryError> {
    let identifier = read_identifier(body)?;
    let field_18 = body.read_i16()?;
    let option_count = body.read_i16()?;
    let field_1c = body.read_i16()?;
    let field_1e = body.read_i16()?;

    if field_18 != 0 || field_1c != 0 || field_1e != 0 {
        trace!("selection reserved fields: {field_18:#06X} {field_1c:#06X} {field_1e:#06X}");
    }

    let (option_offsets, text_buffer) = read_line_table(body, option_count.max(0) as usize)?;

    Ok(RawSelection {
        identifier,
        field_18,
        field_1c,
        field_1e,
        option_offsets,
        text_buffer,
    })
}
