use super::{
    Endian, RawDialogue, RawScript, RawSelection, RawWindow, HEADER_SIZE, MAGIC_V1,
    MAGIC_V1_REVERSED,
};

const SPEAKER_HEADER_SIZE: usize = 16;
const WINDOW_ENTRY_SIZE: usize = 8;

/// Emits into the body area (everything after the header) while keeping a
/// list of file offsets that hold absolute-offset values. That list becomes
/// the relocation table.
struct BodyWriter {
    bytes: Vec<u8>,
    endian: Endian,
    relocations: Vec<u32>,
}

impl BodyWriter {
    fn new(endian: Endian) -> Self {
        Self {
            bytes: Vec::new(),
            endian,
            relocations: Vec::new(),
        }
    }

    fn file_pos(&self) -> usize {
        HEADER_SIZE + self.bytes.len()
    }

    fn push_i16(&mut self, val: i16) {
        let mut buf = [0u8; 2];
        self.endian.write_i16(&mut buf, val);
        self.bytes.extend_from_slice(&buf);
    }

    fn push_u16(&mut self, val: u16) {
        let mut buf = [0u8; 2];
        self.endian.write_u16(&mut buf, val);
        self.bytes.extend_from_slice(&buf);
    }

    fn push_i32(&mut self, val: i32) {
        let mut buf = [0u8; 4];
        self.endian.write_i32(&mut buf, val);
        self.bytes.extend_from_slice(&buf);
    }

    fn push_u32(&mut self, val: u32) {
        let mut buf = [0u8; 4];
        self.endian.write_u32(&mut buf, val);
        self.bytes.extend_from_slice(&buf);
    }

    /// An offset field whose location must appear in the relocation table.
    fn push_pointer(&mut self, val: i32) {
        self.relocations.push(self.file_pos() as u32);
        self.push_i32(val);
    }
}

fn dialogue_body_size(dialogue: &RawDialogue) -> usize {
    let mut size = 24 + 2 + 2;

    if !dialogue.line_offsets.is_empty() {
        size += 4 * dialogue.line_offsets.len() + 4 + dialogue.text_buffer.len();
    }

    size
}

fn selection_body_size(selection: &RawSelection) -> usize {
    24 + 2 + 2 + 2 + 2 + 4 * selection.option_offsets.len() + 4 + selection.text_buffer.len()
}

fn window_body_size(window: &RawWindow) -> usize {
    match window {
        RawWindow::Dialogue(dialogue) => dialogue_body_size(dialogue),
        RawWindow::Selection(selection) => selection_body_size(selection),
    }
}

/// Serializes the raw model.
///
/// Layout: header, window table, speaker table header, speaker name offset
/// array, speaker names, window bodies, relocation table. All body offsets
/// are relative to the end of the header; line/option start offsets are
/// stored rebased to each window's text buffer and the buffer's position is
/// added here.
pub fn encode_raw(raw: &RawScript) -> Vec<u8> {
    let endian = raw.endian;

    /* first pass: pure arithmetic, no bytes yet */

    let name_array_offset = WINDOW_ENTRY_SIZE * raw.windows.len() + SPEAKER_HEADER_SIZE;

    let mut name_offsets = Vec::with_capacity(raw.speakers.len());
    let mut next_name = name_array_offset + 4 * raw.speakers.len();

    for speaker in &raw.speakers {
        match speaker {
            Some(name) => {
                name_offsets.push(next_name as i32);
                next_name += name.len() + 1;
            }
            None => name_offsets.push(0),
        }
    }

    let mut window_offsets = Vec::with_capacity(raw.windows.len());
    let mut next_window = next_name;

    for window in &raw.windows {
        window_offsets.push(next_window as i32);
        next_window += window_body_size(window);
    }

    /* second pass: emit the body area */

    let mut body = BodyWriter::new(endian);

    for (window, &offset) in raw.windows.iter().zip(&window_offsets) {
        body.push_i32(window.window_type());
        body.push_pointer(offset);
    }

    body.push_pointer(name_array_offset as i32);
    body.push_i32(raw.speakers.len() as i32);
    body.push_i32(raw.speaker_field_08);
    body.push_i32(raw.speaker_field_0c);

    for &offset in &name_offsets {
        if offset == 0 {
            body.push_i32(0);
        } else {
            body.push_pointer(offset);
        }
    }

    for name in raw.speakers.iter().flatten() {
        body.bytes.extend_from_slice(name);
        body.bytes.push(0);
    }

    for (window, &offset) in raw.windows.iter().zip(&window_offsets) {
        match window {
            RawWindow::Dialogue(dialogue) => write_dialogue(&mut body, dialogue, offset),
            RawWindow::Selection(selection) => write_selection(&mut body, selection, offset),
        }
    }

    let relocation_offset = body.file_pos();
    let relocation_size = 4 * body.relocations.len();

    let relocations = std::mem::take(&mut body.relocations);

    for position in relocations {
        body.push_u32(position);
    }

    /* header, now that every size is known */

    let file_size = HEADER_SIZE + body.bytes.len();

    let mut out = Vec::with_capacity(file_size);
    out.push(raw.file_type);
    out.push(raw.compressed as u8);

    let mut buf = [0u8; 4];

    endian.write_i16(&mut buf[..2], raw.user_id);
    out.extend_from_slice(&buf[..2]);

    endian.write_i32(&mut buf, file_size as i32);
    out.extend_from_slice(&buf);

    out.extend_from_slice(match endian {
        Endian::Little => MAGIC_V1,
        Endian::Big => MAGIC_V1_REVERSED,
    });

    endian.write_i32(&mut buf, raw.field_0c);
    out.extend_from_slice(&buf);

    endian.write_i32(&mut buf, relocation_offset as i32);
    out.extend_from_slice(&buf);

    endian.write_i32(&mut buf, relocation_size as i32);
    out.extend_from_slice(&buf);

    endian.write_i32(&mut buf, raw.windows.len() as i32);
    out.extend_from_slice(&buf);

    endian.write_i16(&mut buf[..2], raw.relocated as i16);
    out.extend_from_slice(&buf[..2]);

    endian.write_i16(&mut buf[..2], raw.field_1e);
    out.extend_from_slice(&buf[..2]);

    out.extend_from_slice(&body.bytes);
    out
}

fn write_dialogue(body: &mut BodyWriter, dialogue: &RawDialogue, window_offset: i32) {
    body.bytes.extend_from_slice(&dialogue.identifier);
    body.push_i16(dialogue.line_offsets.len() as i16);
    body.push_u16(dialogue.speaker_id);

    if dialogue.line_offsets.is_empty() {
        return;
    }

    let buffer_start = window_offset + 24 + 2 + 2 + 4 * dialogue.line_offsets.len() as i32 + 4;

    /* offsets may arrive buffer-relative (lowerer) or still based on the
     * original layout (reader); rebasing on the smallest handles both */
    let base = dialogue.line_offsets.iter().copied().min().unwrap_or(0);

    for &offset in &dialogue.line_offsets {
        body.push_pointer(buffer_start + (offset - base));
    }

    body.push_i32(dialogue.text_buffer.len() as i32);
    body.bytes.extend_from_slice(&dialogue.text_buffer);
}

fn write_selection(body: &mut BodyWriter, selection: &RawSelection, window_offset: i32) {
    body.bytes.extend_from_slice(&selection.identifier);
    body.push_i16(selection.field_18);
    body.push_i16(selection.option_offsets.len() as i16);
    body.push_i16(selection.field_1c);
    body.push_i16(selection.field_1e);

    let buffer_start =
        window_offset + 24 + 2 + 2 + 2 + 2 + 4 * selection.option_offsets.len() as i32 + 4;

    let base = selection.option_offsets.iter().copied().min().unwrap_or(0);

    for &offset in &selection.option_offsets {
        body.push_pointer(buffer_start + (offset - base));
    }

    body.push_i32(selection.text_buffer.len() as i32);
    body.bytes.extend_from_slice(&selection.text_buffer);
}
