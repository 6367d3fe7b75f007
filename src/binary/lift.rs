use crate::model::{
    DialogueWindow, FormatVersion, Line, MessageScript, ReservedFields, SelectionWindow, Speaker,
    Window, IDENTIFIER_LEN, NO_SPEAKER,
};

use super::{tokens, BinaryError, RawDialogue, RawScript, RawSelection, RawWindow};

fn lift_identifier(stored: &[u8; IDENTIFIER_LEN]) -> String {
    let end = stored.iter().position(|&b| b == 0).unwrap_or(stored.len());
    stored[..end].iter().map(|&b| b as char).collect()
}

fn lift_lines(offsets: &[i32], text_buffer: &[u8]) -> Result<Vec<Line>, BinaryError> {
    /* start offsets are stored against the containing chunk; rebasing on
     * the smallest one turns them into text-buffer positions */

    let base = offsets.iter().copied().min().unwrap_or(0);

    let mut lines = Vec::with_capacity(offsets.len());

    for &offset in offsets {
        let start = (offset - base) as usize;

        if start > text_buffer.len() {
            return Err(BinaryError::StreamTooSmall {
                offset: start,
                needed: 1,
            });
        }

        lines.push(tokens::decode_line(&text_buffer[start..])?);
    }

    Ok(lines)
}

fn lift_speaker(
    speaker_id: u16,
    speakers: &[Option<Vec<u8>>],
) -> Result<Option<Speaker>, BinaryError> {
    if (speaker_id as usize) < speakers.len() {
        match &speakers[speaker_id as usize] {
            Some(name) => Ok(Some(Speaker::Named(tokens::decode_line(name)?))),
            None => Ok(None),
        }
    } else if speaker_id == NO_SPEAKER {
        Ok(None)
    } else {
        Ok(Some(Speaker::VariableIndex(speaker_id)))
    }
}

fn lift_dialogue(
    dialogue: &RawDialogue,
    speakers: &[Option<Vec<u8>>],
) -> Result<DialogueWindow, BinaryError> {
    Ok(DialogueWindow {
        identifier: lift_identifier(&dialogue.identifier),
        speaker: lift_speaker(dialogue.speaker_id, speakers)?,
        lines: lift_lines(&dialogue.line_offsets, &dialogue.text_buffer)?,
    })
}

fn lift_selection(selection: &RawSelection) -> Result<SelectionWindow, BinaryError> {
    Ok(SelectionWindow {
        identifier: lift_identifier(&selection.identifier),
        lines: lift_lines(&selection.option_offsets, &selection.text_buffer)?,
        field_18: selection.field_18,
        field_1c: selection.field_1c,
        field_1e: selection.field_1e,
    })
}

/// Raw container form to mutable model.
pub fn lift_script(raw: &RawScript) -> Result<MessageScript, BinaryError> {
    let mut windows = Vec::with_capacity(raw.windows.len());

    for window in &raw.windows {
        windows.push(match window {
            RawWindow::Dialogue(dialogue) => {
                Window::Dialogue(lift_dialogue(dialogue, &raw.speakers)?)
            }
            RawWindow::Selection(selection) => Window::Selection(lift_selection(selection)?),
        });
    }

    Ok(MessageScript {
        user_id: raw.user_id,
        version: FormatVersion::from_endian(raw.endian),
        windows,
        reserved: ReservedFields {
            file_type: raw.file_type,
            compressed: raw.compressed,
            field_0c: raw.field_0c,
            relocated: raw.relocated,
            field_1e: raw.field_1e,
            speaker_field_08: raw.speaker_field_08,
            speaker_field_0c: raw.speaker_field_0c,
        },
    })
}

fn lower_identifier(identifier: &str) -> Result<[u8; IDENTIFIER_LEN], BinaryError> {
    if identifier.len() > IDENTIFIER_LEN || !identifier.is_ascii() {
        return Err(BinaryError::IdentifierTooLong(identifier.to_string()));
    }

    let mut stored = [0u8; IDENTIFIER_LEN];
    stored[..identifier.len()].copy_from_slice(identifier.as_bytes());
    Ok(stored)
}

/// Encodes every line, concatenates the buffers and records 0-based starts.
fn lower_lines(lines: &[Line]) -> Result<(Vec<i32>, Vec<u8>), BinaryError> {
    let mut offsets = Vec::with_capacity(lines.len());
    let mut buffer = Vec::new();

    for line in lines {
        offsets.push(buffer.len() as i32);
        buffer.extend(tokens::encode_line(line)?);
    }

    Ok((offsets, buffer))
}

/// Interns a speaker name, reusing an existing slot for identical bytes.
fn speaker_slot(speakers: &mut Vec<Option<Vec<u8>>>, name: Vec<u8>) -> u16 {
    if let Some(found) = speakers
        .iter()
        .position(|slot| slot.as_deref() == Some(&name[..]))
    {
        return found as u16;
    }

    speakers.push(Some(name));
    (speakers.len() - 1) as u16
}

/// Mutable model to raw container form.
pub fn lower_script(script: &MessageScript) -> Result<RawScript, BinaryError> {
    let mut speakers = Vec::new();
    let mut windows = Vec::with_capacity(script.windows.len());

    for window in &script.windows {
        windows.push(match window {
            Window::Dialogue(dialogue) => {
                let speaker_id = match &dialogue.speaker {
                    Some(Speaker::Named(line)) => {
                        speaker_slot(&mut speakers, tokens::encode_tokens(line)?)
                    }
                    Some(Speaker::VariableIndex(index)) => *index,
                    None => NO_SPEAKER,
                };

                let (line_offsets, text_buffer) = lower_lines(&dialogue.lines)?;

                RawWindow::Dialogue(RawDialogue {
                    identifier: lower_identifier(&dialogue.identifier)?,
                    speaker_id,
                    line_offsets,
                    text_buffer,
                })
            }

            Window::Selection(selection) => {
                let (option_offsets, text_buffer) = lower_lines(&selection.lines)?;

                RawWindow::Selection(RawSelection {
                    identifier: lower_identifier(&selection.identifier)?,
                    field_18: selection.field_18,
                    field_1c: selection.field_1c,
                    field_1e: selection.field_1e,
                    option_offsets,
                    text_buffer,
                })
            }
        });
    }

    Ok(RawScript {
        endian: script.version.endian(),
        file_type: script.reserved.file_type,
        compressed: script.reserved.compressed,
        user_id: script.user_id,
        field_0c: script.reserved.field_0c,
        relocated: script.reserved.relocated,
        field_1e: script.reserved.field_1e,
        relocation: Vec::new(),
        windows,
        speakers,
        speaker_field_08: script.reserved.speaker_field_08,
        speaker_field_0c: script.reserved.speaker_field_0c,
    })
}
