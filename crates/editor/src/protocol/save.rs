//! Save payload and its chunked transport form

use super::solve::{write_constraint_quads, write_point_triples};
use super::ProtocolError;
use crate::state::SketchModel;

pub const SAVE_COMMAND: &str = "saveSketch";

/// Upper bound for one host message in bytes, header included.
pub const MAX_MESSAGE_LEN: usize = 1024;

/// `<branch>|<point triples>|<constraint quads>|<segments>|`
pub fn build_save_payload(branch: &str, model: &SketchModel) -> Result<String, ProtocolError> {
    let mut out = String::from(branch);
    out.push('|');
    write_point_triples(&mut out, model)?;
    out.push('|');
    write_constraint_quads(&mut out, &model.constraints);
    out.push('|');
    for seg in &model.segments {
        out.push(seg.kind.code());
        out.push(';');
        out.push_str(&(seg.begin + 1).to_string());
        out.push(';');
        out.push_str(&(seg.end + 1).to_string());
        out.push(';');
    }
    out.push('|');
    Ok(out)
}

fn header_len(total: usize) -> usize {
    // saveSketch|k|n| with k written as wide as n
    let digits = total.to_string().len();
    SAVE_COMMAND.len() + 1 + digits + 1 + digits + 1
}

/// Split at char boundaries into pieces of at most `capacity` bytes.
fn split_bytes(payload: &str, capacity: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut rest = payload;
    while !rest.is_empty() {
        let mut cut = capacity.min(rest.len());
        while !rest.is_char_boundary(cut) {
            cut -= 1;
        }
        if cut == 0 {
            // capacity smaller than a single char: emit it whole
            cut = rest.chars().next().map(char::len_utf8).unwrap_or(rest.len());
        }
        let (head, tail) = rest.split_at(cut);
        pieces.push(head);
        rest = tail;
    }
    if pieces.is_empty() {
        pieces.push("");
    }
    pieces
}

/// `saveSketch|k|n|part` messages, each no longer than [`MAX_MESSAGE_LEN`].
pub fn build_save_chunks(payload: &str) -> Vec<String> {
    let mut total = 1;
    let pieces = loop {
        let capacity = MAX_MESSAGE_LEN.saturating_sub(header_len(total)).max(1);
        let pieces = split_bytes(payload, capacity);
        if pieces.len().to_string().len() <= total.to_string().len() {
            break pieces;
        }
        total = pieces.len();
    };
    let n = pieces.len();
    pieces
        .iter()
        .enumerate()
        .map(|(i, part)| format!("{SAVE_COMMAND}|{}|{n}|{part}", i + 1))
        .collect()
}

/// Inverse of [`build_save_chunks`]: checks the command, the numbering and the count.
pub fn reassemble_save_chunks<S: AsRef<str>>(chunks: &[S]) -> Result<String, ProtocolError> {
    let mut payload = String::new();
    let mut expected_total = None;
    for (i, chunk) in chunks.iter().enumerate() {
        let chunk = chunk.as_ref();
        let mut parts = chunk.splitn(4, '|');
        let command = parts.next().unwrap_or_default();
        if command != SAVE_COMMAND {
            return Err(ProtocolError::UnexpectedCommand(command.to_string()));
        }
        let (Some(k), Some(n), Some(part)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ProtocolError::ChunkSequence(format!(
                "chunk {} has no header",
                i + 1
            )));
        };
        let k: usize = k
            .parse()
            .map_err(|_| ProtocolError::MalformedNumber(k.to_string()))?;
        let n: usize = n
            .parse()
            .map_err(|_| ProtocolError::MalformedNumber(n.to_string()))?;
        if k != i + 1 {
            return Err(ProtocolError::ChunkSequence(format!(
                "expected chunk {}, got {k}",
                i + 1
            )));
        }
        match expected_total {
            None => expected_total = Some(n),
            Some(total) if total != n => {
                return Err(ProtocolError::ChunkSequence(format!(
                    "chunk {k} claims {n} chunks, expected {total}"
                )))
            }
            Some(_) => {}
        }
        payload.push_str(part);
    }
    match expected_total {
        Some(total) if total == chunks.len() => Ok(payload),
        Some(total) => Err(ProtocolError::ChunkSequence(format!(
            "got {} of {total} chunks",
            chunks.len()
        ))),
        None => Err(ProtocolError::ChunkSequence("no chunks".to_string())),
    }
}
