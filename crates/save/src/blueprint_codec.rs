// ---------------------------------------------------------------------------
// blueprint_codec – Blueprint <-> bytes for files and wire messages
// ---------------------------------------------------------------------------
//
// A single blueprint is encoded identically for files and the wire:
// `frame_payload(Blueprint, bitcode(SaveBlueprint))`. Collections use the
// same header with the Collection kind. Every decode failure comes back as
// `BlueprintError::DeserializeFailure`; nothing here panics on bad input.
//
// Files without the BLPT magic are legacy text blueprints (`.vbuild` and the
// old `;`-separated `.blueprint` format). They are only accepted from disk.

use std::path::Path;

use bevy::prelude::*;

use blueprints::{Blueprint, BlueprintError, PieceEntry, VBUILD_EXTENSION};

use crate::file_header::{frame_payload, open_frame, Framed, PayloadKind};
use crate::save_types::{SaveBlueprint, SaveCollection};

fn deserialize_failure(msg: impl Into<String>) -> BlueprintError {
    BlueprintError::DeserializeFailure(msg.into())
}

// ---------------------------------------------------------------------------
// Binary encode / decode
// ---------------------------------------------------------------------------

/// Encode a blueprint for a file or a push request.
pub fn encode_blueprint(blueprint: &Blueprint) -> Vec<u8> {
    let save = SaveBlueprint::from(blueprint);
    frame_payload(PayloadKind::Blueprint, &bitcode::encode(&save))
}

/// Decode a headered single-blueprint payload.
pub fn decode_blueprint(bytes: &[u8]) -> Result<Blueprint, BlueprintError> {
    let payload = headered_payload(bytes, PayloadKind::Blueprint)?;
    let save: SaveBlueprint =
        bitcode::decode(&payload).map_err(|e| deserialize_failure(format!("{e}")))?;
    Ok(save.into())
}

/// Encode a full collection for a list response.
pub fn encode_collection<'a>(blueprints: impl IntoIterator<Item = &'a Blueprint>) -> Vec<u8> {
    let save: SaveCollection = blueprints.into_iter().collect();
    frame_payload(PayloadKind::Collection, &bitcode::encode(&save))
}

/// Decode a list response collection.
pub fn decode_collection(bytes: &[u8]) -> Result<Vec<Blueprint>, BlueprintError> {
    let payload = headered_payload(bytes, PayloadKind::Collection)?;
    let save: SaveCollection =
        bitcode::decode(&payload).map_err(|e| deserialize_failure(format!("{e}")))?;
    Ok(save.blueprints.into_iter().map(Blueprint::from).collect())
}

fn headered_payload(
    bytes: &[u8],
    expected: PayloadKind,
) -> Result<std::borrow::Cow<'_, [u8]>, BlueprintError> {
    match open_frame(bytes).map_err(deserialize_failure)? {
        Framed::Headed { header, payload } => {
            if header.kind != expected {
                return Err(deserialize_failure(format!(
                    "expected {:?} payload, got {:?}",
                    expected, header.kind
                )));
            }
            Ok(payload)
        }
        Framed::Unframed(_) => Err(deserialize_failure("missing BLPT header")),
    }
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Blueprint ID derived from a file path: the file stem.
pub fn id_from_path(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

/// Decode a blueprint file read from `path`.
///
/// The file stem is the blueprint ID; a binary payload carrying a different
/// ID is re-keyed to the stem. Files without the binary header are parsed as
/// legacy text, the format picked by extension.
pub fn decode_blueprint_file(path: &Path, bytes: &[u8]) -> Result<Blueprint, BlueprintError> {
    let id = id_from_path(path)
        .ok_or_else(|| deserialize_failure(format!("no file stem in {}", path.display())))?;

    if bytes.is_empty() {
        return Err(deserialize_failure(format!("{} is empty", path.display())));
    }

    match open_frame(bytes).map_err(deserialize_failure)? {
        Framed::Headed { .. } => {
            let blueprint = decode_blueprint(bytes)?;
            if blueprint.id != id {
                debug!(
                    "Blueprint file {} carries ID {}, using {}",
                    path.display(),
                    blueprint.id,
                    id
                );
            }
            Ok(blueprint.renamed(id))
        }
        Framed::Unframed(text) => {
            let text = std::str::from_utf8(text)
                .map_err(|e| deserialize_failure(format!("{}: {e}", path.display())))?;
            let is_vbuild = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case(VBUILD_EXTENSION));
            let entries = if is_vbuild {
                parse_vbuild(text)?
            } else {
                parse_legacy_blueprint(text)?
            };
            Ok(Blueprint::new(id, entries))
        }
    }
}

// ---------------------------------------------------------------------------
// Legacy text formats
// ---------------------------------------------------------------------------

fn parse_float(field: &str, line_no: usize) -> Result<f32, BlueprintError> {
    field
        .trim()
        .replace(',', ".")
        .parse::<f32>()
        .map_err(|_| deserialize_failure(format!("line {line_no}: bad number '{field}'")))
}

fn parse_floats<const N: usize>(
    fields: &[&str],
    line_no: usize,
) -> Result<[f32; N], BlueprintError> {
    let mut out = [0.0; N];
    for (slot, field) in out.iter_mut().zip(fields) {
        *slot = parse_float(field, line_no)?;
    }
    Ok(out)
}

/// Non-comment, non-blank lines with 1-based line numbers.
fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// `.vbuild`: `typeId rotX rotY rotZ rotW posX posY posZ` per line.
pub fn parse_vbuild(text: &str) -> Result<Vec<PieceEntry>, BlueprintError> {
    let mut entries = Vec::new();
    for (line_no, line) in content_lines(text) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 8 {
            return Err(deserialize_failure(format!(
                "line {line_no}: expected 8 fields, got {}",
                fields.len()
            )));
        }
        let rot: [f32; 4] = parse_floats(&fields[1..5], line_no)?;
        let pos: [f32; 3] = parse_floats(&fields[5..8], line_no)?;
        entries.push(PieceEntry::new(
            fields[0],
            Vec3::from_array(pos),
            Quat::from_array(rot),
        ));
    }
    Ok(entries)
}

/// Old text `.blueprint`:
/// `typeId;category;posX;posY;posZ;rotX;rotY;rotZ;rotW[;auxText]` per line.
pub fn parse_legacy_blueprint(text: &str) -> Result<Vec<PieceEntry>, BlueprintError> {
    let mut entries = Vec::new();
    for (line_no, line) in content_lines(text) {
        let fields: Vec<&str> = line.splitn(10, ';').collect();
        if fields.len() < 9 {
            return Err(deserialize_failure(format!(
                "line {line_no}: expected at least 9 fields, got {}",
                fields.len()
            )));
        }
        let pos: [f32; 3] = parse_floats(&fields[2..5], line_no)?;
        let rot: [f32; 4] = parse_floats(&fields[5..9], line_no)?;
        let mut entry = PieceEntry::new(
            fields[0].trim(),
            Vec3::from_array(pos),
            Quat::from_array(rot),
        );
        if let Some(text) = fields.get(9) {
            entry.aux_text = (*text).to_string();
        }
        entries.push(entry);
    }
    Ok(entries)
}
