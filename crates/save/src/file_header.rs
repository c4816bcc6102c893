// ---------------------------------------------------------------------------
// file_header – Blueprint file/wire header with magic bytes, kind, and checksum
// ---------------------------------------------------------------------------
//
// Header format (24 bytes, fixed-size, little-endian):
//   [0..4]   Magic bytes: "BLPT" (0x424C5054)
//   [4..8]   Header format version (u32)
//   [8..12]  Flags (u32: bit 0 = lz4 compressed)
//   [12..16] Payload kind (u32: 1 = single blueprint, 2 = collection)
//   [16..20] Uncompressed payload size (u32)
//   [20..24] xxHash32 checksum of the stored payload (everything after the header)
//
// The same header fronts blueprint files on disk and blueprint payloads on the
// wire, so a file can be sent as-is and a received payload written as-is.
// Legacy: if the first 4 bytes != "BLPT", the buffer is a legacy text file.

use std::borrow::Cow;

use xxhash_rust::xxh32::xxh32;

/// Magic bytes identifying a binary blueprint payload.
pub const MAGIC: [u8; 4] = [0x42, 0x4C, 0x50, 0x54]; // "BLPT"

/// Size of the header in bytes.
pub const HEADER_SIZE: usize = 24;

/// Current header format version.
pub const FRAME_VERSION: u32 = 1;

/// Flag bit: the stored payload is lz4 block-compressed.
pub const FLAG_COMPRESSED: u32 = 1;

/// Payloads at least this large are compressed.
pub const COMPRESSION_THRESHOLD: usize = 16 * 1024;

/// Largest uncompressed payload we are willing to allocate for. Peer-supplied
/// sizes above this are rejected before any allocation happens.
pub const MAX_PAYLOAD_SIZE: usize = 64 * 1024 * 1024;

const XXHASH_SEED: u32 = 0;

/// What the payload after the header contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Blueprint,
    Collection,
}

impl PayloadKind {
    pub fn to_u32(self) -> u32 {
        match self {
            PayloadKind::Blueprint => 1,
            PayloadKind::Collection => 2,
        }
    }

    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            1 => Some(PayloadKind::Blueprint),
            2 => Some(PayloadKind::Collection),
            _ => None,
        }
    }
}

/// Parsed header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    pub format_version: u32,
    pub flags: u32,
    pub kind: PayloadKind,
    pub uncompressed_size: u32,
    pub checksum: u32,
}

impl FrameHeader {
    pub fn is_compressed(&self) -> bool {
        self.flags & FLAG_COMPRESSED != 0
    }
}

/// Wrap an encoded payload with a header, compressing it when it is large.
///
/// Returns bytes: [header (24 bytes)] ++ [stored payload].
pub fn frame_payload(kind: PayloadKind, data: &[u8]) -> Vec<u8> {
    let (flags, stored): (u32, Cow<'_, [u8]>) = if data.len() >= COMPRESSION_THRESHOLD {
        (FLAG_COMPRESSED, Cow::Owned(lz4_flex::compress(data)))
    } else {
        (0, Cow::Borrowed(data))
    };

    let mut out = Vec::with_capacity(HEADER_SIZE + stored.len());
    out.extend_from_slice(&MAGIC);
    out.extend_from_slice(&FRAME_VERSION.to_le_bytes());
    out.extend_from_slice(&flags.to_le_bytes());
    out.extend_from_slice(&kind.to_u32().to_le_bytes());
    out.extend_from_slice(&(data.len() as u32).to_le_bytes());
    out.extend_from_slice(&xxh32(&stored, XXHASH_SEED).to_le_bytes());
    out.extend_from_slice(&stored);
    out
}

/// A buffer after its frame has been checked.
pub enum Framed<'a> {
    /// Valid frame; `payload` is already decompressed.
    Headed {
        header: FrameHeader,
        payload: Cow<'a, [u8]>,
    },
    /// No magic, so a legacy text file; the whole buffer is the payload.
    Unframed(&'a [u8]),
}

fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

/// Validate a `BLPT` frame and hand back its (decompressed) payload. Buffers
/// without the magic come back untouched as [`Framed::Unframed`]; a frame that
/// fails any check is an error describing which.
pub fn open_frame(bytes: &[u8]) -> Result<Framed<'_>, String> {
    if bytes.len() < 4 || bytes[..4] != MAGIC {
        return Ok(Framed::Unframed(bytes));
    }

    if bytes.len() < HEADER_SIZE {
        return Err(format!(
            "BLPT frame cut off: {} bytes, header alone is {}",
            bytes.len(),
            HEADER_SIZE
        ));
    }

    let format_version = read_u32(bytes, 4);
    let flags = read_u32(bytes, 8);
    let kind_raw = read_u32(bytes, 12);
    let uncompressed_size = read_u32(bytes, 16);
    let checksum = read_u32(bytes, 20);

    if format_version > FRAME_VERSION {
        return Err(format!(
            "BLPT frame version {} is newer than supported version {}",
            format_version, FRAME_VERSION,
        ));
    }

    let kind = PayloadKind::from_u32(kind_raw)
        .ok_or_else(|| format!("Unknown blueprint payload kind {kind_raw}"))?;

    if uncompressed_size as usize > MAX_PAYLOAD_SIZE {
        return Err(format!(
            "Blueprint payload declares {} bytes, limit is {}",
            uncompressed_size, MAX_PAYLOAD_SIZE
        ));
    }

    let stored = &bytes[HEADER_SIZE..];

    let computed = xxh32(stored, XXHASH_SEED);
    if computed != checksum {
        return Err(format!(
            "BLPT payload checksum {:#010X} does not match computed {:#010X}",
            checksum, computed,
        ));
    }

    let header = FrameHeader {
        format_version,
        flags,
        kind,
        uncompressed_size,
        checksum,
    };

    let payload = if header.is_compressed() {
        let data = lz4_flex::decompress(stored, uncompressed_size as usize)
            .map_err(|e| format!("Blueprint payload failed to decompress: {e}"))?;
        if data.len() != uncompressed_size as usize {
            return Err(format!(
                "Blueprint payload decompressed to {} bytes, header declares {}",
                data.len(),
                uncompressed_size
            ));
        }
        Cow::Owned(data)
    } else {
        if stored.len() != uncompressed_size as usize {
            return Err(format!(
                "Blueprint payload is {} bytes, header declares {}",
                stored.len(),
                uncompressed_size
            ));
        }
        Cow::Borrowed(stored)
    };

    Ok(Framed::Headed { header, payload })
}
