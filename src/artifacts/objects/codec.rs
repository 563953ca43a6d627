//! Canonical byte encodings shared by the object parsers and writers
//!
//! - loose object framing: `<type> <decimal-length>\0<payload>`
//! - content hash: SHA-1 over the framed bytes
//! - delimiter-terminated records (`<mode> <name>\0` in trees, `\n` lines in
//!   commits and tags)
//!
//! Raw/hex id conversion lives on [`ObjectId`]; big-endian integers are read
//! with `byteorder` where a format needs them (see the pack index reader).

use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::{BufRead, Write};

/// Prefix a payload with its loose object header
pub fn frame(object_type: ObjectType, payload: &[u8]) -> Bytes {
    let header = format!("{} {}\0", object_type.as_str(), payload.len());

    let mut framed = Vec::with_capacity(header.len() + payload.len());
    framed.extend_from_slice(header.as_bytes());
    framed.extend_from_slice(payload);

    Bytes::from(framed)
}

/// Content hash of a payload, as it would be stored on disk
pub fn hash_object(object_type: ObjectType, payload: &[u8]) -> ObjectId {
    hash_framed(&frame(object_type, payload))
}

pub fn hash_framed(framed: &[u8]) -> ObjectId {
    let mut hasher = Sha1::new();
    hasher.update(framed);

    // a SHA-1 digest always renders as 40 hex digits
    ObjectId::try_parse(format!("{:x}", hasher.finalize())).unwrap_or_default()
}

/// Read one record terminated by `delimiter`, without the delimiter
///
/// Returns `None` on a clean EOF and an error when the stream ends mid-record.
pub fn read_record(reader: &mut impl BufRead, delimiter: u8) -> anyhow::Result<Option<Vec<u8>>> {
    let mut record = Vec::new();
    let n = reader.read_until(delimiter, &mut record)?;
    if n == 0 {
        return Ok(None);
    }

    if record.pop() != Some(delimiter) {
        return Err(anyhow::anyhow!("unexpected EOF in record"));
    }

    Ok(Some(record))
}

pub fn write_record(writer: &mut impl Write, record: &[u8], delimiter: u8) -> anyhow::Result<()> {
    writer.write_all(record)?;
    writer.write_all(&[delimiter])?;
    Ok(())
}

/// Split `payload` at the first `\n`, returning the line and the rest
///
/// The rest is `None` when no newline terminates the line.
pub fn split_line(payload: &[u8]) -> (&[u8], Option<&[u8]>) {
    match payload.iter().position(|&byte| byte == b'\n') {
        Some(end) => (&payload[..end], Some(&payload[end + 1..])),
        None => (payload, None),
    }
}
