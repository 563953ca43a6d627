//! Pack index (`.idx`) reader, version 2
//!
//! ## Format
//!
//! All integers are big-endian.
//!
//! ```text
//! magic      ff 74 4f 63
//! version    2
//! fan-out    256 x u32, fan_out[b] = number of ids whose first byte <= b
//! ids        N x 20 raw bytes, ascending
//! crc32      N x u32
//! offsets    N x u32; MSB set means "index into the large offset table"
//! large      M x u64
//! trailer    pack checksum, index checksum (not verified)
//! ```
//!
//! Packs are not loaded by the store. The reader exists to report what a
//! repository keeps outside loose objects.

use crate::artifacts::objects::RAW_OBJECT_ID_LENGTH;
use crate::artifacts::objects::object_id::ObjectId;
use crate::errors::RewriteError;
use anyhow::Context;
use byteorder::{NetworkEndian, ReadBytesExt};
use std::io::{Cursor, Read};
use std::path::Path;

pub const PACK_INDEX_MAGIC: u32 = 0xff74_4f63;
pub const PACK_INDEX_VERSION: u32 = 2;

const FAN_OUT_SIZE: usize = 256;
/// Magic, version and fan-out table
const HEADER_SIZE: usize = 8 + FAN_OUT_SIZE * 4;
const LARGE_OFFSET_FLAG: u32 = 0x8000_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackIndexEntry {
    pub oid: ObjectId,
    pub crc32: u32,
    /// Byte offset of the object in the `.pack` file
    pub offset: u64,
}

#[derive(Debug, Clone)]
pub struct PackIndex {
    fan_out: [u32; FAN_OUT_SIZE],
    entries: Vec<PackIndexEntry>,
}

impl PackIndex {
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let data = std::fs::read(path).context(format!("Unable to read pack index {}", path.display()))?;
        Self::parse(&data).map_err(|e| e.context(format!("Invalid pack index {}", path.display())))
    }

    pub fn parse(data: &[u8]) -> anyhow::Result<Self> {
        let mut reader = Cursor::new(data);
        let truncated = |what: &str| RewriteError::malformed("pack index", format!("truncated {what}"));

        let magic = reader.read_u32::<NetworkEndian>().map_err(|_| truncated("header"))?;
        if magic != PACK_INDEX_MAGIC {
            return Err(RewriteError::UnsupportedFormat(format!("pack index magic {magic:#010x}")).into());
        }
        let version = reader.read_u32::<NetworkEndian>().map_err(|_| truncated("header"))?;
        if version != PACK_INDEX_VERSION {
            return Err(RewriteError::UnsupportedFormat(format!("pack index version {version}")).into());
        }

        let mut fan_out = [0u32; FAN_OUT_SIZE];
        for count in fan_out.iter_mut() {
            *count = reader.read_u32::<NetworkEndian>().map_err(|_| truncated("fan-out table"))?;
        }
        if fan_out.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(RewriteError::malformed("pack index", "fan-out table is not cumulative").into());
        }

        let count = fan_out[FAN_OUT_SIZE - 1] as usize;
        let tables = count.checked_mul(RAW_OBJECT_ID_LENGTH + 4 + 4);
        if tables.is_none_or(|tables| data.len() - HEADER_SIZE < tables) {
            return Err(RewriteError::malformed(
                "pack index",
                format!("truncated tables: fan-out lists {count} objects in {} bytes", data.len()),
            )
            .into());
        }

        let mut oids = Vec::with_capacity(count);
        let mut raw = [0u8; RAW_OBJECT_ID_LENGTH];
        for _ in 0..count {
            reader.read_exact(&mut raw).map_err(|_| truncated("object ids"))?;
            oids.push(ObjectId::from_raw(&raw)?);
        }

        let mut crcs = Vec::with_capacity(count);
        for _ in 0..count {
            crcs.push(reader.read_u32::<NetworkEndian>().map_err(|_| truncated("crc32 table"))?);
        }

        let mut small_offsets = Vec::with_capacity(count);
        for _ in 0..count {
            small_offsets.push(reader.read_u32::<NetworkEndian>().map_err(|_| truncated("offset table"))?);
        }

        let large_count = small_offsets.iter().filter(|&&offset| offset & LARGE_OFFSET_FLAG != 0).count();
        let mut large_offsets = Vec::with_capacity(large_count);
        for _ in 0..large_count {
            large_offsets.push(reader.read_u64::<NetworkEndian>().map_err(|_| truncated("large offset table"))?);
        }

        let entries = oids
            .into_iter()
            .zip(crcs)
            .zip(small_offsets)
            .map(|((oid, crc32), offset)| -> anyhow::Result<PackIndexEntry> {
                let offset = if offset & LARGE_OFFSET_FLAG == 0 {
                    u64::from(offset)
                } else {
                    let slot = (offset & !LARGE_OFFSET_FLAG) as usize;
                    *large_offsets
                        .get(slot)
                        .ok_or_else(|| RewriteError::malformed("pack index", format!("large offset {slot} out of range")))?
                };
                Ok(PackIndexEntry { oid, crc32, offset })
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(PackIndex { fan_out, entries })
    }

    pub fn object_count(&self) -> usize {
        self.entries.len()
    }

    /// Entries in id order
    pub fn entries(&self) -> &[PackIndexEntry] {
        &self.entries
    }

    /// Binary search within the fan-out bucket of the id's first byte
    pub fn lookup(&self, oid: &ObjectId) -> Option<&PackIndexEntry> {
        let first_byte = u8::from_str_radix(&oid.as_ref()[..2], 16).ok()? as usize;
        let start = match first_byte {
            0 => 0,
            _ => self.fan_out[first_byte - 1] as usize,
        };
        let end = self.fan_out[first_byte] as usize;

        let bucket = self.entries.get(start..end)?;
        bucket
            .binary_search_by(|probe| probe.oid.as_ref().cmp(oid.as_ref()))
            .ok()
            .map(|position| &bucket[position])
    }

    pub fn contains(&self, oid: &ObjectId) -> bool {
        self.lookup(oid).is_some()
    }
}
