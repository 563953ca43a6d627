//! Git object identifier (SHA-1 hash)
//!
//! Object IDs are 40-character hexadecimal strings representing SHA-1 hashes.
//! They uniquely identify every object in the store (blobs, trees, commits, tags).
//!
//! ## Format
//!
//! - Full: 40 hex characters (e.g., "abc123...def")
//! - Raw: 20 bytes, as embedded in tree entries and pack indexes
//!
//! ## Storage
//!
//! Loose objects live at `objects/<first-2-chars>/<remaining-38-chars>`

use crate::artifacts::objects::{OBJECT_ID_LENGTH, RAW_OBJECT_ID_LENGTH};
use std::io;
use std::path::PathBuf;

/// Git object identifier (SHA-1 hash)
///
/// Always holds 40 lowercase hexadecimal characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate an object ID from a string
    ///
    /// Uppercase digits are accepted and normalized to lowercase.
    pub fn try_parse(id: String) -> anyhow::Result<Self> {
        if id.len() != OBJECT_ID_LENGTH {
            return Err(anyhow::anyhow!("Invalid object ID length: {}", id.len()));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow::anyhow!("Invalid object ID characters: {}", id));
        }
        Ok(Self(id.to_ascii_lowercase()))
    }

    /// Build an object ID from its 20 raw bytes
    pub fn from_raw(raw: &[u8]) -> anyhow::Result<Self> {
        if raw.len() != RAW_OBJECT_ID_LENGTH {
            return Err(anyhow::anyhow!("Invalid raw object ID length: {}", raw.len()));
        }

        let hex40 = raw.iter().map(|byte| format!("{byte:02x}")).collect();
        Ok(Self(hex40))
    }

    /// Write the object ID in binary format (20 bytes)
    ///
    /// Used when serializing tree entries.
    pub fn write_h40_to<W: io::Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        let hex40 = self.as_ref();

        for i in (0..OBJECT_ID_LENGTH).step_by(2) {
            let byte = u8::from_str_radix(&hex40[i..i + 2], 16)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Invalid hex digit"))?;
            writer.write_all(&[byte])?;
        }

        Ok(())
    }

    /// Read an object ID from binary format (20 bytes)
    pub fn read_h40_from<R: io::Read + ?Sized>(reader: &mut R) -> anyhow::Result<Self> {
        let mut raw = [0u8; RAW_OBJECT_ID_LENGTH];
        reader.read_exact(&mut raw)?;

        Self::from_raw(&raw)
    }

    /// Convert to file system path for object storage
    ///
    /// Splits the hash as `XX/YYYYYY...` where XX is the first 2 chars.
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.0.split_at(2);
        PathBuf::from(dir).join(file)
    }

    /// First 7 characters of the hash
    pub fn to_short_oid(&self) -> String {
        self.0.split_at(7).0.to_string()
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::proptest;
    use rstest::rstest;

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("zz39a3ee5e6b4b0d3255bfef95601890afd80709")]
    #[case("da39a3ee5e6b4b0d3255bfef95601890afd8070")]
    fn rejects_malformed_ids(#[case] id: &str) {
        assert!(ObjectId::try_parse(id.to_string()).is_err());
    }

    #[test]
    fn splits_into_fan_out_path() {
        let oid = ObjectId::try_parse("da39a3ee5e6b4b0d3255bfef95601890afd80709".to_string())
            .unwrap();

        assert_eq!(
            oid.to_path(),
            PathBuf::from("da").join("39a3ee5e6b4b0d3255bfef95601890afd80709")
        );
        assert_eq!(oid.to_short_oid(), "da39a3e");
    }

    #[test]
    fn normalizes_uppercase_digits() {
        let oid = ObjectId::try_parse("DA39A3EE5E6B4B0D3255BFEF95601890AFD80709".to_string())
            .unwrap();

        assert_eq!(oid.as_ref(), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    proptest! {
        #[test]
        fn raw_and_hex_forms_agree(hex in "[0-9a-f]{40}") {
            let oid = ObjectId::try_parse(hex.clone()).unwrap();

            let mut raw = Vec::new();
            oid.write_h40_to(&mut raw).unwrap();
            assert_eq!(raw.len(), RAW_OBJECT_ID_LENGTH);

            let decoded = ObjectId::read_h40_from(&mut raw.as_slice()).unwrap();
            assert_eq!(decoded.as_ref(), hex.as_str());
        }
    }
}
