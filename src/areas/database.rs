use crate::artifacts::objects::codec::{frame, hash_framed};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::errors::RewriteError;
use anyhow::Context;
use bytes::Bytes;
use fake::rand;
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Loose object directory (`<git-dir>/objects`)
#[derive(Debug, Clone)]
pub struct Database {
    path: Box<Path>,
}

impl Database {
    pub fn new(path: Box<Path>) -> Self {
        Database { path }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, object_id: &ObjectId) -> bool {
        self.path.join(object_id.to_path()).exists()
    }

    /// Ids of every loose object, sorted
    ///
    /// Only `<2 hex>/<38 hex>` files count; `pack/`, `info/` and temp files
    /// are skipped.
    pub fn list_objects(&self) -> anyhow::Result<Vec<ObjectId>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut object_ids = Vec::new();
        for entry in WalkDir::new(&self.path)
            .min_depth(2)
            .max_depth(2)
            .sort_by_file_name()
        {
            let entry = entry.context(format!("Unable to list objects in {}", self.path.display()))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let dir_name = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .and_then(|name| name.to_str())
                .unwrap_or_default();
            let file_name = entry.file_name().to_str().unwrap_or_default();

            if dir_name.len() != 2 || file_name.len() != 38 {
                continue;
            }
            if let Ok(oid) = ObjectId::try_parse(format!("{dir_name}{file_name}")) {
                object_ids.push(oid);
            }
        }

        Ok(object_ids)
    }

    /// Pack index files under `objects/pack`
    pub fn pack_indexes(&self) -> anyhow::Result<Vec<PathBuf>> {
        let pack_dir = self.path.join("pack");
        if !pack_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut indexes = std::fs::read_dir(&pack_dir)
            .context(format!("Unable to list {}", pack_dir.display()))?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "idx"))
            .collect::<Vec<_>>();
        indexes.sort();

        Ok(indexes)
    }

    /// Read an object's header and, unless it is a blob, its payload
    ///
    /// Blob payloads are left on disk; see [`Database::load_blob_bytes`].
    pub fn read_object_lazily(
        &self,
        object_id: &ObjectId,
    ) -> anyhow::Result<(ObjectType, u64, Option<Bytes>)> {
        let mut reader = self.open_object(object_id)?;
        let (object_type, size) = ObjectType::parse_header(&mut reader)
            .with_context(|| format!("Unable to read header of object {object_id}"))?;

        if object_type == ObjectType::Blob {
            return Ok((object_type, size, None));
        }

        let payload = Self::read_payload(&mut reader, object_id, size)?;
        Ok((object_type, size, Some(payload)))
    }

    /// Read an object's type and full payload
    pub fn read_object(&self, object_id: &ObjectId) -> anyhow::Result<(ObjectType, Bytes)> {
        let mut reader = self.open_object(object_id)?;
        let (object_type, size) = ObjectType::parse_header(&mut reader)
            .with_context(|| format!("Unable to read header of object {object_id}"))?;

        let payload = Self::read_payload(&mut reader, object_id, size)?;
        Ok((object_type, payload))
    }

    /// Re-read a blob's payload from disk
    pub fn load_blob_bytes(&self, object_id: &ObjectId) -> anyhow::Result<Bytes> {
        let (object_type, payload) = self.read_object(object_id)?;
        if object_type != ObjectType::Blob {
            return Err(RewriteError::malformed(object_id, format!("expected blob, found {object_type}")).into());
        }

        Ok(payload)
    }

    /// Store a payload under its content hash and return the hash
    ///
    /// Existing objects are never rewritten, so a repeated or interrupted
    /// write is harmless.
    pub fn write_object(&self, object_type: ObjectType, payload: &[u8]) -> anyhow::Result<ObjectId> {
        let object_content = frame(object_type, payload);
        let object_id = hash_framed(&object_content);
        let object_path = self.path.join(object_id.to_path());

        if object_path.exists() {
            tracing::trace!(%object_id, "object already stored");
            return Ok(object_id);
        }

        std::fs::create_dir_all(
            object_path
                .parent()
                .context(format!("Invalid object path {}", object_path.display()))?,
        )
        .context(format!(
            "Unable to create object directory {}",
            object_path.display()
        ))?;

        self.write_compressed(object_path, object_content)?;
        tracing::trace!(%object_id, %object_type, "object stored");

        Ok(object_id)
    }

    fn open_object(&self, object_id: &ObjectId) -> anyhow::Result<impl std::io::BufRead> {
        let object_path = self.path.join(object_id.to_path());
        let file = std::fs::File::open(&object_path).context(format!(
            "Unable to read object file {}",
            object_path.display()
        ))?;

        Ok(BufReader::new(flate2::read::ZlibDecoder::new(file)))
    }

    fn read_payload(reader: &mut impl Read, object_id: &ObjectId, size: u64) -> anyhow::Result<Bytes> {
        // the header is not trusted for allocation; one extra byte exposes overlong payloads
        let mut payload = Vec::new();
        reader
            .take(size.saturating_add(1))
            .read_to_end(&mut payload)
            .context(format!("Unable to decompress object {object_id}"))?;

        if payload.len() as u64 != size {
            return Err(RewriteError::malformed(
                object_id,
                format!("header says {size} bytes, payload has {}", payload.len()),
            )
            .into());
        }

        Ok(payload.into())
    }

    fn write_compressed(&self, object_path: PathBuf, object_content: Bytes) -> anyhow::Result<()> {
        let object_dir = object_path
            .parent()
            .context(format!("Invalid object path {}", object_path.display()))?;
        let temp_object_path = object_dir.join(Self::generate_temp_name());

        let object_content = Self::compress(object_content)?;

        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_object_path)
            .context(format!(
                "Unable to open object file {}",
                temp_object_path.display()
            ))?;

        file.write_all(&object_content).context(format!(
            "Unable to write object file {}",
            temp_object_path.display()
        ))?;
        drop(file);

        // rename the temp file to the object file to make it atomic
        std::fs::rename(&temp_object_path, &object_path).context(format!(
            "Unable to rename object file to {}",
            object_path.display()
        ))?;

        Ok(())
    }

    fn compress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut encoder =
            flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(&data)
            .context("Unable to compress object content")?;

        encoder
            .finish()
            .map(|compressed_content| compressed_content.into())
            .context("Unable to finish compressing object content")
    }

    fn generate_temp_name() -> String {
        format!("tmp-obj-{}", rand::random::<u32>())
    }
}
