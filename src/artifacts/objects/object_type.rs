use crate::errors::RewriteError;
use std::io::BufRead;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Blob => "blob",
            ObjectType::Tree => "tree",
            ObjectType::Commit => "commit",
            ObjectType::Tag => "tag",
        }
    }

    /// Read the `<type> <decimal-length>\0` header of a loose object
    ///
    /// Leaves the reader positioned at the first payload byte.
    pub fn parse_header(data_reader: &mut impl BufRead) -> anyhow::Result<(ObjectType, u64)> {
        let mut object_type = Vec::new();
        data_reader.read_until(b' ', &mut object_type)?;
        if object_type.pop() != Some(b' ') {
            return Err(RewriteError::malformed("header", "unexpected EOF in object type").into());
        }

        let object_type = String::from_utf8(object_type)
            .map_err(|_| RewriteError::UnsupportedFormat("non-ASCII object type".to_string()))?;
        let object_type = ObjectType::try_from(object_type.as_str())?;

        let mut size = Vec::new();
        data_reader.read_until(b'\0', &mut size)?;
        if size.pop() != Some(b'\0') {
            return Err(RewriteError::malformed("header", "unexpected EOF in object size").into());
        }

        let size = std::str::from_utf8(&size)
            .ok()
            .and_then(|size| size.parse::<u64>().ok())
            .ok_or_else(|| RewriteError::malformed("header", "invalid object size"))?;

        Ok((object_type, size))
    }
}

impl TryFrom<&str> for ObjectType {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> anyhow::Result<Self> {
        match value {
            "blob" => Ok(ObjectType::Blob),
            "tree" => Ok(ObjectType::Tree),
            "commit" => Ok(ObjectType::Commit),
            "tag" => Ok(ObjectType::Tag),
            _ => Err(RewriteError::UnsupportedFormat(format!("unknown object type {value:?}")).into()),
        }
    }
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
