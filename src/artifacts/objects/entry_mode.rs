//! Tree entry modes
//!
//! Modes are stored in tree payloads as ASCII digits (`100644`, `40000`, ...).
//! The digits are parsed as an octal number and rendered back the same way, so
//! a recognised mode always round-trips to the text it was read from.

use crate::errors::RewriteError;

#[derive(Debug, Clone, Copy, Eq, Ord, Default, PartialEq, PartialOrd, Hash)]
pub enum FileMode {
    #[default]
    Regular,
    Executable,
}

#[derive(Debug, Clone, Copy, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub enum EntryMode {
    File(FileMode),
    Symlink,
    Directory,
    /// Commit of another repository (submodule)
    Gitlink,
    /// Legacy or unusual mode, kept verbatim
    Other(u32),
}

impl Default for EntryMode {
    fn default() -> Self {
        EntryMode::File(FileMode::Regular)
    }
}

impl EntryMode {
    pub fn as_u32(&self) -> u32 {
        match self {
            EntryMode::File(FileMode::Regular) => 0o100644,
            EntryMode::File(FileMode::Executable) => 0o100755,
            EntryMode::Symlink => 0o120000,
            EntryMode::Directory => 0o40000,
            EntryMode::Gitlink => 0o160000,
            EntryMode::Other(mode) => *mode,
        }
    }

    pub fn as_str(&self) -> String {
        format!("{:o}", self.as_u32())
    }

    pub fn from_octal_str(value: &str) -> anyhow::Result<Self> {
        if value.is_empty() {
            return Err(RewriteError::malformed("tree", "empty entry mode").into());
        }

        u32::from_str_radix(value, 8)
            .map(EntryMode::from)
            .map_err(|_| RewriteError::malformed("tree", format!("invalid entry mode {value:?}")).into())
    }

    pub fn is_tree(&self) -> bool {
        matches!(self, EntryMode::Directory)
    }

    /// Regular or executable file
    pub fn is_file(&self) -> bool {
        matches!(self, EntryMode::File(_))
    }

    pub fn is_gitlink(&self) -> bool {
        matches!(self, EntryMode::Gitlink)
    }

    /// Short label used by `ls-tree` style listings
    pub fn kind(&self) -> &'static str {
        match self {
            EntryMode::Directory => "tree",
            EntryMode::Gitlink => "commit",
            _ => "blob",
        }
    }
}

impl From<u32> for EntryMode {
    fn from(mode: u32) -> Self {
        match mode {
            0o100644 => EntryMode::File(FileMode::Regular),
            0o100755 => EntryMode::File(FileMode::Executable),
            0o120000 => EntryMode::Symlink,
            0o40000 => EntryMode::Directory,
            0o160000 => EntryMode::Gitlink,
            other => EntryMode::Other(other),
        }
    }
}

impl From<FileMode> for EntryMode {
    fn from(mode: FileMode) -> Self {
        EntryMode::File(mode)
    }
}
