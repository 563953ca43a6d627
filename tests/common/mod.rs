#![allow(dead_code)]

pub mod command;

use assert_fs::TempDir;
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use sha1::{Digest, Sha1};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const SIGNATURE: &str = "fake_user <fake@email.com> 1672574400 +0000";
pub const PACKED_HEADER: &str = "# pack-refs with: peeled fully-peeled sorted ";

pub const REGULAR: &str = "100644";
pub const EXECUTABLE: &str = "100755";
pub const DIRECTORY: &str = "40000";
pub const GITLINK: &str = "160000";

/// Scratch repository built by writing loose objects directly
pub struct TestRepository {
    dir: TempDir,
}

impl TestRepository {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        std::fs::create_dir_all(dir.path().join(".git").join("objects")).expect("Failed to create objects dir");
        std::fs::create_dir_all(dir.path().join(".git").join("refs").join("heads")).expect("Failed to create refs dir");

        TestRepository { dir }
    }

    /// Work tree path
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn path_str(&self) -> String {
        self.dir.path().display().to_string()
    }

    pub fn git_dir(&self) -> PathBuf {
        self.dir.path().join(".git")
    }

    fn object_path(&self, oid: &str) -> PathBuf {
        self.git_dir().join("objects").join(&oid[..2]).join(&oid[2..])
    }

    pub fn write_object(&self, kind: &str, payload: &[u8]) -> String {
        let mut framed = format!("{kind} {}\0", payload.len()).into_bytes();
        framed.extend_from_slice(payload);
        let oid = format!("{:x}", Sha1::digest(&framed));

        let path = self.object_path(&oid);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&framed).unwrap();
        std::fs::write(path, encoder.finish().unwrap()).unwrap();

        oid
    }

    pub fn blob(&self, content: &[u8]) -> String {
        self.write_object("blob", content)
    }

    /// Entries are written in the order given
    pub fn tree(&self, entries: &[(&str, &str, &str)]) -> String {
        let mut payload = Vec::new();
        for (mode, name, oid) in entries {
            payload.extend_from_slice(format!("{mode} {name}\0").as_bytes());
            payload.extend_from_slice(&raw_id(oid));
        }
        self.write_object("tree", &payload)
    }

    pub fn commit(&self, tree: &str, parents: &[&str], message: &str) -> String {
        let mut payload = format!("tree {tree}\n");
        for parent in parents {
            payload.push_str(&format!("parent {parent}\n"));
        }
        payload.push_str(&format!("author {SIGNATURE}\ncommitter {SIGNATURE}\n\n{message}\n"));
        self.write_object("commit", payload.as_bytes())
    }

    pub fn tag(&self, target: &str, kind: &str, name: &str, message: &str) -> String {
        let payload = format!("object {target}\ntype {kind}\ntag {name}\ntagger {SIGNATURE}\n\n{message}\n");
        self.write_object("tag", payload.as_bytes())
    }

    /// `refs` are `(id, name, peeled)`
    pub fn packed_refs(&self, refs: &[(&str, &str, Option<&str>)]) -> String {
        let mut table = format!("{PACKED_HEADER}\n");
        for (oid, name, peeled) in refs {
            table.push_str(&format!("{oid} {name}\n"));
            if let Some(peeled) = peeled {
                table.push_str(&format!("^{peeled}\n"));
            }
        }
        std::fs::write(self.git_dir().join("packed-refs"), &table).unwrap();
        table
    }

    pub fn loose_ref(&self, name: &str, oid: &str) {
        let path = self.git_dir().join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, format!("{oid}\n")).unwrap();
    }

    pub fn read_packed_refs(&self) -> String {
        std::fs::read_to_string(self.git_dir().join("packed-refs")).unwrap()
    }

    pub fn read_loose_ref(&self, name: &str) -> String {
        std::fs::read_to_string(self.git_dir().join(name)).unwrap().trim().to_string()
    }

    /// Id of `name` in the packed table
    pub fn packed_ref(&self, name: &str) -> String {
        self.read_packed_refs()
            .lines()
            .find_map(|line| line.strip_suffix(name)?.strip_suffix(' ').map(str::to_string))
            .unwrap_or_else(|| panic!("no packed ref {name}"))
    }

    pub fn has_object(&self, oid: &str) -> bool {
        self.object_path(oid).exists()
    }

    pub fn read_object(&self, oid: &str) -> (String, Vec<u8>) {
        let compressed = std::fs::read(self.object_path(oid)).unwrap();
        let mut framed = Vec::new();
        ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut framed).unwrap();

        let split = framed.iter().position(|&byte| byte == 0).unwrap();
        let header = String::from_utf8(framed[..split].to_vec()).unwrap();
        let kind = header.split(' ').next().unwrap().to_string();
        (kind, framed[split + 1..].to_vec())
    }

    /// `(mode, name, id)` of every entry of a tree
    pub fn read_tree(&self, oid: &str) -> Vec<(String, String, String)> {
        let (kind, payload) = self.read_object(oid);
        assert_eq!(kind, "tree");

        let mut entries = Vec::new();
        let mut rest = payload.as_slice();
        while !rest.is_empty() {
            let nul = rest.iter().position(|&byte| byte == 0).unwrap();
            let header = String::from_utf8(rest[..nul].to_vec()).unwrap();
            let (mode, name) = header.split_once(' ').unwrap();
            let oid = rest[nul + 1..nul + 21].iter().map(|byte| format!("{byte:02x}")).collect();
            entries.push((mode.to_string(), name.to_string(), oid));
            rest = &rest[nul + 21..];
        }
        entries
    }

    pub fn tree_entry(&self, tree: &str, name: &str) -> String {
        self.read_tree(tree)
            .into_iter()
            .find(|(_, entry, _)| entry == name)
            .map(|(_, _, oid)| oid)
            .unwrap_or_else(|| panic!("no entry {name} in {tree}"))
    }

    /// Values of the `<key> <value>` header lines of a commit or tag
    pub fn header(&self, oid: &str, key: &str) -> Vec<String> {
        let (_, payload) = self.read_object(oid);
        let text = String::from_utf8(payload).unwrap();
        text.lines()
            .take_while(|line| !line.is_empty())
            .filter_map(|line| line.strip_prefix(key)?.strip_prefix(' ').map(str::to_string))
            .collect()
    }

    pub fn count_loose_objects(&self) -> usize {
        walkdir::WalkDir::new(self.git_dir().join("objects"))
            .min_depth(2)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .count()
    }

    pub fn lfs_object(&self, sha256: &str) -> PathBuf {
        self.git_dir()
            .join("lfs")
            .join("objects")
            .join(&sha256[..2])
            .join(&sha256[2..4])
            .join(sha256)
    }
}

pub fn raw_id(oid: &str) -> Vec<u8> {
    (0..20)
        .map(|i| u8::from_str_radix(&oid[i * 2..i * 2 + 2], 16).unwrap())
        .collect()
}

pub fn sha256_hex(content: &[u8]) -> String {
    use sha2::Sha256;
    format!("{:x}", Sha256::digest(content))
}
