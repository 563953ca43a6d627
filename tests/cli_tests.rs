use common::command::run_bit_rewrite_command;
use common::{DIRECTORY, REGULAR, TestRepository, raw_id};
use fake::Fake;
use fake::faker::lorem::en::Sentence;
use predicates::prelude::*;
use rstest::rstest;

mod common;

#[test]
fn cat_file_prints_blob_content() {
    let repository = TestRepository::new();
    let content = format!("{}\n", Sentence(3..8).fake::<String>());
    let oid = repository.blob(content.as_bytes());

    run_bit_rewrite_command(repository.path(), &["cat-file", "-p", &oid])
        .assert()
        .success()
        .stdout(content);
}

#[test]
fn cat_file_lists_trees() {
    let repository = TestRepository::new();
    let blob = repository.blob(b"content\n");
    let tree = repository.tree(&[(REGULAR, "a.txt", &blob)]);

    run_bit_rewrite_command(repository.path(), &["cat-file", "-p", &tree])
        .assert()
        .success()
        .stdout(format!("100644 blob {blob}\ta.txt\n"));
}

#[test]
fn cat_file_fails_for_unknown_objects() {
    let repository = TestRepository::new();

    run_bit_rewrite_command(
        repository.path(),
        &["cat-file", "-p", "0123456789abcdef0123456789abcdef01234567"],
    )
    .assert()
    .failure();
}

#[rstest]
#[case(false, "040000 tree {dir}\tsrc\n100644 blob {file}\ttop.txt\n")]
#[case(true, "100644 blob {nested}\tsrc/main.rs\n100644 blob {file}\ttop.txt\n")]
fn ls_tree_lists_a_commit(#[case] recursive: bool, #[case] expected: &str) {
    let repository = TestRepository::new();
    let nested = repository.blob(b"fn main() {}\n");
    let file = repository.blob(b"top\n");
    let dir = repository.tree(&[(REGULAR, "main.rs", &nested)]);
    let root = repository.tree(&[(DIRECTORY, "src", &dir), (REGULAR, "top.txt", &file)]);
    let commit = repository.commit(&root, &[], "initial");

    let mut args = vec!["ls-tree", commit.as_str()];
    if recursive {
        args.push("-r");
    }
    let expected = expected
        .replace("{dir}", &dir)
        .replace("{file}", &file)
        .replace("{nested}", &nested);

    run_bit_rewrite_command(repository.path(), &args)
        .assert()
        .success()
        .stdout(expected);
}

#[test]
fn ls_tree_rejects_blobs() {
    let repository = TestRepository::new();
    let blob = repository.blob(b"content\n");

    run_bit_rewrite_command(repository.path(), &["ls-tree", &blob])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a tree-ish"));
}

#[test]
fn verify_accepts_a_complete_repository() {
    let repository = TestRepository::new();
    let blob = repository.blob(b"content\n");
    let tree = repository.tree(&[(REGULAR, "a.txt", &blob)]);
    let commit = repository.commit(&tree, &[], "initial");
    repository.loose_ref("refs/heads/main", &commit);

    run_bit_rewrite_command(repository.path(), &["verify"])
        .assert()
        .success()
        .stdout("ok 3 objects, 1 refs\n");
}

#[test]
fn verify_reports_missing_objects() {
    let repository = TestRepository::new();
    let absent = "0123456789abcdef0123456789abcdef01234567";
    let tree = repository.tree(&[(REGULAR, "gone.txt", absent)]);
    let commit = repository.commit(&tree, &[], "initial");
    repository.packed_refs(&[(&commit, "refs/heads/main", None), (absent, "refs/heads/stale", None)]);

    run_bit_rewrite_command(repository.path(), &["verify"])
        .assert()
        .failure()
        .stdout(predicate::str::contains(format!("missing {absent} referenced by {tree} (100644 gone.txt)")))
        .stdout(predicate::str::contains(format!("dangling ref refs/heads/stale -> {absent}")))
        .stderr(predicate::str::contains("2 unresolved references"));
}

#[test]
fn missing_object_directory_is_not_a_repository() {
    let dir = assert_fs::TempDir::new().unwrap();

    run_bit_rewrite_command(dir.path(), &["verify"]).assert().failure();
}

#[test]
fn lfs_prints_a_summary() {
    let repository = TestRepository::new();
    let image = repository.blob(b"\x89PNG not really");
    let tree = repository.tree(&[(REGULAR, "logo.png", &image)]);
    let commit = repository.commit(&tree, &[], "initial");
    repository.packed_refs(&[(&commit, "refs/heads/main", None)]);

    run_bit_rewrite_command(repository.path(), &["lfs", "--ext", "png"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lfs candidates:   1"))
        .stdout(predicate::str::contains("blobs converted:  1"))
        .stdout(predicate::str::contains("objects written:  2"))
        .stdout(predicate::str::contains("refs updated:     1"));

    assert_ne!(repository.packed_ref("refs/heads/main"), commit);
}

#[test]
fn lfs_dry_run_only_reports() {
    let repository = TestRepository::new();
    let image = repository.blob(b"\x89PNG not really");
    let tree = repository.tree(&[(REGULAR, "logo.png", &image)]);
    let commit = repository.commit(&tree, &[], "initial");
    repository.packed_refs(&[(&commit, "refs/heads/main", None)]);

    run_bit_rewrite_command(repository.path(), &["lfs", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("lfs candidates:   1"))
        .stdout(predicate::str::contains("dry run: nothing was written"));

    assert_eq!(repository.packed_ref("refs/heads/main"), commit);
}

/// Version 2 index listing `ids` (sorted) at the given offsets
fn pack_index(ids: &[(&str, u32, u64)]) -> Vec<u8> {
    let mut data = vec![0xff, 0x74, 0x4f, 0x63, 0, 0, 0, 2];

    for byte in 0..=255u8 {
        let count = ids.iter().filter(|(oid, _, _)| raw_id(oid)[0] <= byte).count() as u32;
        data.extend_from_slice(&count.to_be_bytes());
    }
    for (oid, _, _) in ids {
        data.extend_from_slice(&raw_id(oid));
    }
    for (_, crc32, _) in ids {
        data.extend_from_slice(&crc32.to_be_bytes());
    }

    let mut large = Vec::new();
    for (_, _, offset) in ids {
        match u32::try_from(*offset) {
            Ok(small) if small & 0x8000_0000 == 0 => data.extend_from_slice(&small.to_be_bytes()),
            _ => {
                data.extend_from_slice(&(0x8000_0000 | large.len() as u32).to_be_bytes());
                large.push(*offset);
            }
        }
    }
    for offset in large {
        data.extend_from_slice(&offset.to_be_bytes());
    }

    data.extend_from_slice(&[0; 40]);
    data
}

#[test]
fn show_index_dumps_every_entry() {
    let dir = assert_fs::TempDir::new().unwrap();
    let path = dir.path().join("pack-test.idx");
    std::fs::write(
        &path,
        pack_index(&[
            ("1111111111111111111111111111111111111111", 0xdeadbeef, 12),
            ("ffffffffffffffffffffffffffffffffffffffff", 0x1, 0x1_0000_0000),
        ]),
    )
    .unwrap();

    run_bit_rewrite_command(dir.path(), &["show-index", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(
            "12 1111111111111111111111111111111111111111 (deadbeef)\n\
             4294967296 ffffffffffffffffffffffffffffffffffffffff (00000001)\n",
        );
}

#[test]
fn show_index_rejects_version_one() {
    let dir = assert_fs::TempDir::new().unwrap();
    let path = dir.path().join("pack-old.idx");
    std::fs::write(&path, [0u8; 1032]).unwrap();

    run_bit_rewrite_command(dir.path(), &["show-index", path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("pack index magic"));
}
