use rendergit_core::classify::SNIFF_BYTES;
use rendergit_core::{AppError, Classifier, Decision, generate_tree_fallback};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, bytes: &[u8]) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, bytes).unwrap();
}

fn decision_of(tree: &rendergit_core::ClassifiedTree, rel: &str) -> Decision {
    tree.records
        .iter()
        .find(|r| r.relative_path == rel)
        .unwrap_or_else(|| panic!("no record for {rel}"))
        .decision
}

fn mixed_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "README.md", b"# Title\n");
    write(root, "src/main.rs", b"fn main() {}\n");
    write(root, "src/Lib.rs", b"pub fn f() {}\n");
    write(root, "assets/logo.png", b"not really a png");
    write(root, "data/blob", &[1, 2, 0, 3]);
    write(root, "data/latin1.txt", &[0x63, 0x61, 0x66, 0xe9]);
    write(root, "big.txt", &vec![b'a'; 200]);
    write(root, ".git/HEAD", b"ref: refs/heads/main\n");
    write(root, ".git/objects/ab/cdef", &[0u8; 10]);
    dir
}

#[test]
fn every_regular_file_gets_exactly_one_record() {
    let dir = mixed_tree();
    let tree = Classifier::new(100).classify_tree(dir.path()).unwrap();
    let counts = tree.counts();
    assert_eq!(counts.total, 9);
    assert_eq!(
        counts.included + counts.binary + counts.too_large + counts.ignored,
        counts.total
    );
    assert_eq!(counts.included, 3);
    assert_eq!(counts.binary, 3);
    assert_eq!(counts.too_large, 1);
    assert_eq!(counts.ignored, 2);
}

#[test]
fn records_are_in_case_sensitive_path_order() {
    let dir = mixed_tree();
    let tree = Classifier::new(100).classify_tree(dir.path()).unwrap();
    let paths: Vec<&str> = tree.records.iter().map(|r| r.relative_path.as_str()).collect();
    let mut sorted = paths.clone();
    sorted.sort();
    assert_eq!(paths, sorted);
    assert_eq!(paths[0], ".git/HEAD");
    // Uppercase sorts before lowercase.
    let lib = paths.iter().position(|p| *p == "src/Lib.rs").unwrap();
    let main = paths.iter().position(|p| *p == "src/main.rs").unwrap();
    assert!(lib < main);
}

#[test]
fn classification_is_deterministic() {
    let dir = mixed_tree();
    let classifier = Classifier::new(100);
    let first = classifier.classify_tree(dir.path()).unwrap();
    let second = classifier.classify_tree(dir.path()).unwrap();
    assert_eq!(first.records, second.records);
}

#[test]
fn threshold_is_inclusive() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "exact.txt", &vec![b'x'; 64]);
    write(dir.path(), "over.txt", &vec![b'x'; 65]);
    let tree = Classifier::new(64).classify_tree(dir.path()).unwrap();
    assert_eq!(decision_of(&tree, "exact.txt"), Decision::Included);
    assert_eq!(decision_of(&tree, "over.txt"), Decision::ExcludedTooLarge);
}

#[test]
fn binary_detection_rules() {
    let dir = mixed_tree();
    let tree = Classifier::new(100).classify_tree(dir.path()).unwrap();
    assert_eq!(decision_of(&tree, "assets/logo.png"), Decision::ExcludedBinary);
    assert_eq!(decision_of(&tree, "data/blob"), Decision::ExcludedBinary);
    assert_eq!(decision_of(&tree, "data/latin1.txt"), Decision::ExcludedBinary);
    assert_eq!(decision_of(&tree, "src/main.rs"), Decision::Included);
    assert_eq!(decision_of(&tree, "big.txt"), Decision::ExcludedTooLarge);
    assert_eq!(decision_of(&tree, ".git/objects/ab/cdef"), Decision::ExcludedIgnored);
}

#[test]
fn null_byte_past_sniff_window_is_not_seen() {
    let dir = TempDir::new().unwrap();
    let mut bytes = vec![b'a'; SNIFF_BYTES as usize];
    bytes.push(0);
    write(dir.path(), "late-null.txt", &bytes);
    let tree = Classifier::new(1 << 20).classify_tree(dir.path()).unwrap();
    assert_eq!(decision_of(&tree, "late-null.txt"), Decision::Included);
}

#[test]
fn multibyte_char_split_by_sniff_window_is_text() {
    let dir = TempDir::new().unwrap();
    let mut bytes = vec![b'a'; SNIFF_BYTES as usize - 1];
    bytes.extend_from_slice("é".as_bytes());
    write(dir.path(), "split.txt", &bytes);
    let tree = Classifier::new(1 << 20).classify_tree(dir.path()).unwrap();
    assert_eq!(decision_of(&tree, "split.txt"), Decision::Included);
}

#[test]
fn extra_ignore_patterns_are_ignored_decisions() {
    let dir = mixed_tree();
    let tree = Classifier::new(100)
        .with_ignore_patterns(&["src/".to_string()])
        .unwrap()
        .classify_tree(dir.path())
        .unwrap();
    assert_eq!(decision_of(&tree, "src/main.rs"), Decision::ExcludedIgnored);
    assert_eq!(tree.counts().ignored, 4);
}

#[test]
fn gitfiles_of_submodules_are_ignored() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, ".git", b"gitdir: ../.git/worktrees/main\n");
    write(root, "sub/.git", b"gitdir: ../.git/modules/sub\n");
    write(root, "sub/lib.rs", b"pub fn f() {}\n");
    write(root, "sub/.gitignore", b"target/\n");

    let tree = Classifier::new(100).classify_tree(root).unwrap();
    assert_eq!(decision_of(&tree, ".git"), Decision::ExcludedIgnored);
    assert_eq!(decision_of(&tree, "sub/.git"), Decision::ExcludedIgnored);
    assert_eq!(decision_of(&tree, "sub/lib.rs"), Decision::Included);
    assert_eq!(decision_of(&tree, "sub/.gitignore"), Decision::Included);
}

#[cfg(target_os = "linux")]
#[test]
fn undecodable_file_names_keep_distinct_paths() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::write(root.join(OsStr::from_bytes(b"caf\xe9.txt")), b"one\n").unwrap();
    fs::write(root.join(OsStr::from_bytes(b"caf\xe8.txt")), b"two\n").unwrap();

    let tree = Classifier::new(100).classify_tree(root).unwrap();
    let paths: Vec<&str> = tree.records.iter().map(|r| r.relative_path.as_str()).collect();
    assert_eq!(paths, vec!["caf\\xE8.txt", "caf\\xE9.txt"]);
    assert_eq!(tree.counts().included, 2);
}

#[cfg(unix)]
#[test]
fn symlinks_never_produce_records() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write(root, "real/file.txt", b"hello\n");
    std::os::unix::fs::symlink(root.join("real/file.txt"), root.join("link.txt")).unwrap();
    std::os::unix::fs::symlink(root.join("real"), root.join("linked-dir")).unwrap();
    std::os::unix::fs::symlink(root, root.join("real/loop")).unwrap();

    let tree = Classifier::new(100).classify_tree(root).unwrap();
    let paths: Vec<&str> = tree.records.iter().map(|r| r.relative_path.as_str()).collect();
    assert_eq!(paths, vec!["real/file.txt"]);

    let listing = generate_tree_fallback(root);
    assert!(listing.contains("linked-dir"));
    assert!(!listing.contains("loop/"));
}

#[test]
fn missing_root_is_fatal() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    let err = Classifier::new(100).classify_tree(&missing).unwrap_err();
    assert!(matches!(err, AppError::RootNotFound(_)));

    write(dir.path(), "file.txt", b"x");
    let err = Classifier::new(100)
        .classify_tree(&dir.path().join("file.txt"))
        .unwrap_err();
    assert!(matches!(err, AppError::RootNotFound(_)));
}

#[test]
fn empty_root_has_no_records() {
    let dir = TempDir::new().unwrap();
    let tree = Classifier::new(100).classify_tree(dir.path()).unwrap();
    assert!(tree.records.is_empty());
    assert_eq!(tree.counts().total, 0);
}

#[test]
fn fallback_listing_orders_directories_first_and_skips_vcs() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("proj");
    write(&root, "b.txt", b"");
    write(&root, "A.txt", b"");
    write(&root, "zdir/inner.txt", b"");
    write(&root, "Adir/x.txt", b"");
    write(&root, ".git/HEAD", b"");

    let listing = generate_tree_fallback(&root);
    let expected = "proj\n\
                    ├── Adir\n\
                    │   └── x.txt\n\
                    ├── zdir\n\
                    │   └── inner.txt\n\
                    ├── A.txt\n\
                    └── b.txt";
    assert_eq!(listing, expected);
}
