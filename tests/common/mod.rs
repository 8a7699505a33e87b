//! Shared fixtures for integration tests.

use git2::{IndexAddOption, Repository, Signature};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

pub const ONE_AND_A_HALF_MB: usize = 1024 * 1024 + 512 * 1024;

/// A committed local repository that exercises every selection rule.
pub struct FixtureRepo {
    temp: TempDir,
}

impl FixtureRepo {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("temp dir");
        let root = temp.path();

        write(root, "README.md", b"# Fixture\n\nSmall fixture repo.\n");
        write(root, "src/main.rs", b"fn main() {\n    println!(\"hi\");\n}\n");
        write(root, "src/bin/tool.rs", b"fn main() {}\n");
        write(root, "scripts/big_code.py", &python_of_size(ONE_AND_A_HALF_MB));
        write(root, "data/big_data.csv", &"a,b,c\n".repeat(ONE_AND_A_HALF_MB / 6).into_bytes());
        write(root, "assets/logo.png", b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x10");
        write(root, "node_modules/pkg/index.js", b"module.exports = 1;\n");

        commit_all(root);
        Self { temp }
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    pub fn url(&self) -> String {
        self.root().to_str().expect("utf8 fixture path").to_string()
    }
}

fn python_of_size(size: usize) -> Vec<u8> {
    let line = "value = 1  # padding\n";
    line.repeat(size / line.len() + 1).into_bytes()
}

fn write(root: &Path, rel: &str, contents: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, contents).expect("write fixture file");
}

fn commit_all(root: &Path) {
    let repo = Repository::init(root).expect("init repo");
    let mut index = repo.index().expect("index");
    index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None).expect("add all");
    index.write().expect("write index");
    let tree = repo.find_tree(index.write_tree().expect("write tree")).expect("find tree");
    let sig = Signature::now("Fixture", "fixture@example.com").expect("signature");
    repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[]).expect("commit");
}

/// Paths from every `### `path`` header, in document order.
pub fn header_paths(doc: &str) -> Vec<String> {
    doc.lines()
        .filter_map(|line| line.strip_prefix("### `").and_then(|rest| rest.strip_suffix('`')))
        .map(ToString::to_string)
        .collect()
}
