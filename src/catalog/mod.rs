pub mod parser;

use std::path::Path;

use crate::debug::DebugLog;
use crate::models::{CatalogTree, NodeKind};

/// File extension that marks a suite file.
pub const SUITE_EXTENSION: &str = "robot";

/// Suite-setup files define no runnable cases of their own.
const SETUP_FILE_PREFIX: &str = "__init__";

/// Walk `root` and build the catalog forest from every suite file found.
///
/// Best-effort: an unreadable file or directory is logged and skipped, and
/// an absent root yields an empty forest. Directories without a qualifying
/// suite file anywhere below them never materialize as module nodes.
pub fn scan(root: &Path, debug: &DebugLog) -> CatalogTree {
    let mut tree = CatalogTree::new();
    if !root.is_dir() {
        debug.log(&format!("[catalog] root not found: {}", root.display()));
        return tree;
    }

    let pattern = root
        .join("**")
        .join(format!("*.{}", SUITE_EXTENSION))
        .to_string_lossy()
        .to_string();

    let entries = match glob::glob(&pattern) {
        Ok(entries) => entries,
        Err(e) => {
            debug.log(&format!("[catalog] bad glob pattern {}: {}", pattern, e));
            return tree;
        }
    };

    let mut files: Vec<_> = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                debug.log(&format!("[catalog] unreadable entry: {}", e));
                None
            }
        })
        .filter(|path| {
            !path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(SETUP_FILE_PREFIX))
        })
        .collect();
    files.sort();

    for path in files {
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug.log(&format!("[catalog] skipping {}: {}", path.display(), e));
                continue;
            }
        };

        let rel = path.strip_prefix(root).unwrap_or(&path);
        insert_suite(&mut tree, rel, &parser::parse_cases(&content));
    }

    tree
}

/// Insert one suite file at its relative path, creating the module chain
/// for any directory components that do not exist yet.
fn insert_suite(tree: &mut CatalogTree, rel: &Path, cases: &[parser::SuiteCase]) {
    let components: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect();
    let Some((file_name, dirs)) = components.split_last() else {
        return;
    };

    let mut parent: Option<usize> = None;
    let mut walked = std::path::PathBuf::new();
    for dir in dirs {
        walked.push(dir);
        let rel_path = walked.to_string_lossy().to_string();
        let existing = match parent {
            Some(p) => tree.find_child_by_name(p, dir),
            None => tree.find_root_by_name(dir),
        };
        let id = existing.unwrap_or_else(|| match parent {
            Some(p) => tree.add_child(p, NodeKind::Module, dir.clone(), rel_path),
            None => tree.add_root(NodeKind::Module, dir.clone(), rel_path),
        });
        parent = Some(id);
    }

    let rel_path = rel.to_string_lossy().to_string();
    let suite_id = match parent {
        Some(p) => tree.add_child(p, NodeKind::Suite, file_name.clone(), rel_path.clone()),
        None => tree.add_root(NodeKind::Suite, file_name.clone(), rel_path.clone()),
    };

    for case in cases {
        let test_id = tree.add_child(suite_id, NodeKind::Test, case.name.clone(), rel_path.clone());
        if let Some(node) = tree.get_mut(test_id) {
            node.line = Some(case.line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    const SUITE: &str = "*** Test Cases ***\nFirst\n    Step\nSecond\n    Step\n";

    #[test]
    fn absent_root_yields_empty_forest() {
        let tree = scan(Path::new("/no/such/directory"), &DebugLog::disabled());
        assert!(tree.is_empty());
    }

    #[test]
    fn builds_modules_suites_and_tests() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "auth/login.robot", SUITE);
        write(dir.path(), "smoke.robot", "*** Test Cases ***\nPing\n    Step\n");

        let tree = scan(dir.path(), &DebugLog::disabled());
        assert_eq!(tree.totals(), (2, 3));

        let auth = tree.find_root_by_name("auth").unwrap();
        assert_eq!(tree.get(auth).unwrap().kind, NodeKind::Module);
        let login = tree.find_child_by_name(auth, "login.robot").unwrap();
        let suite = tree.get(login).unwrap();
        assert_eq!(suite.kind, NodeKind::Suite);
        assert_eq!(suite.rel_path, "auth/login.robot");
        assert_eq!(suite.children.len(), 2);

        let first = tree.get(suite.children[0]).unwrap();
        assert_eq!(first.name, "First");
        assert_eq!(first.line, Some(2));
    }

    #[test]
    fn setup_files_are_excluded() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "auth/__init__.robot", "*** Settings ***\n");
        write(dir.path(), "auth/login.robot", SUITE);

        let tree = scan(dir.path(), &DebugLog::disabled());
        let auth = tree.find_root_by_name("auth").unwrap();
        assert_eq!(tree.get(auth).unwrap().children.len(), 1);
    }

    #[test]
    fn directories_without_suites_are_omitted() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("empty/nested")).unwrap();
        write(dir.path(), "real/cases.robot", SUITE);

        let tree = scan(dir.path(), &DebugLog::disabled());
        assert!(tree.find_root_by_name("empty").is_none());
        assert!(tree.find_root_by_name("real").is_some());
    }

    #[test]
    fn suite_with_no_cases_still_appears() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "pending.robot", "*** Settings ***\nLibrary  Browser\n");

        let tree = scan(dir.path(), &DebugLog::disabled());
        let suite = tree.find_root_by_name("pending.robot").unwrap();
        assert!(tree.get(suite).unwrap().children.is_empty());
    }

    #[test]
    fn deterministic_order_across_rescans() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b/second.robot", SUITE);
        write(dir.path(), "a/first.robot", SUITE);

        let debug = DebugLog::disabled();
        let one = scan(dir.path(), &debug);
        let two = scan(dir.path(), &debug);
        let names = |tree: &CatalogTree| -> Vec<String> {
            tree.visible_nodes()
                .into_iter()
                .map(|(id, _)| tree.get(id).unwrap().name.clone())
                .collect()
        };
        assert_eq!(names(&one), names(&two));
        assert_eq!(names(&one)[0], "a");
    }
}
