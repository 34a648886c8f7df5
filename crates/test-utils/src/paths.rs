//! Locating optional real Level-1C products on disk.
//!
//! Real products are large and not checked in. Tests that want one look
//! in the directories named by `TEST_DATA_DIR` and `SCIA_L1C_DATA`, then
//! in the `testdata/` folders of the workspace.

use std::path::{Path, PathBuf};

/// File name prefix shared by every SCIAMACHY Level-1C product.
pub const L1C_PREFIX: &str = "SCI_NLC_1P";

/// Workspace root, two levels above this crate's manifest.
pub fn workspace_root() -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .ancestors()
        .nth(2)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| manifest_dir.to_path_buf())
}

/// Directories searched for products, in priority order.
pub fn product_search_dirs() -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    for var in ["TEST_DATA_DIR", "SCIA_L1C_DATA"] {
        if let Ok(dir) = std::env::var(var) {
            dirs.push(PathBuf::from(dir));
        }
    }
    let root = workspace_root();
    dirs.push(root.join("crates/scia-l1c/testdata"));
    dirs.push(root.join("testdata"));
    dirs
}

/// First search directory holding a file called `name`.
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    product_search_dirs()
        .into_iter()
        .map(|dir| dir.join(name))
        .find(|path| path.is_file())
}

/// Any Level-1C product in the search directories, preferring the
/// lexically first name so repeated runs pick the same file.
pub fn find_any_product() -> Option<PathBuf> {
    product_search_dirs().into_iter().find_map(|dir| {
        let mut found: Vec<PathBuf> = std::fs::read_dir(&dir)
            .ok()?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_l1c_product(path))
            .collect();
        found.sort();
        found.into_iter().next()
    })
}

/// Whether the file name looks like a Level-1C product (`SCI_NLC_1P*.N1`).
pub fn is_l1c_product(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(L1C_PREFIX) && n.ends_with(".N1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_root_holds_manifest() {
        let root = workspace_root();
        assert!(root.join("Cargo.toml").exists(), "no Cargo.toml in {:?}", root);
        assert!(root.join("crates/test-utils").is_dir());
    }

    #[test]
    fn test_search_dirs_end_with_workspace_testdata() {
        let dirs = product_search_dirs();
        assert_eq!(dirs.last(), Some(&workspace_root().join("testdata")));
    }

    #[test]
    fn test_product_name_filter() {
        let dir = tempfile::tempdir().unwrap();
        let product = dir.path().join("SCI_NLC_1PNPDE20040102_093921_000060632023_00165_09804_0000.N1");
        let other = dir.path().join("SCI_NL__1PNPDE20040102_093921_000060632023_00165_09804_0000.N1");
        std::fs::write(&product, b"").unwrap();
        std::fs::write(&other, b"").unwrap();

        assert!(is_l1c_product(&product));
        assert!(!is_l1c_product(&other));
        assert!(!is_l1c_product(dir.path()));
    }

    #[test]
    fn test_missing_file_is_none() {
        assert!(find_test_file("SCI_NLC_1P_does_not_exist.N1").is_none());
    }
}
