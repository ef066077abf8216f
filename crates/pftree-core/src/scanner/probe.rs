//! Bounded-depth filesystem walk using `jwalk`.
//!
//! The walk runs on a rayon-backed `jwalk` pool with sorted children, so
//! the listing order is the same on every run over an unchanged tree.
//! Entries are grouped by parent directory in order of first appearance.

use compact_str::CompactString;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, warn};

/// Walk options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Deepest directory level to list, the root being level 0.
    pub max_depth: Option<usize>,
    /// Descend into symbolic directory links.
    pub follow_links: bool,
    /// Only list files whose basename contains this substring.
    pub single_file_filter: Option<String>,
}

/// Raw listings produced by [`probe`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeResult {
    /// `true` once the root itself was walked.
    pub status: bool,
    /// Per directory with subdirectories, the full subdirectory paths.
    pub dirs: Vec<Vec<PathBuf>>,
    /// Per directory with (matching) files, the full file paths.
    pub files: Vec<Vec<PathBuf>>,
    /// Entries that could not be read.
    pub errors: u64,
}

impl ProbeResult {
    pub fn file_count(&self) -> usize {
        self.files.iter().map(Vec::len).sum()
    }
}

/// Children of one directory, accumulated during the walk.
struct Listing {
    subdirs: Vec<PathBuf>,
    files: Vec<PathBuf>,
}

/// Walk `root` and list the files and subdirectories of every directory.
pub fn probe(root: &Path, options: &ProbeOptions) -> ProbeResult {
    let start = Instant::now();
    let mut walker = jwalk::WalkDir::new(root)
        .sort(true)
        .skip_hidden(false)
        .follow_links(options.follow_links)
        .parallelism(jwalk::Parallelism::RayonNewPool(num_cpus::get()));
    if let Some(depth) = options.max_depth {
        // Files of a level-`depth` directory sit one level further down.
        walker = walker.max_depth(depth + 1);
    }

    let filter = options
        .single_file_filter
        .as_deref()
        .filter(|f| !f.is_empty());
    let mut status = false;
    let mut errors: u64 = 0;
    let mut listings: Vec<Listing> = Vec::new();
    let mut slot_of: HashMap<PathBuf, usize> = HashMap::new();

    for entry_result in walker {
        let entry = match entry_result {
            Ok(e) => e,
            Err(err) => {
                errors += 1;
                let err_path = err
                    .path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                warn!("Skipping unreadable entry {err_path}: {err}");
                continue;
            }
        };
        status = true;

        let path = entry.path();
        if path == root {
            continue;
        }
        let parent = match path.parent() {
            Some(p) => p.to_path_buf(),
            None => continue,
        };

        let file_type = entry.file_type();
        // Unfollowed links to directories are still directories.
        let is_dir = file_type.is_dir() || (file_type.is_symlink() && path.is_dir());
        if !is_dir {
            if let Some(filter) = filter {
                let name = CompactString::new(entry.file_name().to_string_lossy());
                if !name.contains(filter) {
                    continue;
                }
            }
        }

        let slot = *slot_of.entry(parent).or_insert_with(|| {
            listings.push(Listing {
                subdirs: Vec::new(),
                files: Vec::new(),
            });
            listings.len() - 1
        });
        if is_dir {
            listings[slot].subdirs.push(path);
        } else {
            listings[slot].files.push(path);
        }
    }

    let mut result = ProbeResult {
        status,
        errors,
        ..ProbeResult::default()
    };
    for listing in listings {
        if !listing.subdirs.is_empty() {
            result.dirs.push(listing.subdirs);
        }
        if !listing.files.is_empty() {
            result.files.push(listing.files);
        }
    }

    debug!(
        "Probed {}: {} file groups, {} files, {} errors in {:?}",
        root.display(),
        result.files.len(),
        result.file_count(),
        errors,
        start.elapsed()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// ```text
    /// root/
    ///   top.txt
    ///   a/
    ///     a1.dcm
    ///     a2.txt
    ///     deep/
    ///       d.dcm
    ///   empty/
    /// ```
    fn build_tree(root: &Path) {
        fs::create_dir_all(root.join("a/deep")).unwrap();
        fs::create_dir_all(root.join("empty")).unwrap();
        fs::write(root.join("top.txt"), b"t").unwrap();
        fs::write(root.join("a/a1.dcm"), b"1").unwrap();
        fs::write(root.join("a/a2.txt"), b"2").unwrap();
        fs::write(root.join("a/deep/d.dcm"), b"d").unwrap();
    }

    fn groups(result: &ProbeResult, root: &Path) -> Vec<Vec<String>> {
        result
            .files
            .iter()
            .map(|g| {
                g.iter()
                    .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().into_owned())
                    .collect()
            })
            .collect()
    }

    #[test]
    fn unbounded_walk_lists_every_directory_with_files() {
        let tmp = TempDir::new().unwrap();
        build_tree(tmp.path());

        let result = probe(tmp.path(), &ProbeOptions::default());
        assert!(result.status);
        assert_eq!(result.errors, 0);
        let mut found = groups(&result, tmp.path());
        found.sort();
        assert_eq!(
            found,
            vec![
                vec!["a/a1.dcm".to_string(), "a/a2.txt".to_string()],
                vec!["a/deep/d.dcm".to_string()],
                vec!["top.txt".to_string()],
            ]
        );
    }

    #[test]
    fn depth_zero_lists_only_the_root() {
        let tmp = TempDir::new().unwrap();
        build_tree(tmp.path());

        let result = probe(
            tmp.path(),
            &ProbeOptions {
                max_depth: Some(0),
                ..ProbeOptions::default()
            },
        );
        assert_eq!(groups(&result, tmp.path()), vec![vec!["top.txt".to_string()]]);
    }

    #[test]
    fn depth_one_stops_above_deep_directories() {
        let tmp = TempDir::new().unwrap();
        build_tree(tmp.path());

        let result = probe(
            tmp.path(),
            &ProbeOptions {
                max_depth: Some(1),
                ..ProbeOptions::default()
            },
        );
        assert_eq!(result.file_count(), 3);
        assert!(result
            .files
            .iter()
            .flatten()
            .all(|p| !p.to_string_lossy().contains("deep/")));
    }

    #[test]
    fn single_file_filter_drops_unmatched_directories() {
        let tmp = TempDir::new().unwrap();
        build_tree(tmp.path());

        let result = probe(
            tmp.path(),
            &ProbeOptions {
                single_file_filter: Some(".dcm".into()),
                ..ProbeOptions::default()
            },
        );
        let mut found = groups(&result, tmp.path());
        found.sort();
        assert_eq!(
            found,
            vec![vec!["a/a1.dcm".to_string()], vec!["a/deep/d.dcm".to_string()]]
        );
    }

    #[test]
    fn subdirectories_are_reported_separately() {
        let tmp = TempDir::new().unwrap();
        build_tree(tmp.path());

        let result = probe(tmp.path(), &ProbeOptions::default());
        let subdirs: usize = result.dirs.iter().map(Vec::len).sum();
        // a, empty, a/deep
        assert_eq!(subdirs, 3);
    }

    #[test]
    fn missing_root_reports_failure() {
        let tmp = TempDir::new().unwrap();
        let result = probe(&tmp.path().join("nope"), &ProbeOptions::default());
        assert!(!result.status);
        assert!(result.files.is_empty());
    }

    #[test]
    fn repeated_probes_are_identical() {
        let tmp = TempDir::new().unwrap();
        build_tree(tmp.path());
        let first = probe(tmp.path(), &ProbeOptions::default());
        let second = probe(tmp.path(), &ProbeOptions::default());
        assert_eq!(first, second);
    }
}
