use std::path::Path;

use walkdir::WalkDir;

/// Deepest indentation level that is still listed; the root's children are level 0.
pub const MAX_LISTING_DEPTH: usize = 3;

const INDENT: &str = "    ";

/// Indented tree of the entries under `root`, one name per line.
///
/// Directories are recursed until [`MAX_LISTING_DEPTH`]. Symlinked
/// directories are entered like real ones. Entry order follows the
/// filesystem. A missing or unreadable root, or unreadable subtree,
/// contributes nothing instead of failing.
pub fn list_dir_tree(root: impl AsRef<Path>) -> String {
    let mut listing = String::new();
    let walker = WalkDir::new(root)
        .follow_links(true)
        .min_depth(1)
        .max_depth(MAX_LISTING_DEPTH + 1);

    for entry in walker.into_iter().filter_map(Result::ok) {
        let level = entry.depth() - 1;
        listing.push_str(&INDENT.repeat(level));
        listing.push_str(&entry.file_name().to_string_lossy());
        listing.push('\n');
    }

    listing
}
