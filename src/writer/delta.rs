//! Movement of the encoder's directory cursor between entry paths.

use crate::Error;

/// The parent of an unrooted slash-separated path
/// (empty for a top-level name or the root).
pub(crate) fn parent(path: &str) -> &str {
    path.rfind('/').map_or("", |i| &path[..i])
}

/// Path components, none for the empty (root) path.
pub(crate) fn components(path: &str) -> impl DoubleEndedIterator<Item = &str> {
    path.split('/').filter(|c| !c.is_empty())
}

/// Whether `path` is strictly below the directory at `dir`.
/// Everything is below the root.
pub(crate) fn descends(dir: &str, path: &str) -> bool {
    if dir.is_empty() {
        return !path.is_empty();
    }
    path.len() > dir.len() && path.starts_with(dir) && path.as_bytes()[dir.len()] == b'/'
}

/// Computes the directory ends (pops) and new directories to be opened in
/// order to advance from one entry path to the next.
///
/// Returns `(pop, new_dirs)`: the number of directory levels to close
/// below the shared prefix, and the slash-joined chain of directories to
/// open above the new entry. Fails when the paths are not in strictly
/// ascending traversal order, or when descending below a non-directory.
pub(crate) fn tree_delta<'a>(
    old: &str,
    old_is_dir: bool,
    new: &'a str,
) -> Result<(usize, &'a str), Error> {
    let new_parent = parent(new);

    if descends(old, new) {
        if !old_is_dir {
            return Err(Error::invalid(format!("{old:?} is not a directory")));
        }
        let rest = new_parent.strip_prefix(old).unwrap_or(new_parent);
        return Ok((0, rest.strip_prefix('/').unwrap_or(rest)));
    }

    let old_parent = parent(old);
    let common = components(old_parent)
        .zip(components(new_parent))
        .take_while(|(a, b)| a == b)
        .count();
    let pop = components(old_parent).count() - common;

    // The first differing component must be strictly greater than its
    // counterpart; equal or smaller means the traversal went backwards.
    if let (Some(prev), Some(next)) = (components(old).nth(common), components(new).nth(common)) {
        if next <= prev {
            return Err(Error::OutOfOrder {
                path: new.to_owned(),
                prev: old.to_owned(),
            });
        }
    }

    let new_dirs = new_parent.splitn(common + 1, '/').nth(common).unwrap_or("");
    Ok((pop, new_dirs))
}

#[cfg(test)]
mod test {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", true, "foo.txt", 0, "")]
    #[case("", false, "", 0, "")]
    #[case("bar.txt", false, "foo.txt", 0, "")]
    #[case("", true, "a/foo.txt", 0, "a")]
    #[case("", true, "a/b/foo.txt", 0, "a/b")]
    #[case("0/x", false, "a/b/foo.txt", 1, "a/b")]
    #[case("x", true, "x/foo.txt", 0, "")]
    #[case("x", true, "x/a/b/foo.txt", 0, "a/b")]
    #[case("foo/b", false, "foo-a", 1, "")]
    #[case("a/q", false, "a/q.txt", 0, "")]
    fn ok(
        #[case] old: &str,
        #[case] old_is_dir: bool,
        #[case] new: &str,
        #[case] pop: usize,
        #[case] new_dirs: &str,
    ) {
        assert_eq!(tree_delta(old, old_is_dir, new).unwrap(), (pop, new_dirs));
    }

    #[rstest]
    #[case("foo.txt", false, "bar.txt")]
    #[case("x/y", false, "a/foo.txt")]
    #[case("x", false, "x/foo.txt")]
    #[case("", false, "foo.txt")]
    #[case("a", false, "a")]
    fn err(#[case] old: &str, #[case] old_is_dir: bool, #[case] new: &str) {
        assert!(tree_delta(old, old_is_dir, new).is_err());
    }

    #[test]
    fn parent_of() {
        assert_eq!(parent(""), "");
        assert_eq!(parent("a"), "");
        assert_eq!(parent("a/b/c"), "a/b");
    }
}
