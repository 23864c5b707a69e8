//! Derivation of the removed-file manifest.

use std::cmp::Ordering;
use std::io::Write;
use std::path::Path;

use crate::error::IndexError;
use crate::search::SortedIndex;

/// Writes every path present in `prior` but absent from `current` to `out`,
/// newline-terminated, in sorted order.
///
/// Both inputs must be sorted indexes; the derivation is a single linear
/// merge walk, so it runs in O(n+m) time with O(1) record memory.
///
/// # Errors
///
/// Propagates [`IndexError`] from either stream; write failures on `out` are
/// reported as [`IndexError::Io`] labelled with the prior index path.
pub fn write_removed_list<W: Write>(
    prior: &mut SortedIndex,
    current: &mut SortedIndex,
    out: &mut W,
) -> Result<u64, IndexError> {
    let prior_label = prior.source_path().to_path_buf();
    let mut removed = 0_u64;

    let mut prior_iter = prior.iter()?;
    let mut current_iter = current.iter()?;

    let mut prior_record = prior_iter.next().transpose()?;
    let mut current_record = current_iter.next().transpose()?;

    loop {
        match (&prior_record, &current_record) {
            (None, _) => break,
            (Some(p), None) => {
                emit(out, p.path_bytes(), &prior_label)?;
                removed += 1;
                prior_record = prior_iter.next().transpose()?;
            }
            (Some(p), Some(c)) => match p.path_bytes().cmp(c.path_bytes()) {
                Ordering::Less => {
                    emit(out, p.path_bytes(), &prior_label)?;
                    removed += 1;
                    prior_record = prior_iter.next().transpose()?;
                }
                Ordering::Equal => {
                    prior_record = prior_iter.next().transpose()?;
                    current_record = current_iter.next().transpose()?;
                }
                Ordering::Greater => {
                    current_record = current_iter.next().transpose()?;
                }
            },
        }
    }

    Ok(removed)
}

fn emit<W: Write>(out: &mut W, path: &[u8], label: &Path) -> Result<(), IndexError> {
    out.write_all(path)
        .and_then(|()| out.write_all(b"\n"))
        .map_err(|source| IndexError::io(label, source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::append::AppendLog;
    use crate::sort::{sort_index, SortOptions};

    fn index_of(temp: &tempfile::TempDir, name: &str, paths: &[&str]) -> SortedIndex {
        let log = temp.path().join(format!("{name}.log"));
        let sorted = temp.path().join(format!("{name}.sorted"));

        let mut append = AppendLog::create(&log).expect("create");
        for path in paths {
            append.append(Path::new(path), "00").expect("append");
        }
        append.finish().expect("finish");

        let options = SortOptions {
            max_run_bytes: 1 << 20,
            temp_dir: temp.path().to_path_buf(),
        };
        sort_index(&log, &sorted, &options).expect("sort");
        SortedIndex::open(&sorted).expect("open")
    }

    fn removed_between(prior_paths: &[&str], current_paths: &[&str]) -> (Vec<u8>, u64) {
        let temp = tempfile::tempdir().expect("tempdir");
        let mut prior = index_of(&temp, "prior", prior_paths);
        let mut current = index_of(&temp, "current", current_paths);

        let mut out = Vec::new();
        let count = write_removed_list(&mut prior, &mut current, &mut out).expect("derive");
        (out, count)
    }

    #[test]
    fn identical_indexes_remove_nothing() {
        let (out, count) = removed_between(&["/a", "/b"], &["/a", "/b"]);
        assert_eq!(out, b"");
        assert_eq!(count, 0);
    }

    #[test]
    fn deleted_paths_are_emitted_in_sorted_order() {
        let (out, count) = removed_between(&["/c", "/a", "/b"], &["/b"]);
        assert_eq!(out, b"/a\n/c\n");
        assert_eq!(count, 2);
    }

    #[test]
    fn additions_in_current_are_ignored() {
        let (out, count) = removed_between(&["/a"], &["/a", "/new1", "/new2"]);
        assert_eq!(out, b"");
        assert_eq!(count, 0);
    }

    #[test]
    fn empty_current_removes_everything() {
        let (out, count) = removed_between(&["/x", "/y"], &[]);
        assert_eq!(out, b"/x\n/y\n");
        assert_eq!(count, 2);
    }

    #[test]
    fn empty_prior_removes_nothing() {
        let (out, count) = removed_between(&[], &["/x"]);
        assert_eq!(out, b"");
        assert_eq!(count, 0);
    }
}
