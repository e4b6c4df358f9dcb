//! Resolution of probe and gallery file lists from the command line: pair
//! files, list files, directories and 1-based index ranges.

use std::ffi::OsStr;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;

/// 1-based inclusive index range, stored 0-based.
#[derive(Debug, Copy, Clone)]
pub struct Range {
    first: u32,
    last: u32,
}

impl Range {
    pub fn first(&self) -> u32 {
        self.first
    }

    pub fn len(&self) -> u32 {
        self.last - self.first + 1
    }
}

impl FromStr for Range {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (first, last) = s.split_once('-').ok_or("no separator")?;
        let first: u32 = first.parse().map_err(|_| "invalid start of range")?;
        let last: u32 = last.parse().map_err(|_| "invalid end of range")?;

        if first >= 1 && first <= last {
            Ok(Range {
                first: first - 1,
                last: last - 1,
            })
        } else {
            Err("invalid order")
        }
    }
}

pub fn slice_by_range<T>(slice: &[T], range: Range) -> Option<&[T]> {
    let first = range.first() as usize;
    let len = range.len() as usize;
    if first < slice.len() && first + len <= slice.len() {
        Some(&slice[first..first + len])
    } else {
        None
    }
}

/// A pair file alternates probe and gallery paths line by line. A trailing
/// unmatched gallery line is dropped with a warning.
pub fn items_from_pairs(path: impl AsRef<Path>) -> anyhow::Result<(Vec<PathBuf>, Vec<PathBuf>)> {
    let file = std::fs::File::open(path.as_ref())
        .with_context(|| format!("cannot load pairs from {}", path.as_ref().display()))?;

    let mut probes = Vec::new();
    let mut galleries = Vec::new();
    for (i, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line.context("cannot read line")?;
        if i % 2 == 0 {
            probes.push(line.into());
        } else {
            galleries.push(line.into());
        }
    }

    if probes.len() != galleries.len() {
        log::warn!(
            "{} probe files but {} gallery files, dropping the last probe",
            probes.len(),
            galleries.len()
        );
        probes.pop();
    }

    Ok((probes, galleries))
}

pub fn items_from_file(path: impl AsRef<Path>) -> anyhow::Result<Vec<PathBuf>> {
    let file = std::fs::File::open(path.as_ref())
        .with_context(|| format!("cannot load file list from {}", path.as_ref().display()))?;

    let mut files = Vec::new();
    for line in std::io::BufReader::new(file).lines() {
        files.push(line.context("cannot read line")?.into());
    }
    Ok(files)
}

/// All `.xyt` files in a directory, sorted by path.
pub fn items_from_directory(path: impl AsRef<Path>) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(path.as_ref())
        .with_context(|| format!("cannot read directory {}", path.as_ref().display()))?
    {
        let entry = entry.context("cannot read directory entry")?;
        if !entry.metadata().context("cannot read metadata")?.is_file() {
            continue;
        }
        if entry.path().extension().and_then(OsStr::to_str) != Some("xyt") {
            continue;
        }
        files.push(entry.path());
    }
    files.sort();
    Ok(files)
}

pub fn items_from_file_or_directory(path: impl AsRef<Path>) -> anyhow::Result<Vec<PathBuf>> {
    let path = path.as_ref();
    if path.is_file() {
        items_from_file(path)
    } else if path.is_dir() {
        items_from_directory(path)
    } else if path.exists() {
        anyhow::bail!("cannot use path {}", path.display())
    } else {
        anyhow::bail!("path {} does not exist", path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_one_based_inclusive() {
        let range: Range = "2-5".parse().unwrap();
        assert_eq!(range.first(), 1);
        assert_eq!(range.len(), 4);

        let single: Range = "3-3".parse().unwrap();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn invalid_ranges_are_rejected() {
        assert!("5".parse::<Range>().is_err());
        assert!("0-3".parse::<Range>().is_err());
        assert!("5-3".parse::<Range>().is_err());
        assert!("a-b".parse::<Range>().is_err());
    }

    #[test]
    fn range_slicing_checks_bounds() {
        let items = [10, 20, 30, 40];
        let range: Range = "2-3".parse().unwrap();
        assert_eq!(slice_by_range(&items, range), Some(&items[1..3]));

        let out_of_bounds: Range = "3-9".parse().unwrap();
        assert_eq!(slice_by_range(&items, out_of_bounds), None);
    }
}
