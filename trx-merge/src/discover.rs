// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expanding the inputs given on the command line into a list of report files.

use crate::errors::DiscoverError;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Options controlling how input directories are searched.
#[derive(Clone, Debug)]
pub struct DiscoverOpts<'a> {
    /// Files with this extension (without the leading dot) are picked up from directories.
    pub extension: &'a str,

    /// Whether subdirectories are searched.
    pub recursive: bool,
}

/// Expands `inputs` into report files.
///
/// Anything that isn't a directory is passed through as-is, in the order given, and is checked
/// when it's loaded. Each directory is replaced by the files in it that have the configured
/// extension, sorted by path.
pub fn discover_inputs(
    inputs: &[Utf8PathBuf],
    opts: &DiscoverOpts<'_>,
) -> Result<Vec<Utf8PathBuf>, DiscoverError> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let found = search_dir(input, opts)?;
            debug!("found {} reports under {input}", found.len());
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }

    if files.is_empty() {
        return Err(DiscoverError::NoInputsFound {
            extension: opts.extension.to_owned(),
        });
    }
    Ok(files)
}

fn search_dir(dir: &Utf8Path, opts: &DiscoverOpts<'_>) -> Result<Vec<Utf8PathBuf>, DiscoverError> {
    let max_depth = if opts.recursive { usize::MAX } else { 1 };
    let mut found = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(max_depth)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|err| DiscoverError::Walk {
            path: dir.to_owned(),
            err,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = Utf8PathBuf::from_path_buf(entry.into_path()).map_err(|path| {
            DiscoverError::NonUtf8Path {
                root: dir.to_owned(),
                path,
            }
        })?;
        if path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(opts.extension))
        {
            found.push(path);
        }
    }

    found.sort();
    Ok(found)
}
