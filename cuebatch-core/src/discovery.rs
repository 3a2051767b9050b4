//! Candidate discovery and job filtering.
//!
//! Candidates are the regular files in the top level of the input directory.
//! Subdirectories are not searched. Names are returned sorted so submission
//! order is the same on every platform.

use std::path::Path;

use log::debug;
use regex::Regex;

use crate::error::{CoreError, CoreResult};

/// Lists candidate job identifiers (file names) in `dir`.
///
/// # Errors
///
/// Returns `CoreError::Enumeration` if the directory cannot be read. This is
/// fatal to the batch.
///
/// # Examples
///
/// ```rust,no_run
/// use cuebatch_core::discovery::list_candidates;
/// use std::path::Path;
///
/// match list_candidates(Path::new("dist")) {
///     Ok(names) => println!("Found {} candidates", names.len()),
///     Err(e) => eprintln!("Error listing candidates: {}", e),
/// }
/// ```
pub fn list_candidates(dir: &Path) -> CoreResult<Vec<String>> {
    let enumeration_error = |source| CoreError::Enumeration {
        dir: dir.to_path_buf(),
        source,
    };

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(enumeration_error)? {
        let entry = entry.map_err(enumeration_error)?;
        let is_file = entry
            .file_type()
            .map(|file_type| file_type.is_file())
            .unwrap_or(false);
        if !is_file {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        } else {
            debug!("Skipping non UTF-8 file name in {}", dir.display());
        }
    }

    names.sort();
    debug!("Listed {} candidate(s) in {}", names.len(), dir.display());
    Ok(names)
}

/// Case-sensitive filter matching `^<pattern>\.<extension>$`.
#[derive(Debug, Clone)]
pub struct JobFilter {
    regex: Regex,
}

impl JobFilter {
    /// Compiles the filter. The extension is matched literally.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::InvalidPattern` if `pattern` is not a valid
    /// regular expression.
    pub fn new(pattern: &str, extension: &str) -> CoreResult<Self> {
        let extension = extension.trim_start_matches('.');
        let regex = Regex::new(&format!(
            r"^(?:{pattern})\.{}$",
            regex::escape(extension)
        ))?;
        Ok(Self { regex })
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// Keeps matching names, preserving their order.
    pub fn filter(&self, names: Vec<String>) -> Vec<String> {
        names.into_iter().filter(|name| self.matches(name)).collect()
    }
}
