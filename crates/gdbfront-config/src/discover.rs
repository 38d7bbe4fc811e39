//! Locating GDB binaries and per-program init scripts.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ConfigError;

/// Name of the init script looked up next to the debugged program.
pub const INIT_SCRIPT_NAME: &str = ".gdbinit";

fn debugger_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // Matches `gdb`, `gdb.exe` and cross toolchains such as `arm-none-eabi-gdb`.
    RE.get_or_init(|| Regex::new(r"^([\w-]+-)?gdb(\.exe)?$").expect("debugger name regex is valid"))
}

/// Whether `file_name` looks like a GDB executable.
pub fn is_debugger_name(file_name: &str) -> bool {
    debugger_name_regex().is_match(file_name)
}

/// Scan every directory of a `PATH`-style variable for GDB executables.
///
/// Returns full paths, sorted and de-duplicated. Unreadable directories
/// are skipped.
pub fn find_debuggers_in(path_var: &OsStr) -> Vec<PathBuf> {
    let mut found = BTreeSet::new();
    for dir in std::env::split_paths(path_var) {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if !is_debugger_name(name) {
                continue;
            }
            let path = entry.path();
            if path.is_file() {
                found.insert(path);
            }
        }
    }
    tracing::debug!("found {} debugger candidate(s)", found.len());
    found.into_iter().collect()
}

/// [`find_debuggers_in`] over the current process `PATH`.
pub fn find_debuggers() -> Vec<PathBuf> {
    match std::env::var_os("PATH") {
        Some(path) => find_debuggers_in(&path),
        None => Vec::new(),
    }
}

/// The `.gdbinit` sitting next to `executable`, if there is one.
pub fn find_init_script(executable: &Path) -> Option<PathBuf> {
    let candidate = executable.parent()?.join(INIT_SCRIPT_NAME);
    candidate.is_file().then_some(candidate)
}

/// Contents of the `.gdbinit` next to `executable`, or an empty string.
///
/// # Errors
///
/// Returns `ConfigError::Io` if the script exists but cannot be read.
pub fn read_init_script(executable: &Path) -> Result<String, ConfigError> {
    match find_init_script(executable) {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(String::new()),
    }
}
