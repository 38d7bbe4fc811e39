//! Init-script templates stored as `gdbinit*.json` files.
//!
//! A file holds either one template object or an array of them:
//!
//! ```json
//! { "name": "OpenOCD", "default": true, "preferredGdb": "arm-none-eabi-gdb",
//!   "commands": ["target extended-remote :3333", "monitor reset halt"] }
//! ```

use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A named list of debugger commands run after startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub name: String,
    #[serde(default)]
    pub default: bool,
    /// Regex matched against candidate debugger base names.
    #[serde(default)]
    pub preferred_gdb: Option<String>,
    #[serde(default)]
    pub commands: Vec<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TemplateFile {
    One(Template),
    Many(Vec<Template>),
}

impl Template {
    /// The commands as a newline-separated script.
    pub fn init_script(&self) -> String {
        self.commands.join("\n")
    }

    /// First candidate whose base name (file name up to the first `.`)
    /// matches `preferred_gdb`. Without a preference the first candidate
    /// is returned.
    pub fn pick_debugger<'a>(&self, candidates: &'a [PathBuf]) -> Option<&'a PathBuf> {
        let pattern = match self.preferred_gdb.as_deref() {
            None | Some("") => return candidates.first(),
            Some(p) => p,
        };
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!("template {:?}: bad preferredGdb pattern: {e}", self.name);
                return None;
            }
        };
        candidates.iter().find(|c| {
            c.file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.split('.').next().unwrap_or(n))
                .is_some_and(|base| re.is_match(base))
        })
    }
}

/// Parse the contents of one template file.
///
/// # Errors
///
/// Returns `ConfigError::Parse` when the JSON is neither a template object
/// nor an array of them.
pub fn parse_templates(json: &str) -> Result<Vec<Template>, ConfigError> {
    let file: TemplateFile =
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
    Ok(match file {
        TemplateFile::One(t) => vec![t],
        TemplateFile::Many(ts) => ts,
    })
}

/// Read every `gdbinit*.json` in `dirs`, in directory order and then file
/// name order. Missing directories and malformed files are skipped.
pub fn load_templates(dirs: &[PathBuf]) -> Vec<Template> {
    let mut templates = Vec::new();
    for dir in dirs {
        for path in template_files(dir) {
            let parsed = std::fs::read_to_string(&path)
                .map_err(ConfigError::from)
                .and_then(|s| parse_templates(&s));
            match parsed {
                Ok(mut ts) => templates.append(&mut ts),
                Err(e) => tracing::warn!("skipping template {}: {e}", path.display()),
            }
        }
    }
    templates
}

fn template_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| {
            p.is_file()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("gdbinit") && n.ends_with(".json"))
        })
        .collect();
    files.sort();
    files
}

/// The last template marked `default`, else the first one.
pub fn default_template(templates: &[Template]) -> Option<&Template> {
    templates
        .iter()
        .rev()
        .find(|t| t.default)
        .or_else(|| templates.first())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn template(name: &str, default: bool) -> Template {
        Template {
            name: name.into(),
            default,
            preferred_gdb: None,
            commands: Vec::new(),
        }
    }

    #[test]
    fn parse_single_object() {
        let ts = parse_templates(
            r#"{"name":"Local","preferredGdb":"^gdb$","commands":["set confirm off","start"]}"#,
        )
        .unwrap();
        assert_eq!(ts.len(), 1);
        assert_eq!(ts[0].name, "Local");
        assert!(!ts[0].default);
        assert_eq!(ts[0].preferred_gdb.as_deref(), Some("^gdb$"));
        assert_eq!(ts[0].init_script(), "set confirm off\nstart");
    }

    #[test]
    fn parse_array() {
        let ts = parse_templates(r#"[{"name":"a"},{"name":"b","default":true}]"#).unwrap();
        assert_eq!(ts.len(), 2);
        assert!(ts[1].default);
        assert!(ts[0].commands.is_empty());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(parse_templates("42"), Err(ConfigError::Parse(_))));
        assert!(parse_templates("{not json").is_err());
    }

    #[test]
    fn default_is_last_marked() {
        let ts = vec![
            template("a", false),
            template("b", true),
            template("c", true),
            template("d", false),
        ];
        assert_eq!(default_template(&ts).unwrap().name, "c");
    }

    #[test]
    fn default_falls_back_to_first() {
        let ts = vec![template("a", false), template("b", false)];
        assert_eq!(default_template(&ts).unwrap().name, "a");
        assert!(default_template(&[]).is_none());
    }

    #[test]
    fn pick_debugger_matches_base_name() {
        let mut t = template("arm", false);
        t.preferred_gdb = Some("^arm-.*-gdb$".into());
        let candidates = vec![
            PathBuf::from("/usr/bin/gdb"),
            PathBuf::from("/opt/arm/bin/arm-none-eabi-gdb.exe"),
        ];
        assert_eq!(t.pick_debugger(&candidates), Some(&candidates[1]));

        t.preferred_gdb = Some("^riscv".into());
        assert_eq!(t.pick_debugger(&candidates), None);

        t.preferred_gdb = None;
        assert_eq!(t.pick_debugger(&candidates), Some(&candidates[0]));
    }

    #[test]
    fn pick_debugger_bad_pattern_is_none() {
        let mut t = template("bad", false);
        t.preferred_gdb = Some("(".into());
        assert_eq!(t.pick_debugger(&[PathBuf::from("gdb")]), None);
    }

    #[test]
    fn load_templates_reads_matching_files_only() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        std::fs::write(first.path().join("gdbinit-b.json"), r#"{"name":"b"}"#).unwrap();
        std::fs::write(first.path().join("gdbinit-a.json"), r#"[{"name":"a"}]"#).unwrap();
        std::fs::write(first.path().join("other.json"), r#"{"name":"ignored"}"#).unwrap();
        std::fs::write(second.path().join("gdbinit.json"), "oops").unwrap();
        std::fs::write(second.path().join("gdbinit2.json"), r#"{"name":"c","default":true}"#)
            .unwrap();

        let dirs = vec![
            first.path().to_path_buf(),
            PathBuf::from("/no/such/dir"),
            second.path().to_path_buf(),
        ];
        let ts = load_templates(&dirs);
        let names: Vec<_> = ts.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(default_template(&ts).unwrap().name, "c");
    }
}
