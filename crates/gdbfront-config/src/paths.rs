use std::path::PathBuf;

use crate::error::ConfigError;

/// Standard directory locations for gdbfront.
pub trait PlatformPaths: Send + Sync {
    /// Configuration directory (`~/.config/gdbfront`).
    fn config_dir(&self) -> PathBuf;
    /// Data directory (`~/.local/share/gdbfront`).
    fn data_dir(&self) -> PathBuf;
    /// Log directory (`<data_dir>/logs`).
    fn log_dir(&self) -> PathBuf;
    /// Directories searched for `gdbinit*.json` templates, most specific last.
    fn template_dirs(&self) -> Vec<PathBuf>;
}

/// [`PlatformPaths`] rooted at the user's home directory.
pub struct DefaultPaths {
    home: PathBuf,
}

impl DefaultPaths {
    /// Resolve the home directory.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Path` if the home directory cannot be
    /// determined.
    pub fn new() -> Result<Self, ConfigError> {
        let home = dirs::home_dir()
            .or_else(|| std::env::var("HOME").ok().map(PathBuf::from))
            .ok_or_else(|| ConfigError::Path("could not determine home directory".into()))?;
        Ok(Self { home })
    }

    /// Paths rooted at an explicit directory instead of `$HOME`.
    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self { home: home.into() }
    }
}

impl PlatformPaths for DefaultPaths {
    fn config_dir(&self) -> PathBuf {
        self.home.join(".config").join("gdbfront")
    }

    fn data_dir(&self) -> PathBuf {
        self.home.join(".local").join("share").join("gdbfront")
    }

    fn log_dir(&self) -> PathBuf {
        self.data_dir().join("logs")
    }

    fn template_dirs(&self) -> Vec<PathBuf> {
        vec![self.data_dir().join("templates"), self.config_dir()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_resolves_home() {
        assert!(DefaultPaths::new().is_ok());
    }

    #[test]
    fn config_dir_ends_with_gdbfront() {
        let paths = DefaultPaths::with_home("/home/dev");
        assert_eq!(paths.config_dir(), PathBuf::from("/home/dev/.config/gdbfront"));
    }

    #[test]
    fn log_dir_is_under_data_dir() {
        let paths = DefaultPaths::with_home("/home/dev");
        assert!(paths.log_dir().starts_with(paths.data_dir()));
        assert!(paths.log_dir().ends_with("logs"));
    }

    #[test]
    fn template_dirs_prefer_config_last() {
        let paths = DefaultPaths::with_home("/home/dev");
        let dirs = paths.template_dirs();
        assert_eq!(dirs.len(), 2);
        assert_eq!(dirs.last(), Some(&paths.config_dir()));
    }
}
