use crate::config::Config;
use crate::error::ConfigError;

/// Upper bound for `session.quit_grace_ms`.
const MAX_QUIT_GRACE_MS: u64 = 60_000;

/// Validate a [`Config`], returning all detected violations.
pub fn validate(config: &Config) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.debugger.command.trim().is_empty() {
        errors.push(ConfigError::Validation {
            field: "debugger.command".to_string(),
            message: "must not be empty".to_string(),
        });
    }

    if let Some(target) = &config.launch.remote_target {
        if !is_remote_target(target) {
            errors.push(ConfigError::Validation {
                field: "launch.remote_target".to_string(),
                message: format!("expected host:port, a device path or `| command`, got {target:?}"),
            });
        }
    }

    if config.session.token_base == 0 {
        errors.push(ConfigError::Validation {
            field: "session.token_base".to_string(),
            message: "must be at least 1".to_string(),
        });
    }

    if config.session.quit_grace_ms > MAX_QUIT_GRACE_MS {
        errors.push(ConfigError::Validation {
            field: "session.quit_grace_ms".to_string(),
            message: format!(
                "must be at most {MAX_QUIT_GRACE_MS}, got {}",
                config.session.quit_grace_ms
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Forms accepted by `target remote`: `host:port`, `:port`, a serial
/// device path, or a `| command` pipe.
fn is_remote_target(target: &str) -> bool {
    let target = target.trim();
    if target.starts_with('|') {
        return target.len() > 1;
    }
    if target.starts_with('/') {
        return true;
    }
    match target.rsplit_once(':') {
        Some((_, port)) => !port.is_empty() && port.chars().all(|c| c.is_ascii_digit()),
        None => false,
    }
}
