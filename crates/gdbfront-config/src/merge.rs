use crate::config::Config;
use crate::error::ConfigError;

/// Merge an overlay TOML fragment on top of a base [`Config`].
///
/// Values present in `overlay_toml` override those in `base`; tables are
/// merged key by key, everything else (including arrays such as
/// `debugger.args`) is replaced outright.
pub fn merge_configs(base: &Config, overlay_toml: &str) -> Result<Config, ConfigError> {
    let base_str = toml::to_string(base).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let mut base_val: toml::Value =
        toml::from_str(&base_str).map_err(|e| ConfigError::Parse(e.to_string()))?;

    let overlay_val: toml::Value =
        toml::from_str(overlay_toml).map_err(|e| ConfigError::Parse(e.to_string()))?;

    merge_values(&mut base_val, &overlay_val);

    base_val
        .try_into()
        .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))
}

fn merge_values(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, val) in overlay_table {
                match base_table.get_mut(key) {
                    Some(base_val) => merge_values(base_val, val),
                    None => {
                        base_table.insert(key.clone(), val.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_empty_overlay_returns_base() {
        let base = Config::default();
        let merged = merge_configs(&base, "").expect("merge empty");
        assert_eq!(merged, base);
    }

    #[test]
    fn merge_overrides_single_key() {
        let base = Config::default();
        let merged = merge_configs(&base, "[debugger]\ncommand = \"gdb-multiarch\"\n").unwrap();
        assert_eq!(merged.debugger.command, "gdb-multiarch");
        // Sibling keys survive.
        assert_eq!(merged.debugger.args, base.debugger.args);
    }

    #[test]
    fn merge_replaces_arrays() {
        let base = Config::default();
        let merged = merge_configs(&base, "[debugger]\nargs = [\"-i=mi3\"]\n").unwrap();
        assert_eq!(merged.debugger.args, vec!["-i=mi3"]);
    }

    #[test]
    fn merge_adds_optional_keys_missing_from_base() {
        let base = Config::default();
        let merged = merge_configs(&base, "[launch]\nremote_target = \"localhost:1234\"\n").unwrap();
        assert_eq!(merged.launch.remote_target.as_deref(), Some("localhost:1234"));
    }

    #[test]
    fn merge_stacks_multiple_overlays() {
        let base = Config::default();
        let first = merge_configs(&base, "[session]\ntoken_base = 200\n").unwrap();
        let second = merge_configs(&first, "[session]\nrefresh_on_stop = false\n").unwrap();
        assert_eq!(second.session.token_base, 200);
        assert!(!second.session.refresh_on_stop);
    }

    #[test]
    fn merge_invalid_overlay_errors() {
        let result = merge_configs(&Config::default(), "[debugger\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn merge_type_mismatch_errors() {
        let result = merge_configs(&Config::default(), "[session]\ntoken_base = \"many\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
