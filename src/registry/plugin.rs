//! Plugin file lookup and symbol loading.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_yaml::Mapping;

use super::RegistryError;
use crate::database::SqlDialect;

/// Body of a `DatabaseConnection_<Name>` symbol: a new name for a built-in dialect.
///
/// ```yaml
/// DatabaseConnection_Warehouse:
///   kind: alias
///   dialect: pgsql
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DatabaseDefinition {
    Alias { dialect: SqlDialect },
}

/// Path of the plugin file for type `name`.
pub fn plugin_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("plugin_{}.yaml", name))
}

/// Whether `name` can name a plugin file without leaving the plugin directory.
pub(super) fn is_plugin_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Read `path` and deserialize the definition stored under `symbol`.
pub(super) fn load_symbol<T: DeserializeOwned>(path: &Path, symbol: &str) -> Result<T, RegistryError> {
    let fail = |reason: String| RegistryError::PluginLoad {
        path: path.to_path_buf(),
        symbol: symbol.to_string(),
        reason,
    };

    let content = std::fs::read_to_string(path).map_err(|e| fail(e.to_string()))?;
    let document: Mapping =
        serde_yaml::from_str(&content).map_err(|e| fail(format!("malformed plugin file: {}", e)))?;
    let definition = document
        .get(symbol)
        .ok_or_else(|| fail("symbol not found".to_string()))?;

    serde_yaml::from_value(definition.clone())
        .map_err(|e| fail(format!("invalid definition: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_path() {
        assert_eq!(
            plugin_path(Path::new("/opt/agent"), "Entropy"),
            PathBuf::from("/opt/agent/plugin_Entropy.yaml")
        );
    }

    #[test]
    fn test_is_plugin_name() {
        assert!(is_plugin_name("Disk_Usage-2"));
        assert!(!is_plugin_name(""));
        assert!(!is_plugin_name("../etc/passwd"));
        assert!(!is_plugin_name("a b"));
    }

    #[test]
    fn test_load_symbol() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugin_Warehouse.yaml");
        std::fs::write(
            &path,
            "DatabaseConnection_Warehouse:\n  kind: alias\n  dialect: sqlite\nOther: 1\n",
        )
        .unwrap();

        let def: DatabaseDefinition = load_symbol(&path, "DatabaseConnection_Warehouse").unwrap();
        assert_eq!(
            def,
            DatabaseDefinition::Alias {
                dialect: SqlDialect::Sqlite
            }
        );

        let err = load_symbol::<DatabaseDefinition>(&path, "DatabaseConnection_Other").unwrap_err();
        assert!(err.to_string().contains("symbol not found"));

        let err = load_symbol::<DatabaseDefinition>(&path, "Other").unwrap_err();
        assert!(err.to_string().contains("invalid definition"));
    }

    #[test]
    fn test_load_symbol_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugin_Bad.yaml");
        std::fs::write(&path, "- just\n- a list\n").unwrap();
        let err = load_symbol::<DatabaseDefinition>(&path, "DatabaseConnection_Bad").unwrap_err();
        assert!(matches!(err, RegistryError::PluginLoad { .. }));
        assert!(err.to_string().contains("malformed"));
    }
}
