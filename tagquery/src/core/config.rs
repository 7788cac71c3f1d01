use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::filter::{CompilerConfig, Filter, LikeMode, Sanitizer};
use crate::sql::Dialect;
use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_MAX_DEPTH, MAX_DEPTH_LIMIT};

// =============================================================================
// File Configuration
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CompilerFileConfig {
    pub max_depth: Option<usize>,
    pub like_mode: Option<LikeMode>,
    pub fold_case: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SqlFileConfig {
    pub dialect: Option<Dialect>,
    /// Allow-list for ORDER BY keys
    pub sortable: Option<Vec<String>>,
    pub default_sort: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SanitizeFileConfig {
    pub allow: Option<Vec<String>>,
    pub deny: Option<Vec<String>>,
    pub defaults: Option<Filter>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub compiler: Option<CompilerFileConfig>,
    pub sql: Option<SqlFileConfig>,
    pub sanitize: Option<SanitizeFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(compiler) = other.compiler {
            let current = self
                .compiler
                .get_or_insert_with(CompilerFileConfig::default);
            if compiler.max_depth.is_some() {
                tracing::trace!(max_depth = ?compiler.max_depth, "Merging compiler.max_depth");
                current.max_depth = compiler.max_depth;
            }
            if compiler.like_mode.is_some() {
                tracing::trace!(like_mode = ?compiler.like_mode, "Merging compiler.like_mode");
                current.like_mode = compiler.like_mode;
            }
            if compiler.fold_case.is_some() {
                current.fold_case = compiler.fold_case;
            }
        }

        if let Some(sql) = other.sql {
            let current = self.sql.get_or_insert_with(SqlFileConfig::default);
            if sql.dialect.is_some() {
                tracing::trace!(dialect = ?sql.dialect, "Merging sql.dialect");
                current.dialect = sql.dialect;
            }
            if sql.sortable.is_some() {
                current.sortable = sql.sortable;
            }
            if sql.default_sort.is_some() {
                current.default_sort = sql.default_sort;
            }
        }

        // Lists replace rather than extend, so an overlay can narrow them
        if let Some(sanitize) = other.sanitize {
            let current = self
                .sanitize
                .get_or_insert_with(SanitizeFileConfig::default);
            if sanitize.allow.is_some() {
                current.allow = sanitize.allow;
            }
            if sanitize.deny.is_some() {
                current.deny = sanitize.deny;
            }
            if sanitize.defaults.is_some() {
                current.defaults = sanitize.defaults;
            }
        }
    }
}

// =============================================================================
// Resolved Configuration
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct SqlConfig {
    pub dialect: Dialect,
    pub sortable: Option<Vec<String>>,
    pub default_sort: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SanitizeConfig {
    pub allow: Option<Vec<String>>,
    pub deny: Option<Vec<String>>,
    pub defaults: Filter,
}

impl SanitizeConfig {
    /// Build a sanitizer from these lists on top of a base sanitizer
    pub fn apply_to(&self, mut sanitizer: Sanitizer) -> Sanitizer {
        if let Some(allow) = &self.allow {
            sanitizer = sanitizer.allow(allow.iter().cloned());
        }
        if let Some(deny) = &self.deny {
            sanitizer = sanitizer.deny(deny.iter().cloned());
        }
        sanitizer.defaults(self.defaults.clone())
    }
}

/// Final merged application configuration
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub compiler: CompilerConfig,
    pub sql: SqlConfig,
    pub sanitize: SanitizeConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.tagquery/tagquery.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        Self::load_with_profile(cli, get_profile_config_path())
    }

    fn load_with_profile(cli: &CliConfig, profile_path: Option<PathBuf>) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Load from profile dir - skip if not exists
        if let Some(profile_path) = profile_path
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. Load from CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        // 3. Extract file config values with defaults
        let file_compiler = file_config.compiler.unwrap_or_default();
        let file_sql = file_config.sql.unwrap_or_default();
        let file_sanitize = file_config.sanitize.unwrap_or_default();

        // 4. Layer configs: defaults -> file config -> CLI/env overrides
        let compiler = CompilerConfig {
            max_depth: cli
                .max_depth
                .or(file_compiler.max_depth)
                .unwrap_or(DEFAULT_MAX_DEPTH),
            like_mode: cli
                .like_mode
                .or(file_compiler.like_mode)
                .unwrap_or_default(),
            // --keep-case only ever disables folding
            fold_case: !cli.keep_case && file_compiler.fold_case.unwrap_or(true),
        };

        let config = Self {
            compiler,
            sql: SqlConfig {
                dialect: file_sql.dialect.unwrap_or_default(),
                sortable: file_sql.sortable,
                default_sort: file_sql.default_sort.unwrap_or_default(),
            },
            sanitize: SanitizeConfig {
                allow: file_sanitize.allow,
                deny: file_sanitize.deny,
                defaults: file_sanitize.defaults.unwrap_or_default(),
            },
        };

        config.validate()?;

        tracing::debug!(
            max_depth = config.compiler.max_depth,
            like_mode = ?config.compiler.like_mode,
            fold_case = config.compiler.fold_case,
            dialect = %config.sql.dialect,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.compiler.max_depth > MAX_DEPTH_LIMIT {
            anyhow::bail!(
                "Configuration error: compiler.max_depth must be at most {} (got {})",
                MAX_DEPTH_LIMIT,
                self.compiler.max_depth
            );
        }
        if let Some(sortable) = &self.sql.sortable
            && let Some(bad) = sortable.iter().find(|f| !crate::filter::is_safe_field(f))
        {
            anyhow::bail!("Configuration error: invalid sortable field {:?}", bad);
        }
        Ok(())
    }
}

/// Get the profile config path (~/.tagquery/tagquery.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    fn cli_with(path: &Path) -> CliConfig {
        CliConfig {
            config: Some(path.to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_file_config_parse_full() {
        let json = r#"{
            "compiler": { "max_depth": 3, "like_mode": "contains", "fold_case": false },
            "sql": { "dialect": "mysql", "sortable": ["createTime"] },
            "sanitize": { "deny": ["uid"], "defaults": { "tenant": "a" } }
        }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();

        let compiler = config.compiler.as_ref().unwrap();
        assert_eq!(compiler.max_depth, Some(3));
        assert_eq!(compiler.like_mode, Some(LikeMode::Contains));
        assert_eq!(compiler.fold_case, Some(false));
        assert_eq!(config.sql.as_ref().unwrap().dialect, Some(Dialect::Mysql));
        let sanitize = config.sanitize.as_ref().unwrap();
        assert_eq!(sanitize.deny, Some(vec!["uid".to_string()]));
        assert_eq!(sanitize.defaults.as_ref().unwrap()["tenant"], json!("a"));
    }

    #[test]
    fn test_file_config_parse_empty() {
        let config: FileConfig = serde_json::from_str("{}").unwrap();
        assert!(config.compiler.is_none());
        assert!(config.sql.is_none());
    }

    #[test]
    fn test_file_config_parse_extra_fields() {
        let json = r#"{ "sql": { "dialect": "sqlite" }, "dialekt": "mssql" }"#;
        let config: FileConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.extra.get("dialekt").unwrap(), "mssql");
    }

    #[test]
    fn test_file_config_merge() {
        let mut base: FileConfig = serde_json::from_str(
            r#"{ "compiler": { "max_depth": 2, "like_mode": "contains" }, "sql": { "dialect": "mysql" } }"#,
        )
        .unwrap();
        let overlay: FileConfig =
            serde_json::from_str(r#"{ "compiler": { "max_depth": 7 }, "sanitize": { "allow": ["a"] } }"#)
                .unwrap();
        base.merge(overlay);

        let compiler = base.compiler.as_ref().unwrap();
        assert_eq!(compiler.max_depth, Some(7));
        assert_eq!(compiler.like_mode, Some(LikeMode::Contains));
        assert_eq!(base.sql.as_ref().unwrap().dialect, Some(Dialect::Mysql));
        assert_eq!(
            base.sanitize.as_ref().unwrap().allow,
            Some(vec!["a".to_string()])
        );
    }

    #[test]
    fn test_load_defaults_without_files() {
        let config = AppConfig::load_with_profile(&CliConfig::default(), None).unwrap();
        assert_eq!(config.compiler, CompilerConfig::default());
        assert_eq!(config.sql.dialect, Dialect::Postgres);
        assert!(config.sanitize.allow.is_none());
    }

    #[test]
    fn test_load_layers_profile_file_and_cli() {
        let profile = write_config(
            r#"{ "compiler": { "max_depth": 2, "like_mode": "contains" }, "sql": { "dialect": "mysql" } }"#,
        );
        let overlay = write_config(r#"{ "compiler": { "max_depth": 4 } }"#);

        let mut cli = cli_with(overlay.path());
        let config =
            AppConfig::load_with_profile(&cli, Some(profile.path().to_path_buf())).unwrap();
        assert_eq!(config.compiler.max_depth, 4);
        assert_eq!(config.compiler.like_mode, LikeMode::Contains);
        assert_eq!(config.sql.dialect, Dialect::Mysql);
        assert!(config.compiler.fold_case);

        cli.max_depth = Some(1);
        cli.like_mode = Some(LikeMode::Raw);
        cli.keep_case = true;
        let config =
            AppConfig::load_with_profile(&cli, Some(profile.path().to_path_buf())).unwrap();
        assert_eq!(config.compiler.max_depth, 1);
        assert_eq!(config.compiler.like_mode, LikeMode::Raw);
        assert!(!config.compiler.fold_case);
    }

    #[test]
    fn test_load_missing_config_file() {
        let cli = cli_with(Path::new("/nonexistent/tagquery.json"));
        let err = AppConfig::load_with_profile(&cli, None).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_invalid_json() {
        let file = write_config("{ not json");
        let err = AppConfig::load_with_profile(&cli_with(file.path()), None).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_validate_rejects_deep_and_unsafe() {
        let file = write_config(r#"{ "compiler": { "max_depth": 1000 } }"#);
        assert!(AppConfig::load_with_profile(&cli_with(file.path()), None).is_err());

        let file = write_config(r#"{ "sql": { "sortable": ["ok", "bad field"] } }"#);
        let err = AppConfig::load_with_profile(&cli_with(file.path()), None).unwrap_err();
        assert!(err.to_string().contains("invalid sortable field"));
    }

    #[test]
    fn test_sanitize_config_builds_sanitizer() {
        let config = SanitizeConfig {
            allow: Some(vec!["name".to_string()]),
            deny: None,
            defaults: json!({"tenant": "t1"}).as_object().cloned().unwrap(),
        };
        let mut filter = json!({"name": "a", "other": 1}).as_object().cloned().unwrap();
        config.apply_to(Sanitizer::new()).apply(&mut filter).unwrap();
        assert_eq!(
            serde_json::Value::Object(filter),
            json!({"name": "a", "tenant": "t1"})
        );
    }
}
