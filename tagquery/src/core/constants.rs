// =============================================================================
// Application Identity
// =============================================================================

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME: &str = "tagquery";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".tagquery";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "tagquery.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "TAGQUERY_CONFIG";

// =============================================================================
// Environment Variables
// =============================================================================

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "TAGQUERY_LOG";

/// Environment variable for the SQL dialect
pub const ENV_DIALECT: &str = "TAGQUERY_DIALECT";

/// Environment variable for the maximum filter nesting depth
pub const ENV_MAX_DEPTH: &str = "TAGQUERY_MAX_DEPTH";

/// Environment variable for the LIKE operand mode
pub const ENV_LIKE_MODE: &str = "TAGQUERY_LIKE_MODE";

// =============================================================================
// Logging
// =============================================================================

/// Filter used when neither `TAGQUERY_LOG` nor `RUST_LOG` is set
pub const DEFAULT_LOG_FILTER: &str = "warn,tagquery=info";

// =============================================================================
// Filter Limits
// =============================================================================

/// Default maximum nesting depth (top level is depth 0)
pub const DEFAULT_MAX_DEPTH: usize = 5;

/// Hard upper bound accepted for a configured depth
pub const MAX_DEPTH_LIMIT: usize = 64;

/// Maximum accepted filter JSON size in bytes
pub const MAX_FILTER_JSON_SIZE: usize = 256 * 1024;
