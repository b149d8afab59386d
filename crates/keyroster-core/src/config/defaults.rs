//! Default configuration values

/// Configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "keyroster.toml";

/// Hidden alternative
pub const ALT_CONFIG_FILE: &str = ".keyroster.toml";

/// Default gpg binary
pub const DEFAULT_GPG_PATH: &str = "gpg";

/// Default console log level
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Config file names to look for, in order
pub fn config_file_names() -> Vec<&'static str> {
    vec![DEFAULT_CONFIG_FILE, ALT_CONFIG_FILE]
}
