// Configuration keys owned by the server

pub const DEFAULT_CONFIG_PATH: &str = "conf/application.yml";

/// Process-wide key for secure bootstrap
pub const BOOTSTRAP_ENCRYPTION_KEY: &str = "provis.bootstrap.encryption.key";
/// Marks an encryption key given as hex instead of raw bytes
pub const HEX_KEY_PREFIX: &str = "hex:";

pub const LOGS_PATH: &str = "provis.logs.path";
pub const LOGS_LEVEL: &str = "provis.logs.level";
pub const DEFAULT_LOGS_LEVEL: &str = "info";
pub const LOGS_CONSOLE: &str = "provis.logs.console";
pub const LOGS_FILE: &str = "provis.logs.file";
