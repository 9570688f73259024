//! Configuration template generation

use std::fs;
use std::path::Path;

/// Generate a configuration file with comments explaining each field
pub fn generate_commented_config_template<P: AsRef<Path>>(path: P) -> std::io::Result<()> {
    let toml_str = r#"# wifipos configuration
# Every value below is the built-in default; delete what you do not change.

# Log filter (error, warn, info, debug, trace). WIFIPOS_LOG overrides it.
log_level = "info"

[engine]
# Shards launched per request once the dataset exceeds partition_threshold.
# Overridden by the THREAD_NUM environment variable.
worker_count = 3

# A candidate survives when its overlap count is strictly greater than
# (largest overlap in its shard) * margin. Must be in (0, 1].
margin = 0.6

# Number of best-ranked candidates taking part in the majority vote.
top_k = 4

# Datasets with at most this many records are scored as a single shard.
partition_threshold = 3

# Per-request deadline in milliseconds (0 disables it).
request_timeout_ms = 5000

[server]
# Address the HTTP API listens on (WIFIPOS_BIND).
bind_addr = "0.0.0.0:8080"

[storage]
# SQLite fingerprint database (WIFIPOS_DB_PATH).
# Defaults to <data dir>/wifipos/fingerprints.db when unset.
# db_path = "fingerprints.db"

[auth]
# Upload password hash written by `wifipos passwd` (WIFIPOS_PASSWORD_FILE).
# When the file does not exist, /add accepts any password.
password_file = "password.json"
"#;

    if let Some(parent) = path.as_ref().parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, toml_str)
}
