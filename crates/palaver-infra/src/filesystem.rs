//! Data directory layout.
//!
//! ```text
//! {data_dir}/
//!   config.toml
//!   sessions/
//!     {safe_channel_id}/
//!       session.jsonl
//! ```

use std::path::{Path, PathBuf};

/// File name of a channel's session log.
pub const SESSION_FILE: &str = "session.jsonl";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `PALAVER_DATA_DIR` environment variable
/// 2. `~/.palaver`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PALAVER_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".palaver");
    }

    PathBuf::from(".palaver")
}

/// Map a channel id onto a single safe path component.
///
/// ASCII alphanumerics, `-` and `_` pass through; everything else becomes `_`.
pub fn safe_channel_id(channel_id: &str) -> String {
    let safe: String = channel_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if safe.is_empty() { "_".to_string() } else { safe }
}

pub fn sessions_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("sessions")
}

/// `{data_dir}/sessions/{safe_channel_id}/`
pub fn channel_dir(data_dir: &Path, channel_id: &str) -> PathBuf {
    sessions_dir(data_dir).join(safe_channel_id(channel_id))
}

/// `{data_dir}/sessions/{safe_channel_id}/session.jsonl`
pub fn session_path(data_dir: &Path, channel_id: &str) -> PathBuf {
    channel_dir(data_dir, channel_id).join(SESSION_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_channel_id() {
        assert_eq!(safe_channel_id("1234567890"), "1234567890");
        assert_eq!(safe_channel_id("dm-user_1"), "dm-user_1");
        assert_eq!(safe_channel_id("../../etc"), "______etc");
        assert_eq!(safe_channel_id("a/b c"), "a_b_c");
        assert_eq!(safe_channel_id(""), "_");
    }

    #[test]
    fn test_session_path_layout() {
        let data_dir = PathBuf::from("/home/user/.palaver");
        assert_eq!(
            session_path(&data_dir, "42"),
            PathBuf::from("/home/user/.palaver/sessions/42/session.jsonl")
        );
    }

    #[test]
    fn test_resolve_data_dir_from_env() {
        // SAFETY: This test is single-threaded and restores the env var immediately.
        unsafe {
            std::env::set_var("PALAVER_DATA_DIR", "/tmp/test-palaver");
        }
        let dir = resolve_data_dir();
        assert_eq!(dir, PathBuf::from("/tmp/test-palaver"));
        unsafe {
            std::env::remove_var("PALAVER_DATA_DIR");
        }
    }
}
