//! CLI subcommand implementations.

pub mod config_cmd;
pub mod gateway;
pub mod knowledge;
pub mod reply;

use chatwright_core::Error;
use chatwright_core::profile::BotProfile;
use std::path::Path;

/// Read a bot profile snapshot as exported by the dashboard.
pub fn load_profile(path: &Path) -> chatwright_core::Result<BotProfile> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let profile: BotProfile = serde_json::from_str(&raw)?;
    profile.validate()?;
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn profile_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn missing_profile_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = load_profile(&path).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("absent.json"));
    }

    #[test]
    fn malformed_profile_is_a_serialization_error() {
        let file = profile_file("{ not json");
        let err = load_profile(file.path()).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn profile_without_id_is_a_generation_error() {
        let file = profile_file(r#"{"id": "  ", "name": "Bot", "updatedAt": "2026-01-02T03:04:05Z"}"#);
        let err = load_profile(file.path()).unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }
}
