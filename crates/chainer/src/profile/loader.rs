// ABOUTME: Loader for source profile registries from embedded JSON data and user files.
// ABOUTME: Provides load_builtin_registry() and load_registry_file() for the ProfileRegistry.

//! Source profile registry loader.
//!
//! The built-in profiles ship as JSON embedded in the binary. Additional
//! profiles can be read from a JSON file at run time; a user profile with the
//! same id as a built-in one replaces it.

use std::path::Path;

use tracing::debug;

use crate::error::ChainError;
use crate::profile::{ProfileRegistry, SourceProfile};

/// Embedded JSON containing the built-in source profiles.
const BUILTIN_PROFILES_JSON: &str = include_str!("../../data/profiles.json");

/// Loads the builtin profile registry from embedded JSON.
pub fn load_builtin_registry() -> Result<ProfileRegistry, ChainError> {
    let mut registry = ProfileRegistry::new();
    extend_from_json(&mut registry, BUILTIN_PROFILES_JSON, "<builtin>")?;
    Ok(registry)
}

/// Reads profiles from `path` into `registry`, replacing same-id entries.
///
/// The file holds either a single profile object or an array of profiles.
pub fn load_registry_file(registry: &mut ProfileRegistry, path: &Path) -> Result<usize, ChainError> {
    let origin = path.display().to_string();
    let json = std::fs::read_to_string(path)
        .map_err(|e| ChainError::io(origin.clone(), "read profiles", e))?;
    extend_from_json(registry, &json, &origin)
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ProfileFile {
    Many(Vec<SourceProfile>),
    One(Box<SourceProfile>),
}

fn extend_from_json(
    registry: &mut ProfileRegistry,
    json: &str,
    origin: &str,
) -> Result<usize, ChainError> {
    let parsed: ProfileFile = serde_json::from_str(json)
        .map_err(|e| ChainError::profile(origin, "parse profiles", Some(e.into())))?;
    let profiles = match parsed {
        ProfileFile::Many(list) => list,
        ProfileFile::One(profile) => vec![*profile],
    };

    let count = profiles.len();
    for profile in profiles {
        if profile.id.is_empty() {
            return Err(ChainError::profile(
                origin,
                "parse profiles",
                Some(anyhow::anyhow!("profile without an id")),
            ));
        }
        debug!(id = %profile.id, origin, "registering profile");
        registry.register(profile);
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::compiled::CompiledProfile;
    use crate::profile::NotesMode;
    use std::io::Write;

    #[test]
    fn load_builtin_registry_succeeds() {
        let registry = load_builtin_registry().expect("builtin profiles");
        let ids: Vec<_> = registry.ids().collect();
        assert_eq!(ids, vec!["SICP", "T5D", "Unsong"]);
    }

    #[test]
    fn builtin_profiles_compile() {
        let registry = load_builtin_registry().expect("builtin profiles");
        for profile in registry.iter() {
            let id = profile.id.clone();
            if let Err(err) = CompiledProfile::compile(profile.clone()) {
                panic!("profile {} does not compile: {}", id, err);
            }
        }
    }

    #[test]
    fn builtin_unsong_has_notes_policy() {
        let registry = load_builtin_registry().expect("builtin profiles");
        let unsong = registry.get("Unsong").expect("Unsong profile");
        let notes = unsong.notes.as_ref().expect("notes policy");
        assert_eq!(notes.default_mode, NotesMode::Interleave);
        assert!(unsong.title_separate);

        let compiled = CompiledProfile::compile(unsong.clone()).expect("compile");
        assert!(compiled.is_notes("Author's Note 3: Questions"));
        assert!(!compiled.is_notes("Chapter 1: Dark Satanic Mills"));
    }

    #[test]
    fn builtin_sicp_uses_relative_links() {
        let registry = load_builtin_registry().expect("builtin profiles");
        let sicp = registry.get("SICP").expect("SICP profile");
        assert!(sicp.base_url.is_some());
        assert!(!sicp.title_separate);
        assert_eq!(sicp.output_file_for(None), "StructInterprCompProg.html");
        assert_eq!(sicp.title, vec!["h1", "h2"]);
    }

    #[test]
    fn user_file_overrides_builtin() {
        let mut registry = load_builtin_registry().expect("builtin profiles");
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"[{{"id": "T5D", "name": "Replaced", "start_url": "https://example.com/1"}},
                {{"id": "Extra", "name": "Extra", "start_url": "https://example.com/x"}}]"#
        )
        .expect("write");

        let added = load_registry_file(&mut registry, file.path()).expect("load");
        assert_eq!(added, 2);
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.get("T5D").map(|p| p.name.as_str()), Some("Replaced"));
    }

    #[test]
    fn single_object_file_is_accepted() {
        let mut registry = ProfileRegistry::new();
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{"id": "Solo", "name": "Solo", "start_url": "https://example.com/1"}}"#
        )
        .expect("write");
        assert_eq!(load_registry_file(&mut registry, file.path()).expect("load"), 1);
        assert!(registry.get("Solo").is_some());
    }

    #[test]
    fn malformed_and_missing_files_fail() {
        let mut registry = ProfileRegistry::new();
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, "{{ not json").expect("write");
        let err = load_registry_file(&mut registry, file.path()).expect_err("malformed");
        assert!(err.is_profile());

        let err = load_registry_file(&mut registry, Path::new("/nonexistent/profiles.json"))
            .expect_err("missing");
        assert!(err.is_io());
    }
}
