#[cfg(test)]
mod tests {
    use super::*;

    // === validate tests ===

    #[test]
    fn accepts_library_document() {
        assert!(validate("Library://Data/Roads.FeatureSource").is_ok());
    }

    #[test]
    fn accepts_nested_library_document() {
        assert!(validate("Library://Projects/City/Base Map.MapDefinition").is_ok());
    }

    #[test]
    fn accepts_library_folder() {
        assert!(validate("Library://").is_ok());
        assert!(validate("Library://Data/").is_ok());
        assert!(validate("Library://Data/Imported/").is_ok());
    }

    #[test]
    fn accepts_session_document() {
        let id = "Session:78a2e5c0-1f4b-4d09-9d38-1df07893e2ab//Scratch/Preview.LayerDefinition";
        assert!(validate(id).is_ok());
    }

    #[test]
    fn accepts_session_folder() {
        assert!(validate("Session:78a2e5c0//Scratch/").is_ok());
    }

    #[test]
    fn rejects_missing_root() {
        assert!(validate("Data/Roads.FeatureSource").is_err());
    }

    #[test]
    fn rejects_document_without_type_suffix() {
        assert!(validate("Library://Data/Roads").is_err());
    }

    #[test]
    fn rejects_folder_with_type_suffix() {
        // A trailing slash marks a folder; folders carry no type suffix,
        // so a dotted final segment makes this a document with a bogus path.
        assert!(validate("Library://Data.FeatureSource/").is_err());
    }

    #[test]
    fn rejects_recursive_root_in_path() {
        assert!(validate("Library://Data/Library://Roads.FeatureSource").is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(validate("").is_err());
    }

    // === predicate tests ===

    #[test]
    fn folder_predicate_follows_trailing_slash() {
        assert!(is_folder("Library://Data/"));
        assert!(!is_folder("Library://Data/Roads.FeatureSource"));
    }

    #[test]
    fn root_predicates() {
        assert!(is_library("Library://Data/"));
        assert!(!is_library("Session:abc//Data/"));
        assert!(is_session("Session:abc//Data/"));
    }

    #[test]
    fn extracts_session_id() {
        assert_eq!(
            session_id("Session:78a2e5c0-1f4b//Scratch/Preview.LayerDefinition"),
            Some("78a2e5c0-1f4b")
        );
        assert_eq!(session_id("Library://Data/"), None);
    }

    // === type_name tests ===

    #[test]
    fn type_name_is_suffix_after_final_dot() {
        assert_eq!(
            type_name("Library://Data/Roads.FeatureSource"),
            Some("FeatureSource")
        );
        assert_eq!(
            type_name("Library://Data/roads.v2.LayerDefinition"),
            Some("LayerDefinition")
        );
    }

    #[test]
    fn folders_have_no_type_name() {
        assert_eq!(type_name("Library://Data/"), None);
    }

    // === resource_name tests ===

    #[test]
    fn name_without_path_is_last_segment() {
        let name = resource_name("Library://Data/Roads.FeatureSource", false).unwrap();
        assert_eq!(name, "Roads");
    }

    #[test]
    fn name_with_path_spans_from_root_separator() {
        let name = resource_name("Library://Data/Roads.FeatureSource", true).unwrap();
        assert_eq!(name, "Data/Roads");
    }

    #[test]
    fn name_of_folder_is_an_error() {
        assert!(resource_name("Library://Data/", false).is_err());
    }

    // === construction tests ===

    #[test]
    fn builds_library_identifier() {
        assert_eq!(
            library_id("Data/Roads", "FeatureSource"),
            "Library://Data/Roads.FeatureSource"
        );
    }

    #[test]
    fn builds_session_identifier() {
        assert_eq!(
            session_resource_id("78a2e5c0", "Scratch/Preview", "LayerDefinition"),
            "Session:78a2e5c0//Scratch/Preview.LayerDefinition"
        );
    }

    #[test]
    fn minted_session_ids_build_valid_identifiers() {
        let session = mint_session_id();
        let id = session_resource_id(&session, "Scratch/Preview", "LayerDefinition");
        assert!(validate(&id).is_ok(), "invalid id built: {}", id);
    }

    // === fix_folder_path tests ===

    #[test]
    fn appends_missing_trailing_slash() {
        assert_eq!(fix_folder_path("Library://Data").unwrap(), "Library://Data/");
    }

    #[test]
    fn keeps_existing_trailing_slash() {
        assert_eq!(fix_folder_path("Library://Data/").unwrap(), "Library://Data/");
    }

    #[test]
    fn keeps_library_root_intact() {
        assert_eq!(fix_folder_path("Library://").unwrap(), "Library://");
    }

    #[test]
    fn accepts_session_folder_path() {
        assert_eq!(
            fix_folder_path("Session:78a2e5c0//Scratch").unwrap(),
            "Session:78a2e5c0//Scratch/"
        );
    }

    #[test]
    fn rejects_rootless_folder_path() {
        assert!(fix_folder_path("Data/Imported").is_err());
    }
}

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

/// Root prefix of the permanent repository.
pub const LIBRARY_ROOT: &str = "Library://";

/// Root prefix of connection-scoped repositories, followed by `<id>//`.
pub const SESSION_SCHEME: &str = "Session:";

// Compile grammar once, reuse across calls. Path segments exclude ':' so a
// root prefix can never recur inside the path component, and folder segments
// exclude '.' so a folder is never mistaken for a typed document.
static DOCUMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:Library://|Session:[^/:]+//)(?:[^/:.]+/)*[^/:]+\.[A-Za-z][A-Za-z0-9]*$")
        .unwrap()
});

static FOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:Library://|Session:[^/:]+//)(?:[^/:.]+/)*$").unwrap()
});

static FOLDER_ROOT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:Library://|Session:[^/:]+//)").unwrap());

/// Validate an identifier against the grammar. Only the string is checked,
/// not the existence of the resource.
pub fn validate(id: &str) -> Result<()> {
    if DOCUMENT_RE.is_match(id) || FOLDER_RE.is_match(id) {
        Ok(())
    } else {
        Err(Error::InvalidIdentifier {
            id: id.to_string(),
            reason: "must be a Library:// or Session:<id>// document or folder path",
        })
    }
}

/// True when the identifier denotes a folder (trailing slash, no type suffix).
pub fn is_folder(id: &str) -> bool {
    id.ends_with('/')
}

pub fn is_library(id: &str) -> bool {
    id.starts_with(LIBRARY_ROOT)
}

pub fn is_session(id: &str) -> bool {
    id.starts_with(SESSION_SCHEME)
}

/// The `<id>` part of a `Session:<id>//...` identifier.
pub fn session_id(id: &str) -> Option<&str> {
    let rest = id.strip_prefix(SESSION_SCHEME)?;
    let end = rest.find("//")?;
    Some(&rest[..end])
}

/// The type suffix of a document identifier, e.g. "FeatureSource".
pub fn type_name(id: &str) -> Option<&str> {
    if is_folder(id) {
        return None;
    }
    let last_slash = id.rfind('/')?;
    let dot = id.rfind('.')?;
    if dot <= last_slash {
        return None;
    }
    Some(&id[dot + 1..])
}

/// The name of a document, without the root prefix or the type suffix.
///
/// With `include_path` the name spans from the root separator (`//`), so
/// `Library://Data/Roads.FeatureSource` yields `Data/Roads`; without it only
/// the final segment, `Roads`.
pub fn resource_name(id: &str, include_path: bool) -> Result<&str> {
    let invalid = || Error::InvalidIdentifier {
        id: id.to_string(),
        reason: "cannot extract a resource name",
    };

    let begin = if include_path {
        id.find("//").ok_or_else(invalid)? + 2
    } else {
        id.rfind('/').ok_or_else(invalid)? + 1
    };
    let end = id.rfind('.').ok_or_else(invalid)?;
    if end < begin {
        return Err(invalid());
    }
    Ok(&id[begin..end])
}

/// Build a library document identifier from a bare path and a type name.
pub fn library_id(path: &str, type_name: &str) -> String {
    format!("{LIBRARY_ROOT}{path}.{type_name}")
}

/// Build a session document identifier from a session id, a bare path and a
/// type name.
pub fn session_resource_id(session: &str, path: &str, type_name: &str) -> String {
    format!("{SESSION_SCHEME}{session}//{path}.{type_name}")
}

/// Mint a fresh session id.
pub fn mint_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Validate the root of a folder path and ensure it carries a trailing slash.
///
/// Interior and root `//` are significant in the grammar, so only a missing
/// final slash is repaired; nothing is collapsed.
pub fn fix_folder_path(path: &str) -> Result<String> {
    if !FOLDER_ROOT_RE.is_match(path) {
        return Err(Error::InvalidIdentifier {
            id: path.to_string(),
            reason: "folder path must start with Library:// or Session:<id>//",
        });
    }
    if path.ends_with('/') {
        Ok(path.to_string())
    } else {
        Ok(format!("{path}/"))
    }
}
