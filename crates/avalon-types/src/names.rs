//! Document name validation.
//!
//! Valid identifiers (subset names, plug-in names):
//! - Must be non-empty
//! - Must contain only ASCII alphanumerics and `_`
//! - Must not start with a digit
//!
//! Valid asset names:
//! - Must be non-empty
//! - Must not contain whitespace or path separators (`/`, `\`)
//! - Must not be `.` or `..`

use crate::error::{Result, TypeError};

/// Characters that are forbidden anywhere in an asset name.
const FORBIDDEN_ASSET_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Validate a generic identifier, reporting failures as `kind`.
fn check_identifier(kind: &'static str, name: &str) -> Result<()> {
    let invalid = |reason: &str| TypeError::InvalidName {
        kind,
        name: name.to_string(),
        reason: reason.into(),
    };

    let Some(first) = name.chars().next() else {
        return Err(invalid("must not be empty"));
    };
    if first.is_ascii_digit() {
        return Err(invalid("must not start with a digit"));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(invalid(&format!("contains forbidden character: {ch:?}")));
    }
    Ok(())
}

/// Validate an identifier, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use avalon_types::names::validate_identifier;
///
/// assert!(validate_identifier("modelDefault").is_ok());
/// assert!(validate_identifier("_private").is_ok());
/// assert!(validate_identifier("3d").is_err());
/// assert!(validate_identifier("model Default").is_err());
/// ```
pub fn validate_identifier(name: &str) -> Result<()> {
    check_identifier("identifier", name)
}

/// Validate a subset name. Subset names are identifiers.
pub fn validate_subset_name(name: &str) -> Result<()> {
    check_identifier("subset", name)
}

/// Validate an asset name.
pub fn validate_asset_name(name: &str) -> Result<()> {
    let invalid = |reason: String| TypeError::InvalidName {
        kind: "asset",
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("must not be empty".into()));
    }
    if name == "." || name == ".." {
        return Err(invalid("must not be a relative path component".into()));
    }
    if let Some(ch) = name.chars().find(|c| c.is_whitespace()) {
        return Err(invalid(format!("contains whitespace: {ch:?}")));
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN_ASSET_CHARS.contains(c)) {
        return Err(invalid(format!("contains forbidden character: {ch:?}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn valid_identifiers() {
        for name in ["modelDefault", "rig_main", "_hidden", "a1"] {
            assert!(validate_identifier(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn invalid_identifiers() {
        for name in ["", "1model", "model Default", "model-default", "modèle"] {
            assert!(validate_identifier(name).is_err(), "{name} should be invalid");
        }
    }

    #[test]
    fn subset_errors_name_the_kind() {
        let err = validate_subset_name("model Default").unwrap_err();
        assert!(matches!(err, TypeError::InvalidName { kind: "subset", .. }));
        assert!(err.to_string().contains("subset"));
    }

    #[test]
    fn asset_names() {
        assert!(validate_asset_name("bruce").is_ok());
        assert!(validate_asset_name("sh010-bg").is_ok());
        assert!(validate_asset_name("").is_err());
        assert!(validate_asset_name("..").is_err());
        assert!(validate_asset_name("bruce wayne").is_err());
        assert!(validate_asset_name("char/bruce").is_err());
    }

    proptest! {
        #[test]
        fn generated_identifiers_validate(name in "[A-Za-z_][A-Za-z0-9_]{0,24}") {
            prop_assert!(validate_identifier(&name).is_ok());
        }

        #[test]
        fn names_with_spaces_never_validate(a in "[a-z]{1,8}", b in "[a-z]{1,8}") {
            let name = format!("{a} {b}");
            prop_assert!(validate_subset_name(&name).is_err());
            prop_assert!(validate_asset_name(&name).is_err());
        }
    }
}
