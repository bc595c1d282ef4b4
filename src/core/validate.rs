//! Identifier and table-name validation.
//!
//! Both session ids and table names are restricted to ASCII word
//! characters. Table names are interpolated into SQL text, so this check is
//! the only thing standing between configuration and the query string.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Result, SessionError};

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("word pattern is valid"));

/// Whether `value` is a non-empty run of `[A-Za-z0-9_]`.
pub fn is_word(value: &str) -> bool {
    WORD.is_match(value)
}

/// Validate a session identifier.
pub fn validate_session_id(id: &str) -> Result<()> {
    if is_word(id) {
        Ok(())
    } else {
        Err(SessionError::invalid_identifier(id))
    }
}

/// Validate a table name.
pub fn validate_table_name(table: &str) -> Result<()> {
    if table.is_empty() {
        return Err(SessionError::config("table name is not set"));
    }
    if !is_word(table) {
        return Err(SessionError::config(format!(
            "table name {table:?} must contain only letters, digits and underscores"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_word_ids() {
        for id in ["abc123", "A", "_", "sess_0f3a9c", "0123456789abcdef"] {
            assert!(validate_session_id(id).is_ok(), "{id} should be valid");
        }
    }

    #[test]
    fn test_rejects_non_word_ids() {
        for id in ["", "abc'", "a/b", "a b", "a-b", "a.b", "abc\n", "é"] {
            let err = validate_session_id(id).unwrap_err();
            assert!(
                matches!(err, SessionError::InvalidIdentifier { .. }),
                "{id:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_table_name_rules() {
        assert!(validate_table_name("sess").is_ok());
        assert!(validate_table_name("web_sessions_2").is_ok());
        assert!(matches!(
            validate_table_name(""),
            Err(SessionError::Config { .. })
        ));
        assert!(matches!(
            validate_table_name("sess; DROP TABLE users"),
            Err(SessionError::Config { .. })
        ));
        assert!(matches!(
            validate_table_name("public.sess"),
            Err(SessionError::Config { .. })
        ));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // Any run of word characters is accepted.
            #[test]
            fn prop_word_ids_accepted(id in "[A-Za-z0-9_]{1,64}") {
                prop_assert!(validate_session_id(&id).is_ok());
            }

            // A single foreign character anywhere is enough to reject.
            #[test]
            fn prop_foreign_char_rejected(
                prefix in "[A-Za-z0-9_]{0,16}",
                bad in "[^A-Za-z0-9_]",
                suffix in "[A-Za-z0-9_]{0,16}",
            ) {
                let id = format!("{prefix}{bad}{suffix}");
                prop_assert!(validate_session_id(&id).is_err());
            }
        }
    }
}
