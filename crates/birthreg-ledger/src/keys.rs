//! Composite key encoding.
//!
//! A composite key is laid out as:
//!
//! ```text
//! U+0000 objectType U+0000 attr1 U+0000 attr2 U+0000 ...
//! ```
//!
//! The leading separator keeps composite keys out of the simple-key space,
//! and the trailing separator after each attribute makes prefix scans over
//! partial attribute lists unambiguous.
//!
//! Rules for every component:
//! - Must not contain `U+0000` (the separator)
//! - Must not contain `U+10FFFF` (reserved as the range-scan upper bound)
//! - The object type must be non-empty

use crate::error::{LedgerError, LedgerResult};

/// Separator between composite key components.
pub const COMPOSITE_KEY_SEPARATOR: char = '\u{0000}';

/// Highest Unicode scalar value; reserved as the end-of-range marker.
pub const MAX_UNICODE_RUNE: char = '\u{10FFFF}';

/// Build a composite key from an object type and its attributes.
///
/// # Examples
///
/// ```
/// use birthreg_ledger::keys::create_composite_key;
///
/// let key = create_composite_key("BirthRecord", &["R1"]).unwrap();
/// assert_eq!(key, "\u{0}BirthRecord\u{0}R1\u{0}");
/// assert!(create_composite_key("", &["R1"]).is_err());
/// ```
pub fn create_composite_key(object_type: &str, attributes: &[&str]) -> LedgerResult<String> {
    if object_type.is_empty() {
        return Err(LedgerError::InvalidCompositeKey {
            component: String::new(),
            reason: "object type must not be empty".into(),
        });
    }
    validate_component(object_type)?;

    let capacity = 2 + object_type.len() + attributes.iter().map(|a| a.len() + 1).sum::<usize>();
    let mut key = String::with_capacity(capacity);
    key.push(COMPOSITE_KEY_SEPARATOR);
    key.push_str(object_type);
    key.push(COMPOSITE_KEY_SEPARATOR);
    for attribute in attributes {
        validate_component(attribute)?;
        key.push_str(attribute);
        key.push(COMPOSITE_KEY_SEPARATOR);
    }
    Ok(key)
}

/// Split a composite key back into its object type and attributes.
pub fn split_composite_key(key: &str) -> LedgerResult<(String, Vec<String>)> {
    let body = key
        .strip_prefix(COMPOSITE_KEY_SEPARATOR)
        .and_then(|rest| rest.strip_suffix(COMPOSITE_KEY_SEPARATOR))
        .ok_or_else(|| LedgerError::InvalidKey(format!("not a composite key: {key:?}")))?;

    let mut parts = body.split(COMPOSITE_KEY_SEPARATOR).map(str::to_string);
    let object_type = parts
        .next()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| LedgerError::InvalidKey("composite key has no object type".into()))?;
    Ok((object_type, parts.collect()))
}

/// Whether a key lives in the composite key space.
pub fn is_composite_key(key: &str) -> bool {
    key.starts_with(COMPOSITE_KEY_SEPARATOR)
}

fn validate_component(component: &str) -> LedgerResult<()> {
    for reserved in [COMPOSITE_KEY_SEPARATOR, MAX_UNICODE_RUNE] {
        if component.contains(reserved) {
            return Err(LedgerError::InvalidCompositeKey {
                component: component.to_string(),
                reason: format!("contains reserved character U+{:04X}", reserved as u32),
            });
        }
    }
    Ok(())
}
