/// Identifier validation helpers

/// Allow-list check for SQL identifiers that end up interpolated into DDL
/// (database names cannot be bound as parameters). Identifiers come from
/// configuration or internal constants, never from request input, and
/// anything outside `[a-z_][a-z0-9_]*` is refused.
pub fn is_safe_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_identifiers() {
        assert!(is_safe_identifier("documents"));
        assert!(is_safe_identifier("document_access"));
        assert!(is_safe_identifier("_scratch"));
        assert!(is_safe_identifier("db2"));
    }

    #[test]
    fn test_unsafe_identifiers() {
        assert!(!is_safe_identifier(""));
        assert!(!is_safe_identifier("2documents"));
        assert!(!is_safe_identifier("Documents"));
        assert!(!is_safe_identifier("documents; DROP TABLE documents"));
        assert!(!is_safe_identifier("docs\"--"));
        assert!(!is_safe_identifier("docs'"));
        assert!(!is_safe_identifier("docs name"));
    }
}
