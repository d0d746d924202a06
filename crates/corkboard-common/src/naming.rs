/// Maximum length, in characters, of a board name and of its URL slug.
pub const BOARD_NAME_MAX_LEN: usize = 50;

/// Trim a user-supplied title and cap it at [`BOARD_NAME_MAX_LEN`] characters.
pub fn normalize_board_name(title: &str) -> String {
    title.trim().chars().take(BOARD_NAME_MAX_LEN).collect()
}

/// Convert a board name to a URL-safe slug, limited to `max_len` characters.
///
/// Every run of characters outside `[a-z0-9]` (after lowercasing) becomes a
/// single `-`; leading and trailing dashes are dropped.
pub fn slugify(name: &str, max_len: usize) -> String {
    let slug = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    // Slug is pure ASCII here, so byte slicing is on a char boundary.
    if slug.len() > max_len {
        slug[..max_len].trim_end_matches('-').to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_collapses_separators() {
        assert_eq!(slugify("Q3 Roadmap -- Final!", 50), "q3-roadmap-final");
        assert_eq!(slugify("  leading and trailing  ", 50), "leading-and-trailing");
    }

    #[test]
    fn test_slugify_drops_non_ascii_letters() {
        assert_eq!(slugify("Café Über", 50), "caf-ber");
        assert_eq!(slugify("日本語", 50), "");
    }

    #[test]
    fn test_slugify_truncates_without_trailing_dash() {
        let slug = slugify("abcd efgh", 5);
        assert_eq!(slug, "abcd");
        assert_eq!(slugify(&"x".repeat(80), BOARD_NAME_MAX_LEN).len(), 50);
    }

    #[test]
    fn test_normalize_board_name_trims_and_caps() {
        assert_eq!(normalize_board_name("  Sprint board \n"), "Sprint board");
        let long = "é".repeat(60);
        assert_eq!(normalize_board_name(&long).chars().count(), BOARD_NAME_MAX_LEN);
    }
}
