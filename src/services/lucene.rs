//! Escape a user query for the graph store's Lucene-backed full-text index,
//! per the term-splitting and prefix-matching convention the catalog's
//! autocomplete endpoint relies on.

const SPECIAL: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\', '/',
];

fn escape_term(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Build a Lucene query string: escape special characters in each whitespace
/// token, suffix each with `*` for prefix matching, join with ` AND `.
pub fn build_query(q: &str) -> String {
    q.split_whitespace()
        .map(|term| format!("{}*", escape_term(term)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_special_characters() {
        assert_eq!(escape_term("a+b"), "a\\+b");
        assert_eq!(escape_term("(test)"), "\\(test\\)");
    }

    #[test]
    fn single_term_gets_prefix_star() {
        assert_eq!(build_query("radio"), "radio*");
    }

    #[test]
    fn multiple_terms_joined_with_and() {
        assert_eq!(build_query("radio head"), "radio* AND head*");
    }

    #[test]
    fn special_characters_escaped_before_prefix_star() {
        assert_eq!(build_query("ac/dc"), "ac\\/dc*");
    }
}
