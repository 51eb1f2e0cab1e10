/// atext characters allowed besides ASCII letters and digits (RFC 5322 3.2.3).
const ATEXT_SPECIALS: &str = "!#$%&'*+-/=?^_`{|}~";

fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric() || ATEXT_SPECIALS.contains(c)
}

/// Dot-atom: runs of atext separated by single dots.
pub(crate) fn is_local_strict(s: &str) -> bool {
    !s.is_empty() && s.split('.').all(|atom| !atom.is_empty() && atom.chars().all(is_atext))
}

/// Dot-atom, or a quoted-string of printable ASCII with backslash escapes.
pub(crate) fn is_local_relaxed(s: &str) -> bool {
    match s.strip_prefix('"').and_then(|rest| rest.strip_suffix('"')) {
        Some(inner) => is_quoted_content(inner),
        None => is_local_strict(s),
    }
}

fn is_quoted_content(inner: &str) -> bool {
    let mut escaped = false;
    for c in inner.chars() {
        if !(' '..='~').contains(&c) {
            return false;
        }
        match (escaped, c) {
            (true, _) => escaped = false,
            (false, '\\') => escaped = true,
            (false, '"') => return false,
            _ => {}
        }
    }
    !escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_atom_rules() {
        assert!(is_local_strict("first.last"));
        assert!(is_local_strict("o'neil+tag"));
        for bad in ["", ".abc", "abc.", "a..b", "a b", "a\"b", "a@b"] {
            assert!(!is_local_strict(bad), "{bad}");
        }
    }

    #[test]
    fn quoted_strings() {
        assert!(is_local_relaxed("\"a b\""));
        assert!(is_local_relaxed("\"a\\\"b\""));
        assert!(is_local_relaxed("plain.atom"));
        assert!(!is_local_relaxed("\"a\"b\""));
        assert!(!is_local_relaxed("\"trailing\\\""));
        assert!(!is_local_relaxed("\"line\r\nbreak\""));
        assert!(!is_local_relaxed("\""));
    }
}
