/// Characters stripped from both ends of an oracle answer before matching.
pub(crate) const DECORATION: &[char] = &['"', '\'', '`', '*', '.', ',', ':', ';', '!', '?'];

/// Strip whitespace plus surrounding quotes and punctuation from an oracle
/// answer, and lowercase it.
pub fn normalize_oracle_output(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c.is_whitespace() || DECORATION.contains(&c))
        .to_lowercase()
}

/// Match an oracle answer against registered names. The normalized answer must
/// equal a name exactly, ignoring case; partial or embedded matches do not
/// count. Returns the canonical name.
pub fn match_handler(raw: &str, names: &[String]) -> Option<String> {
    let candidate = normalize_oracle_output(raw);
    if candidate.is_empty() {
        return None;
    }
    names
        .iter()
        .find(|name| name.to_lowercase() == candidate)
        .cloned()
}
