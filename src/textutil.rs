use once_cell::sync::Lazy;
use regex::Regex;

static HANGUL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\u{AC00}-\u{D7A3}]").expect("hangul"));
static RESERVED_CHARS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\\/*?:"<>|]"#).expect("reserved chars"));
static SPACED_JOINER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\S)\s*([-·])\s*(\S)").expect("spaced joiner"));

/// True when the text contains at least one precomposed Hangul syllable.
pub fn has_hangul(text: &str) -> bool {
    HANGUL_RE.is_match(text)
}

/// Picks (title, subtitle) from a title-marked paragraph and its follower: the Hangul one is
/// the title; when neither or both contain Hangul, the first wins.
pub fn pick_title_pair(first: &str, second: &str) -> (String, String) {
    if !has_hangul(first) && has_hangul(second) {
        (second.to_string(), first.to_string())
    } else {
        (first.to_string(), second.to_string())
    }
}

/// Directory name for a record title: reserved path characters become `_` and whitespace
/// around `-`/`·` joiners is removed.
pub fn sanitize_dir_name(title: &str) -> String {
    let replaced = RESERVED_CHARS_RE.replace_all(title, "_");
    let joined = SPACED_JOINER_RE.replace_all(&replaced, "${1}${2}${3}");
    let out = joined.trim();
    if out.is_empty() || out == "." || out == ".." {
        "untitled".to_string()
    } else {
        out.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_pair_prefers_hangul() {
        assert_eq!(
            pick_title_pair("감기약", "ColdMed"),
            ("감기약".to_string(), "ColdMed".to_string())
        );
        assert_eq!(
            pick_title_pair("ColdMed", "감기약"),
            ("감기약".to_string(), "ColdMed".to_string())
        );
        assert_eq!(
            pick_title_pair("Aspirin", "ASA"),
            ("Aspirin".to_string(), "ASA".to_string())
        );
        assert_eq!(pick_title_pair("타이레놀", ""), ("타이레놀".to_string(), String::new()));
    }

    #[test]
    fn sanitizes_reserved_chars_and_joiners() {
        assert_eq!(sanitize_dir_name("A/B:C*D"), "A_B_C_D");
        assert_eq!(sanitize_dir_name("가 - 나"), "가-나");
        assert_eq!(sanitize_dir_name("  비타민 · 미네랄 "), "비타민·미네랄");
        assert_eq!(sanitize_dir_name("   "), "untitled");
        assert_eq!(sanitize_dir_name(".."), "untitled");
    }
}
