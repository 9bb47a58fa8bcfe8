//! Best-effort rewrite of Hangul equation-editor scripts into LaTeX.

use once_cell::sync::Lazy;
use regex::Regex;

static OVER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([^{\s]+)\s+over\s+([^{\s]+)").expect("over"));
static ROMAN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"rm\{([^}]+)\}").expect("rm"));
static ITALIC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"it\{([^}]+)\}").expect("it"));
static COMMAND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\\(?:mathrm|textit|frac|times))").expect("command"));
static SPACES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r" +").expect("spaces"));

pub fn script_to_latex(script: &str) -> String {
    let s = OVER_RE.replace_all(script, r"\frac{${1}}{${2}}");
    let s = ROMAN_RE.replace_all(&s, r"\mathrm{${1}}");
    let s = ITALIC_RE.replace_all(&s, r"\textit{${1}}");
    let s = s.replace("TIMES", r"\times");
    let s = COMMAND_RE.replace_all(&s, "${1} ");
    SPACES_RE.replace_all(&s, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::script_to_latex;

    #[test]
    fn rewrites_fraction_and_fonts() {
        assert_eq!(script_to_latex("a over b"), r"\frac {a}{b}");
        assert_eq!(script_to_latex("rm{ABC} TIMES 2"), r"\mathrm {ABC} \times 2");
        assert_eq!(script_to_latex("it{x}  +  1"), r"\textit {x} + 1");
    }

    #[test]
    fn leaves_plain_scripts_alone() {
        assert_eq!(script_to_latex("  x + y "), "x + y");
        assert_eq!(script_to_latex(""), "");
    }
}
