use std::sync::LazyLock;

use regex::Regex;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"```(?:[A-Za-z0-9_+-]*[ \t]*\r?\n|(?:sql|postgresql|postgres|javascript|js|json|mongodb|mongo)\b)?",
    )
    .expect("code fence pattern is valid")
});

/// Removes markdown code fences, surrounding whitespace and trailing
/// statement terminators from generator output.
///
/// Applying it to its own output changes nothing.
#[must_use]
pub fn strip_generation_artifacts(raw: &str) -> String {
    let without_fences = CODE_FENCE.replace_all(raw, "");
    without_fences
        .trim()
        .trim_end_matches(|c: char| c == ';' || c.is_whitespace())
        .to_string()
}
