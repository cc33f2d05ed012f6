//! Final clean-up applied to every response before it is delivered.

use regex::Regex;
use std::sync::LazyLock;

const ERROR_START: &str = "\x1b[0;31m";
const ERROR_END: &str = "\x1b[0m";

static LOAD_NOISE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Script \(.+\) loaded correctly").expect("load-noise pattern is valid")
});

/// Wrap `text` in red terminal colouring.
pub fn error_message(text: &str) -> String {
    format!("{ERROR_START}{text}{ERROR_END}")
}

/// Remove the runtime's "Script (...) loaded correctly" notices.
pub fn strip_load_noise(text: &str) -> String {
    LOAD_NOISE.replace_all(text, "").into_owned()
}

/// Drop every empty line.
pub fn trim_empty_lines(text: &str) -> String {
    text.lines()
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Clean captured output for display.
///
/// Load notices and empty lines are removed; the result is coloured red when
/// it mentions `error` or when the caller already knows it is a failure.
pub fn normalize(text: &str, flagged: bool) -> String {
    let text = trim_empty_lines(&strip_load_noise(text));
    if flagged || text.contains("error") {
        error_message(&text)
    } else {
        text
    }
}
