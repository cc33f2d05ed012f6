//! Splits a cell into its leading directive lines and the payload.

/// Character that starts a directive line.
pub const DIRECTIVE_MARKER: char = '>';

/// A cell split into directives and payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCell {
    /// Directive tags in the order they appeared, marker removed.
    pub directives: Vec<String>,
    /// Everything after the directive block, line breaks preserved.
    pub payload: String,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Directives,
    Payload,
}

/// Split `code` into directives and payload.
///
/// Directives are only recognised in the leading block; blank lines inside
/// that block are dropped. The first other line starts the payload, and from
/// there on every line is kept verbatim, marker or not.
pub fn split_magics(code: &str) -> ParsedCell {
    let mut directives = Vec::new();
    let mut payload = Vec::new();
    let mut state = State::Directives;

    for line in code.split('\n') {
        if state == State::Directives {
            if line.starts_with(DIRECTIVE_MARKER) {
                directives.push(line.trim_start_matches(DIRECTIVE_MARKER).to_string());
                continue;
            }
            if line.is_empty() {
                continue;
            }
            state = State::Payload;
        }
        payload.push(line);
    }

    ParsedCell {
        directives,
        payload: payload.join("\n"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_input() {
        assert_eq!(split_magics(""), ParsedCell::default());
    }

    #[test]
    fn test_single_directive() {
        let cell = split_magics(">python\nprint(1)");
        assert_eq!(cell.directives, vec!["python"]);
        assert_eq!(cell.payload, "print(1)");
    }

    #[test]
    fn test_blank_lines_between_directives_are_skipped() {
        let cell = split_magics(">python\n\n>>javascript\n\nx = 1\n\ny = 2");
        assert_eq!(cell.directives, vec!["python", "javascript"]);
        assert_eq!(cell.payload, "x = 1\n\ny = 2");
    }

    #[test]
    fn test_late_marker_lines_stay_in_payload() {
        let cell = split_magics("a = 1\n>python\nb = 2");
        assert!(cell.directives.is_empty());
        assert_eq!(cell.payload, "a = 1\n>python\nb = 2");
    }

    #[test]
    fn test_indented_marker_is_not_a_directive() {
        let cell = split_magics("  >python\nprint(1)");
        assert!(cell.directives.is_empty());
        assert_eq!(cell.payload, "  >python\nprint(1)");
    }

    fn plain_line() -> impl Strategy<Value = String> {
        "[a-z0-9 ()=+]{0,12}".prop_filter("must not start with a marker", |s| {
            !s.starts_with(DIRECTIVE_MARKER)
        })
    }

    proptest! {
        #[test]
        fn prop_directive_free_input_is_untouched(
            first in "[a-z][a-z0-9 ]{0,8}",
            rest in proptest::collection::vec(plain_line(), 0..8),
        ) {
            let mut lines = vec![first];
            lines.extend(rest);
            let code = lines.join("\n");

            let cell = split_magics(&code);
            prop_assert!(cell.directives.is_empty());
            prop_assert_eq!(cell.payload, code);
        }

        #[test]
        fn prop_no_line_is_lost(
            tags in proptest::collection::vec("[a-z]{1,8}", 0..4),
            first in "[a-z][a-z0-9 ]{0,8}",
            rest in proptest::collection::vec("[a-z0-9 >]{0,10}", 0..6),
        ) {
            let mut lines: Vec<String> = tags.iter().map(|t| format!(">{t}")).collect();
            lines.push(first);
            lines.extend(rest);
            let code = lines.join("\n");

            let cell = split_magics(&code);
            prop_assert_eq!(&cell.directives, &tags);

            let rebuilt: Vec<String> = cell
                .directives
                .iter()
                .map(|d| format!(">{d}"))
                .chain(cell.payload.split('\n').map(str::to_string))
                .collect();
            prop_assert_eq!(rebuilt, lines);
        }
    }
}
