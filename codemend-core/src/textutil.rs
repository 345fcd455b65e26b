//! Indentation-aware text helpers shared by the body re-parser and the
//! patch applier.

/// Strip the longest common leading whitespace from all non-blank lines.
pub fn dedent(source: &str) -> String {
    let common = source
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(leading_whitespace_len)
        .min()
        .unwrap_or(0);

    if common == 0 {
        return source.to_string();
    }

    source
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                ""
            } else {
                &line[common.min(leading_whitespace_len(line))..]
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prefix every non-blank line with `prefix`.
pub fn indent(source: &str, prefix: &str) -> String {
    source
        .lines()
        .map(|line| {
            if line.trim().is_empty() {
                line.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The leading whitespace of a line.
pub fn leading_whitespace(line: &str) -> &str {
    &line[..leading_whitespace_len(line)]
}

fn leading_whitespace_len(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedent_strips_common_prefix() {
        let src = "    def f():\n        return 1";
        assert_eq!(dedent(src), "def f():\n    return 1");
    }

    #[test]
    fn dedent_ignores_blank_lines() {
        let src = "    a = 1\n\n    b = 2";
        assert_eq!(dedent(src), "a = 1\n\nb = 2");
    }

    #[test]
    fn indent_round_trip() {
        let src = "def f():\n    return 1";
        let indented = indent(src, "    ");
        assert_eq!(dedent(&indented), src);
    }

    #[test]
    fn leading_whitespace_of_line() {
        assert_eq!(leading_whitespace("    x = 1"), "    ");
        assert_eq!(leading_whitespace("x"), "");
    }
}
