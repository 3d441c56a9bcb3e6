//! Comment removal
//!
//! - `[- block -]` comments, removed, or replaced by a single space when they
//!   span a line break. An unclosed block comment runs to the end.
//! - `-- line` comments, removed up to the end of the line.

const BLOCK_START: &str = "[-";
const BLOCK_END: &str = "-]";
const LINE: &str = "--";

pub(crate) fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(pos) = rest.find(['[', '-']) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if let Some(after) = rest.strip_prefix(BLOCK_START) {
            let (comment, tail) = match after.find(BLOCK_END) {
                Some(end) => (&after[..end], &after[end + BLOCK_END.len()..]),
                None => (after, ""),
            };
            if comment.contains('\n') {
                out.push(' ');
            }
            rest = tail;
        } else if rest.starts_with(LINE) {
            let end = rest.find('\n').unwrap_or(rest.len());
            rest = &rest[end..];
        } else {
            // single `[` or `-`
            out.push_str(&rest[..1]);
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("a [- b -] c" => "a  c"; "inline block")]
    #[test_case("a[-\nb\n-]c" => "a c"; "multiline block")]
    #[test_case("a [- never closed\nb" => "a "; "unclosed block")]
    #[test_case("a -- comment\nb" => "a \nb"; "line comment")]
    #[test_case("1-2 [x] @-salt" => "1-2 [x] @-salt"; "not comments")]
    #[test_case("-- only" => ""; "whole line")]
    fn strip(input: &str) -> String {
        strip_comments(input)
    }
}
