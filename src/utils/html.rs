// src/utils/html.rs

use std::sync::LazyLock;

use regex::Regex;

/// `<` directly followed by something a browser would start a tag,
/// comment or processing instruction with.
static MARKUP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[A-Za-z!?/]").expect("static regex"));

/// Strips scripts, event handlers and other unsafe markup from user text
/// while keeping harmless formatting such as `<b>` or `<p>`.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}

/// Grading feedback is rendered to students as HTML. Markup is sanitised;
/// plain text (`Score < 10 & missing joins`) is kept as typed.
pub fn clean_feedback(input: &str) -> String {
    if MARKUP.is_match(input) {
        clean_html(input)
    } else {
        input.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_html_keeps_formatting() {
        let cleaned = clean_html("<p onclick=\"x()\">Well <b>done</b><script>alert(1)</script></p>");
        assert_eq!(cleaned, "<p>Well <b>done</b></p>");
    }

    #[test]
    fn test_plain_feedback_is_untouched() {
        let text = "Score < 10 & missing joins, a <= b";
        assert_eq!(clean_feedback(text), text);
    }

    #[test]
    fn test_feedback_with_markup_is_sanitised() {
        assert_eq!(
            clean_feedback("Good <script>x()</script>work"),
            "Good work"
        );
        assert_eq!(clean_feedback("<!-- hidden -->Fine"), "Fine");
    }
}
