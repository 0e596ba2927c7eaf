use std::sync::LazyLock;

use regex::Regex;

/// HTML fragments the model sometimes emits despite being asked for
/// Markdown, paired with their Markdown replacement. Applied in order.
static MARKUP_RULES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (r"<h1>(.*?)</h1>", "# ${1}"),
        (r"<h2>(.*?)</h2>", "## ${1}"),
        (r"<h3>(.*?)</h3>", "### ${1}"),
        (r"<strong>(.*?)</strong>", "**${1}**"),
        (r"<b>(.*?)</b>", "**${1}**"),
        (r"<em>(.*?)</em>", "*${1}*"),
        (r"<i>(.*?)</i>", "*${1}*"),
        (r"<p>(.*?)</p>", "${1}\n"),
        (r"<code>(.*?)</code>", "`${1}`"),
        (r"</?ul>", ""),
        (r"</?ol>", ""),
        (r"<li>(.*?)</li>", "- ${1}"),
        (r"<br\s*/?>", "\n"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("valid markup regex"),
            replacement,
        )
    })
    .collect()
});

/// Rewrite the known HTML fragments into Markdown tokens.
pub fn normalize_markup(text: &str) -> String {
    let mut normalized = text.to_string();
    for (regex, replacement) in MARKUP_RULES.iter() {
        normalized = regex.replace_all(&normalized, *replacement).into_owned();
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("<h2>Agenda</h2>", "## Agenda")]
    #[case("<strong>Today</strong> and <b>tomorrow</b>", "**Today** and **tomorrow**")]
    #[case("<em>maybe</em> <i>later</i>", "*maybe* *later*")]
    #[case("<p>First</p><p>Second</p>", "First\nSecond\n")]
    #[case("Run <code>cargo</code>", "Run `cargo`")]
    #[case("<ul><li>one</li><li>two</li></ul>", "- one- two")]
    #[case("line<br>break<br/>again<br />", "line\nbreak\nagain\n")]
    fn test_normalize_markup(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_markup(input), expected);
    }

    #[test]
    fn test_plain_markdown_is_untouched() {
        let text = "## Plan\n- **Dentist** at 2pm\n[FUNCTION_CALL]{}[/FUNCTION_CALL]";
        assert_eq!(normalize_markup(text), text);
    }
}
