//! Conversions between plain text and HTML.

use tracing::warn;

/// Escapes the characters HTML treats as markup.
#[must_use]
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Converts plain text to minimal HTML.
///
/// Blank lines separate paragraphs; single line breaks become `<br>`.
#[must_use]
pub fn text_to_html(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .map(|paragraph| paragraph.trim_matches('\n'))
        .filter(|paragraph| !paragraph.trim().is_empty())
        .map(|paragraph| {
            let lines: Vec<String> = paragraph.lines().map(escape_html).collect();
            format!("<p>{}</p>", lines.join("<br>\n"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Derives analysis text from an HTML body (as Markdown).
#[must_use]
pub fn html_to_text(html: &str) -> String {
    match htmd::convert(html) {
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!("HTML conversion failed, keeping markup: {}", e);
            html.to_string()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#39;Jerry&#39;&lt;/a&gt;"
        );
    }

    #[test]
    fn text_to_html_paragraphs_and_breaks() {
        let html = text_to_html("Hello,\r\nline two\r\n\r\n\r\nSecond <para>\n");
        assert_eq!(html, "<p>Hello,<br>\nline two</p>\n<p>Second &lt;para&gt;</p>");
        assert_eq!(text_to_html(""), "");
    }

    #[test]
    fn html_to_text_keeps_words() {
        let text = html_to_text("<p>Hello <b>world</b></p>");
        assert!(text.contains("Hello"));
        assert!(text.contains("world"));
        assert!(!text.contains("<p>"));
    }
}
