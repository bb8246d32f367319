// Plain text to HTML.
// Used when the clipboard only offers text: the text is escaped, web and
// mail addresses become links, and line structure survives as <br>.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::html::escape_attribute;

static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(?P<url>\b(?:https?://|www\.)[^\s<>\x22]+)|(?P<email>\b[a-z0-9._%+-]+@[a-z0-9-]+(?:\.[a-z0-9-]+)*\.[a-z]{2,}\b)",
    )
    .unwrap()
});

/// Characters that end a sentence rather than a URL
const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', '\''];

/// Format plain text as an HTML fragment
pub fn format_plain_text(text: &str) -> String {
    let text = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut writer = TextWriter::default();

    let mut last = 0;
    for caps in LINK_RE.captures_iter(&text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let (label, href) = if caps.name("url").is_some() {
            let label = whole.as_str().trim_end_matches(TRAILING_PUNCTUATION);
            if label.len() <= 4 {
                continue;
            }
            let href = if label.to_ascii_lowercase().starts_with("www.") {
                format!("http://{label}")
            } else {
                label.to_string()
            };
            (label, href)
        } else {
            (whole.as_str(), format!("mailto:{}", whole.as_str()))
        };

        writer.text(&text[last..whole.start()]);
        writer.link(label, &href);
        last = whole.start() + label.len();
    }
    writer.text(&text[last..]);
    writer.out
}

#[derive(Default)]
struct TextWriter {
    out: String,
    prev: Option<char>,
}

impl TextWriter {
    fn text(&mut self, text: &str) {
        for ch in text.chars() {
            match ch {
                '\n' => self.out.push_str("<br>"),
                ' ' if matches!(self.prev, None | Some(' ') | Some('\n')) => {
                    self.out.push_str("&nbsp;")
                }
                '&' => self.out.push_str("&amp;"),
                '<' => self.out.push_str("&lt;"),
                '>' => self.out.push_str("&gt;"),
                _ => self.out.push(ch),
            }
            self.prev = Some(ch);
        }
    }

    fn link(&mut self, label: &str, href: &str) {
        self.out.push_str("<a href=\"");
        escape_attribute(href, &mut self.out);
        self.out.push_str("\">");
        self.text(label);
        self.out.push_str("</a>");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escapes_and_breaks() {
        assert_eq!(format_plain_text("a < b\r\nc & d"), "a &lt; b<br>c &amp; d");
    }

    #[test]
    fn test_repeated_spaces() {
        assert_eq!(format_plain_text("a   b"), "a &nbsp;&nbsp;b");
        assert_eq!(format_plain_text(" x"), "&nbsp;x");
    }

    #[test]
    fn test_links_are_detected() {
        assert_eq!(
            format_plain_text("see https://x.org/p?q=1&r=2."),
            "see <a href=\"https://x.org/p?q=1&amp;r=2\">https://x.org/p?q=1&amp;r=2</a>."
        );
        assert_eq!(
            format_plain_text("or www.example.com"),
            "or <a href=\"http://www.example.com\">www.example.com</a>"
        );
    }

    #[test]
    fn test_mail_addresses_are_detected() {
        assert_eq!(
            format_plain_text("mail bob@example.com now"),
            "mail <a href=\"mailto:bob@example.com\">bob@example.com</a> now"
        );
    }
}
