//! HTML to readable text

use regex::{Captures, Regex};
use std::sync::OnceLock;

struct HtmlPatterns {
    script: Regex,
    style: Regex,
    line_break: Regex,
    paragraph_close: Regex,
    block_close: Regex,
    list_item: Regex,
    tag: Regex,
    trailing_space: Regex,
    blank_lines: Regex,
}

fn patterns() -> &'static HtmlPatterns {
    static PATTERNS: OnceLock<HtmlPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("valid HTML pattern");
        HtmlPatterns {
            script: re(r"(?is)<script\b.*?</script\s*>"),
            style: re(r"(?is)<style\b.*?</style\s*>"),
            line_break: re(r"(?i)<br\s*/?>"),
            paragraph_close: re(r"(?i)</(p|h[1-6])\s*>"),
            block_close: re(r"(?i)</(div|li|tr)\s*>"),
            list_item: re(r"(?i)<li\b[^>]*>"),
            tag: re(r"(?s)<[^>]+>"),
            trailing_space: re(r"[ \t]+\n"),
            blank_lines: re(r"\n{3,}"),
        }
    })
}

/// Convert an HTML body to plain text
///
/// Drops script and style blocks, turns line breaks and block ends into
/// newlines (paragraphs and headings end with a blank line), prefixes list
/// items with a bullet, strips the remaining tags, decodes entities and
/// leaves at most one blank line between paragraphs.
pub fn html_to_text(html: &str) -> String {
    if html.is_empty() {
        return String::new();
    }
    let p = patterns();

    let s = p.script.replace_all(html, "");
    let s = p.style.replace_all(&s, "");
    let s = p.line_break.replace_all(&s, "\n");
    let s = p.paragraph_close.replace_all(&s, "\n\n");
    let s = p.block_close.replace_all(&s, "\n");
    let s = p.list_item.replace_all(&s, "\n• ");
    let s = p.tag.replace_all(&s, "");

    let s = decode_html_entities(&s)
        .replace('\r', "")
        .replace(['\t', '\u{a0}'], " ");

    let s = p.trailing_space.replace_all(&s, "\n");
    let s = p.blank_lines.replace_all(&s, "\n\n");
    s.trim().to_string()
}

fn entity_patterns() -> &'static (Regex, Regex, Regex) {
    static PATTERNS: OnceLock<(Regex, Regex, Regex)> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        (
            Regex::new(r"&(nbsp|amp|lt|gt|quot|#39|apos);").expect("valid entity pattern"),
            Regex::new(r"&#(\d+);").expect("valid entity pattern"),
            Regex::new(r"&#[xX]([0-9A-Fa-f]+);").expect("valid entity pattern"),
        )
    })
}

/// Decode named, decimal and hexadecimal HTML entities
///
/// Unknown or out-of-range entities are left as written.
pub fn decode_html_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let (named, decimal, hex) = entity_patterns();

    let s = named.replace_all(text, |caps: &Captures| {
        match &caps[1] {
            "nbsp" => " ",
            "amp" => "&",
            "lt" => "<",
            "gt" => ">",
            "quot" => "\"",
            _ => "'",
        }
        .to_string()
    });

    let numeric = |radix: u32| {
        move |caps: &Captures| {
            u32::from_str_radix(&caps[1], radix)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        }
    };

    let s = decimal.replace_all(&s, numeric(10));
    hex.replace_all(&s, numeric(16)).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraphs() {
        assert_eq!(html_to_text("<p>A</p><p>B</p>"), "A\n\nB");
    }

    #[test]
    fn test_script_and_style_removed() {
        let html = "<style>p{color:red}</style><SCRIPT type=\"x\">alert(1)</SCRIPT><div>Text</div>";
        assert_eq!(html_to_text(html), "Text");
    }

    #[test]
    fn test_breaks_and_lists() {
        let html = "Line 1<br>Line 2<BR/>Line 3<ul><li>one</li><li class=\"x\">two</li></ul>";
        assert_eq!(html_to_text(html), "Line 1\nLine 2\nLine 3\n• one\n\n• two");
    }

    #[test]
    fn test_link_tag_is_not_a_list_item() {
        let html = "<link rel=\"stylesheet\" href=\"a.css\"><p>Body</p>";
        assert_eq!(html_to_text(html), "Body");
    }

    #[test]
    fn test_blank_lines_collapsed() {
        let html = "<div>A</div><br><br><br><br><div>B</div>";
        assert_eq!(html_to_text(html), "A\n\nB");
    }

    #[test]
    fn test_no_residual_tags() {
        let html = "<table><tr><td><b>x</b> &amp; <i>y</i></td></tr></table>";
        let text = html_to_text(html);
        assert_eq!(text, "x & y");
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_nbsp_and_tabs() {
        assert_eq!(html_to_text("a&nbsp;b\tc\u{a0}d"), "a b c d");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(
            decode_html_entities("Hello &amp; welcome &lt;user&gt; &quot;x&quot; &#39;y&apos;"),
            "Hello & welcome <user> \"x\" 'y'"
        );
        assert_eq!(decode_html_entities("&#169; &#x263A; &#X41;"), "© ☺ A");
    }

    #[test]
    fn test_malformed_entities_kept() {
        assert_eq!(decode_html_entities("&bogus; &#xD800; &#;"), "&bogus; &#xD800; &#;");
        assert_eq!(decode_html_entities("a & b"), "a & b");
    }
}
