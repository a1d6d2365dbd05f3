//! Outbound link extraction

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;
use url::Url;

use super::html::decode_html_entities;

struct LinkPatterns {
    href_double: Regex,
    href_single: Regex,
    safe_redirect: Regex,
    bare_url: Regex,
}

fn patterns() -> &'static LinkPatterns {
    static PATTERNS: OnceLock<LinkPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("valid link pattern");
        LinkPatterns {
            href_double: re(r#"(?i)<a\b[^>]*?\bhref\s*=\s*"([^"]+)""#),
            href_single: re(r#"(?i)<a\b[^>]*?\bhref\s*=\s*'([^']+)'"#),
            safe_redirect: re(r#"(?i)data-saferedirecturl\s*=\s*"([^"]+)""#),
            bare_url: re(r#"(?i)\bhttps?://[^\s"'<>)\]]+"#),
        }
    })
}

/// Hosts whose link-tracking wrappers are unwrapped
const REDIRECT_HOSTS: [&str; 2] = ["google.com", "googleusercontent.com"];

/// Extract http(s) links from an HTML body and a plain-text body
///
/// Anchor targets come first (double-quoted, then single-quoted, then
/// safe-redirect attributes), followed by bare URLs found in either body.
/// Each link is entity-decoded, protocol-relative links get `https:`,
/// redirect wrappers are unwrapped, and duplicates are dropped keeping the
/// first occurrence.
pub fn extract_links(html: &str, plain: &str) -> Vec<String> {
    let p = patterns();
    let mut out = Vec::new();
    let mut seen = HashSet::new();

    let mut push = |candidate: &str| {
        if let Some(url) = normalize_link(candidate)
            && seen.insert(url.clone())
        {
            out.push(url);
        }
    };

    for re in [&p.href_double, &p.href_single, &p.safe_redirect] {
        for caps in re.captures_iter(html) {
            push(&caps[1]);
        }
    }

    let both = format!("{}\n{}", html, plain);
    for m in p.bare_url.find_iter(&both) {
        push(m.as_str());
    }

    out
}

fn normalize_link(candidate: &str) -> Option<String> {
    let decoded = decode_html_entities(candidate);
    let mut url = decoded.trim().to_string();
    if url.is_empty() {
        return None;
    }
    if url.starts_with("//") {
        url.insert_str(0, "https:");
    }

    let lower = url.get(..8).unwrap_or(&url).to_ascii_lowercase();
    if !(lower.starts_with("http://") || lower.starts_with("https://")) {
        return None;
    }

    Some(unwrap_redirect(&url))
}

/// Unwrap a Google redirect wrapper to the destination in its `q`/`url` parameter
///
/// Anything that is not a recognizable wrapper is returned unchanged.
pub fn unwrap_redirect(link: &str) -> String {
    let Ok(parsed) = Url::parse(link) else {
        return link.to_string();
    };

    let is_wrapper_host = parsed
        .host_str()
        .is_some_and(|host| REDIRECT_HOSTS.iter().any(|h| host.ends_with(h)));
    if !is_wrapper_host || parsed.query().is_none_or(str::is_empty) {
        return link.to_string();
    }

    let param = |name: &str| {
        parsed
            .query_pairs()
            .find(|(k, v)| k == name && !v.is_empty())
            .map(|(_, v)| v.into_owned())
    };

    match param("q").or_else(|| param("url")) {
        Some(target) => urlencoding::decode(&target)
            .map(|s| s.into_owned())
            .unwrap_or(target),
        None => link.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_relative_href() {
        let links = extract_links(r#"<a href="//example.com/x">x</a>"#, "");
        assert_eq!(links, vec!["https://example.com/x"]);
    }

    #[test]
    fn test_redirect_unwrapped() {
        let html = r#"<a href="https://www.google.com/url?q=https%3A%2F%2Ftarget.example&amp;sa=D">go</a>"#;
        assert_eq!(extract_links(html, ""), vec!["https://target.example"]);
    }

    #[test]
    fn test_unwrap_redirect_url_param() {
        assert_eq!(
            unwrap_redirect("https://www.google.com/url?url=https%3A%2F%2Fa.example%2Fp"),
            "https://a.example/p"
        );
        assert_eq!(
            unwrap_redirect("https://example.com/url?q=https%3A%2F%2Fa.example"),
            "https://example.com/url?q=https%3A%2F%2Fa.example"
        );
        assert_eq!(
            unwrap_redirect("https://www.google.com/search"),
            "https://www.google.com/search"
        );
    }

    #[test]
    fn test_quoting_styles_and_safe_redirect() {
        let html = concat!(
            r#"<a class="c" href="https://one.example/">1</a>"#,
            r#"<A HREF='https://two.example/'>2</A>"#,
            r#"<a href="https://three.example/" data-saferedirecturl="https://www.google.com/url?q=https://four.example/&amp;source=gmail">3</a>"#,
        );
        assert_eq!(
            extract_links(html, ""),
            vec![
                "https://one.example/",
                "https://three.example/",
                "https://two.example/",
                "https://four.example/",
            ]
        );
    }

    #[test]
    fn test_non_http_discarded() {
        let html = r#"<a href="mailto:a@example.com">m</a><a href="javascript:void(0)">j</a><a href="/relative">r</a>"#;
        assert!(extract_links(html, "ftp://files.example").is_empty());
    }

    #[test]
    fn test_bare_urls_and_dedup() {
        let html = r#"<a href="https://example.com/a">https://example.com/a</a>"#;
        let plain = "See https://example.com/a and (https://example.com/b) or <http://example.com/c>";
        assert_eq!(
            extract_links(html, plain),
            vec![
                "https://example.com/a",
                "https://example.com/b",
                "http://example.com/c",
            ]
        );
    }

    #[test]
    fn test_entities_in_href_decoded() {
        let html = r#"<a href="https://example.com/?a=1&amp;b=2">x</a>"#;
        assert_eq!(extract_links(html, ""), vec!["https://example.com/?a=1&b=2"]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(extract_links("", "").is_empty());
    }
}
