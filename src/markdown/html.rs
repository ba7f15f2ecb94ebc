//! Embedded HTML fragments
//!
//! Markdown has no syntax for alignment, visual indent, border colors or
//! explicit collapse state, so those are carried as small raw-HTML fragments.
//! This module is the tolerant tokenizer both converters share: it splits a
//! fragment into tags and text, reads attributes and inline `style`
//! declarations, and escapes or decodes text and attribute values.
//!
//! Anything that does not look like a tag is returned as text, so malformed
//! input degrades to literal content instead of failing.

use regex::Regex;
use std::sync::OnceLock;

// ─────────────────────────────────────────────────────────────────────────────
// Token Types
// ─────────────────────────────────────────────────────────────────────────────

/// A parsed start or end tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    /// Lowercased tag name
    pub name: String,
    /// Attributes in source order; names lowercased, values entity-decoded
    pub attrs: Vec<(String, String)>,
    /// End tag (`</name>`)
    pub closing: bool,
    /// Self-closing (`<name/>`)
    pub self_closing: bool,
}

impl Tag {
    /// Value of the named attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Value of a declaration inside the `style` attribute.
    pub fn style(&self, property: &str) -> Option<String> {
        self.attr("style")
            .and_then(|style| style_property(style, property))
    }
}

/// One token of an HTML fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HtmlToken<'a> {
    Tag(Tag),
    Text(&'a str),
}

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(
            r#"<(/?)([A-Za-z][A-Za-z0-9-]*)((?:\s+[^\s"'>/=]+(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'=<>`]+))?)*)\s*(/?)>"#,
        )
        .expect("tag pattern is valid")
    })
}

fn attr_regex() -> &'static Regex {
    static ATTR: OnceLock<Regex> = OnceLock::new();
    ATTR.get_or_init(|| {
        Regex::new(r#"([^\s"'>/=]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#)
            .expect("attribute pattern is valid")
    })
}

fn entity_regex() -> &'static Regex {
    static ENTITY: OnceLock<Regex> = OnceLock::new();
    ENTITY.get_or_init(|| {
        Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z]{2,8});")
            .expect("entity pattern is valid")
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokenizing
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a string that must consist of exactly one tag.
pub fn parse_tag(raw: &str) -> Option<Tag> {
    let raw = raw.trim();
    let captures = tag_regex().captures(raw)?;
    let whole = captures.get(0)?;
    if whole.start() != 0 || whole.end() != raw.len() {
        return None;
    }
    Some(tag_from_captures(&captures))
}

/// Split an HTML fragment into tags and the text between them.
pub fn tokenize(html: &str) -> Vec<HtmlToken<'_>> {
    let mut tokens = Vec::new();
    let mut last = 0;
    for captures in tag_regex().captures_iter(html) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        if whole.start() > last {
            tokens.push(HtmlToken::Text(&html[last..whole.start()]));
        }
        tokens.push(HtmlToken::Tag(tag_from_captures(&captures)));
        last = whole.end();
    }
    if last < html.len() {
        tokens.push(HtmlToken::Text(&html[last..]));
    }
    tokens
}

fn tag_from_captures(captures: &regex::Captures<'_>) -> Tag {
    let closing = captures.get(1).is_some_and(|m| !m.as_str().is_empty());
    let name = captures
        .get(2)
        .map(|m| m.as_str().to_ascii_lowercase())
        .unwrap_or_default();
    let self_closing = captures.get(4).is_some_and(|m| !m.as_str().is_empty());

    let mut attrs = Vec::new();
    if let Some(raw_attrs) = captures.get(3) {
        for attr in attr_regex().captures_iter(raw_attrs.as_str()) {
            let key = attr
                .get(1)
                .map(|m| m.as_str().to_ascii_lowercase())
                .unwrap_or_default();
            let value = attr
                .get(2)
                .or_else(|| attr.get(3))
                .or_else(|| attr.get(4))
                .map(|m| decode_entities(m.as_str()))
                .unwrap_or_default();
            attrs.push((key, value));
        }
    }

    Tag {
        name,
        attrs,
        closing,
        self_closing,
    }
}

/// Read one declaration out of an inline `style` attribute.
///
/// Property names compare case-insensitively; the value is trimmed and
/// `!important` is dropped.
pub fn style_property(style: &str, property: &str) -> Option<String> {
    style.split(';').find_map(|declaration| {
        let (name, value) = declaration.split_once(':')?;
        if !name.trim().eq_ignore_ascii_case(property) {
            return None;
        }
        let value = value.trim().trim_end_matches("!important").trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Escaping
// ─────────────────────────────────────────────────────────────────────────────

/// HTML-escape text content.
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// HTML-escape an attribute value for use inside double quotes.
pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;").replace('\'', "&#39;")
}

/// Decode character references. Unknown named entities are left as written.
pub fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    entity_regex()
        .replace_all(s, |captures: &regex::Captures<'_>| {
            let body = &captures[1];
            decode_entity(body).unwrap_or_else(|| captures[0].to_string())
        })
        .into_owned()
}

fn decode_entity(body: &str) -> Option<String> {
    if let Some(numeric) = body.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse::<u32>().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    let decoded = match body {
        "amp" => "&",
        "lt" => "<",
        "gt" => ">",
        "quot" => "\"",
        "apos" => "'",
        "nbsp" => "\u{a0}",
        _ => return None,
    };
    Some(decoded.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tag_with_attributes() {
        let tag = parse_tag(r#"<li style="margin-left: 3rem" data-x='y' hidden>"#).unwrap();
        assert_eq!(tag.name, "li");
        assert!(!tag.closing);
        assert_eq!(tag.attr("style"), Some("margin-left: 3rem"));
        assert_eq!(tag.attr("data-x"), Some("y"));
        assert_eq!(tag.attr("hidden"), Some(""));
        assert_eq!(tag.style("margin-left").as_deref(), Some("3rem"));
    }

    #[test]
    fn test_parse_closing_and_self_closing() {
        let close = parse_tag("</BlockQuote>").unwrap();
        assert!(close.closing);
        assert_eq!(close.name, "blockquote");

        let br = parse_tag("<br/>").unwrap();
        assert!(br.self_closing);
        assert_eq!(br.name, "br");
    }

    #[test]
    fn test_parse_tag_rejects_surrounding_text() {
        assert!(parse_tag("<p> hello").is_none());
        assert!(parse_tag("not a tag").is_none());
        assert!(parse_tag("<!-- comment -->").is_none());
    }

    #[test]
    fn test_tokenize_mixed() {
        let tokens = tokenize("<td>a &amp; <strong>b</strong></td>");
        assert_eq!(tokens.len(), 6);
        assert!(matches!(&tokens[0], HtmlToken::Tag(t) if t.name == "td"));
        assert_eq!(tokens[1], HtmlToken::Text("a &amp; "));
        assert!(matches!(&tokens[5], HtmlToken::Tag(t) if t.closing && t.name == "td"));
    }

    #[test]
    fn test_tokenize_malformed_is_text() {
        let tokens = tokenize("a < b and <unclosed");
        assert_eq!(tokens, vec![HtmlToken::Text("a < b and <unclosed")]);
    }

    #[test]
    fn test_style_property() {
        let style = "color: red; TEXT-ALIGN : center !important;";
        assert_eq!(style_property(style, "text-align").as_deref(), Some("center"));
        assert_eq!(style_property(style, "color").as_deref(), Some("red"));
        assert_eq!(style_property(style, "margin-left"), None);
    }

    #[test]
    fn test_escape_and_decode() {
        assert_eq!(escape_text("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(escape_attr(r#"say "hi""#), "say &quot;hi&quot;");
        assert_eq!(decode_entities("a &lt; b &amp;&nbsp;c"), "a < b &\u{a0}c");
        assert_eq!(decode_entities("&#65;&#x42;"), "AB");
        assert_eq!(decode_entities("&unknown; stays"), "&unknown; stays");
    }
}
