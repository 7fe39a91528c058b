//! Owned element index over a document's markup.
//!
//! `tl` hands out a DOM that borrows its input, which does not fit a
//! document whose markup is replaced after every stage. The index keeps
//! only what the pipeline queries: tag name, attributes and where the
//! opening tag sits in the markup. `tl` locates the elements; attributes are
//! read back from the opening tag text so minified, unquoted values parse
//! the same as quoted ones.

use std::ops::Range;

use crate::utils::html::parse_attributes;

/// Elements whose content is raw text; tags inside them are not elements.
const RAW_TEXT: &[&str] = &["script", "style", "textarea", "title"];

/// Elements that never have a closing tag.
const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// One element of the parsed markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attrs: Vec<(String, Option<String>)>,
    span: Range<usize>,
}

impl Element {
    /// Lower-cased tag name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Entity-decoded attribute value; `Some("")` for a bare attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_deref().unwrap_or(""))
    }

    /// Byte range of the opening tag.
    pub fn span(&self) -> Range<usize> {
        self.span.clone()
    }

    pub fn is_void(&self) -> bool {
        VOID.contains(&self.name.as_str())
    }

    /// Byte range from the opening tag through the matching closing tag.
    ///
    /// Void elements and elements without a closing tag cover only the
    /// opening tag. For other elements the first `</name` after the opening
    /// tag closes it, which is exact for raw-text elements like `script`.
    pub fn outer_span(&self, html: &str) -> Range<usize> {
        if self.is_void() || html[..self.span.end].ends_with("/>") {
            return self.span();
        }
        let closing = format!("</{}", self.name);
        find_ascii_ci(html, &closing, self.span.end)
            .and_then(|close| html[close..].find('>').map(|gt| close + gt + 1))
            .map_or_else(|| self.span(), |end| self.span.start..end)
    }

    /// Re-serialize the opening tag with one attribute value replaced.
    pub fn with_attr(&self, name: &str, value: &str) -> String {
        let mut out = format!("<{}", self.name);
        for (key, val) in &self.attrs {
            out.push(' ');
            out.push_str(key);
            let val = if key == name { Some(value) } else { val.as_deref() };
            if let Some(val) = val {
                out.push_str("=\"");
                out.push_str(&crate::utils::html::escape(val));
                out.push('"');
            }
        }
        out.push('>');
        out
    }
}

/// Elements of a document in document order.
#[derive(Debug, Clone, Default)]
pub struct Tree {
    elements: Vec<Element>,
}

impl Tree {
    /// Index every element in `html`.
    ///
    /// Markup that `tl` rejects yields an empty tree.
    pub fn parse(html: &str) -> Self {
        let dom = match tl::parse(html, tl::ParserOptions::default()) {
            Ok(dom) => dom,
            Err(e) => {
                crate::debug!("tree"; "parse failed: {:?}", e);
                return Self::default();
            }
        };

        let base = html.as_ptr() as usize;
        let mut elements: Vec<Element> = dom
            .nodes()
            .iter()
            .filter_map(tl::Node::as_tag)
            .filter_map(|tag| {
                let start = (tag.raw().as_bytes().as_ptr() as usize).checked_sub(base)?;
                if start >= html.len() || !html[start..].starts_with('<') {
                    return None;
                }
                let end = open_tag_end(html, start)?;
                let name = tag.name().as_utf8_str().to_ascii_lowercase();
                let attrs = parse_attributes(attribute_text(&html[start..end]));
                Some(Element {
                    name,
                    attrs,
                    span: start..end,
                })
            })
            .collect();

        elements.sort_by_key(|el| el.span.start);
        elements.dedup_by_key(|el| el.span.start);

        // Markup inside script/style text is not part of the document
        let mut kept = Vec::with_capacity(elements.len());
        let mut raw_until = 0;
        for el in elements {
            if el.span.start < raw_until {
                continue;
            }
            if RAW_TEXT.contains(&el.name.as_str()) {
                raw_until = el.outer_span(html).end;
            }
            kept.push(el);
        }

        Self { elements: kept }
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Elements matching `pred`, in document order.
    pub fn select<'a, P>(&'a self, pred: P) -> impl Iterator<Item = &'a Element>
    where
        P: Fn(&Element) -> bool + 'a,
    {
        self.elements.iter().filter(move |el| pred(el))
    }
}

/// Index just past the `>` closing the tag opened at `start`.
///
/// Quoted attribute values may contain `>`.
fn open_tag_end(html: &str, start: usize) -> Option<usize> {
    let mut quote = None;
    for (i, &b) in html.as_bytes()[start..].iter().enumerate() {
        match (quote, b) {
            (Some(q), _) if b == q => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(b),
            (None, b'>') => return Some(start + i + 1),
            _ => {}
        }
    }
    None
}

/// The attribute part of an opening tag: after the name, before `>` or `/>`.
fn attribute_text(tag: &str) -> &str {
    let inner = tag.strip_prefix('<').unwrap_or(tag);
    let inner = inner.strip_suffix('>').unwrap_or(inner);
    let name_end = inner
        .find(|c: char| c.is_whitespace() || c == '/')
        .unwrap_or(inner.len());
    let attrs = inner[name_end..].trim_end();
    match attrs.strip_suffix('/') {
        Some(rest) if rest.is_empty() || rest.ends_with(|c: char| c.is_whitespace() || c == '"' || c == '\'') => rest,
        _ => attrs,
    }
}

/// ASCII case-insensitive substring search starting at `from`.
pub fn find_ascii_ci(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack.as_bytes()[from..]
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .map(|pos| from + pos)
}

/// Last ASCII case-insensitive occurrence of `needle`.
pub fn rfind_ascii_ci(haystack: &str, needle: &str) -> Option<usize> {
    let needle = needle.as_bytes();
    haystack
        .as_bytes()
        .windows(needle.len())
        .rposition(|w| w.eq_ignore_ascii_case(needle))
}
