//! Minifiers for HTML, CSS and JavaScript.
//!
//! Uses minify-html for markup and oxc for JavaScript. Stylesheets are
//! printed minified by lightningcss in the css stage; the textual
//! compressor here covers the ones lightningcss rejects.

use std::sync::LazyLock;

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use regex::Regex;

/// Minify an HTML document.
///
/// Closing tags and the `<html>`/`<head>` opening tags are kept so that
/// later stages can still find `</head>` and `</body>`.
pub fn minify_html(source: &str) -> String {
    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;

    let out = minify_html::minify(source.as_bytes(), &cfg);
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Minify a classic (non-module) script.
///
/// Top-level bindings are globals in a classic script, so they are kept.
/// Returns `None` if the source does not parse.
pub fn minify_js(source: &str) -> Option<String> {
    let allocator = Allocator::default();
    let source_type = SourceType::cjs();
    let ret = Parser::new(&allocator, source, source_type).parse();
    if !ret.errors.is_empty() {
        return None;
    }
    let mut program = ret.program;
    let options = MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    };
    let ret = Minifier::new(options).minify(&allocator, &mut program);
    let code = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            ..CodegenOptions::default()
        })
        .with_scoping(ret.scoping)
        .build(&program)
        .code;
    Some(code)
}

static CHARSET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*@charset\s+("[^"]*"|'[^']*')\s*;\s*"#).expect("charset pattern is valid")
});

static COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/").expect("comment pattern is valid")
});

static WHITESPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

static AROUND_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" ?([{};,]) ?").expect("punctuation pattern is valid"));

/// Drop a leading `@charset` rule; inlined styles inherit the page encoding.
pub fn strip_charset(css: &str) -> &str {
    CHARSET.find(css).map_or(css, |m| &css[m.end()..])
}

/// Textual CSS compressor.
///
/// Removes comments and line breaks and squeezes whitespace around
/// `{ } ; ,` and after `:`. Used when a stylesheet cannot be parsed.
pub fn compress_css(css: &str) -> String {
    let css = COMMENT.replace_all(css, "");
    let css = WHITESPACE.replace_all(&css, " ");
    let css = AROUND_PUNCT.replace_all(&css, "$1");
    css.replace(": ", ":").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minify_js_keeps_globals() {
        let out = minify_js("function greet(name) {\n  return 'hi ' + name;\n}\n").unwrap();
        assert!(out.contains("greet"));
        assert!(!out.contains("  return"));
    }

    #[test]
    fn test_minify_js_rejects_invalid() {
        assert!(minify_js("function (").is_none());
    }

    #[test]
    fn test_minify_html_keeps_anchors() {
        let out = minify_html("<html>\n<head>\n<title>x</title>\n</head>\n<body>\n<p>a</p>\n</body>\n</html>");
        assert!(out.contains("</head>"));
        assert!(out.contains("</body>"));
    }

    #[test]
    fn test_strip_charset() {
        assert_eq!(strip_charset("@charset \"utf-8\";\nbody{}"), "body{}");
        assert_eq!(strip_charset("@CHARSET 'UTF-8'; a{}"), "a{}");
        assert_eq!(strip_charset("body{}"), "body{}");
    }

    #[test]
    fn test_compress_css() {
        let css = "/* header */\r\nbody {\r\n  color: red;\r\n  margin: 0 , 1px;\r\n}\r\n\r\na { b: c }";
        assert_eq!(compress_css(css), "body{color:red;margin:0,1px;}a{b:c}");
    }
}
