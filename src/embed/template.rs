//! Template types for typed variable injection.
//!
//! Two flavours live here:
//! - `Template<V>`: compile-time embedded content with typed variables
//! - `render_placeholders()`: `{{ name }}` substitution for user pages

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Trait for template variable sets
pub trait TemplateVars {
    fn apply(&self, content: &str) -> String;
}

/// Template with typed variable injection
#[derive(Debug, Clone, Copy)]
pub struct Template<V> {
    content: &'static str,
    _marker: PhantomData<V>,
}

impl<V> Template<V> {
    pub const fn new(content: &'static str) -> Self {
        Self {
            content,
            _marker: PhantomData,
        }
    }
}

impl<V: TemplateVars> Template<V> {
    pub fn render(&self, vars: &V) -> String {
        vars.apply(self.content)
    }
}

// =============================================================================
// Page placeholders
// =============================================================================

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// Substitute `{{ name }}` placeholders from `vars`.
///
/// Unknown names are left verbatim so a typo stays visible in the page.
/// Values are inserted as-is, nothing is evaluated.
pub fn render_placeholders<'a>(content: &'a str, vars: &BTreeMap<String, String>) -> Cow<'a, str> {
    if vars.is_empty() || !content.contains("{{") {
        return Cow::Borrowed(content);
    }

    PLACEHOLDER.replace_all(content, |caps: &Captures<'_>| match vars.get(&caps[1]) {
        Some(value) => value.clone(),
        None => {
            crate::debug!("render"; "unknown placeholder: {}", &caps[1]);
            caps[0].to_string()
        }
    })
}
