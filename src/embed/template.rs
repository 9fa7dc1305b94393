//! Template types for typed variable injection.

use std::marker::PhantomData;

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

/// Replace every placeholder in a single left-to-right pass.
///
/// Substituted values are never rescanned, so user content that happens to
/// contain a placeholder name is left alone.
pub fn substitute(content: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(content.len());
    let mut rest = content;

    while let Some((pos, key, value)) = vars
        .iter()
        .filter_map(|&(key, value)| rest.find(key).map(|pos| (pos, key, value)))
        .min_by_key(|&(pos, ..)| pos)
    {
        out.push_str(&rest[..pos]);
        out.push_str(value);
        rest = &rest[pos + key.len()..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_all_occurrences() {
        let out = substitute("<__A__|__B__|__A__>", &[("__A__", "1"), ("__B__", "2")]);
        assert_eq!(out, "<1|2|1>");
    }

    #[test]
    fn test_substitute_does_not_rescan_values() {
        let out = substitute("__A__ __B__", &[("__A__", "__B__"), ("__B__", "x")]);
        assert_eq!(out, "__B__ x");
    }

    #[test]
    fn test_substitute_without_placeholders() {
        assert_eq!(substitute("plain", &[("__A__", "1")]), "plain");
    }
}
