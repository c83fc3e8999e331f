//! User-authored template DSL for rendering stream listings.
//!
//! Templates are untrusted input: parsing returns a typed error for the
//! authoring UI, but rendering an already-parsed template never fails —
//! unknown namespaces, properties and modifiers come out as literal markers
//! in the output text so authors can see exactly what went wrong.
//!
//! A template is parsed once into an explicit AST; ternary branch texts are
//! themselves parsed sub-templates and evaluation is plain mutual recursion
//! over that tree, so complexity is bounded by the template size.

pub mod eval;
mod parse;

pub use eval::{FormatterContext, Value};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unclosed placeholder starting at character {position}")]
    UnclosedPlaceholder { position: usize },

    #[error("unclosed modifier argument at character {position}")]
    UnclosedArgument { position: usize },

    #[error("unclosed conditional branch at character {position}")]
    UnclosedBranch { position: usize },
}

/// A parsed template, ready to render any number of streams.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Placeholder(Placeholder),
}

#[derive(Debug, Clone, PartialEq)]
struct Placeholder {
    namespace: String,
    property: String,
    modifier: Option<Modifier>,
}

#[derive(Debug, Clone, PartialEq)]
struct Modifier {
    name: String,
    arg: Option<String>,
    branches: Option<Branches>,
}

/// Recursively parsed `[T||F]` branch templates.
#[derive(Debug, Clone, PartialEq)]
struct Branches {
    truthy: Template,
    falsy: Template,
}

impl Template {
    pub fn parse(input: &str) -> Result<Self, TemplateError> {
        parse::parse(input)
    }

    /// Evaluates against one stream and applies post-processing. Never
    /// fails; resolution problems become literal markers in the output.
    #[must_use]
    pub fn render(&self, ctx: &FormatterContext) -> String {
        postprocess(&self.evaluate(ctx))
    }

    fn evaluate(&self, ctx: &FormatterContext) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Placeholder(p) => out.push_str(&eval::placeholder(p, ctx)),
            }
        }
        out
    }
}

/// One-shot parse and render.
pub fn render(template: &str, ctx: &FormatterContext) -> Result<String, TemplateError> {
    Ok(Template::parse(template)?.render(ctx))
}

/// Line-level cleanup after substitution: unescape literal `\n`, drop lines
/// that are blank or carry the remove-line marker, expand the new-line
/// marker last so templates can still force a blank line through.
fn postprocess(rendered: &str) -> String {
    let unescaped = rendered.replace("\\n", "\n");
    let kept: Vec<&str> = unescaped
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.contains("{tools.removeLine}"))
        .collect();
    kept.join("\n").replace("{tools.newLine}", "\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Addon, ParsedStream, Provider};

    fn stream() -> ParsedStream {
        let mut s = ParsedStream {
            addon: Addon {
                id: "torrentio".to_string(),
                name: "Torrentio".to_string(),
            },
            size: Some(1_610_612_736),
            seeders: Some(42),
            provider: Some(Provider {
                id: "realdebrid".to_string(),
                cached: Some(true),
            }),
            ..ParsedStream::default()
        };
        s.file.resolution = "1080p".to_string();
        s.file.languages = vec!["English".to_string(), "French".to_string()];
        s
    }

    fn render_with(template: &str, s: &ParsedStream) -> String {
        let ctx = FormatterContext::new(s);
        render(template, &ctx).unwrap()
    }

    #[test]
    fn test_plain_property() {
        assert_eq!(render_with("{stream.resolution}", &stream()), "1080p");
    }

    #[test]
    fn test_join_with_separator() {
        assert_eq!(
            render_with("{stream.languages::join(, )}", &stream()),
            "English, French"
        );
    }

    #[test]
    fn test_unknown_property_marker() {
        assert_eq!(render_with("{stream.nope}", &stream()), "{unknown_value}");
    }

    #[test]
    fn test_unknown_namespace_marker() {
        assert_eq!(render_with("{nope.thing}", &stream()), "{unknown_type}");
    }

    #[test]
    fn test_unknown_modifier_marker() {
        assert_eq!(
            render_with("{stream.resolution::frobnicate}", &stream()),
            "{unknown_string_modifier(frobnicate)}"
        );
    }

    #[test]
    fn test_remove_line_marker_drops_line() {
        let out = render_with("first\n{tools.removeLine}\nlast", &stream());
        assert_eq!(out, "first\nlast");
    }

    #[test]
    fn test_blank_lines_dropped() {
        let out = render_with("first\n   \n\nlast", &stream());
        assert_eq!(out, "first\nlast");
    }

    #[test]
    fn test_conditional_branch_suppresses_line() {
        let s = stream();
        let template = "{stream.message::exists[{stream.message}||{tools.removeLine}]}\n{stream.resolution}";
        assert_eq!(render_with(template, &s), "1080p");

        let mut with_message = stream();
        with_message.message = Some("cached".to_string());
        assert_eq!(render_with(template, &with_message), "cached\n1080p");
    }

    #[test]
    fn test_ternary_branches_are_recursive_templates() {
        let out = render_with(
            "{stream.seeders::>=10[hot {stream.resolution}||cold]}",
            &stream(),
        );
        assert_eq!(out, "hot 1080p");
    }

    #[test]
    fn test_number_comparison_false_branch() {
        let out = render_with("{stream.seeders::>100[many||few]}", &stream());
        assert_eq!(out, "few");
    }

    #[test]
    fn test_bytes_modifier() {
        assert_eq!(render_with("{stream.size::bytes}", &stream()), "1.50 GiB");
    }

    #[test]
    fn test_provider_namespace() {
        assert_eq!(
            render_with("{provider.id} {provider.cached::istrue[⚡||⏳]}", &stream()),
            "realdebrid ⚡"
        );
    }

    #[test]
    fn test_newline_marker_survives_line_filter() {
        let out = render_with("a{tools.newLine}b", &stream());
        assert_eq!(out, "a\nb");
    }

    #[test]
    fn test_escaped_newline_unescaped() {
        let out = render_with("a\\nb", &stream());
        assert_eq!(out, "a\nb");
    }

    #[test]
    fn test_string_equality_modifier() {
        assert_eq!(
            render_with("{stream.resolution::=1080p[FHD||other]}", &stream()),
            "FHD"
        );
        assert_eq!(
            render_with("{stream.resolution::=2160p[UHD||other]}", &stream()),
            "other"
        );
    }

    #[test]
    fn test_parse_error_on_unclosed_placeholder() {
        let ctx_stream = stream();
        let ctx = FormatterContext::new(&ctx_stream);
        assert!(matches!(
            render("{stream.resolution", &ctx),
            Err(TemplateError::UnclosedPlaceholder { .. })
        ));
    }

    #[test]
    fn test_literal_braces_without_dot_pass_through() {
        assert_eq!(render_with("set {x} theory", &stream()), "set {x} theory");
    }
}
