//! Tokenizer and recursive-descent parser for the template grammar:
//! `{namespace.property}`, `{ns.prop::modifier}`, `{ns.prop::modifier(arg)}`
//! and `{ns.prop::modifier[truthy||falsy]}`, where branch bodies are full
//! sub-templates.

use super::{Branches, Modifier, Placeholder, Segment, Template, TemplateError};

pub(super) fn parse(input: &str) -> Result<Template, TemplateError> {
    let chars: Vec<char> = input.chars().collect();
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '{' {
            let close = matching_brace(&chars, i)
                .ok_or(TemplateError::UnclosedPlaceholder { position: i })?;
            let inner: String = chars[i + 1..close].iter().collect();
            if let Some(placeholder) = parse_placeholder(&inner, i)? {
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                segments.push(Segment::Placeholder(placeholder));
            } else {
                // Braced text that is not namespace.property shaped is kept
                // verbatim.
                text.push('{');
                text.push_str(&inner);
                text.push('}');
            }
            i = close + 1;
        } else {
            text.push(chars[i]);
            i += 1;
        }
    }
    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(Template { segments })
}

/// Index of the `}` matching the `{` at `open`, honoring nesting.
fn matching_brace(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, &c) in chars[open..].iter().enumerate() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn matching_bracket(chars: &[char], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (offset, &c) in chars[open..].iter().enumerate() {
        match c {
            '[' => depth += 1,
            ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn is_ident(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// `Ok(None)` means the braced text is not a placeholder and should stay
/// literal; errors are reserved for text that is unmistakably a placeholder
/// with broken modifier syntax.
fn parse_placeholder(
    inner: &str,
    position: usize,
) -> Result<Option<Placeholder>, TemplateError> {
    let (head, modifier_src) = match inner.find("::") {
        Some(idx) => (&inner[..idx], Some(&inner[idx + 2..])),
        None => (inner, None),
    };
    let Some(dot) = head.find('.') else {
        return Ok(None);
    };
    let namespace = &head[..dot];
    let property = &head[dot + 1..];
    if !is_ident(namespace) || !is_ident(property) {
        return Ok(None);
    }

    let modifier = match modifier_src {
        Some(src) => Some(parse_modifier(src, position)?),
        None => None,
    };
    Ok(Some(Placeholder {
        namespace: namespace.to_string(),
        property: property.to_string(),
        modifier,
    }))
}

fn parse_modifier(src: &str, position: usize) -> Result<Modifier, TemplateError> {
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    let mut raw_name = String::new();
    while i < chars.len() && chars[i] != '(' && chars[i] != '[' {
        raw_name.push(chars[i]);
        i += 1;
    }
    let (name, mut arg) = split_comparison(&raw_name);

    if i < chars.len() && chars[i] == '(' {
        let close = chars[i..]
            .iter()
            .position(|&c| c == ')')
            .map(|offset| i + offset)
            .ok_or(TemplateError::UnclosedArgument { position })?;
        arg = Some(chars[i + 1..close].iter().collect());
        i = close + 1;
    }

    let branches = if i < chars.len() && chars[i] == '[' {
        let close =
            matching_bracket(&chars, i).ok_or(TemplateError::UnclosedBranch { position })?;
        let body: String = chars[i + 1..close].iter().collect();
        let (truthy, falsy) = split_branches(&body);
        Some(Branches {
            truthy: parse(&truthy)?,
            falsy: parse(&falsy)?,
        })
    } else {
        None
    };

    Ok(Modifier { name, arg, branches })
}

/// Comparison and string-test modifiers carry their operand inline
/// (`>=10`, `=1080p`, `~remux`); everything else is a plain word.
fn split_comparison(raw: &str) -> (String, Option<String>) {
    for op in [">=", "<=", ">", "<", "=", "$", "^", "~"] {
        if let Some(rest) = raw.strip_prefix(op) {
            let operand = (!rest.is_empty()).then(|| rest.to_string());
            return (op.to_string(), operand);
        }
    }
    (raw.to_string(), None)
}

/// Splits a branch body on the first `||` that sits outside any nested
/// bracket or placeholder. A body without a separator is all-truthy.
fn split_branches(body: &str) -> (String, String) {
    let chars: Vec<char> = body.chars().collect();
    let mut bracket_depth = 0usize;
    let mut brace_depth = 0usize;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '[' => bracket_depth += 1,
            ']' => bracket_depth = bracket_depth.saturating_sub(1),
            '{' => brace_depth += 1,
            '}' => brace_depth = brace_depth.saturating_sub(1),
            '|' if bracket_depth == 0
                && brace_depth == 0
                && chars.get(i + 1) == Some(&'|') =>
            {
                let truthy: String = chars[..i].iter().collect();
                let falsy: String = chars[i + 2..].iter().collect();
                return (truthy, falsy);
            }
            _ => {}
        }
        i += 1;
    }
    (body.to_string(), String::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn only_placeholder(template: &Template) -> &Placeholder {
        match template.segments.as_slice() {
            [Segment::Placeholder(p)] => p,
            other => panic!("expected a single placeholder, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_placeholder() {
        let t = parse("{stream.resolution}").unwrap();
        let p = only_placeholder(&t);
        assert_eq!(p.namespace, "stream");
        assert_eq!(p.property, "resolution");
        assert!(p.modifier.is_none());
    }

    #[test]
    fn test_modifier_with_argument() {
        let t = parse("{stream.languages::join(, )}").unwrap();
        let p = only_placeholder(&t);
        let m = p.modifier.as_ref().unwrap();
        assert_eq!(m.name, "join");
        assert_eq!(m.arg.as_deref(), Some(", "));
        assert!(m.branches.is_none());
    }

    #[test]
    fn test_comparison_operand_is_inline() {
        let t = parse("{stream.seeders::>=10[a||b]}").unwrap();
        let m = only_placeholder(&t).modifier.as_ref().unwrap();
        assert_eq!(m.name, ">=");
        assert_eq!(m.arg.as_deref(), Some("10"));
        let b = m.branches.as_ref().unwrap();
        assert_eq!(b.truthy, parse("a").unwrap());
        assert_eq!(b.falsy, parse("b").unwrap());
    }

    #[test]
    fn test_branches_parse_nested_placeholders() {
        let t = parse("{stream.title::exists[{stream.title::upper}||none]}").unwrap();
        let m = only_placeholder(&t).modifier.as_ref().unwrap();
        let b = m.branches.as_ref().unwrap();
        let inner = only_placeholder(&b.truthy);
        assert_eq!(inner.property, "title");
        assert_eq!(inner.modifier.as_ref().unwrap().name, "upper");
    }

    #[test]
    fn test_separator_inside_nested_placeholder_is_ignored() {
        // The || inside the nested branch must not split the outer one.
        let t =
            parse("{stream.title::exists[{stream.year::exists[y||n]}||outer]}").unwrap();
        let m = only_placeholder(&t).modifier.as_ref().unwrap();
        let b = m.branches.as_ref().unwrap();
        assert_eq!(b.falsy, parse("outer").unwrap());
    }

    #[test]
    fn test_branch_without_separator_is_all_truthy() {
        let t = parse("{stream.title::exists[yes]}").unwrap();
        let b = only_placeholder(&t)
            .modifier
            .as_ref()
            .unwrap()
            .branches
            .as_ref()
            .unwrap();
        assert_eq!(b.truthy, parse("yes").unwrap());
        assert_eq!(b.falsy, parse("").unwrap());
    }

    #[test]
    fn test_unclosed_bracket_is_an_error() {
        assert_eq!(
            parse("{stream.title::exists[yes||no}"),
            Err(TemplateError::UnclosedBranch { position: 0 })
        );
    }

    #[test]
    fn test_text_around_placeholders() {
        let t = parse("pre {addon.name} post").unwrap();
        assert_eq!(t.segments.len(), 3);
        assert!(matches!(&t.segments[0], Segment::Text(s) if s == "pre "));
        assert!(matches!(&t.segments[2], Segment::Text(s) if s == " post"));
    }

    #[test]
    fn test_non_placeholder_braces_stay_literal() {
        let t = parse("{not a placeholder}").unwrap();
        assert_eq!(
            t.segments,
            vec![Segment::Text("{not a placeholder}".to_string())]
        );
    }
}
