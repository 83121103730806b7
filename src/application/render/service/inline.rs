//! CSS inlining built on `lol_html`.
//!
//! Rules from every `<style>` element are copied into the `style` attribute of
//! the elements they match. Rules that cannot be expressed inline (at-rules,
//! pseudo-classes, selectors `lol_html` does not understand) are kept in a
//! single `<style>` element appended to `<head>`.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use lol_html::{RewriteStrSettings, Selector, element, html_content::ContentType, rewrite_str, text};

use crate::application::render::types::{CssInliner, CssInliningError};

const MATCH_ATTRIBUTE: &str = "data-mailsmith-inline";
const MATCH_SELECTOR: &str = "[data-mailsmith-inline]";

/// Default [`CssInliner`] implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct StyleInliner;

impl CssInliner for StyleInliner {
    fn inline(&self, html: &str) -> Result<String, CssInliningError> {
        let css = collect_stylesheets(html)?;
        if css.trim().is_empty() {
            return Ok(html.to_string());
        }

        let blocks = parse_stylesheet(&css)?;
        let Partitioned { rules, leftover } = partition(blocks);

        let tagged = tag_matches(html, &rules)?;
        apply_styles(&tagged, &rules, &leftover)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Declaration {
    property: String,
    value: String,
    important: bool,
}

impl Declaration {
    fn render(&self) -> String {
        if self.important {
            format!("{}: {} !important", self.property, self.value)
        } else {
            format!("{}: {}", self.property, self.value)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CssBlock {
    Rule {
        selectors: String,
        declarations: Vec<Declaration>,
    },
    Verbatim(String),
}

#[derive(Debug, Clone)]
struct InlineRule {
    selector: String,
    specificity: (u32, u32, u32),
    declarations: Vec<Declaration>,
}

struct Partitioned {
    rules: Vec<InlineRule>,
    leftover: String,
}

fn rewrite_error(err: impl std::fmt::Display) -> CssInliningError {
    CssInliningError::Rewrite {
        message: err.to_string(),
    }
}

fn stylesheet_error(message: impl Into<String>) -> CssInliningError {
    CssInliningError::Stylesheet {
        message: message.into(),
    }
}

fn collect_stylesheets(html: &str) -> Result<String, CssInliningError> {
    let css = Rc::new(RefCell::new(String::new()));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![text!("style", {
                let css = Rc::clone(&css);
                move |chunk| {
                    let mut css = css.borrow_mut();
                    css.push_str(chunk.as_str());
                    if chunk.last_in_text_node() {
                        css.push('\n');
                    }
                    Ok(())
                }
            })],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(rewrite_error)?;

    Ok(css.take())
}

fn partition(blocks: Vec<CssBlock>) -> Partitioned {
    let mut rules = Vec::new();
    let mut leftover = Vec::new();

    for block in blocks {
        match block {
            CssBlock::Verbatim(text) => leftover.push(text),
            CssBlock::Rule {
                selectors,
                declarations,
            } => {
                let mut kept = Vec::new();
                for selector in split_top_level(&selectors, ',') {
                    let selector = selector.trim();
                    if selector.is_empty() {
                        continue;
                    }
                    if is_inlinable(selector) {
                        rules.push(InlineRule {
                            selector: selector.to_string(),
                            specificity: specificity(selector),
                            declarations: declarations.clone(),
                        });
                    } else {
                        kept.push(selector);
                    }
                }

                if !kept.is_empty() {
                    let body = declarations
                        .iter()
                        .map(Declaration::render)
                        .collect::<Vec<_>>()
                        .join("; ");
                    leftover.push(format!("{} {{ {} }}", kept.join(", "), body));
                }
            }
        }
    }

    Partitioned {
        rules,
        leftover: leftover.join("\n"),
    }
}

fn is_inlinable(selector: &str) -> bool {
    !selector.contains(':') && selector.parse::<Selector>().is_ok()
}

fn tag_matches(html: &str, rules: &[InlineRule]) -> Result<String, CssInliningError> {
    // The marker is reserved: markup that already carries it must not pick up
    // rules it does not match. Handlers run in registration order, so the
    // strip happens before any rule tags the element.
    let mut handlers = vec![element!(MATCH_SELECTOR, |el| {
        el.remove_attribute(MATCH_ATTRIBUTE);
        Ok(())
    })];

    // Selectors were validated by `is_inlinable`, so the macro's parse cannot fail.
    handlers.extend(rules.iter().enumerate().map(|(index, rule)| {
        element!(rule.selector.as_str(), move |el| {
            let tagged = match el.get_attribute(MATCH_ATTRIBUTE) {
                Some(existing) => format!("{existing} {index}"),
                None => index.to_string(),
            };
            el.set_attribute(MATCH_ATTRIBUTE, &tagged)?;
            Ok(())
        })
    }));

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: handlers,
            ..RewriteStrSettings::default()
        },
    )
    .map_err(rewrite_error)
}

fn apply_styles(
    html: &str,
    rules: &[InlineRule],
    leftover: &str,
) -> Result<String, CssInliningError> {
    let head_seen = Rc::new(Cell::new(false));
    let leftover_element = (!leftover.trim().is_empty())
        .then(|| format!("<style type=\"text/css\">\n{leftover}\n</style>"));

    let rewritten = rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![
                element!(MATCH_SELECTOR, |el| {
                    let indices = el.get_attribute(MATCH_ATTRIBUTE).unwrap_or_default();
                    el.remove_attribute(MATCH_ATTRIBUTE);

                    let mut matched: Vec<(usize, &InlineRule)> = indices
                        .split_whitespace()
                        .filter_map(|raw| raw.parse::<usize>().ok())
                        .filter_map(|index| rules.get(index).map(|rule| (index, rule)))
                        .collect();
                    matched.sort_by_key(|(index, rule)| (rule.specificity, *index));

                    let inline = el
                        .get_attribute("style")
                        .map(|style| parse_declarations(&style))
                        .unwrap_or_default();

                    let merged = cascade(
                        matched
                            .iter()
                            .flat_map(|(_, rule)| rule.declarations.iter().cloned()),
                        inline,
                    );
                    if !merged.is_empty() {
                        let style = merged
                            .iter()
                            .map(Declaration::render)
                            .collect::<Vec<_>>()
                            .join("; ");
                        el.set_attribute("style", &style)?;
                    }
                    Ok(())
                }),
                element!("style", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("head", {
                    let head_seen = Rc::clone(&head_seen);
                    let leftover_element = leftover_element.clone();
                    move |el| {
                        if !head_seen.replace(true)
                            && let Some(style) = leftover_element.as_deref()
                        {
                            el.append(style, ContentType::Html);
                        }
                        Ok(())
                    }
                }),
            ],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(rewrite_error)?;

    match leftover_element {
        Some(style) if !head_seen.get() => Ok(format!("{style}\n{rewritten}")),
        _ => Ok(rewritten),
    }
}

/// Merge rule declarations (already in cascade order) with the element's own
/// inline declarations.
fn cascade(
    rule_declarations: impl Iterator<Item = Declaration>,
    inline: Vec<Declaration>,
) -> Vec<Declaration> {
    let mut merged: Vec<Declaration> = Vec::new();
    for declaration in rule_declarations.chain(inline) {
        if let Some(position) = merged
            .iter()
            .position(|existing| existing.property.eq_ignore_ascii_case(&declaration.property))
        {
            if merged[position].important && !declaration.important {
                continue;
            }
            merged.remove(position);
        }
        merged.push(declaration);
    }
    merged
}

fn parse_stylesheet(css: &str) -> Result<Vec<CssBlock>, CssInliningError> {
    let stripped = strip_comments(css);
    let mut blocks = Vec::new();
    let mut rest = stripped.as_str();

    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }

        let (index, delimiter) = find_top_level(rest, &['{', ';', '}']).ok_or_else(|| {
            stylesheet_error(format!("unterminated rule near `{}`", excerpt(rest)))
        })?;

        match delimiter {
            '}' => {
                return Err(stylesheet_error(format!(
                    "unexpected `}}` near `{}`",
                    excerpt(rest)
                )));
            }
            ';' => {
                let statement = rest[..=index].trim();
                if statement.starts_with('@') {
                    blocks.push(CssBlock::Verbatim(statement.to_string()));
                }
                rest = &rest[index + 1..];
            }
            _ => {
                let close = matching_brace(rest, index).ok_or_else(|| {
                    stylesheet_error(format!("unbalanced braces near `{}`", excerpt(rest)))
                })?;
                let prelude = rest[..index].trim();
                if prelude.starts_with('@') {
                    blocks.push(CssBlock::Verbatim(rest[..=close].trim().to_string()));
                } else {
                    blocks.push(CssBlock::Rule {
                        selectors: prelude.to_string(),
                        declarations: parse_declarations(&rest[index + 1..close]),
                    });
                }
                rest = &rest[close + 1..];
            }
        }
    }

    Ok(blocks)
}

fn parse_declarations(body: &str) -> Vec<Declaration> {
    split_top_level(body, ';')
        .into_iter()
        .filter_map(|raw| {
            let (property, value) = raw.split_once(':')?;
            let property = property.trim();
            let mut value = value.trim();
            if property.is_empty() || value.is_empty() {
                return None;
            }

            let mut important = false;
            if let Some(bang) = value.rfind('!')
                && value[bang + 1..].trim().eq_ignore_ascii_case("important")
            {
                important = true;
                value = value[..bang].trim_end();
            }

            Some(Declaration {
                property: property.to_string(),
                value: value.to_string(),
                important,
            })
        })
        .collect()
}

fn strip_comments(css: &str) -> String {
    let mut output = String::with_capacity(css.len());
    let mut chars = css.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(ch) = chars.next() {
        if let Some(open) = quote {
            output.push(ch);
            if ch == '\\' {
                if let Some(escaped) = chars.next() {
                    output.push(escaped);
                }
            } else if ch == open {
                quote = None;
            }
            continue;
        }

        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                output.push(ch);
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut previous = '\0';
                for inner in chars.by_ref() {
                    if previous == '*' && inner == '/' {
                        break;
                    }
                    previous = inner;
                }
                output.push(' ');
            }
            _ => output.push(ch),
        }
    }

    output
}

/// Position of the first delimiter outside quotes, parentheses and brackets.
fn find_top_level(input: &str, delimiters: &[char]) -> Option<(usize, char)> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 0usize;

    for (index, ch) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        if ch == '\\' {
            escaped = true;
            continue;
        }
        if let Some(open) = quote {
            if ch == open {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            _ if depth == 0 && delimiters.contains(&ch) => return Some((index, ch)),
            _ => {}
        }
    }

    None
}

fn matching_brace(input: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut offset = open;

    loop {
        let (relative, ch) = find_top_level(&input[offset..], &['{', '}'])?;
        let index = offset + relative;
        if ch == '{' {
            depth += 1;
        } else {
            depth -= 1;
            if depth == 0 {
                return Some(index);
            }
        }
        offset = index + 1;
    }
}

fn split_top_level(input: &str, separator: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut rest = input;
    while let Some((index, _)) = find_top_level(rest, &[separator]) {
        parts.push(&rest[..index]);
        rest = &rest[index + separator.len_utf8()..];
    }
    if !rest.trim().is_empty() {
        parts.push(rest);
    }
    parts
}

/// `(ids, classes + attributes, type selectors)` for a selector without pseudo-classes.
fn specificity(selector: &str) -> (u32, u32, u32) {
    let mut ids = 0;
    let mut classes = 0;
    let mut types = 0;
    let mut compound_start = true;
    let mut chars = selector.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '#' => {
                ids += 1;
                skip_identifier(&mut chars);
                compound_start = false;
            }
            '.' => {
                classes += 1;
                skip_identifier(&mut chars);
                compound_start = false;
            }
            '[' => {
                classes += 1;
                for inner in chars.by_ref() {
                    if inner == ']' {
                        break;
                    }
                }
                compound_start = false;
            }
            '*' => compound_start = false,
            c if c.is_whitespace() || matches!(c, '>' | '+' | '~') => compound_start = true,
            c if compound_start && (c.is_alphabetic() || c == '_') => {
                types += 1;
                skip_identifier(&mut chars);
                compound_start = false;
            }
            _ => {}
        }
    }

    (ids, classes, types)
}

fn skip_identifier(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while chars
        .peek()
        .is_some_and(|c| c.is_alphanumeric() || matches!(c, '-' | '_'))
    {
        chars.next();
    }
}

fn excerpt(input: &str) -> String {
    input.chars().take(40).collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inline(html: &str) -> String {
        StyleInliner.inline(html).expect("inlining succeeds")
    }

    #[test]
    fn inlines_class_rules_and_drops_style_element() {
        let html = inline(
            "<html><head><style>.button { color: #fff; padding: 4px; }</style></head>\
             <body><a class=\"button\" href=\"https://example.com/\">Go</a></body></html>",
        );

        assert!(html.contains("style=\"color: #fff; padding: 4px\""));
        assert!(!html.contains("<style"));
        assert!(!html.contains(MATCH_ATTRIBUTE));
    }

    #[test]
    fn existing_inline_declarations_win_over_rules() {
        let html = inline(
            "<head><style>p { color: red; margin: 0; }</style></head>\
             <body><p style=\"color: blue\">Hi</p></body>",
        );

        assert!(html.contains("style=\"margin: 0; color: blue\""));
    }

    #[test]
    fn important_rules_win_over_inline_declarations() {
        let html = inline(
            "<head><style>p { color: red !important; }</style></head>\
             <body><p style=\"color: blue\">Hi</p></body>",
        );

        assert!(html.contains("style=\"color: red !important\""));
    }

    #[test]
    fn higher_specificity_wins_regardless_of_order() {
        let html = inline(
            "<head><style>#hero { color: green; } .title { color: red; } p { color: gray; }</style></head>\
             <body><p id=\"hero\" class=\"title\">Hi</p></body>",
        );

        assert!(html.contains("style=\"color: green\""));
    }

    #[test]
    fn later_rules_win_on_equal_specificity() {
        let html = inline(
            "<head><style>.a { color: red; } .b { color: blue; }</style></head>\
             <body><p class=\"a b\">Hi</p></body>",
        );

        assert!(html.contains("style=\"color: blue\""));
    }

    #[test]
    fn media_queries_and_pseudo_classes_stay_in_head() {
        let html = inline(
            "<html><head><style>\
             a:hover { color: red; }\
             @media only screen and (max-width: 600px) { .wrapper { width: 100% !important; } }\
             .wrapper { width: 570px; }\
             </style></head><body><div class=\"wrapper\">x</div></body></html>",
        );

        assert!(html.contains("style=\"width: 570px\""));
        assert!(html.contains("a:hover { color: red }"));
        assert!(html.contains("@media only screen and (max-width: 600px)"));
        assert_eq!(html.matches("<style").count(), 1);
        let head_end = html.find("</head>").expect("head is kept");
        assert!(html.find("<style").expect("leftover style") < head_end);
    }

    #[test]
    fn comments_are_ignored() {
        let html = inline(
            "<head><style>/* brand */ .logo { /* inner */ font-weight: bold; }</style></head>\
             <body><span class=\"logo\">Acme</span></body>",
        );

        assert!(html.contains("style=\"font-weight: bold\""));
    }

    #[test]
    fn documents_without_styles_are_unchanged() {
        let source = "<html><body><p class=\"x\">Plain</p></body></html>";
        assert_eq!(inline(source), source);
    }

    #[test]
    fn leftover_rules_are_prepended_without_head() {
        let html = inline("<style>a:hover { color: red; }</style><p>Hi</p>");

        assert!(html.starts_with("<style type=\"text/css\">"));
        assert!(html.contains("<p>Hi</p>"));
    }

    #[test]
    fn existing_marker_attributes_do_not_attract_rules() {
        let html = inline(
            "<html><head><style>p { color: red; }</style></head>\
             <body><span data-mailsmith-inline=\"0\">Note</span><p>Body</p></body></html>",
        );

        assert!(html.contains("<span>Note</span>"), "{html}");
        assert!(html.contains("<p style=\"color: red\">Body</p>"), "{html}");
        assert!(!html.contains(MATCH_ATTRIBUTE));
    }

    #[test]
    fn unbalanced_stylesheet_is_an_error() {
        let err = StyleInliner
            .inline("<head><style>.a { color: red;</style></head><p class=\"a\">x</p>")
            .expect_err("unbalanced braces");

        assert!(matches!(err, CssInliningError::Stylesheet { .. }));
    }

    #[test]
    fn data_uris_keep_their_semicolons() {
        let declarations = parse_declarations(
            "background: url(data:image/png;base64,AAAA) no-repeat; color: red",
        );

        assert_eq!(declarations.len(), 2);
        assert_eq!(
            declarations[0].value,
            "url(data:image/png;base64,AAAA) no-repeat"
        );
    }

    #[test]
    fn specificity_counts_ids_classes_and_types() {
        assert_eq!(specificity("body"), (0, 0, 1));
        assert_eq!(specificity(".email-body .content-cell p"), (0, 2, 1));
        assert_eq!(specificity("#main > td.cell[data-x]"), (1, 2, 1));
        assert_eq!(specificity("*"), (0, 0, 0));
    }
}
