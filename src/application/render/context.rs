//! Template environment and the values bound for every render.

use minijinja::{AutoEscape, Environment, Error, HtmlEscape, UndefinedBehavior, Value, value::Rest};
use serde::Serialize;

use crate::domain::{
    content::{EmailContent, Markdown},
    engine::{EngineConfig, Product},
};

use super::service::markdown_to_html;

/// Engine values visible to templates under `engine`.
#[derive(Debug, Serialize)]
pub struct EngineView<'a> {
    pub theme: &'a str,
    pub text_direction: &'a str,
    pub product: &'a Product,
    pub disable_css_inlining: bool,
}

impl<'a> EngineView<'a> {
    pub fn new(theme: &'a str, config: &'a EngineConfig) -> Self {
        Self {
            theme,
            text_direction: config
                .text_direction
                .as_ref()
                .map_or("ltr", |direction| direction.as_str()),
            product: &config.product,
            disable_css_inlining: config.disable_css_inlining,
        }
    }
}

/// Root namespace of every template.
#[derive(Debug, Serialize)]
pub struct TemplateContext<'a> {
    pub engine: EngineView<'a>,
    pub email: &'a EmailContent,
}

/// Build the environment shared by the HTML and plain-text templates.
///
/// Output is HTML-escaped in both cases; the plain-text rendering is reduced
/// to text afterwards. Referencing a field that does not exist is an error.
pub fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::Html);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);

    env.add_function("safe", safe);
    env.add_function("url", url);
    env.add_function("lookup", lookup);
    env.add_function("coalesce", coalesce);

    env.add_filter("markdown", markdown);
    env.add_filter("trunc", trunc);
    env.add_filter("nospace", nospace);
    env.add_filter("snakecase", snakecase);
    env.add_filter("kebabcase", kebabcase);
    env.add_filter("repeat", repeat);
    env
}

fn safe(value: String) -> Value {
    Value::from_safe_string(value)
}

/// Normalise absolute URLs; anything that does not parse is returned as-is.
///
/// The result is attribute-safe and marked safe so slashes stay readable.
fn url(value: String) -> Value {
    let normalized = match url::Url::parse(value.trim()) {
        Ok(parsed) => parsed.to_string(),
        Err(_) => value,
    };
    Value::from_safe_string(escape_attribute(&normalized))
}

/// `HtmlEscape` with slashes put back. A literal `&#x2f;` in the input has
/// its `&` escaped, so only escaped slashes match.
fn escape_attribute(value: &str) -> String {
    HtmlEscape(value).to_string().replace("&#x2f;", "/")
}

fn lookup(map: &Value, key: &str) -> Result<Value, Error> {
    if map.is_none() || map.is_undefined() {
        return Ok(Value::from(()));
    }
    let value = map.get_item(&Value::from(key))?;
    Ok(if value.is_undefined() {
        Value::from(())
    } else {
        value
    })
}

fn coalesce(values: Rest<Value>) -> Value {
    values
        .iter()
        .find(|value| value.is_true())
        .cloned()
        .unwrap_or_else(|| Value::from(()))
}

fn markdown(source: Option<String>) -> Value {
    let html = source
        .map(|source| markdown_to_html(&Markdown::new(source)))
        .unwrap_or_default();
    Value::from_safe_string(html)
}

fn trunc(value: &str, length: usize) -> String {
    value.chars().take(length).collect()
}

fn nospace(value: &str) -> String {
    value.chars().filter(|c| !c.is_whitespace()).collect()
}

fn kebabcase(value: &str) -> String {
    slug::slugify(value)
}

fn snakecase(value: &str) -> String {
    slug::slugify(value).replace('-', "_")
}

fn repeat(value: &str, count: usize) -> String {
    value.repeat(count)
}
