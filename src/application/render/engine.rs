//! The render engine: defaulting, template execution and post-processing.

use std::{sync::Arc, time::Instant};

use metrics::{counter, histogram};
use tracing::{debug, field, info_span};

use crate::domain::{
    content::EmailContent,
    defaults::{apply_content_defaults, apply_engine_defaults},
    engine::EngineConfig,
    theme::Theme,
};

use super::{
    context::{EngineView, TemplateContext, environment},
    service::{Html2TextReducer, StyleInliner},
    types::{CssInliner, RenderError, RenderFormat, RenderedEmail, TextOptions, TextReducer},
};

pub const METRIC_RENDER_TOTAL: &str = "mailsmith_render_total";
pub const METRIC_RENDER_FAILURES_TOTAL: &str = "mailsmith_render_failures_total";
pub const METRIC_RENDER_MS: &str = "mailsmith_render_ms";

/// Values used to fill whatever the caller leaves unset.
#[derive(Debug, Clone, PartialEq)]
pub struct Defaults {
    pub engine: EngineConfig,
    pub content: EmailContent,
}

impl Defaults {
    pub fn builtin() -> Self {
        Self {
            engine: EngineConfig::builtin_defaults(),
            content: EmailContent::builtin_defaults(),
        }
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Turns an [`EmailContent`] into HTML and plain text for the configured theme.
///
/// The renderer is stateless between calls and can be shared across threads.
/// Config and content are defaulted in place, so concurrent renders must use
/// their own copies.
#[derive(Clone)]
pub struct Renderer {
    defaults: Defaults,
    inliner: Arc<dyn CssInliner>,
    reducer: Arc<dyn TextReducer>,
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            defaults: Defaults::builtin(),
            inliner: Arc::new(StyleInliner),
            reducer: Arc::new(Html2TextReducer::default()),
        }
    }

    pub fn with_defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_inliner(mut self, inliner: Arc<dyn CssInliner>) -> Self {
        self.inliner = inliner;
        self
    }

    pub fn with_reducer(mut self, reducer: Arc<dyn TextReducer>) -> Self {
        self.reducer = reducer;
        self
    }

    /// Render the HTML body, inlining CSS unless the config disables it.
    pub fn render_html(
        &self,
        config: &mut EngineConfig,
        content: &mut EmailContent,
    ) -> Result<String, RenderError> {
        self.observe(config, content, RenderFormat::Html)
    }

    /// Render the plain-text body.
    pub fn render_plain_text(
        &self,
        config: &mut EngineConfig,
        content: &mut EmailContent,
    ) -> Result<String, RenderError> {
        self.observe(config, content, RenderFormat::PlainText)
    }

    /// Render both bodies.
    pub fn render(
        &self,
        config: &mut EngineConfig,
        content: &mut EmailContent,
    ) -> Result<RenderedEmail, RenderError> {
        let html = self.render_html(config, content)?;
        let plain_text = self.render_plain_text(config, content)?;
        Ok(RenderedEmail { html, plain_text })
    }

    fn observe(
        &self,
        config: &mut EngineConfig,
        content: &mut EmailContent,
        format: RenderFormat,
    ) -> Result<String, RenderError> {
        let span = info_span!("render_email", format = format.as_str(), theme = field::Empty);
        let _entered = span.enter();
        let started_at = Instant::now();

        let result = self.run(config, content, format);

        let theme = config.theme_name().unwrap_or("unknown").to_string();
        span.record("theme", theme.as_str());
        let elapsed_ms = started_at.elapsed().as_secs_f64() * 1000.0;

        match &result {
            Ok(output) => {
                debug!(bytes = output.len(), elapsed_ms, "Rendered email");
                counter!(
                    METRIC_RENDER_TOTAL,
                    "theme" => theme.clone(),
                    "format" => format.as_str()
                )
                .increment(1);
            }
            Err(err) => {
                debug!(error = %err, "Email rendering failed");
                counter!(
                    METRIC_RENDER_FAILURES_TOTAL,
                    "theme" => theme.clone(),
                    "format" => format.as_str()
                )
                .increment(1);
            }
        }
        histogram!(METRIC_RENDER_MS, "format" => format.as_str()).record(elapsed_ms);

        result
    }

    fn run(
        &self,
        config: &mut EngineConfig,
        content: &mut EmailContent,
        format: RenderFormat,
    ) -> Result<String, RenderError> {
        apply_engine_defaults(config, &self.defaults.engine)?;
        apply_content_defaults(content, &self.defaults.content)?;

        let theme = config.theme.clone().ok_or(RenderError::MissingTheme)?;
        let rendered = execute_template(theme.as_ref(), config, content, format)?;

        match format {
            RenderFormat::Html if config.disable_css_inlining => Ok(rendered),
            RenderFormat::Html => Ok(self.inliner.inline(&rendered)?),
            RenderFormat::PlainText => Ok(self
                .reducer
                .reduce(&rendered, TextOptions::default())?),
        }
    }
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

fn execute_template(
    theme: &dyn Theme,
    config: &EngineConfig,
    content: &EmailContent,
    format: RenderFormat,
) -> Result<String, RenderError> {
    let source = match format {
        RenderFormat::Html => theme.html_template(),
        RenderFormat::PlainText => theme.plain_text_template(),
    };
    let context = TemplateContext {
        engine: EngineView::new(theme.name(), config),
        email: content,
    };

    environment()
        .render_named_str(template_name(format), source, context)
        .map_err(|source| RenderError::Template {
            theme: theme.name().to_string(),
            format: format.as_str(),
            source,
        })
}

fn template_name(format: RenderFormat) -> &'static str {
    match format {
        RenderFormat::Html => "email.html",
        RenderFormat::PlainText => "email.txt",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::{
        application::render::types::CssInliningError,
        domain::{
            content::{Action, Button, Markdown},
            engine::TextDirection,
        },
    };

    struct Inline(&'static str, &'static str);

    impl Theme for Inline {
        fn name(&self) -> &str {
            "inline"
        }

        fn html_template(&self) -> &str {
            self.0
        }

        fn plain_text_template(&self) -> &str {
            self.1
        }
    }

    #[derive(Default)]
    struct CountingInliner {
        calls: AtomicUsize,
    }

    impl CssInliner for CountingInliner {
        fn inline(&self, html: &str) -> Result<String, CssInliningError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(html.to_string())
        }
    }

    fn submitted_request() -> EmailContent {
        EmailContent {
            name: "Jon Snow".to_string(),
            intros: Some(vec!["Your request was submitted.".to_string()]),
            actions: vec![Action {
                instructions: "Check the status of your request:".to_string(),
                button: Button {
                    color: "#22BC66".to_string(),
                    text: "View Details".to_string(),
                    link: "https://example.com/".to_string(),
                    ..Button::default()
                },
                invite_code: None,
            }],
            ..EmailContent::default()
        }
    }

    #[test]
    fn builtin_theme_renders_intro_button_and_link() {
        let renderer = Renderer::new();
        let mut config = EngineConfig::default();
        let mut content = submitted_request();

        let email = renderer
            .render(&mut config, &mut content)
            .expect("renders");

        for needle in ["Your request was submitted.", "View Details", "https://example.com/"] {
            assert!(email.html.contains(needle), "html is missing {needle}");
            assert!(email.plain_text.contains(needle), "text is missing {needle}");
        }
        assert!(email.html.contains("Hi Jon Snow"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let renderer = Renderer::new();

        let first = renderer
            .render(&mut EngineConfig::default(), &mut submitted_request())
            .expect("renders");
        let second = renderer
            .render(&mut EngineConfig::default(), &mut submitted_request())
            .expect("renders");

        assert_eq!(first, second);
    }

    #[test]
    fn disabled_inlining_never_calls_the_inliner() {
        let inliner = Arc::new(CountingInliner::default());
        let renderer = Renderer::new().with_inliner(inliner.clone());
        let mut config = EngineConfig {
            disable_css_inlining: true,
            ..EngineConfig::default()
        };

        let html = renderer
            .render_html(&mut config, &mut submitted_request())
            .expect("renders");

        assert_eq!(inliner.calls.load(Ordering::SeqCst), 0);
        assert!(html.contains("<style"));
    }

    #[test]
    fn enabled_inlining_calls_the_inliner_once() {
        let inliner = Arc::new(CountingInliner::default());
        let renderer = Renderer::new().with_inliner(inliner.clone());

        renderer
            .render(&mut EngineConfig::default(), &mut submitted_request())
            .expect("renders");

        assert_eq!(inliner.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn render_defaults_config_and_content_in_place() {
        let renderer = Renderer::new();
        let mut config = EngineConfig {
            text_direction: Some(TextDirection::from("sideways")),
            ..EngineConfig::default()
        };
        let mut content = EmailContent::default();

        renderer
            .render_plain_text(&mut config, &mut content)
            .expect("renders");

        assert_eq!(config.theme_name(), Some("default"));
        assert_eq!(config.text_direction, Some(TextDirection::LeftToRight));
        assert_eq!(content.greeting.as_deref(), Some("Hi"));
        assert_eq!(content.signature.as_deref(), Some("Thanks"));
    }

    #[test]
    fn template_errors_name_the_theme_and_format() {
        let renderer = Renderer::new();
        let mut config =
            EngineConfig::default().with_theme(Arc::new(Inline("{{ email.missing }}", "")));

        let err = renderer
            .render_html(&mut config, &mut EmailContent::default())
            .expect_err("undefined field");

        assert!(matches!(
            err,
            RenderError::Template {
                ref theme,
                format: "html",
                ..
            } if theme == "inline"
        ));
    }

    #[test]
    fn syntax_errors_are_template_errors() {
        let renderer = Renderer::new();
        let mut config = EngineConfig::default().with_theme(Arc::new(Inline("", "{% if %}")));

        let err = renderer
            .render_plain_text(&mut config, &mut EmailContent::default())
            .expect_err("syntax error");

        assert!(matches!(err, RenderError::Template { format: "plain_text", .. }));
    }

    #[test]
    fn engine_values_are_bound() {
        let renderer = Renderer::new();
        let mut config = EngineConfig {
            text_direction: Some(TextDirection::RightToLeft),
            disable_css_inlining: true,
            ..EngineConfig::default()
        }
        .with_theme(Arc::new(Inline(
            "{{ engine.theme }}|{{ engine.text_direction }}|{{ engine.product.name }}|{{ engine.disable_css_inlining }}",
            "",
        )));

        let html = renderer
            .render_html(&mut config, &mut EmailContent::default())
            .expect("renders");

        insta::assert_snapshot!(html, @"inline|rtl|Mailsmith|True");
    }

    #[test]
    fn free_markdown_is_available_to_themes() {
        let renderer = Renderer::new();
        let mut config = EngineConfig {
            disable_css_inlining: true,
            ..EngineConfig::default()
        }
        .with_theme(Arc::new(Inline("{{ email.free_markdown | markdown }}", "")));
        let mut content = EmailContent {
            free_markdown: Some(Markdown::new("Welcome to **Acme**")),
            ..EmailContent::default()
        };

        let html = renderer
            .render_html(&mut config, &mut content)
            .expect("renders");

        assert!(html.contains("<strong>Acme</strong>"));
    }
}
