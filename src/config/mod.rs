//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::{
    application::{
        delivery::SmtpSettings,
        render::DEFAULT_TEXT_WIDTH,
    },
    domain::engine::{EngineConfig, Product, TextDirection},
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "mailsmith";
const ENV_PREFIX: &str = "MAILSMITH";
const DEFAULT_OUTPUT_DIR: &str = "email_templates";
const DEFAULT_SMTP_PORT: u16 = 587;
const DEFAULT_SUBJECT_PREFIX: &str = "Mailsmith";

/// Command-line arguments for the Mailsmith binary.
#[derive(Debug, Parser)]
#[command(
    name = "mailsmith",
    version,
    about = "Render transactional emails from themes and send them over SMTP"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MAILSMITH_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Render every selected (theme, content) pair into the output directory.
    Generate(GenerateArgs),
    /// Send previously generated emails through the configured SMTP relay.
    Send(SendArgs),
}

impl Default for Command {
    fn default() -> Self {
        Self::Generate(GenerateArgs::default())
    }
}

impl Command {
    pub fn selection(&self) -> &SelectionArgs {
        match self {
            Self::Generate(args) => &args.selection,
            Self::Send(args) => &args.selection,
        }
    }
}

/// Which themes and which content to work on.
#[derive(Debug, Args, Default, Clone)]
pub struct SelectionArgs {
    /// Theme to use; repeat for several. All built-in themes when omitted.
    #[arg(long = "theme", value_name = "NAME")]
    pub themes: Vec<String>,

    /// TOML content file; repeat for several. Built-in samples when omitted.
    #[arg(long = "content", value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub content: Vec<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub common: CommonOverrides,

    #[command(flatten)]
    pub render: RenderOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SendArgs {
    #[command(flatten)]
    pub selection: SelectionArgs,

    #[command(flatten)]
    pub common: CommonOverrides,

    #[command(flatten)]
    pub smtp: SmtpOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CommonOverrides {
    /// Override the directory holding generated emails.
    #[arg(long = "output-dir", value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub output_dir: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Keep the theme stylesheet in `<style>` instead of inlining it.
    #[arg(long = "disable-css-inlining", action = clap::ArgAction::SetTrue)]
    pub disable_css_inlining: bool,

    /// Override the text direction (ltr|rtl).
    #[arg(long = "text-direction", value_name = "DIR")]
    pub text_direction: Option<String>,

    /// Override the wrap width of the plain-text rendering.
    #[arg(long = "text-width", value_name = "COLUMNS")]
    pub text_width: Option<usize>,

    /// Override the product name shown in the header and signature.
    #[arg(long = "product-name", value_name = "NAME")]
    pub product_name: Option<String>,

    /// Override the product homepage.
    #[arg(long = "product-link", value_name = "URL")]
    pub product_link: Option<String>,

    /// Override the product logo URL.
    #[arg(long = "product-logo", value_name = "URL")]
    pub product_logo: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SmtpOverrides {
    /// Override the SMTP relay host.
    #[arg(long = "smtp-server", value_name = "HOST")]
    pub server: Option<String>,

    /// Override the SMTP relay port.
    #[arg(long = "smtp-port", value_name = "PORT")]
    pub port: Option<u16>,

    /// Override the SMTP login.
    #[arg(long = "smtp-username", value_name = "USER")]
    pub username: Option<String>,

    /// Override the display name of the sender.
    #[arg(long = "sender-identity", value_name = "NAME")]
    pub sender_identity: Option<String>,

    /// Override the sender address.
    #[arg(long = "sender-address", value_name = "ADDRESS")]
    pub sender_address: Option<String>,

    /// Recipient address; repeat for several. Replaces configured recipients.
    #[arg(long = "to", value_name = "ADDRESS")]
    pub to: Vec<String>,

    /// Override the subject prefix.
    #[arg(long = "subject-prefix", value_name = "PREFIX")]
    pub subject_prefix: Option<String>,
}

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub product: Product,
    pub render: RenderSettings,
    pub output: OutputSettings,
    pub smtp: SmtpSettings,
    pub delivery: DeliverySettings,
}

impl Settings {
    /// Engine configuration without a theme; the caller picks one per render.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            theme: None,
            text_direction: self.render.text_direction.clone(),
            product: self.product.clone(),
            disable_css_inlining: self.render.disable_css_inlining,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub disable_css_inlining: bool,
    /// Passed through as configured; unrecognized values are coerced at render time.
    pub text_direction: Option<TextDirection>,
    pub text_width: usize,
}

#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub directory: PathBuf,
}

#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub recipients: Vec<String>,
    pub subject_prefix: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .list_separator(",")
            .with_list_parse_key("delivery.recipients")
            .try_parsing(true),
    );

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Generate(args)) => raw.apply_generate_overrides(args),
        Some(Command::Send(args)) => raw.apply_send_overrides(args),
        None => raw.apply_generate_overrides(&GenerateArgs::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    product: Product,
    render: RawRenderSettings,
    output: RawOutputSettings,
    smtp: RawSmtpSettings,
    delivery: RawDeliverySettings,
}

impl RawSettings {
    fn apply_generate_overrides(&mut self, args: &GenerateArgs) {
        self.apply_common_overrides(&args.common);
        self.apply_render_overrides(&args.render);
    }

    fn apply_send_overrides(&mut self, args: &SendArgs) {
        self.apply_common_overrides(&args.common);
        self.apply_smtp_overrides(&args.smtp);
    }

    fn apply_common_overrides(&mut self, overrides: &CommonOverrides) {
        if let Some(directory) = overrides.output_dir.as_ref() {
            self.output.directory = Some(directory.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        if overrides.disable_css_inlining {
            self.render.disable_css_inlining = Some(true);
        }
        if let Some(direction) = overrides.text_direction.as_ref() {
            self.render.text_direction = Some(direction.clone());
        }
        if let Some(width) = overrides.text_width {
            self.render.text_width = Some(width);
        }
        if let Some(name) = overrides.product_name.as_ref() {
            self.product.name = Some(name.clone());
        }
        if let Some(link) = overrides.product_link.as_ref() {
            self.product.link = Some(link.clone());
        }
        if let Some(logo) = overrides.product_logo.as_ref() {
            self.product.logo = Some(logo.clone());
        }
    }

    fn apply_smtp_overrides(&mut self, overrides: &SmtpOverrides) {
        if let Some(server) = overrides.server.as_ref() {
            self.smtp.server = Some(server.clone());
        }
        if let Some(port) = overrides.port {
            self.smtp.port = Some(port);
        }
        if let Some(username) = overrides.username.as_ref() {
            self.smtp.username = Some(username.clone());
        }
        if let Some(identity) = overrides.sender_identity.as_ref() {
            self.smtp.sender_identity = Some(identity.clone());
        }
        if let Some(address) = overrides.sender_address.as_ref() {
            self.smtp.sender_address = Some(address.clone());
        }
        if !overrides.to.is_empty() {
            self.delivery.recipients = Some(overrides.to.clone());
        }
        if let Some(prefix) = overrides.subject_prefix.as_ref() {
            self.delivery.subject_prefix = Some(prefix.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            product,
            render,
            output,
            smtp,
            delivery,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let product = build_product(product);
        let render = build_render_settings(render)?;
        let output = build_output_settings(output)?;
        let smtp = build_smtp_settings(smtp);
        let delivery = build_delivery_settings(delivery);

        Ok(Self {
            logging,
            product,
            render,
            output,
            smtp,
            delivery,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_product(product: Product) -> Product {
    Product {
        name: non_blank(product.name),
        link: non_blank(product.link),
        logo: non_blank(product.logo),
        copyright: product.copyright,
        trouble_text: product.trouble_text,
    }
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let text_width = render.text_width.unwrap_or(DEFAULT_TEXT_WIDTH);
    if text_width == 0 {
        return Err(LoadError::invalid(
            "render.text_width",
            "must be greater than zero",
        ));
    }

    Ok(RenderSettings {
        disable_css_inlining: render.disable_css_inlining.unwrap_or(false),
        text_direction: non_blank(render.text_direction).map(TextDirection::from),
        text_width,
    })
}

fn build_output_settings(output: RawOutputSettings) -> Result<OutputSettings, LoadError> {
    let directory = output
        .directory
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR));
    if directory.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "output.directory",
            "path must not be empty",
        ));
    }

    Ok(OutputSettings { directory })
}

// Missing SMTP fields are reported by delivery validation, so `generate`
// works without any SMTP configuration.
fn build_smtp_settings(smtp: RawSmtpSettings) -> SmtpSettings {
    SmtpSettings {
        server: smtp.server.unwrap_or_default(),
        port: smtp.port.unwrap_or(DEFAULT_SMTP_PORT),
        username: smtp.username.unwrap_or_default(),
        password: smtp.password.unwrap_or_default(),
        sender_identity: smtp.sender_identity.unwrap_or_default(),
        sender_address: smtp.sender_address.unwrap_or_default(),
    }
}

fn build_delivery_settings(delivery: RawDeliverySettings) -> DeliverySettings {
    let recipients = delivery
        .recipients
        .unwrap_or_default()
        .into_iter()
        .map(|recipient| recipient.trim().to_string())
        .filter(|recipient| !recipient.is_empty())
        .collect();

    DeliverySettings {
        recipients,
        subject_prefix: delivery
            .subject_prefix
            .unwrap_or_else(|| DEFAULT_SUBJECT_PREFIX.to_string()),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    disable_css_inlining: Option<bool>,
    text_direction: Option<String>,
    text_width: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawOutputSettings {
    directory: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSmtpSettings {
    server: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    sender_identity: Option<String>,
    sender_address: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDeliverySettings {
    recipients: Option<Vec<String>>,
    subject_prefix: Option<String>,
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
