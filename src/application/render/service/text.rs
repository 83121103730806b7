use crate::application::render::types::{TextConversionError, TextOptions, TextReducer};

/// Layout width handed to `html2text`.
///
/// `html2text` hard-splits any word longer than the space left on a line, so
/// the default leaves table columns and long links room to stay whole.
pub const DEFAULT_TEXT_WIDTH: usize = 4096;

/// [`TextReducer`] backed by `html2text`.
#[derive(Debug, Clone, Copy)]
pub struct Html2TextReducer {
    width: usize,
}

impl Html2TextReducer {
    pub fn new(width: usize) -> Self {
        Self {
            width: width.max(1),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }
}

impl Default for Html2TextReducer {
    fn default() -> Self {
        Self::new(DEFAULT_TEXT_WIDTH)
    }
}

impl TextReducer for Html2TextReducer {
    fn reduce(&self, html: &str, options: TextOptions) -> Result<String, TextConversionError> {
        html2text::config::plain()
            .raw_mode(!options.preserve_tables)
            .allow_width_overflow()
            .no_link_wrapping()
            .string_from_read(html.as_bytes(), self.width)
            .map(|text| normalize_blank_lines(&text))
            .map_err(|err| TextConversionError {
                message: err.to_string(),
            })
    }
}

/// Collapse runs of blank lines and trim trailing whitespace per line.
fn normalize_blank_lines(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let mut blank_run = 0usize;

    for line in text.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            blank_run += 1;
            if blank_run > 1 || output.is_empty() {
                continue;
            }
        } else {
            blank_run = 0;
        }
        output.push_str(line);
        output.push('\n');
    }

    let trimmed = output.trim_end().len();
    output.truncate(trimmed);
    output
}
