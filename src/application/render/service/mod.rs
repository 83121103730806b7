//! Post-processing collaborators applied around template execution.

mod inline;
mod markdown;
mod text;

pub use inline::StyleInliner;
pub use markdown::to_html as markdown_to_html;
pub use text::{DEFAULT_TEXT_WIDTH, Html2TextReducer};
