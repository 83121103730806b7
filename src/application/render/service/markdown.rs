use comrak::{
    markdown_to_html,
    options::{ListStyleType, Options},
};

use crate::domain::content::Markdown;

fn default_options() -> Options<'static> {
    let mut options = Options::default();
    configure_extensions(&mut options);
    options
}

/// Expand markdown into an HTML fragment. Raw HTML in the source is kept.
pub fn to_html(markdown: &Markdown) -> String {
    markdown_to_html(markdown.as_str(), &default_options())
}

fn configure_extensions(options: &mut Options<'static>) {
    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.tagfilter = false;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.superscript = true;
    ext.footnotes = true;
    ext.description_lists = true;
    ext.underline = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.list_style = ListStyleType::Dash;
    render.r#unsafe = true;
    render.sourcepos = false;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headings_and_emphasis() {
        let html = to_html(&Markdown::new("# Welcome\n\nThis is **bold**."));

        assert!(html.contains("<h1>Welcome</h1>"));
        assert!(html.contains("<strong>bold</strong>"));
    }

    #[test]
    fn renders_tables() {
        let html = to_html(&Markdown::new(
            "| Item | Price |\n| --- | --- |\n| Golang | $10.99 |\n",
        ));

        assert!(html.contains("<table>"));
        assert!(html.contains("<td>Golang</td>"));
    }

    #[test]
    fn keeps_raw_html() {
        let html = to_html(&Markdown::new("<span class=\"tag\">new</span>"));

        assert!(html.contains("<span class=\"tag\">new</span>"));
    }

    #[test]
    fn empty_source_renders_empty_fragment() {
        assert!(to_html(&Markdown::default()).trim().is_empty());
    }
}
