//! Text renderers: turn one file's text into an HTML fragment.
//!
//! [`RendererSet`] tries each renderer in order. A renderer may decline a
//! file (`Ok(None)`); an error is logged and the next renderer is tried. The
//! plain renderer always runs last.

use crate::config::{DEFAULT_THEME, RenderConfig};
use crate::error::{AppError, Result};
use crate::output_formats::is_markdown_path;
use log;
use once_cell::sync::Lazy;
use pulldown_cmark::{Options, Parser, html};
#[cfg(feature = "serde_support")]
use serde::Serialize;
use std::path::Path;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::highlighted_html_for_string;
use syntect::parsing::{SyntaxReference, SyntaxSet};

static SYNTAXES: Lazy<SyntaxSet> = Lazy::new(SyntaxSet::load_defaults_newlines);
static THEMES: Lazy<ThemeSet> = Lazy::new(ThemeSet::load_defaults);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
#[cfg_attr(feature = "serde_support", serde(rename_all = "lowercase"))]
pub enum BodyKind {
    Markdown,
    Highlighted,
    Plain,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize))]
pub struct RenderedBody {
    pub kind: BodyKind,
    pub html: String,
}

pub trait TextRenderer: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` means this renderer does not handle `filename`.
    fn render(&self, text: &str, filename: &str) -> Result<Option<RenderedBody>>;
}

pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_FOOTNOTES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS,
        }
    }
}

impl TextRenderer for MarkdownRenderer {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn render(&self, text: &str, filename: &str) -> Result<Option<RenderedBody>> {
        if !is_markdown_path(filename) {
            return Ok(None);
        }
        let parser = Parser::new_ext(text, self.options);
        let mut out = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut out, parser);
        Ok(Some(RenderedBody {
            kind: BodyKind::Markdown,
            html: out,
        }))
    }
}

pub struct SyntaxRenderer {
    theme: Theme,
}

impl SyntaxRenderer {
    /// Unknown theme names fall back to the default theme.
    pub fn new(theme_name: &str) -> Result<Self> {
        let theme = THEMES
            .themes
            .get(theme_name)
            .or_else(|| {
                log::warn!(
                    "Unknown highlight theme '{}', using '{}'",
                    theme_name,
                    DEFAULT_THEME
                );
                THEMES.themes.get(DEFAULT_THEME)
            })
            .cloned()
            .ok_or_else(|| AppError::Config(format!("No highlight theme named '{}'", theme_name)))?;
        Ok(Self { theme })
    }

    pub fn available_themes() -> Vec<&'static str> {
        THEMES.themes.keys().map(String::as_str).collect()
    }

    fn find_syntax(filename: &str, text: &str) -> Option<&'static SyntaxReference> {
        let path = Path::new(filename);
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if let Some(syntax) = SYNTAXES.find_syntax_by_extension(name) {
                return Some(syntax);
            }
        }
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            if let Some(syntax) = SYNTAXES.find_syntax_by_extension(ext) {
                return Some(syntax);
            }
        }
        text.lines()
            .next()
            .and_then(|line| SYNTAXES.find_syntax_by_first_line(line))
    }
}

impl TextRenderer for SyntaxRenderer {
    fn name(&self) -> &'static str {
        "syntax"
    }

    fn render(&self, text: &str, filename: &str) -> Result<Option<RenderedBody>> {
        let Some(syntax) = Self::find_syntax(filename, text) else {
            return Ok(None);
        };
        let html = highlighted_html_for_string(text, &SYNTAXES, syntax, &self.theme).map_err(
            |e| AppError::Render {
                path: filename.to_string(),
                message: e.to_string(),
            },
        )?;
        Ok(Some(RenderedBody {
            kind: BodyKind::Highlighted,
            html,
        }))
    }
}

#[derive(Default)]
pub struct PlainRenderer;

impl TextRenderer for PlainRenderer {
    fn name(&self) -> &'static str {
        "plain"
    }

    fn render(&self, text: &str, _filename: &str) -> Result<Option<RenderedBody>> {
        Ok(Some(RenderedBody {
            kind: BodyKind::Plain,
            html: format!("<pre><code>{}</code></pre>", quick_xml::escape::escape(text)),
        }))
    }
}

pub struct RendererSet {
    renderers: Vec<Box<dyn TextRenderer>>,
    fallback: PlainRenderer,
}

impl RendererSet {
    pub fn new(renderers: Vec<Box<dyn TextRenderer>>) -> Self {
        Self {
            renderers,
            fallback: PlainRenderer,
        }
    }

    pub fn plain_only() -> Self {
        Self::new(Vec::new())
    }

    pub fn from_config(config: &RenderConfig) -> Result<Self> {
        let mut renderers: Vec<Box<dyn TextRenderer>> = Vec::new();
        if config.markdown {
            renderers.push(Box::new(MarkdownRenderer::default()));
        }
        if config.highlight {
            renderers.push(Box::new(SyntaxRenderer::new(&config.theme)?));
        }
        Ok(Self::new(renderers))
    }

    pub fn render(&self, text: &str, filename: &str) -> Result<RenderedBody> {
        for renderer in &self.renderers {
            match renderer.render(text, filename) {
                Ok(Some(body)) => return Ok(body),
                Ok(None) => {}
                Err(e) => log::warn!(
                    "{} renderer failed for {}, trying next: {}",
                    renderer.name(),
                    filename,
                    e
                ),
            }
        }
        self.fallback
            .render(text, filename)?
            .ok_or_else(|| AppError::Render {
                path: filename.to_string(),
                message: "no renderer produced output".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl TextRenderer for Failing {
        fn name(&self) -> &'static str {
            "failing"
        }
        fn render(&self, _text: &str, filename: &str) -> Result<Option<RenderedBody>> {
            Err(AppError::Render {
                path: filename.to_string(),
                message: "boom".to_string(),
            })
        }
    }

    #[test]
    fn markdown_is_selected_by_extension() {
        let set = RendererSet::from_config(&RenderConfig::default()).unwrap();
        let body = set.render("# Title\n\n*hi*", "docs/README.MD").unwrap();
        assert_eq!(body.kind, BodyKind::Markdown);
        assert!(body.html.contains("<h1>Title</h1>"));
        assert!(body.html.contains("<em>hi</em>"));
    }

    #[test]
    fn known_source_is_highlighted() {
        let set = RendererSet::from_config(&RenderConfig::default()).unwrap();
        let body = set.render("fn main() {}\n", "src/main.rs").unwrap();
        assert_eq!(body.kind, BodyKind::Highlighted);
        assert!(body.html.starts_with("<pre"));
    }

    #[test]
    fn unknown_extension_falls_back_to_escaped_plain_text() {
        let set = RendererSet::from_config(&RenderConfig::default()).unwrap();
        let body = set.render("<b>&</b>", "notes.zzunknown").unwrap();
        assert_eq!(body.kind, BodyKind::Plain);
        assert_eq!(body.html, "<pre><code>&lt;b&gt;&amp;&lt;/b&gt;</code></pre>");
    }

    #[test]
    fn failing_renderer_falls_through() {
        let set = RendererSet::new(vec![Box::new(Failing)]);
        let body = set.render("text", "a.rs").unwrap();
        assert_eq!(body.kind, BodyKind::Plain);
    }

    #[test]
    fn disabled_renderers_leave_plain_output() {
        let config = RenderConfig {
            markdown: false,
            highlight: false,
            ..RenderConfig::default()
        };
        let set = RendererSet::from_config(&config).unwrap();
        assert_eq!(set.render("# x", "a.md").unwrap().kind, BodyKind::Plain);
    }

    #[test]
    fn unknown_theme_uses_default() {
        assert!(SyntaxRenderer::new("no-such-theme").is_ok());
        assert!(SyntaxRenderer::available_themes().contains(&DEFAULT_THEME));
    }
}
