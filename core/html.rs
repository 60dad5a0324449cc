use crate::document::{Block, HumanDocument, ListItem, TOC_ID};
use crate::error::{AppError, Result};
use crate::render::BodyKind;
use log;
use quick_xml::escape::escape;
use rust_embed::RustEmbed;

#[derive(RustEmbed)]
#[folder = "../data/assets/"]
struct PageAssets;

const STYLESHEET: &str = "page.css";

fn get_asset_text(name: &str) -> Result<String> {
    let asset = PageAssets::get(name)
        .ok_or_else(|| AppError::Asset(format!("Asset not found in embed: {}", name)))?;
    let content = std::str::from_utf8(asset.data.as_ref())
        .map_err(|e| AppError::Asset(format!("UTF-8 error in embedded asset {}: {}", name, e)))?;
    Ok(content.to_string())
}

/// Serialises the document model into one self-contained HTML page. When
/// `flattened` is given it is shown read-only below the human view.
pub fn render_html(doc: &HumanDocument, flattened: Option<&str>) -> Result<String> {
    let css = get_asset_text(STYLESHEET)?;
    let mut out = String::with_capacity(64 * 1024);

    out.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str(&format!(
        "<title>Flattened repo – {}</title>\n",
        escape(doc.meta.repository.as_str())
    ));
    out.push_str(&format!("<style>\n{}\n</style>\n</head>\n<body>\n", css));
    out.push_str("<div class=\"page\">\n<nav id=\"sidebar\">\n<h2>Contents</h2>\n");
    if let Some(items) = doc.list(TOC_ID) {
        push_items(&mut out, items, "toc");
    }
    out.push_str("</nav>\n<main>\n<section id=\"human-view\">\n");
    for block in &doc.blocks {
        push_block(&mut out, block);
    }
    out.push_str("</section>\n");

    if let Some(text) = flattened {
        out.push_str("<section id=\"llm-view\">\n<h2>LLM view (CXML)</h2>\n");
        out.push_str("<p class=\"muted\">Every rendered file, tagged with its index and source path.</p>\n");
        out.push_str(&format!(
            "<textarea readonly spellcheck=\"false\">{}</textarea>\n</section>\n",
            escape(text)
        ));
    }
    out.push_str("</main>\n</div>\n</body>\n</html>\n");

    log::debug!("Rendered HTML page: {} bytes.", out.len());
    Ok(out)
}

fn push_block(out: &mut String, block: &Block) {
    match block {
        Block::Heading { level, text, id } => {
            let level = (*level).clamp(1, 6);
            out.push_str(&format!(
                "<h{}{}>{}</h{}>\n",
                level,
                id_attr(id.as_deref()),
                escape(text.as_str()),
                level
            ));
        }
        Block::Text { text } => {
            out.push_str(&format!("<p>{}</p>\n", escape(text.as_str())));
        }
        Block::Stats { title, rows } => {
            out.push_str(&format!(
                "<section class=\"stats-block\">\n<h3>{}</h3>\n<dl class=\"meta stats\">\n",
                escape(title.as_str())
            ));
            for row in rows {
                out.push_str(&format!(
                    "<div><dt>{}</dt><dd>{}</dd></div>\n",
                    escape(row.label.as_str()),
                    escape(row.value.as_str())
                ));
            }
            out.push_str("</dl>\n</section>\n");
        }
        Block::List { id, title, items } => {
            out.push_str(&format!(
                "<section id=\"{}\">\n<h2>{}</h2>\n",
                escape(id.as_str()),
                escape(title.as_str())
            ));
            let class = if id == TOC_ID { "toc" } else { "skip-list" };
            push_items(out, items, class);
            out.push_str("</section>\n");
        }
        Block::CodeBlock { id, text } => {
            out.push_str(&format!(
                "<pre{}>{}</pre>\n",
                id_attr(id.as_deref()),
                escape(text.as_str())
            ));
        }
        Block::Html { kind, html } => match kind {
            BodyKind::Markdown => {
                out.push_str(&format!("<div class=\"markdown-content\">\n{}\n</div>\n", html));
            }
            BodyKind::Highlighted => {
                out.push_str(&format!("<div class=\"highlight\">\n{}\n</div>\n", html));
            }
            BodyKind::Plain => {
                out.push_str(html);
                out.push('\n');
            }
        },
        Block::Error { message } => {
            out.push_str(&format!("<pre class=\"error\">{}</pre>\n", escape(message.as_str())));
        }
        Block::Section {
            id,
            title,
            note,
            body,
        } => {
            out.push_str(&format!(
                "<section class=\"file-section\" id=\"{}\">\n<h2>{}{}</h2>\n",
                escape(id.as_str()),
                escape(title.as_str()),
                note_span(note.as_deref())
            ));
            for inner in body {
                push_block(out, inner);
            }
            out.push_str("<div class=\"back-top\"><a href=\"#top\">↑ Back to top</a></div>\n</section>\n");
        }
    }
}

fn push_items(out: &mut String, items: &[ListItem], class: &str) {
    out.push_str(&format!("<ul class=\"{}\">\n", class));
    for item in items {
        let indent = format!(" style=\"padding-left: {}rem\"", item.depth);
        let label = escape(item.label.as_str());
        match &item.href {
            Some(href) => out.push_str(&format!(
                "<li{}><a href=\"{}\">{}</a>{}</li>\n",
                indent,
                escape(href.as_str()),
                label,
                note_span(item.note.as_deref())
            )),
            None if item.label.ends_with('/') => out.push_str(&format!(
                "<li class=\"dir\"{}>{}</li>\n",
                indent, label
            )),
            None => out.push_str(&format!(
                "<li{}>{}{}</li>\n",
                indent,
                label,
                note_span(item.note.as_deref())
            )),
        }
    }
    out.push_str("</ul>\n");
}

fn id_attr(id: Option<&str>) -> String {
    id.map(|id| format!(" id=\"{}\"", escape(id)))
        .unwrap_or_default()
}

fn note_span(note: Option<&str>) -> String {
    note.map(|n| format!(" <span class=\"muted\">({})</span>", escape(n)))
        .unwrap_or_default()
}
