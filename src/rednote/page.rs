// ABOUTME: Legacy HTML scraping of a note's explore page
// ABOUTME: Pulls title, author, description, and tags out of #noteContainer

use super::model::PageDetail;
use crate::{Error, Result};
use scraper::{ElementRef, Html, Selector};

fn selector(endpoint: &str, css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| Error::malformed(endpoint, format!("bad selector {}: {}", css, e)))
}

fn first<'a>(endpoint: &str, scope: ElementRef<'a>, css: &str) -> Result<ElementRef<'a>> {
    scope
        .select(&selector(endpoint, css)?)
        .next()
        .ok_or_else(|| Error::malformed(endpoint, format!("page has no `{}` element", css)))
}

fn text_of(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub fn parse_explore_page(endpoint: &str, html: &str) -> Result<PageDetail> {
    let doc = Html::parse_document(html);
    let container = first(endpoint, doc.root_element(), "div#noteContainer")?;

    let author = text_of(first(endpoint, container, "span.username")?);
    let content = first(endpoint, container, "div.note-content")?;
    let title = text_of(first(endpoint, content, "div.title")?);
    let note_text = first(endpoint, content, "span.note-text")?;
    let description = text_of(first(endpoint, note_text, "span")?);

    let tag_sel = selector(endpoint, "a.tag")?;
    let tags = content
        .select(&tag_sel)
        .map(text_of)
        .filter(|t| !t.is_empty())
        .collect();

    Ok(PageDetail {
        title,
        author,
        description,
        tags,
    })
}
