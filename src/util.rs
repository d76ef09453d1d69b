// ABOUTME: Utility functions for slugging and per-folder file naming
// ABOUTME: Provides consistent filename generation for bulk exports

pub fn slugify(text: &str) -> String {
    slug::slugify(text)
}

/// `<id>-<slug>.json`, or `<id>.json` when the title slugs to nothing.
pub fn folder_export_name(id: i64, title: &str) -> String {
    let slug = slugify(title);
    if slug.is_empty() {
        format!("{}.json", id)
    } else {
        format!("{}-{}.json", id, slug)
    }
}

pub fn folder_cursor_name(id: i64) -> String {
    format!("{}.cursor", id)
}
