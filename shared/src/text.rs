//! Small string helpers shared by the stores and the importer.

/// URL slug for tools and posts: lowercase, non-word characters dropped,
/// runs of whitespace/underscores/hyphens collapsed into one hyphen.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_sep = false;
    for ch in text.trim().to_lowercase().chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('-');
            }
            pending_sep = false;
            slug.push(ch);
        } else if ch.is_whitespace() || ch == '_' || ch == '-' {
            pending_sep = true;
        }
    }
    slug
}

/// Slug of a synthesized category: lowercased, each whitespace run becomes a
/// hyphen. Punctuation is kept so distinct names stay distinct.
pub fn category_slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

/// First segment of a comma-joined category string.
pub fn primary_category(category: &str) -> &str {
    category.split(',').next().unwrap_or_default().trim()
}

/// Splits a comma-joined list, trimming entries and dropping empty ones.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect()
}

pub fn normalize_opt(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
