use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Convert a display name to a URL-safe kebab-case slug.
///
/// Accents are stripped (NFD + combining-mark removal) and everything that is
/// not an ASCII letter or digit becomes a separator.
///
/// Example: "Piros Bőrkesztyű, L méret" → "piros-borkesztyu-l-meret"
pub fn slugify(name: &str) -> String {
    name.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Base used when a name has no ASCII letters or digits to slug from.
pub const FALLBACK_SLUG: &str = "item";

/// Slug base for a name, falling back to [`FALLBACK_SLUG`] when it slugifies
/// to nothing (e.g. "Кофе" or "!!!").
pub fn slug_base(name: &str) -> String {
    let slug = slugify(name);
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Pick the first of `base`, `base-1`, `base-2`, ... for which `taken` is false.
pub fn unique_slug<F>(base: &str, mut taken: F) -> String
where
    F: FnMut(&str) -> bool,
{
    let base = if base.is_empty() { FALLBACK_SLUG } else { base };
    if !taken(base) {
        return base.to_string();
    }
    let mut counter = 1u32;
    loop {
        let candidate = format!("{}-{}", base, counter);
        if !taken(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Whether a stored value counts as empty for merge purposes.
pub fn is_blank(value: Option<&str>) -> bool {
    value.map(|v| v.trim().is_empty()).unwrap_or(true)
}
