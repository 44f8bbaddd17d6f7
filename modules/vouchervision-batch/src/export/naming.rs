//! File names for archive entries.

use std::collections::HashSet;

use url::Url;

use crate::record::{ItemSource, WorkItem};

const MAX_STEM_LEN: usize = 180;

/// 32-bit `h = h * 31 + c` over UTF-16 code units, wrapping on overflow.
pub fn hash_code(key: &str) -> i32 {
    key.encode_utf16()
        .fold(0i32, |h, unit| h.wrapping_mul(31).wrapping_add(i32::from(unit)))
}

pub fn hash_stem(key: &str) -> String {
    format!("file_{}", i64::from(hash_code(key)).abs())
}

/// Base name for an item's exported files, without extension.
pub fn export_stem(item: &WorkItem) -> String {
    let candidate = match &item.source {
        ItemSource::Url(url) => url_stem(url),
        ItemSource::File(file) => Some(strip_extension(&file.name).to_string()),
    };

    candidate
        .filter(|stem| is_safe_stem(stem))
        .unwrap_or_else(|| hash_stem(item.key()))
}

fn url_stem(raw: &str) -> Option<String> {
    let parsed = Url::parse(raw).ok()?;
    let segment = parsed.path_segments()?.last()?;
    if segment.is_empty() {
        return None;
    }
    Some(strip_extension(segment).to_string())
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

fn is_safe_stem(stem: &str) -> bool {
    !stem.is_empty()
        && stem.len() <= MAX_STEM_LEN
        && !stem.starts_with('.')
        && stem
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '(' | ')' | '+' | '%' | '~' | ' '))
}

/// Hands out unique entry names within one archive.
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name for `item` with `extension`. A name already taken falls back to
    /// the key's hash; a repeated hash gets a numeric suffix.
    pub fn allocate(&mut self, item: &WorkItem, extension: &str) -> String {
        let preferred = format!("{}.{extension}", export_stem(item));
        if self.used.insert(preferred.clone()) {
            return preferred;
        }

        let hashed = hash_stem(item.key());
        let mut name = format!("{hashed}.{extension}");
        let mut n = 1;
        while !self.used.insert(name.clone()) {
            name = format!("{hashed}_{n}.{extension}");
            n += 1;
        }
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::FileSource;
    use std::path::PathBuf;

    fn file(name: &str) -> WorkItem {
        WorkItem::file(FileSource {
            path: PathBuf::from(name),
            name: name.to_string(),
            size: 0,
            media_type: "image/jpeg".to_string(),
        })
    }

    #[test]
    fn hash_code_matches_java_style_string_hash() {
        assert_eq!(hash_code(""), 0);
        assert_eq!(hash_code("a"), 97);
        assert_eq!(hash_code("hello"), 99162322);
        assert_eq!(hash_code("hello world"), 1794106052);
        // Wraps to i32::MIN; the stem still gets a positive number.
        assert_eq!(hash_code("polygenelubricants"), i32::MIN);
        assert_eq!(hash_stem("polygenelubricants"), "file_2147483648");
    }

    #[test]
    fn url_stem_uses_last_segment_without_extension() {
        let item = WorkItem::url("https://cdn.example.org/specimens/MICH_123.jpg?size=full");
        assert_eq!(export_stem(&item), "MICH_123");
    }

    #[test]
    fn url_without_extension_keeps_segment() {
        let item = WorkItem::url("https://example.org/iiif/abc123");
        assert_eq!(export_stem(&item), "abc123");
    }

    #[test]
    fn url_with_trailing_slash_falls_back_to_hash() {
        let item = WorkItem::url("https://example.org/images/");
        assert_eq!(export_stem(&item), hash_stem("https://example.org/images/"));
    }

    #[test]
    fn unparsable_url_falls_back_to_hash() {
        let item = WorkItem::url("not a url");
        assert_eq!(export_stem(&item), hash_stem("not a url"));
    }

    #[test]
    fn file_stem_strips_last_extension_only() {
        assert_eq!(export_stem(&file("sheet.v2.JPG")), "sheet.v2");
        assert_eq!(export_stem(&file("noext")), "noext");
        assert_eq!(export_stem(&file(".hidden")), hash_stem(".hidden"));
    }

    #[test]
    fn allocator_resolves_collisions() {
        let mut names = NameAllocator::new();
        let a = WorkItem::url("https://one.example.org/x.jpg");
        let b = WorkItem::url("https://two.example.org/x.png");

        assert_eq!(names.allocate(&a, "json"), "x.json");
        assert_eq!(
            names.allocate(&b, "json"),
            format!("{}.json", hash_stem("https://two.example.org/x.png"))
        );
        // Same key again: hash name is taken too, so it gets a suffix.
        assert_eq!(
            names.allocate(&b, "json"),
            format!("{}_1.json", hash_stem("https://two.example.org/x.png"))
        );
    }
}
