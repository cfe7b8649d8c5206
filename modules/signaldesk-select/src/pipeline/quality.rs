//! Quality filter for candidate articles.
//!
//! Scrapers surface navigation links, file listings, numeric ids and slugs as
//! if they were headlines. These are pure checks over the title; rejecting a
//! real article here is cheaper than sending noise to the scorer.

use std::sync::LazyLock;

use regex::Regex;

use signaldesk_common::Article;

/// Titles shorter than this (in chars) are never real headlines.
const MIN_TITLE_CHARS: usize = 15;

/// The alphabetic-ratio check only applies above this length.
const ALPHA_RATIO_MIN_CHARS: usize = 10;
const MIN_ALPHA_RATIO: f64 = 0.5;

static FILE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(html?|shtml|xhtml|php\d?|aspx?|jsp|cfm|cgi|xml|pdf)$").unwrap()
});

static URL_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9]+(?:[-_][A-Za-z0-9]+)+/?$").unwrap());

/// Navigation and boilerplate link texts, compared lower-cased and trimmed.
const BOILERPLATE_TITLES: &[&str] = &[
    "most popular",
    "most read",
    "subscribe",
    "subscribe now",
    "sign in",
    "sign up",
    "log in",
    "load more",
    "read more",
    "see all",
    "view all",
    "latest news",
    "top stories",
    "breaking news",
    "newsletters",
    "advertisement",
    "privacy policy",
    "terms of service",
    "terms of use",
    "cookie policy",
    "contact us",
    "about us",
    "skip to content",
    "skip to main content",
    "more stories",
    "related articles",
    "trending now",
];

/// Generic section words that mark a short title as a navigation stub.
const STOP_WORDS: &[&str] = &[
    "news", "feed", "home", "index", "archive", "archives", "latest", "rss", "sitemap",
    "search", "menu", "page", "category", "tag", "tags", "topics", "sections", "video",
    "videos", "podcasts", "opinion", "markets",
];

/// Which rule marked a title as garbage. Checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GarbageReason {
    NumericTitle,
    TooShort,
    FileExtension,
    UrlSlug,
    LowAlphaRatio,
    Boilerplate,
    GenericStub,
}

impl GarbageReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            GarbageReason::NumericTitle => "numeric_title",
            GarbageReason::TooShort => "too_short",
            GarbageReason::FileExtension => "file_extension",
            GarbageReason::UrlSlug => "url_slug",
            GarbageReason::LowAlphaRatio => "low_alpha_ratio",
            GarbageReason::Boilerplate => "boilerplate",
            GarbageReason::GenericStub => "generic_stub",
        }
    }
}

impl std::fmt::Display for GarbageReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The first garbage rule `title` trips, if any.
pub fn title_garbage_reason(title: &str) -> Option<GarbageReason> {
    let title = title.trim();
    let char_count = title.chars().count();

    if !title.is_empty() && title.chars().all(|c| c.is_ascii_digit()) {
        return Some(GarbageReason::NumericTitle);
    }
    if char_count < MIN_TITLE_CHARS {
        return Some(GarbageReason::TooShort);
    }
    if FILE_EXTENSION.is_match(title) {
        return Some(GarbageReason::FileExtension);
    }
    if !title.contains(char::is_whitespace) && URL_SLUG.is_match(title) {
        return Some(GarbageReason::UrlSlug);
    }
    if char_count > ALPHA_RATIO_MIN_CHARS {
        let alpha = title.chars().filter(|c| c.is_alphabetic()).count();
        if (alpha as f64) / (char_count as f64) < MIN_ALPHA_RATIO {
            return Some(GarbageReason::LowAlphaRatio);
        }
    }

    let lower = title.to_lowercase();
    if BOILERPLATE_TITLES.contains(&lower.as_str()) {
        return Some(GarbageReason::Boilerplate);
    }

    let words: Vec<&str> = lower.split_whitespace().collect();
    if words.len() <= 2 && !lower.contains(':') && !lower.contains('-') {
        let has_stop_word = words.iter().any(|w| {
            let w = w.trim_matches(|c: char| !c.is_alphanumeric());
            STOP_WORDS.contains(&w)
        });
        if has_stop_word {
            return Some(GarbageReason::GenericStub);
        }
    }

    None
}

pub fn garbage_reason(article: &Article) -> Option<GarbageReason> {
    title_garbage_reason(&article.title)
}

/// Boolean form of [`garbage_reason`].
pub fn is_garbage(article: &Article) -> bool {
    garbage_reason(article).is_some()
}
