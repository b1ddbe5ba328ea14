use dashmap::DashMap;
use lazy_static::lazy_static;
use log::trace;
use regex::Regex;

lazy_static! {
    // Maximal runs of Cyrillic letters, three or longer, matched against
    // already-lowercased text. `ё` sits outside the `а-я` codepoint range and
    // has to be named explicitly.
    static ref WORD_RE: Regex = Regex::new(r"[а-яё]{3,}").expect("invalid word regex");
}

/// Metadata extracted from one `<page>` block of a dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub title: String,
    pub text: String,
    pub year: i32,
    pub bytes: u64,
}

/// The four shared statistic tables, populated concurrently by parse tasks.
///
/// Each increment locks only the dashmap shard owning the key, so tasks on
/// different keys do not contend. Keys are never removed; after the parse
/// phase the tables are only read.
#[derive(Debug, Default)]
pub struct DumpStats {
    pub title_words: DashMap<String, u64>,
    pub body_words: DashMap<String, u64>,
    pub years: DashMap<i32, u64>,
    pub size_buckets: DashMap<i32, u64>,
}

impl DumpStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds one fully extracted page into all four tables.
    pub fn record_page(&self, page: &Page) {
        trace!("recording page '{}' ({} bytes)", page.title, page.bytes);
        for word in words(&page.title) {
            self.record_title_word(word);
        }
        for word in words(&page.text) {
            self.record_body_word(word);
        }
        self.record_year(page.year);
        self.record_size_bucket(size_bucket(page.bytes));
    }

    pub fn record_title_word(&self, word: String) {
        *self.title_words.entry(word).or_insert(0) += 1;
    }

    pub fn record_body_word(&self, word: String) {
        *self.body_words.entry(word).or_insert(0) += 1;
    }

    pub fn record_year(&self, year: i32) {
        *self.years.entry(year).or_insert(0) += 1;
    }

    pub fn record_size_bucket(&self, bucket: i32) {
        *self.size_buckets.entry(bucket).or_insert(0) += 1;
    }
}

/// Histogram key for a page size: the number of base-10 digits past the
/// first, i.e. `floor(log10(bytes))` with `bucket(0) == 0`.
pub fn size_bucket(bytes: u64) -> i32 {
    let mut bytes = bytes;
    let mut bucket = 0;
    while bytes / 10 > 0 {
        bytes /= 10;
        bucket += 1;
    }
    bucket
}

/// Word occurrences of a text, one item per match (no deduplication).
fn words(text: &str) -> impl Iterator<Item = String> {
    let lowered = text.to_lowercase();
    WORD_RE
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect::<Vec<_>>()
        .into_iter()
}
