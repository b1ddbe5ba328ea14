use dashmap::DashMap;

/// Word-frequency sections are capped at this many lines.
pub const TOP_WORDS: usize = 300;

#[cfg(windows)]
pub const LINE_SEP: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEP: &str = "\n";

/// `(word, count)` pairs sorted by count descending, word ascending on ties,
/// first [`TOP_WORDS`] rendered one per line as `"<count> <word>"`.
pub fn top_words(words: &DashMap<String, u64>) -> String {
    let mut pairs: Vec<(String, u64)> = words
        .iter()
        .map(|entry| (entry.key().clone(), *entry.value()))
        .collect();
    pairs.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let mut section = String::new();
    for (word, count) in pairs.into_iter().take(TOP_WORDS) {
        section.push_str(&count.to_string());
        section.push(' ');
        section.push_str(&word);
        section.push_str(LINE_SEP);
    }
    section
}

/// Dense rendering of an integer histogram: one `"<key> <count>"` line for
/// every key in `[min, max]`, zero-filled where absent. An empty table
/// renders nothing.
pub fn dense_range(histogram: &DashMap<i32, u64>) -> String {
    let min = histogram.iter().map(|entry| *entry.key()).min();
    let max = histogram.iter().map(|entry| *entry.key()).max();
    let (Some(min), Some(max)) = (min, max) else {
        return String::new();
    };

    let mut section = String::new();
    for key in min..=max {
        let count = histogram.get(&key).map(|entry| *entry).unwrap_or(0);
        section.push_str(&key.to_string());
        section.push(' ');
        section.push_str(&count.to_string());
        section.push_str(LINE_SEP);
    }
    section
}

/// Concatenates the four sections under their fixed headers, in the fixed
/// order: title words, body words, size distribution, time distribution.
/// No separator is appended after the last section.
pub fn assemble(titles: &str, bodies: &str, sizes: &str, times: &str) -> String {
    let mut report = String::new();

    push_line(&mut report, &format!("Топ-{TOP_WORDS} слов в заголовках статей:"));
    push_line(&mut report, titles);

    push_line(&mut report, &format!("Топ-{TOP_WORDS} слов в статьях:"));
    push_line(&mut report, bodies);

    push_line(&mut report, "Распределение статей по размеру:");
    push_line(&mut report, sizes);

    push_line(&mut report, "Распределение статей по времени:");
    report.push_str(times);

    report
}

fn push_line(report: &mut String, content: &str) {
    report.push_str(content);
    report.push_str(LINE_SEP);
}
