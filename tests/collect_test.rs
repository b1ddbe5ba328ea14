use std::io::{self, Cursor, Read};
use std::thread;
use std::time::Duration;

use wiki_fast_dump_stats::{collect, CollectError};

const SEP: &str = wiki_fast_dump_stats::report::LINE_SEP;

fn page(title: &str, timestamp: &str, bytes: u64, text: &str) -> String {
    format!(
        "<page><title>{title}</title><revision>\
         <timestamp>{timestamp}</timestamp>\
         <text bytes=\"{bytes}\">{text}</text>\
         </revision></page>"
    )
}

fn archive(pages: &[String]) -> Cursor<Vec<u8>> {
    Cursor::new(format!("<mediawiki>{}</mediawiki>", pages.concat()).into_bytes())
}

fn two_page_archive() -> Cursor<Vec<u8>> {
    archive(&[
        page("Кот", "2020-05-01T10:00:00Z", 512, "кот кот собака"),
        page("Пёс", "2021-03-02T08:30:00Z", 5000, "пёс пёс пёс"),
    ])
}

#[test]
fn two_page_archive_renders_the_expected_report() {
    let report = collect(vec![two_page_archive()], 2).unwrap();

    let expected = "Топ-300 слов в заголовках статей:\n\
                    1 кот\n\
                    1 пёс\n\
                    \n\
                    Топ-300 слов в статьях:\n\
                    3 пёс\n\
                    2 кот\n\
                    1 собака\n\
                    \n\
                    Распределение статей по размеру:\n\
                    2 1\n\
                    3 1\n\
                    \n\
                    Распределение статей по времени:\n\
                    2020 1\n\
                    2021 1\n"
        .replace('\n', SEP);
    assert_eq!(report, expected);
}

#[test]
fn no_archives_renders_empty_sections() {
    let report = collect(Vec::<Cursor<Vec<u8>>>::new(), 1).unwrap();

    let expected = "Топ-300 слов в заголовках статей:\n\
                    \n\
                    Топ-300 слов в статьях:\n\
                    \n\
                    Распределение статей по размеру:\n\
                    \n\
                    Распределение статей по времени:\n"
        .replace('\n', SEP);
    assert_eq!(report, expected);
}

#[test]
fn report_is_invariant_under_input_order_and_thread_count() {
    let first = || page("Кот", "2020-05-01T10:00:00Z", 512, "кот и собака");
    let second = || page("Слон", "2019-01-01T00:00:00Z", 17, "слон слон кот");
    let third = || page("Пёс", "2021-03-02T08:30:00Z", 123456, "пёс");

    let baseline = collect(
        vec![
            archive(&[first()]),
            archive(&[second()]),
            archive(&[third()]),
        ],
        1,
    )
    .unwrap();

    for threads in [1, 2, 4, 8] {
        let reordered = collect(
            vec![
                archive(&[third()]),
                archive(&[first()]),
                archive(&[second()]),
            ],
            threads,
        )
        .unwrap();
        assert_eq!(reordered, baseline, "threads = {threads}");
    }
}

#[test]
fn incomplete_pages_contribute_nothing() {
    let no_bytes = "<page><title>Кот</title><revision>\
                    <timestamp>2020-05-01T10:00:00Z</timestamp>\
                    <text>кот</text></revision></page>"
        .to_string();
    let bad_timestamp = page("Пёс", "позавчера", 512, "пёс");

    let report = collect(vec![archive(&[no_bytes, bad_timestamp])], 2).unwrap();
    let empty = collect(Vec::<Cursor<Vec<u8>>>::new(), 2).unwrap();
    assert_eq!(report, empty);
}

#[test]
fn malformed_archive_fails_the_run() {
    let broken = Cursor::new(b"<mediawiki><page><title>x</wrong></page></mediawiki>".to_vec());
    let result = collect(vec![broken], 2);
    assert!(matches!(result, Err(CollectError::Xml(_))));
}

#[test]
fn healthy_archives_are_still_drained_when_a_sibling_fails() {
    // One broken archive must not prevent the run from awaiting the healthy
    // one; the error surfaces only after both reach a terminal state.
    let broken = Cursor::new(b"<mediawiki></page></mediawiki>".to_vec());
    let result = collect(vec![two_page_archive(), broken], 2);
    assert!(result.is_err());

    // The engine stays usable for the next run.
    let report = collect(vec![two_page_archive()], 2).unwrap();
    assert!(report.contains("3 пёс"));
}

#[test]
fn invalid_thread_count_is_rejected() {
    assert!(matches!(
        collect(Vec::<Cursor<Vec<u8>>>::new(), 0),
        Err(CollectError::InvalidThreadCount(0))
    ));
    assert!(matches!(
        collect(Vec::<Cursor<Vec<u8>>>::new(), 33),
        Err(CollectError::InvalidThreadCount(33))
    ));
}

/// Delays the first read, then yields its payload. Used to force a specific
/// wall-clock completion order.
struct SlowReader {
    inner: Cursor<Vec<u8>>,
    delay: Option<Duration>,
}

impl SlowReader {
    fn new(data: &[u8], delay: Duration) -> Self {
        Self {
            inner: Cursor::new(data.to_vec()),
            delay: Some(delay),
        }
    }
}

impl Read for SlowReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(delay) = self.delay.take() {
            thread::sleep(delay);
        }
        self.inner.read(buf)
    }
}

/// Fails immediately with a recognizable message.
struct BrokenReader;

impl Read for BrokenReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::Other, "boom-late-submitted"))
    }
}

#[test]
fn first_submitted_failure_wins_over_first_completed() {
    // Archive 0 fails structurally, but only after a delay; archive 1 fails
    // right away. The run must still report archive 0's error.
    let slow_malformed: Box<dyn Read + Send> = Box::new(SlowReader::new(
        b"<mediawiki><page><title>x</wrong></page></mediawiki>",
        Duration::from_millis(200),
    ));
    let fast_broken: Box<dyn Read + Send> = Box::new(BrokenReader);

    let err = collect(vec![slow_malformed, fast_broken], 2).unwrap_err();
    assert!(
        !err.to_string().contains("boom-late-submitted"),
        "later-submitted failure leaked through: {err}"
    );
}
