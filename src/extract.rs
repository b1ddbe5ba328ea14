use std::io::{BufReader, Read};

use log::debug;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::CollectError;
use crate::pool::CancelToken;
use crate::stats::{DumpStats, Page};

const PAGE_TAG: &[u8] = b"page";
const REVISION_TAG: &[u8] = b"revision";
const TITLE_TAG: &[u8] = b"title";
const TEXT_TAG: &[u8] = b"text";
const TIMESTAMP_TAG: &[u8] = b"timestamp";
const BYTES_ATTR: &[u8] = b"bytes";

// Element depths in a <mediawiki><page>... dump: <title> text sits at depth 3,
// <text>/<timestamp> text under <revision> at depth 4.
const TITLE_DEPTH: usize = 3;
const REVISION_CHILD_DEPTH: usize = 4;

/// Streams one decompressed dump through quick-xml and folds every complete
/// page into `stats`. Malformed XML fails the whole archive; a page with an
/// unparsable timestamp or missing/unparsable `bytes` attribute is dropped
/// silently.
pub fn parse_dump<R: Read>(
    source: R,
    stats: &DumpStats,
    cancel: &CancelToken,
) -> Result<(), CollectError> {
    let mut reader = Reader::from_reader(BufReader::new(source));
    let mut extractor = PageExtractor::new(stats);
    let mut buf = Vec::new();

    loop {
        if cancel.is_cancelled() {
            return Err(CollectError::Cancelled);
        }
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => extractor.on_open(&start),
            Event::Empty(start) => {
                // Self-closing element, e.g. <text bytes="0"/>.
                extractor.on_open(&start);
                extractor.on_close(start.local_name().as_ref());
            }
            Event::Text(text) => extractor.on_text(text.unescape()?.as_ref()),
            Event::End(end) => extractor.on_close(end.local_name().as_ref()),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    debug!("archive finished, {} pages extracted", extractor.pages_emitted);
    Ok(())
}

/// Nested-element state machine over one archive's open/text/close events.
struct PageExtractor<'a> {
    stats: &'a DumpStats,
    depth: usize,
    in_page: bool,
    in_revision: bool,
    last_element: Vec<u8>,
    title: Option<String>,
    text: Option<String>,
    year: Option<i32>,
    bytes: Option<u64>,
    pages_emitted: u64,
}

impl<'a> PageExtractor<'a> {
    fn new(stats: &'a DumpStats) -> Self {
        Self {
            stats,
            depth: 0,
            in_page: false,
            in_revision: false,
            last_element: Vec::new(),
            title: None,
            text: None,
            year: None,
            bytes: None,
            pages_emitted: 0,
        }
    }

    fn on_open(&mut self, start: &BytesStart<'_>) {
        let name = start.local_name();
        let name = name.as_ref();

        if self.in_page
            && self.in_revision
            && self.depth + 1 == REVISION_CHILD_DEPTH
            && name == TEXT_TAG
        {
            self.bytes = parse_bytes_attr(start);
        }

        self.last_element = name.to_vec();

        match name {
            PAGE_TAG => {
                self.in_page = true;
                self.title = None;
                self.text = None;
                self.year = None;
                self.bytes = None;
            }
            REVISION_TAG => self.in_revision = true,
            _ => {}
        }

        self.depth += 1;
    }

    fn on_text(&mut self, content: &str) {
        if self.in_page && self.depth == TITLE_DEPTH && self.last_element == TITLE_TAG {
            // Titles may arrive in several chunks; concatenate in order.
            self.title.get_or_insert_with(String::new).push_str(content);
        }

        if self.in_page && self.in_revision && self.depth == REVISION_CHILD_DEPTH {
            if self.last_element == TEXT_TAG {
                self.text.get_or_insert_with(String::new).push_str(content);
            }
            if self.last_element == TIMESTAMP_TAG {
                self.year = parse_year(content);
            }
        }
    }

    fn on_close(&mut self, name: &[u8]) {
        match name {
            PAGE_TAG => {
                self.in_page = false;
                self.emit_if_complete();
            }
            REVISION_TAG => self.in_revision = false,
            _ => {}
        }
        self.depth = self.depth.saturating_sub(1);
    }

    fn emit_if_complete(&mut self) {
        if let (Some(title), Some(text), Some(year), Some(bytes)) = (
            self.title.take(),
            self.text.take(),
            self.year,
            self.bytes,
        ) {
            self.stats.record_page(&Page { title, text, year, bytes });
            self.pages_emitted += 1;
        }
        self.title = None;
        self.text = None;
        self.year = None;
        self.bytes = None;
    }
}

/// `bytes` attribute of a `<text>` element; any retrieval or parse failure
/// leaves the size unset so the enclosing page gets dropped.
fn parse_bytes_attr(start: &BytesStart<'_>) -> Option<u64> {
    let attr = start.try_get_attribute(BYTES_ATTR).ok().flatten()?;
    let value = attr.unescape_value().ok()?;
    value.parse().ok()
}

/// Year of an RFC 3339 dump timestamp like `2021-11-01T00:16:32Z`.
fn parse_year(content: &str) -> Option<i32> {
    OffsetDateTime::parse(content.trim(), &Rfc3339)
        .map(|moment| moment.year())
        .ok()
}
