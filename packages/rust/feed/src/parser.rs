//! Streaming RSS 2.0 / Atom parser.
//!
//! Only the fields the map needs are kept: title, publication date, and the
//! post's HTML body. For RSS the body comes from `content:encoded`, falling
//! back to `description`; for Atom from `content`, falling back to `summary`.

use quick_xml::Reader;
use quick_xml::events::Event;

use sietsemap_shared::{Post, Result, SietsemapError};

/// Title used when an entry has none.
const UNTITLED: &str = "Untitled";

// ---------------------------------------------------------------------------
// Entry accumulator
// ---------------------------------------------------------------------------

/// Fields of an item/entry we care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Published,
    Content,
    Summary,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"title" => Some(Self::Title),
            b"pubDate" | b"dc:date" | b"published" | b"updated" => Some(Self::Published),
            b"content:encoded" | b"content" => Some(Self::Content),
            b"description" | b"summary" => Some(Self::Summary),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct RawEntry {
    title: Option<String>,
    published: Option<String>,
    content: Option<String>,
    summary: Option<String>,
}

impl RawEntry {
    fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Published => &mut self.published,
            Field::Content => &mut self.content,
            Field::Summary => &mut self.summary,
        };
        // Atom entries can carry both <published> and <updated>; keep the first.
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    fn into_post(self) -> Post {
        Post {
            title: self
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| UNTITLED.to_string()),
            published: self.published.unwrap_or_default(),
            content_html: self.content.or(self.summary).unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

/// Parse an RSS or Atom document into posts, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<Post>> {
    // Text events are kept verbatim; only a finished field value is trimmed.
    let mut reader = Reader::from_str(xml);

    let mut posts = Vec::new();
    let mut entry: Option<RawEntry> = None;
    let mut field: Option<(Field, Vec<u8>)> = None;
    let mut text = String::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            SietsemapError::parse(format!(
                "malformed feed XML at byte {}: {e}",
                reader.error_position()
            ))
        })?;

        match event {
            Event::Start(ref e) => {
                let name = e.name();
                let tag = name.as_ref();
                if tag == b"item" || tag == b"entry" {
                    entry = Some(RawEntry::default());
                    field = None;
                } else if entry.is_some() && field.is_none() {
                    if let Some(f) = Field::from_tag(tag) {
                        field = Some((f, tag.to_vec()));
                        text.clear();
                    }
                }
            }
            Event::Text(ref e) => {
                if field.is_some() {
                    let unescaped = e
                        .unescape()
                        .map_err(|err| SietsemapError::parse(format!("bad entity: {err}")))?;
                    text.push_str(&unescaped);
                }
            }
            Event::CData(e) => {
                if field.is_some() {
                    text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::End(ref e) => {
                let name = e.name();
                let tag = name.as_ref();
                if tag == b"item" || tag == b"entry" {
                    if let Some(done) = entry.take() {
                        posts.push(done.into_post());
                    }
                    field = None;
                } else if let Some((f, open_tag)) = field.take() {
                    if open_tag == tag {
                        if let Some(current) = entry.as_mut() {
                            current.set(f, text.trim().to_string());
                        }
                    } else {
                        // Closing a nested element inside the field; keep collecting.
                        field = Some((f, open_tag));
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if entry.is_some() {
        return Err(SietsemapError::parse("feed ended inside an unclosed item"));
    }

    Ok(posts)
}
