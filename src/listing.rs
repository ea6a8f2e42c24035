//! Listing-feed retrieval: one RSS search feed per configured source.
//!
//! Each source maps to a templated search URL whose response is an
//! RSS-shaped XML body. Items are parsed with a streaming `quick-xml`
//! reader into [`Lecture`] candidates; an unreachable or unparsable feed
//! costs that source its entries but never the run.

use crate::config::Config;
use crate::fetch::FetchClient;
use crate::models::{Lecture, Source};
use quick_xml::Reader;
use quick_xml::events::Event;
use tracing::{info, warn};
use url::Url;

/// Fetch every configured source's listing feed and concatenate the parsed
/// entries in source-declaration order.
pub async fn fetch_listings(client: &FetchClient, config: &Config) -> Vec<Lecture> {
    let mut lectures = Vec::new();
    for source in &config.sources {
        let url = listing_url(&config.listing_url, source, config.subcategory_id);
        let Some(body) = client.fetch_with_retries(&url).await else {
            warn!(source = %source.name, %url, "listing feed unreachable; skipping source");
            continue;
        };
        let base = Url::parse(&url).ok();
        match parse_listing(&body, &source.name, base.as_ref()) {
            Ok(items) => {
                info!(source = %source.name, count = items.len(), "indexed listing feed");
                lectures.extend(items);
            }
            Err(e) => {
                warn!(source = %source.name, error = %e, "listing feed did not parse; skipping source");
            }
        }
    }
    info!(count = lectures.len(), "harvested listing candidates");
    lectures
}

/// Expand the listing URL template for one source. The sort key asks the
/// server for newest-first item order.
fn listing_url(template: &str, source: &Source, subcategory_id: u32) -> String {
    template
        .replace("{teacher_id}", &source.teacher_id.to_string())
        .replace("{subcategory_id}", &subcategory_id.to_string())
        .replace("{sort}", &urlencoding::encode("shiurdate desc"))
}

/// Parse an RSS listing body into candidates for one source.
///
/// Handles both proper CDATA sections and pre-escaped wrapper text: literal
/// `<![CDATA[` / `]]>` markers inside text content are stripped in case the
/// server emits them verbatim.
fn parse_listing(
    xml: &str,
    source_name: &str,
    base: Option<&Url>,
) -> Result<Vec<Lecture>, quick_xml::Error> {
    // no reader-level text trimming: content can arrive in chunks around
    // references, and per-chunk trimming would eat interior whitespace.
    // Fields are trimmed once assembled, when the item closes.
    let mut reader = Reader::from_str(xml);

    let mut lectures = Vec::new();
    let mut title = String::new();
    let mut link = String::new();
    let mut description = String::new();
    let mut in_item = false;
    let mut current_tag = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = std::str::from_utf8(e.name().as_ref())
                    .unwrap_or("")
                    .to_string();
                if name == "item" {
                    in_item = true;
                    title.clear();
                    link.clear();
                    description.clear();
                    current_tag.clear();
                } else {
                    current_tag = name;
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"item" && in_item {
                    in_item = false;
                    lectures.push(Lecture {
                        source_name: source_name.to_string(),
                        title: strip_cdata_markers(&title),
                        link: absolutize(strip_cdata_markers(&link).as_str(), base),
                        description: strip_cdata_markers(&description),
                    });
                } else {
                    current_tag.clear();
                }
            }
            // text content may arrive in several chunks around references,
            // so every content event appends to the current field
            Ok(Event::Text(e)) => {
                if in_item {
                    let text = e.xml_content().unwrap_or_default();
                    append_field(&current_tag, &text, &mut title, &mut link, &mut description);
                }
            }
            Ok(Event::CData(e)) => {
                if in_item {
                    let text = String::from_utf8_lossy(e.as_ref());
                    append_field(&current_tag, &text, &mut title, &mut link, &mut description);
                }
            }
            Ok(Event::GeneralRef(e)) => {
                if in_item {
                    let text = resolve_reference(&String::from_utf8_lossy(e.as_ref()));
                    append_field(&current_tag, &text, &mut title, &mut link, &mut description);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e),
            _ => {}
        }
    }

    Ok(lectures)
}

fn append_field(
    tag: &str,
    text: &str,
    title: &mut String,
    link: &mut String,
    description: &mut String,
) {
    match tag {
        "title" => title.push_str(text),
        "link" => link.push_str(text),
        "description" => description.push_str(text),
        _ => {}
    }
}

/// Resolve one entity or character reference (the part between `&` and `;`).
/// Unknown names are kept as written.
fn resolve_reference(name: &str) -> String {
    match name {
        "lt" => "<".to_string(),
        "gt" => ">".to_string(),
        "amp" => "&".to_string(),
        "apos" => "'".to_string(),
        "quot" => "\"".to_string(),
        _ => {
            let code = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| name.strip_prefix('#').and_then(|dec| dec.parse().ok()));
            match code.and_then(char::from_u32) {
                Some(ch) => ch.to_string(),
                None => format!("&{name};"),
            }
        }
    }
}

fn strip_cdata_markers(text: &str) -> String {
    text.replace("<![CDATA[", "").replace("]]>", "").trim().to_string()
}

/// Resolve a possibly-relative listing link against the feed URL.
fn absolutize(link: &str, base: Option<&Url>) -> String {
    if link.is_empty() || Url::parse(link).is_ok() {
        return link.to_string();
    }
    match base.and_then(|b| b.join(link).ok()) {
        Some(resolved) => resolved.to_string(),
        None => link.to_string(),
    }
}
