//! Podcast feed synthesis.
//!
//! Turns the ordered, enriched lectures into one RSS 2.0 document with the
//! iTunes duration extension declared at the root. Serialization is
//! pretty-printed with two-space indentation and a UTF-8 XML declaration;
//! exact byte layout is not a contract, well-formedness and the namespace
//! declaration are.
//!
//! Every item's `pubDate` is the synthesis instant, injected by the caller
//! so repeated runs over identical input are reproducible. The extracted
//! per-lecture recording timestamp is deliberately not surfaced here.

use crate::config::ChannelConfig;
use crate::models::EnrichedLecture;
use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::error::Error;
use std::io::Cursor;

const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
const ENCLOSURE_TYPE: &str = "audio/mpeg";

/// Serialize the enriched lectures as an RSS 2.0 podcast document.
pub fn build_feed(
    channel: &ChannelConfig,
    lectures: &[EnrichedLecture],
    now: DateTime<Utc>,
) -> Result<Vec<u8>, Box<dyn Error>> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:itunes", ITUNES_NS));
    writer.write_event(Event::Start(rss))?;

    writer.write_event(Event::Start(BytesStart::new("channel")))?;
    write_text_element(&mut writer, "title", &channel.title)?;
    write_text_element(&mut writer, "link", &channel.link)?;
    write_text_element(&mut writer, "description", &channel.description)?;
    write_text_element(&mut writer, "language", &channel.language)?;

    let pub_date = now.to_rfc2822();
    for entry in lectures {
        writer.write_event(Event::Start(BytesStart::new("item")))?;
        write_text_element(&mut writer, "title", &entry.lecture.title)?;
        write_text_element(&mut writer, "link", &entry.audio_url)?;
        write_text_element(&mut writer, "guid", &entry.audio_url)?;
        write_text_element(&mut writer, "pubDate", &pub_date)?;
        let mut enclosure = BytesStart::new("enclosure");
        enclosure.push_attribute(("url", entry.audio_url.as_str()));
        enclosure.push_attribute(("type", ENCLOSURE_TYPE));
        writer.write_event(Event::Empty(enclosure))?;
        write_text_element(&mut writer, "itunes:duration", &entry.duration)?;
        write_text_element(&mut writer, "author", &entry.lecture.source_name)?;
        writer.write_event(Event::End(BytesEnd::new("item")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    writer.write_event(Event::End(BytesEnd::new("rss")))?;

    Ok(writer.into_inner().into_inner())
}

fn write_text_element<W: std::io::Write>(
    writer: &mut Writer<W>,
    name: &str,
    text: &str,
) -> Result<(), Box<dyn Error>> {
    writer.write_event(Event::Start(BytesStart::new(name)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
