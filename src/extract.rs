//! Detail-page extraction.
//!
//! Every candidate's detail page embeds a `lecturePlayerData` object
//! literal inside an inline script. The blob is semi-structured at best,
//! so each field is pulled out by its own pattern and each one is allowed
//! to be absent independently:
//!
//! - `downloadURL`: the audio file, stored with its string escaping undone
//! - `shiurDateUTCDateTime`: the recording timestamp, stored verbatim
//! - `shiurDuration`: `"2h 5min 9s "`-style text, normalized to `m:ss`
//!
//! A record whose page is unreachable or blob-less keeps its place in the
//! output with empty fields; nothing here can abort the batch.

use crate::fetch::FetchClient;
use crate::models::{DetailOutcome, EnrichedLecture, Lecture};
use crate::utils::truncate_for_log;
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Number of detail pages in flight at once. Stands in for the serial
/// inter-item sleep of earlier revisions; keeps outbound pressure bounded.
const DETAIL_CONCURRENCY: usize = 4;

static PLAYER_DATA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)var lecturePlayerData = (\{.*?\});").unwrap());
static DOWNLOAD_URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""downloadURL":"(.*?)""#).unwrap());
static RECORDED_AT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""shiurDateUTCDateTime":"(.*?)""#).unwrap());
static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""shiurDuration":"(?:(\d+)h )?(\d+)min(?: (\d+)s)? ""#).unwrap());

/// Locate the player blob on a detail page.
///
/// Inline `<script>` contents are searched first so that escaped copies of
/// the marker in visible text cannot shadow the real blob; the raw page is
/// the fallback for markup the HTML parser mangles.
pub fn find_player_data(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let scripts = Selector::parse("script").unwrap();
    for script in document.select(&scripts) {
        let text = script.text().collect::<String>();
        if let Some(cap) = PLAYER_DATA_RE.captures(&text) {
            return Some(cap[1].to_string());
        }
    }
    PLAYER_DATA_RE.captures(html).map(|cap| cap[1].to_string())
}

/// The audio download URL, with backslash escaping reversed.
pub fn download_url(player_data: &str) -> Option<String> {
    DOWNLOAD_URL_RE
        .captures(player_data)
        .map(|cap| unescape_js_string(&cap[1]))
}

/// The recording timestamp, exactly as published.
pub fn recorded_at(player_data: &str) -> Option<String> {
    RECORDED_AT_RE.captures(player_data).map(|cap| cap[1].to_string())
}

/// The duration, normalized to `minutes:seconds` with seconds zero-padded.
///
/// Hours default to 0 and seconds to `"00"` when the published text omits
/// them: `"2h 5min 9s "` becomes `"125:09"`, `"45min "` becomes `"45:00"`.
pub fn duration(player_data: &str) -> Option<String> {
    let cap = DURATION_RE.captures(player_data)?;
    let hours: u32 = cap.get(1).map_or(0, |m| m.as_str().parse().unwrap_or(0));
    let minutes: u32 = cap[2].parse().unwrap_or(0);
    let seconds = cap
        .get(3)
        .map_or_else(|| "00".to_string(), |m| format!("{:0>2}", m.as_str()));
    Some(format!("{}:{}", hours * 60 + minutes, seconds))
}

/// Reverse generic JavaScript string escaping: `\/` → `/`, `\\` → `\`,
/// `\"` → `"`, `\uXXXX` → the code point, plus the usual control escapes.
/// Unknown escapes are kept as written rather than dropped.
fn unescape_js_string(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('/') => out.push('/'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Enrich one candidate. Every failure mode folds into empty fields on the
/// returned record; nothing propagates past it.
async fn enrich_one(client: &FetchClient, lecture: Lecture, throttle: Duration) -> EnrichedLecture {
    let body = client.fetch_with_retries(&lecture.link).await;
    if !throttle.is_zero() {
        sleep(throttle).await;
    }
    let Some(body) = body else {
        warn!(
            title = %lecture.title,
            link = %lecture.link,
            "detail page unreachable; keeping record with empty fields"
        );
        return EnrichedLecture::empty(lecture, DetailOutcome::FetchFailed);
    };
    let Some(player_data) = find_player_data(&body) else {
        warn!(
            title = %lecture.title,
            link = %lecture.link,
            body_preview = %truncate_for_log(&body, 120),
            "no lecturePlayerData on detail page"
        );
        return EnrichedLecture::empty(lecture, DetailOutcome::MissingPlayerData);
    };

    let audio_url = download_url(&player_data).unwrap_or_default();
    let recorded_at = recorded_at(&player_data).unwrap_or_default();
    let duration = duration(&player_data).unwrap_or_default();
    debug!(
        title = %lecture.title,
        has_audio = !audio_url.is_empty(),
        %recorded_at,
        %duration,
        "extracted player data"
    );
    EnrichedLecture {
        lecture,
        audio_url,
        recorded_at,
        duration,
        outcome: DetailOutcome::Extracted,
    }
}

/// Fetch and extract details for every candidate, at most
/// [`DETAIL_CONCURRENCY`] pages in flight, restoring candidate order once
/// all workers finish.
///
/// `limit` caps how many candidates are enriched (the rest are dropped from
/// the run); `throttle` is the per-worker courtesy delay after each fetch.
pub async fn enrich_details(
    client: &FetchClient,
    lectures: Vec<Lecture>,
    limit: Option<usize>,
    throttle: Duration,
) -> Vec<EnrichedLecture> {
    let total = limit.map_or(lectures.len(), |n| n.min(lectures.len()));
    info!(total, concurrency = DETAIL_CONCURRENCY, "fetching lecture details");

    let tagged: Vec<(usize, EnrichedLecture)> =
        stream::iter(lectures.into_iter().take(total).enumerate())
            .map(|(idx, lecture)| async move {
                let enriched = enrich_one(client, lecture, throttle).await;
                debug!(index = idx, total, "lecture detail processed");
                (idx, enriched)
            })
            .buffer_unordered(DETAIL_CONCURRENCY)
            .collect()
            .await;

    let ordered: Vec<EnrichedLecture> = tagged
        .into_iter()
        .sorted_by_key(|(idx, _)| *idx)
        .map(|(_, enriched)| enriched)
        .collect();

    let extracted = ordered
        .iter()
        .filter(|l| l.outcome == DetailOutcome::Extracted)
        .count();
    info!(
        total = ordered.len(),
        extracted,
        failed = ordered.len() - extracted,
        "detail fetching complete"
    );
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMPLE_PAGE: &str = r#"<html><head><title>Shiur</title></head><body>
<div id="player"></div>
<script type="text/javascript">
  var lecturePlayerData = {"shiurID":1063,"downloadURL":"https:\/\/download.example.org\/shiurim\/1063.mp3","shiurDateUTCDateTime":"2025-03-14T09:30:00","shiurDuration":"1h 5min 9s ","teacherFullName":"Rabbi Chaim Marcus"};
</script>
</body></html>"#;

    fn sample_lecture(link: &str) -> Lecture {
        Lecture {
            source_name: "Rabbi Chaim Marcus".to_string(),
            title: "Parshas Bo".to_string(),
            link: link.to_string(),
            description: String::new(),
        }
    }

    fn quick_test_client() -> FetchClient {
        FetchClient::new(2, Duration::from_secs(5), Duration::from_millis(10))
    }

    #[test]
    fn test_find_player_data_in_script() {
        let blob = find_player_data(SAMPLE_PAGE).expect("blob should be found");
        assert!(blob.starts_with('{'));
        assert!(blob.ends_with('}'));
        assert!(blob.contains("downloadURL"));
    }

    #[test]
    fn test_find_player_data_absent() {
        assert!(find_player_data("<html><body>no player here</body></html>").is_none());
    }

    #[test]
    fn test_download_url_unescapes_slashes() {
        let blob = r#"{"downloadURL":"https:\/\/example.com\/a.mp3"}"#;
        assert_eq!(
            download_url(blob).as_deref(),
            Some("https://example.com/a.mp3")
        );
    }

    #[test]
    fn test_unescape_handles_unicode_and_unknown_escapes() {
        assert_eq!(unescape_js_string(r"a\u0041b"), "aAb");
        assert_eq!(unescape_js_string(r"tab\there"), "tab\there");
        assert_eq!(unescape_js_string(r"odd\zend"), r"odd\zend");
    }

    #[test]
    fn test_recorded_at_is_verbatim() {
        let blob = r#"{"shiurDateUTCDateTime":"2025-03-14T09:30:00"}"#;
        assert_eq!(recorded_at(blob).as_deref(), Some("2025-03-14T09:30:00"));
    }

    #[test]
    fn test_duration_normalization_table() {
        let cases = [
            (r#"{"shiurDuration":"45min "}"#, Some("45:00")),
            (r#"{"shiurDuration":"1h 5min "}"#, Some("65:00")),
            (r#"{"shiurDuration":"2h 5min 9s "}"#, Some("125:09")),
            (r#"{"shiurDuration":"1h 5min 42s "}"#, Some("65:42")),
            (r#"{"shiurDuration":"about an hour"}"#, None),
            (r#"{"otherKey":"1h 5min "}"#, None),
        ];
        for (blob, expected) in cases {
            assert_eq!(duration(blob).as_deref(), expected, "blob: {blob}");
        }
    }

    #[test]
    fn test_fields_are_independent() {
        // a blob with only a duration still yields that duration
        let blob = r#"{"shiurID":7,"shiurDuration":"45min "}"#;
        assert!(download_url(blob).is_none());
        assert!(recorded_at(blob).is_none());
        assert_eq!(duration(blob).as_deref(), Some("45:00"));
    }

    #[tokio::test]
    async fn test_failed_record_is_isolated() {
        let server = MockServer::start().await;
        for i in [1usize, 2, 4, 5] {
            Mock::given(method("GET"))
                .and(path(format!("/shiur/{i}")))
                .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_PAGE))
                .mount(&server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/shiur/3"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let lectures: Vec<Lecture> = (1..=5)
            .map(|i| sample_lecture(&format!("{}/shiur/{}", server.uri(), i)))
            .collect();

        let client = quick_test_client();
        let enriched = enrich_details(&client, lectures, None, Duration::ZERO).await;

        assert_eq!(enriched.len(), 5);
        for (i, entry) in enriched.iter().enumerate() {
            if i == 2 {
                assert_eq!(entry.outcome, DetailOutcome::FetchFailed);
                assert!(entry.audio_url.is_empty());
                assert!(entry.recorded_at.is_empty());
                assert!(entry.duration.is_empty());
            } else {
                assert_eq!(entry.outcome, DetailOutcome::Extracted, "record {i}");
                assert_eq!(
                    entry.audio_url,
                    "https://download.example.org/shiurim/1063.mp3"
                );
                assert_eq!(entry.recorded_at, "2025-03-14T09:30:00");
                assert_eq!(entry.duration, "65:09");
            }
        }
    }

    #[tokio::test]
    async fn test_completion_order_does_not_leak_into_output_order() {
        let server = MockServer::start().await;
        // source A's two items respond slowly, source B's three instantly,
        // so completion order differs from candidate order
        for p in ["a1", "a2"] {
            Mock::given(method("GET"))
                .and(path(format!("/shiur/{p}")))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_string(SAMPLE_PAGE)
                        .set_delay(Duration::from_millis(200)),
                )
                .mount(&server)
                .await;
        }
        for p in ["b1", "b2", "b3"] {
            Mock::given(method("GET"))
                .and(path(format!("/shiur/{p}")))
                .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_PAGE))
                .mount(&server)
                .await;
        }

        let order = ["a1", "a2", "b1", "b2", "b3"];
        let lectures: Vec<Lecture> = order
            .iter()
            .map(|p| {
                let mut lecture = sample_lecture(&format!("{}/shiur/{}", server.uri(), p));
                lecture.title = p.to_string();
                lecture
            })
            .collect();

        let client = quick_test_client();
        let enriched = enrich_details(&client, lectures, None, Duration::ZERO).await;

        let titles: Vec<&str> = enriched.iter().map(|e| e.lecture.title.as_str()).collect();
        assert_eq!(titles, order);
    }

    #[tokio::test]
    async fn test_limit_caps_enriched_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(SAMPLE_PAGE))
            .mount(&server)
            .await;

        let lectures: Vec<Lecture> = (1..=5)
            .map(|i| sample_lecture(&format!("{}/shiur/{}", server.uri(), i)))
            .collect();

        let client = quick_test_client();
        let enriched = enrich_details(&client, lectures, Some(3), Duration::ZERO).await;
        assert_eq!(enriched.len(), 3);
    }
}
