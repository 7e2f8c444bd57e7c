use async_trait::async_trait;
use log::debug;
use regex::Regex;
use serde::Deserialize;

use crate::{Error, Result, Segment};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// Source of caption segments for a video.
///
/// `lang` of `None` asks for the video's default track.
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    async fn fetch(&self, video_id: &str, lang: Option<&str>) -> Result<Vec<Segment>>;
}

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
}

/// Captions scraped from YouTube's InnerTube player endpoint
#[derive(Debug, Clone, Default)]
pub struct YoutubeCaptions {
    client: reqwest::Client,
}

impl YoutubeCaptions {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Caption(e.to_string()))?;
        resp.text().await.map_err(|e| Error::Caption(e.to_string()))
    }

    async fn caption_tracks(&self, video_id: &str, lang: &str) -> Result<Vec<CaptionTrack>> {
        let watch_url = format!("https://www.youtube.com/watch?v={video_id}");
        debug!("Fetching watch page: {watch_url}");
        let page_html = self.get_text(&watch_url).await?;

        let api_key = extract_api_key(&page_html)?;
        debug!("Extracted InnerTube API key: {api_key}");

        let player_url = format!("https://www.youtube.com/youtubei/v1/player?key={api_key}&prettyPrint=false");
        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": lang,
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": "2.20241126.01.00"
                }
            },
            "videoId": video_id
        });

        let resp: InnerTubePlayerResponse = self
            .client
            .post(&player_url)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Caption(e.to_string()))?
            .json()
            .await
            .map_err(|e| Error::Caption(e.to_string()))?;

        Ok(resp
            .captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .and_then(|r| r.caption_tracks)
            .unwrap_or_default())
    }
}

#[async_trait]
impl CaptionProvider for YoutubeCaptions {
    async fn fetch(&self, video_id: &str, lang: Option<&str>) -> Result<Vec<Segment>> {
        let tracks = self.caption_tracks(video_id, lang.unwrap_or("en")).await?;
        if tracks.is_empty() {
            return Err(Error::Caption(format!("no captions available for video {video_id}")));
        }

        let track = select_track(&tracks, lang)
            .ok_or_else(|| Error::Caption(format!("no {} captions for video {video_id}", lang.unwrap_or("default"))))?;
        debug!("Using caption track: lang={}", track.language_code);

        let caption_xml = self.get_text(&track.base_url).await?;
        parse_caption_xml(&caption_xml)
    }
}

// A requested language must match exactly; no language means the first track.
fn select_track<'a>(tracks: &'a [CaptionTrack], lang: Option<&str>) -> Option<&'a CaptionTrack> {
    match lang {
        Some(lang) => tracks.iter().find(|t| t.language_code == lang),
        None => tracks.first(),
    }
}

fn extract_api_key(html: &str) -> Result<String> {
    let patterns = [r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#, r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#];
    for pattern in patterns {
        let re = Regex::new(pattern).map_err(|e| Error::Caption(e.to_string()))?;
        if let Some(caps) = re.captures(html) {
            return Ok(caps[1].to_string());
        }
    }
    Err(Error::Caption("could not extract InnerTube API key from watch page".to_string()))
}

/// Parse timedtext XML into segments.
///
/// Only the XML escaping layer is removed here; caption bodies often carry a
/// second, HTML-entity layer which the transcript fetcher decodes.
fn parse_caption_xml(xml: &str) -> Result<Vec<Segment>> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current_start: Option<f64> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                current_start = e
                    .attributes()
                    .flatten()
                    .find(|attr| attr.key.as_ref() == b"start")
                    .and_then(|attr| String::from_utf8_lossy(&attr.value).parse::<f64>().ok());
            }
            Ok(Event::Text(ref e)) => {
                if let Some(offset) = current_start.take() {
                    let text = e.unescape().unwrap_or_default().trim().to_string();
                    if !text.is_empty() {
                        segments.push(Segment { offset, text });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(Error::Caption(format!("error parsing caption XML: {e}"))),
            _ => {}
        }
    }

    Ok(segments)
}
