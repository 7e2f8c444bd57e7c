use log::{debug, warn};

use crate::youtube::CaptionProvider;
use crate::{Error, Result, Segment};

fn decode_entities(segments: Vec<Segment>) -> Vec<Segment> {
    segments
        .into_iter()
        .map(|s| Segment {
            offset: s.offset,
            text: html_escape::decode_html_entities(&s.text).into_owned(),
        })
        .collect()
}

/// Fetch the transcript of `video_id`, preferring captions in `lang`.
///
/// The requested language is tried first. Any failure or empty result there
/// falls back to the video's default track, once. Both tracks get their
/// HTML entities decoded.
pub async fn fetch_transcript(
    provider: &dyn CaptionProvider,
    video_id: Option<&str>,
    lang: &str,
) -> Result<Vec<Segment>> {
    let video_id = video_id.ok_or(Error::NoVideoDetected)?;

    match provider.fetch(video_id, Some(lang)).await {
        Ok(segments) if !segments.is_empty() => {
            debug!("Fetched {} {lang} segments for {video_id}", segments.len());
            return Ok(decode_entities(segments));
        }
        Ok(_) => debug!("No {lang} segments for {video_id}, trying default track"),
        Err(e) => warn!("{lang} captions failed for {video_id}: {e}; trying default track"),
    }

    match provider.fetch(video_id, None).await {
        Ok(segments) if !segments.is_empty() => {
            debug!("Fetched {} default-track segments for {video_id}", segments.len());
            Ok(decode_entities(segments))
        }
        Ok(_) => Err(Error::EmptyTranscript),
        Err(e) => Err(Error::TranscriptFetchFailed(match e {
            Error::Caption(msg) | Error::TranscriptFetchFailed(msg) if !msg.is_empty() => msg,
            Error::Caption(_) | Error::TranscriptFetchFailed(_) => {
                "Failed to fetch transcript. Please try again.".to_string()
            }
            other => other.to_string(),
        })),
    }
}

/// The most recently fetched transcript and what it was fetched for.
#[derive(Debug, Clone, Default)]
pub struct TranscriptStore {
    segments: Vec<Segment>,
    locale: Option<String>,
    video_id: Option<String>,
}

impl TranscriptStore {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// Usable as-is for `video_id` in `lang`, without a re-fetch.
    pub fn is_fresh(&self, video_id: Option<&str>, lang: &str) -> bool {
        !self.segments.is_empty() && self.locale.as_deref() == Some(lang) && self.video_id.as_deref() == video_id
    }

    /// Replace wholesale. The locale is the requested language even when the
    /// segments came from the default track.
    pub fn replace(&mut self, video_id: &str, lang: &str, segments: Vec<Segment>) {
        self.segments = segments;
        self.locale = Some(lang.to_string());
        self.video_id = Some(video_id.to_string());
    }

    pub fn clear(&mut self) {
        self.segments.clear();
        self.locale = None;
        self.video_id = None;
    }
}
