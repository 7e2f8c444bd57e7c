use crate::Segment;
use crate::timestamp::format_timestamp;

/// Default character budget for transcript text sent to the model
pub const MAX_TRANSCRIPT_CHARACTERS: usize = 6000;

fn keep_tail(text: String, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }

    let skip = total - max_chars;
    let cut = text.char_indices().nth(skip).map(|(i, _)| i).unwrap_or(text.len());
    text[cut..].to_string()
}

/// Join segment text with spaces, keeping only the last `max_chars`
/// characters when the result is over budget.
pub fn reduce_plain(segments: &[Segment], max_chars: usize) -> String {
    let combined = segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    keep_tail(combined, max_chars)
}

/// Join segments as `[mm:ss] text`, giving prompts temporal anchors.
pub fn reduce_with_timestamps(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| format!("[{}] {}", format_timestamp(s.offset), s.text))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Picks the reducer variant used when building prompts. Both variants keep
/// only the last `max_chars` characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reducer {
    pub max_chars: usize,
    pub timestamps: bool,
}

impl Default for Reducer {
    fn default() -> Self {
        Self {
            max_chars: MAX_TRANSCRIPT_CHARACTERS,
            timestamps: true,
        }
    }
}

impl Reducer {
    pub fn reduce(&self, segments: &[Segment]) -> String {
        if self.timestamps {
            keep_tail(reduce_with_timestamps(segments), self.max_chars)
        } else {
            reduce_plain(segments, self.max_chars)
        }
    }
}

/// Render a transcript for reading, one `[mm:ss] text` line per segment
pub fn render_transcript(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| format!("[{}] {}", format_timestamp(s.offset), s.text))
        .collect::<Vec<_>>()
        .join("\n")
}
