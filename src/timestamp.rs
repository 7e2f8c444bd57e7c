const SECONDS_PER_MINUTE: u64 = 60;
const SECONDS_PER_HOUR: u64 = 3600;

/// Format an offset in seconds as `mm:ss`, or `hh:mm:ss` from one hour up.
pub fn format_timestamp(offset: f64) -> String {
    let total = if offset.is_finite() && offset > 0.0 {
        offset.floor() as u64
    } else {
        0
    };

    let minutes = (total % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE;
    let seconds = total % SECONDS_PER_MINUTE;

    if total >= SECONDS_PER_HOUR {
        format!("{:02}:{minutes:02}:{seconds:02}", total / SECONDS_PER_HOUR)
    } else {
        format!("{:02}:{seconds:02}", total / SECONDS_PER_MINUTE)
    }
}

/// Parse `m:ss`, `mm:ss`, `h:mm:ss` or `hh:mm:ss` into seconds.
pub fn parse_timestamp_to_seconds(timestamp: &str) -> Option<u32> {
    let trimmed = timestamp.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parts = trimmed
        .split(':')
        .map(|p| p.trim().parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;

    match parts.as_slice() {
        [minutes, seconds] if *seconds < 60 => minutes.checked_mul(60)?.checked_add(*seconds),
        [hours, minutes, seconds] if *minutes < 60 && *seconds < 60 => {
            hours.checked_mul(3600)?.checked_add(minutes * 60 + seconds)
        }
        _ => None,
    }
}

/// A timestamp found inside free text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampMatch {
    pub timestamp: String,
    pub offset: u32,
    /// Byte offset of the match in the scanned text
    pub index: usize,
}

fn digit_run(bytes: &[u8], from: usize) -> usize {
    bytes[from..].iter().take(2).take_while(|b| b.is_ascii_digit()).count()
}

// Candidate lengths for `d{1,2}:d{1,2}(:d{1,2})?` starting at `start`, in the
// order a backtracking matcher tries them: longest digit groups first, the
// optional third group before its absence.
fn candidates(bytes: &[u8], start: usize) -> Vec<usize> {
    let mut out = Vec::new();
    let first = digit_run(bytes, start);
    for a in (1..=first).rev() {
        let colon = start + a;
        if bytes.get(colon) != Some(&b':') {
            continue;
        }
        let second = digit_run(bytes, colon + 1);
        for b in (1..=second).rev() {
            let end = colon + 1 + b;
            if bytes.get(end) == Some(&b':') {
                let third = digit_run(bytes, end + 1);
                for c in (1..=third).rev() {
                    out.push(end + 1 + c - start);
                }
            }
            out.push(end - start);
        }
    }
    out
}

/// Find every `h:mm:ss` / `m:ss` style timestamp in `text`.
///
/// A match may not touch another digit on either side, and matches that are
/// not valid clock values (such as `99:99`) are dropped.
pub fn parse_timestamps_from_text(text: &str) -> Vec<TimestampMatch> {
    let bytes = text.as_bytes();
    let mut results = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let preceded_by_digit = i > 0 && bytes[i - 1].is_ascii_digit();
        let found = if preceded_by_digit {
            None
        } else {
            candidates(bytes, i)
                .into_iter()
                .find(|len| !bytes.get(i + len).is_some_and(u8::is_ascii_digit))
        };

        match found {
            Some(len) => {
                // Candidates are pure ASCII, so the slice is on char boundaries.
                let timestamp = &text[i..i + len];
                if let Some(offset) = parse_timestamp_to_seconds(timestamp) {
                    results.push(TimestampMatch {
                        timestamp: timestamp.to_string(),
                        offset,
                        index: i,
                    });
                }
                i += len;
            }
            None => i += 1,
        }
    }

    results
}

/// Watch-page URL that starts playback at `offset` seconds.
pub fn watch_url_at(video_id: &str, offset: u32) -> String {
    format!("https://www.youtube.com/watch?v={video_id}&t={offset}s")
}

/// Append a watch link after every timestamp found in `text`.
pub fn link_timestamps(text: &str, video_id: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for m in parse_timestamps_from_text(text) {
        let end = m.index + m.timestamp.len();
        out.push_str(&text[last..end]);
        out.push_str(&format!(" ({})", watch_url_at(video_id, m.offset)));
        last = end;
    }
    out.push_str(&text[last..]);
    out
}
