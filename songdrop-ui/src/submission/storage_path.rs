//! Deterministic object paths for uploaded files

/// Extension derived from a media type
///
/// Uses the subtype (`audio/ogg` → `ogg`) with a few common aliases mapped to
/// their usual file extension. Parameters (`; charset=...`) and structured
/// suffixes (`+xml`) are dropped.
pub fn extension_for(content_type: &str) -> String {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let subtype = essence
        .split_once('/')
        .map(|(_, sub)| sub)
        .unwrap_or_default();
    let subtype = subtype.split('+').next().unwrap_or_default();

    let ext = match subtype {
        "mpeg" | "mp3" => "mp3",
        "jpeg" | "pjpeg" => "jpg",
        "x-wav" | "wave" | "vnd.wave" => "wav",
        "x-flac" => "flac",
        "mp4" | "x-m4a" => "m4a",
        "" => "bin",
        other => other,
    };

    let ext: String = ext.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    if ext.is_empty() {
        "bin".to_string()
    } else {
        ext
    }
}

/// Lowercase ASCII slug; runs of anything else collapse to one `-`
fn slug(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut dash = false;
    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
            dash = false;
        } else if !dash && !out.is_empty() {
            out.push('-');
            dash = true;
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// `{title}-{artist}-{row_id}.{ext}`, built from the inserted row
pub fn storage_path(title: &str, artist: &str, row_id: i64, content_type: &str) -> String {
    format!(
        "{}-{}-{}.{}",
        slug(title),
        slug(artist),
        row_id,
        extension_for(content_type)
    )
}
