use once_cell::sync::Lazy;
use regex::Regex;

static VIDEO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(https?://)?(www\.)?(youtube\.com/watch\?v=|youtu\.be/)[\w\-]+([&?][\w=%\-]+)*",
    )
    .expect("video URL pattern is valid")
});

/// Recognizes `youtube.com/watch?v=ID` and `youtu.be/ID`, with optional
/// scheme and `www.`. Only the start of the input has to match, so trailing
/// parameters and fragments are accepted as-is.
pub fn is_video_url(url: &str) -> bool {
    VIDEO_URL.is_match(url.trim())
}
