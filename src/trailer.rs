use once_cell::sync::Lazy;
use regex::Regex;

const VIDEO_ID_LEN: usize = 11;

static VIDEO_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*").expect("static regex")
});

/// The 11-character video id, or `None` when the URL holds no usable trailer.
pub fn video_id(url: &str) -> Option<&str> {
    let caps = VIDEO_URL.captures(url.trim())?;
    let id = caps.get(2)?.as_str();
    (id.len() == VIDEO_ID_LEN).then_some(id)
}

pub fn embed_url(url: &str) -> Option<String> {
    video_id(url).map(|id| format!("https://www.youtube.com/embed/{id}?autoplay=1&rel=0&modestbranding=1"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_url_shapes() {
        for url in [
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?t=10",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/v/dQw4w9WgXcQ",
            "https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
        ] {
            assert_eq!(video_id(url), Some("dQw4w9WgXcQ"), "{url}");
        }
    }

    #[test]
    fn missing_or_malformed_ids_mean_no_trailer() {
        assert_eq!(video_id(""), None);
        assert_eq!(video_id("https://vimeo.com/12345"), None);
        assert_eq!(video_id("https://youtu.be/short"), None);
        assert_eq!(embed_url("not a url"), None);
        assert_eq!(
            embed_url("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ?autoplay=1&rel=0&modestbranding=1")
        );
    }
}
