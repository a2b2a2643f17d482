// Target detection: pure hostname + path-shape matching, no HTTP.

use std::sync::LazyLock;

use regex::Regex;

static STATUS_PATH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(?:([A-Za-z0-9_]{1,15})|i/web)/status(?:es)?/(\d{1,20})(?:/|$)")
        .expect("valid regex")
});

const STATUS_HOSTS: &[&str] = &["twitter.com", "x.com", "fxtwitter.com", "vxtwitter.com"];
const VIDEO_HOSTS: &[&str] = &["youtube.com", "youtu.be"];

/// A single post on a social-status host, e.g. `https://x.com/rustlang/status/123`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRef {
    /// Account handle, absent for `/i/web/status/{id}` links.
    pub user: Option<String>,
    pub id: String,
}

impl StatusRef {
    /// Canonical public URL for this status.
    pub fn canonical_url(&self) -> String {
        match &self.user {
            Some(user) => format!("https://x.com/{user}/status/{}", self.id),
            None => format!("https://x.com/i/web/status/{}", self.id),
        }
    }
}

/// Match `url` against the social-status shape. Returns `None` for anything
/// that is not a single post on a known status host.
pub fn social_status(url: &str) -> Option<StatusRef> {
    let parsed = url::Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    if !host_matches(&host, STATUS_HOSTS) {
        return None;
    }

    let caps = STATUS_PATH_RE.captures(parsed.path())?;
    Some(StatusRef {
        user: caps.get(1).map(|m| m.as_str().to_string()),
        id: caps[2].to_string(),
    })
}

pub fn is_social_status(url: &str) -> bool {
    social_status(url).is_some()
}

/// Is `url` on the video-hosting domain with an oEmbed fallback?
pub fn is_video_host(url: &str) -> bool {
    url::Url::parse(url.trim())
        .ok()
        .and_then(|u| u.host_str().map(str::to_lowercase))
        .is_some_and(|host| host_matches(&host, VIDEO_HOSTS))
}

/// Exact host or any subdomain of it (`mobile.x.com`, `www.youtube.com`).
fn host_matches(host: &str, candidates: &[&str]) -> bool {
    candidates
        .iter()
        .any(|c| host == *c || host.ends_with(&format!(".{c}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_urls_on_both_hosts() {
        for url in &[
            "https://twitter.com/rustlang/status/1234567890",
            "https://x.com/rustlang/status/1234567890",
            "https://mobile.twitter.com/rustlang/status/1234567890/photo/1",
            "https://www.x.com/rustlang/status/1234567890?s=20",
        ] {
            let status = social_status(url).unwrap_or_else(|| panic!("expected status for {url}"));
            assert_eq!(status.user.as_deref(), Some("rustlang"));
            assert_eq!(status.id, "1234567890");
        }
    }

    #[test]
    fn web_status_link_has_no_user() {
        let status = social_status("https://x.com/i/web/status/42").unwrap();
        assert_eq!(status.user, None);
        assert_eq!(status.canonical_url(), "https://x.com/i/web/status/42");
    }

    #[test]
    fn profiles_and_other_hosts_are_not_statuses() {
        assert!(!is_social_status("https://x.com/rustlang"));
        assert!(!is_social_status("https://x.com/rustlang/likes"));
        assert!(!is_social_status("https://example.com/rustlang/status/1"));
        assert!(!is_social_status("https://notx.com/rustlang/status/1"));
        assert!(!is_social_status("not a url"));
    }

    #[test]
    fn canonical_url_uses_x_host() {
        let status = social_status("https://twitter.com/rustlang/status/7").unwrap();
        assert_eq!(status.canonical_url(), "https://x.com/rustlang/status/7");
    }

    #[test]
    fn video_hosts() {
        assert!(is_video_host("https://www.youtube.com/watch?v=abc"));
        assert!(is_video_host("https://youtu.be/abc"));
        assert!(is_video_host("https://m.youtube.com/watch?v=abc"));
        assert!(!is_video_host("https://vimeo.com/123"));
        assert!(!is_video_host("https://youtube.com.evil.test/watch"));
    }
}
