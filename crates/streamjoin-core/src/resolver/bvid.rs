//! Media id extraction and quality labels.

use url::Url;

const BVID_PREFIX: &str = "BV";
const BVID_BODY_LEN: usize = 10;

fn is_bvid(s: &str) -> bool {
    s.len() == BVID_PREFIX.len() + BVID_BODY_LEN
        && s.starts_with(BVID_PREFIX)
        && s[BVID_PREFIX.len()..].chars().all(|c| c.is_ascii_alphanumeric())
}

/// First `BV` + 10 alphanumerics token in `s`, if any.
fn find_bvid(s: &str) -> Option<&str> {
    let want = BVID_PREFIX.len() + BVID_BODY_LEN;
    s.match_indices(BVID_PREFIX).find_map(|(i, _)| {
        let candidate = s.get(i..i + want)?;
        let boundary_ok = s[i + want..]
            .chars()
            .next()
            .map_or(true, |c| !c.is_ascii_alphanumeric());
        (is_bvid(candidate) && boundary_ok).then_some(candidate)
    })
}

/// Extract a video id from a bare id (`BV1xx411c7mD`) or a page URL
/// (`https://www.bilibili.com/video/BV1xx411c7mD/?p=2`).
pub fn extract_bvid(input: &str) -> Option<String> {
    let input = input.trim();
    if is_bvid(input) {
        return Some(input.to_string());
    }
    let url = Url::parse(input).ok()?;
    if let Some(segments) = url.path_segments() {
        for seg in segments {
            if is_bvid(seg) {
                return Some(seg.to_string());
            }
        }
    }
    url.query_pairs()
        .find(|(k, _)| k == "bvid")
        .and_then(|(_, v)| find_bvid(&v).map(str::to_string))
}

/// Page number from a `?p=N` query parameter, if present.
pub fn page_from_url(input: &str) -> Option<u32> {
    let url = Url::parse(input.trim()).ok()?;
    url.query_pairs()
        .find(|(k, _)| k == "p")
        .and_then(|(_, v)| v.parse().ok())
        .filter(|p| *p >= 1)
}

/// Human label for a video quality id.
pub fn quality_label(id: u32) -> Option<&'static str> {
    Some(match id {
        127 => "8K",
        120 => "4K",
        116 => "1080P60",
        112 => "1080P+",
        80 => "1080P",
        64 => "720P",
        32 => "480P",
        16 => "360P",
        _ => return None,
    })
}
