//! Folding HEAD response header lines into a `HeadResult`.

use super::HeadResult;

impl HeadResult {
    /// Absorbs one raw header line. A status line (`HTTP/...`) starts a new
    /// response, so headers of a redirect hop never leak into the final one.
    pub(crate) fn absorb_line(&mut self, line: &str) {
        let line = line.trim();
        if line.starts_with("HTTP/") {
            *self = HeadResult::default();
            return;
        }
        let Some((name, value)) = line.split_once(':') else {
            return;
        };
        let value = value.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "content-length" => self.content_length = value.parse().ok(),
            "accept-ranges" => self.accept_ranges = value.eq_ignore_ascii_case("bytes"),
            "content-type" => self.content_type = Some(value.to_string()),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn absorb_all(lines: &[&str]) -> HeadResult {
        let mut r = HeadResult::default();
        for l in lines {
            r.absorb_line(l);
        }
        r
    }

    #[test]
    fn length_ranges_and_type() {
        let r = absorb_all(&[
            "HTTP/1.1 200 OK\r\n",
            "Content-Length: 12345\r\n",
            "Accept-Ranges: bytes\r\n",
            "Content-Type: video/mp4\r\n",
            "\r\n",
        ]);
        assert_eq!(r.content_length, Some(12345));
        assert_eq!(r.usable_length(), Some(12345));
        assert!(r.accept_ranges);
        assert_eq!(r.content_type.as_deref(), Some("video/mp4"));
    }

    #[test]
    fn redirect_hop_headers_discarded() {
        let r = absorb_all(&[
            "HTTP/1.1 302 Found",
            "Content-Length: 99",
            "Location: https://cdn.example/v.m4s",
            "HTTP/2 200",
            "accept-ranges: bytes",
        ]);
        assert_eq!(r.content_length, None);
        assert!(r.accept_ranges);
    }

    #[test]
    fn zero_length_is_not_usable() {
        let r = absorb_all(&["Content-Length: 0"]);
        assert_eq!(r.content_length, Some(0));
        assert_eq!(r.usable_length(), None);
    }

    #[test]
    fn garbage_length_and_ranges_none() {
        let r = absorb_all(&["content-length: lots", "Accept-Ranges: none"]);
        assert!(r.content_length.is_none());
        assert!(!r.accept_ranges);
    }
}
