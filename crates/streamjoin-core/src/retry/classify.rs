//! Classify HTTP status and curl errors into retry policy error kinds.

use super::error::FetchError;
use super::policy::ErrorKind;

/// Classify the status of an answer to a ranged GET.
///
/// 206 never reaches here. Throttling and 5xx keep their own kinds for
/// logging; anything else means the range was not honoured this time.
pub fn classify_http_status(code: u32) -> ErrorKind {
    match code {
        429 | 503 => ErrorKind::Throttled,
        500..=599 => ErrorKind::Http5xx(code as u16),
        _ => ErrorKind::RangeRejected,
    }
}

/// Classify a curl error for retry decisions.
///
/// Transport failures (resets, HTTP/2 framing, TLS handshakes, short bodies)
/// are `Connection`. Only errors that would repeat on every attempt are
/// `Other`: a bad request setup, a local write failure, a callback abort,
/// or a certificate the peer will keep presenting.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_url_malformed()
        || e.is_unsupported_protocol()
        || e.is_failed_init()
        || e.is_out_of_memory()
        || e.is_bad_function_argument()
        || e.is_unknown_option()
        || e.is_write_error()
        || e.is_aborted_by_callback()
        || e.is_too_many_redirects()
        || e.is_peer_failed_verification()
        || e.is_ssl_certproblem()
        || e.is_ssl_cacert()
    {
        return ErrorKind::Other;
    }
    ErrorKind::Connection
}

/// Classify an attempt error into an ErrorKind.
pub fn classify(e: &FetchError) -> ErrorKind {
    match e {
        FetchError::Curl(ce) => classify_curl_error(ce),
        FetchError::Http(code) | FetchError::UnsupportedRange(code) => classify_http_status(*code),
        FetchError::PartialTransfer { .. } => ErrorKind::Connection,
        FetchError::Storage(_) | FetchError::Cancelled | FetchError::Task(_) => ErrorKind::Other,
    }
}
