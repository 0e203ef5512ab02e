//! Turn a media title into a safe file name.

/// Longest title kept, leaving room for the `.mp4` extension within NAME_MAX.
const TITLE_MAX: usize = 255 - 4;

/// Characters dropped from titles outright.
const RESERVED: &[char] = &['/', '\\', ',', ':', '*', '?', '<', '>', '&', '|', '\'', '"', '$'];

/// Sanitize a title for use as a file name on Linux.
///
/// - Drops path separators and shell/filesystem-reserved punctuation
/// - Drops NUL and control characters; collapses whitespace runs to one space
/// - Removes `..` sequences and trims leading/trailing dots and spaces
/// - Truncates to fit NAME_MAX once `.mp4` is appended (UTF-8 safe)
/// - Falls back to `untitled` when nothing is left
pub fn sanitize_title(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut prev_space = false;

    for c in title.chars() {
        if RESERVED.contains(&c) || c == '\0' {
            continue;
        }
        if c.is_whitespace() || c.is_control() {
            if !prev_space {
                out.push(' ');
            }
            prev_space = true;
            continue;
        }
        out.push(c);
        prev_space = false;
    }

    while out.contains("..") {
        out = out.replace("..", "");
    }

    let trimmed = out.trim_matches(|c| c == ' ' || c == '.');

    let capped = if trimmed.len() > TITLE_MAX {
        let mut take = TITLE_MAX;
        while take > 0 && !trimmed.is_char_boundary(take) {
            take -= 1;
        }
        trimmed[..take].trim_end()
    } else {
        trimmed
    };

    if capped.is_empty() {
        "untitled".to_string()
    } else {
        capped.to_string()
    }
}

/// File name stem for one page of a media item: page 1 uses the item title,
/// later pages use `P<n> <part title>`.
pub fn page_title(title: &str, part: &str, page: u32) -> String {
    if page > 1 {
        format!("P{} {}", page, sanitize_title(part))
    } else {
        sanitize_title(title)
    }
}
