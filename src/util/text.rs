//! Terminal-safe rendering of server-supplied text (report titles, source
//! names, summaries).
use std::borrow::Cow;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";
const ELLIPSIS_WIDTH: usize = 3;

/// Terminal columns occupied by `s`. CJK and emoji count as two.
///
/// ```
/// use navigator::util::display_width;
///
/// assert_eq!(display_width("Tech"), 4);
/// assert_eq!(display_width("科技"), 4);
/// ```
pub fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Cut `s` to at most `max_width` columns, appending "..." when something
/// was dropped. Never splits a character.
///
/// Widths of three or less have no room for the ellipsis; the result is
/// simply the longest prefix that fits.
///
/// ```
/// use navigator::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Weekly digest", 20), "Weekly digest");
/// assert_eq!(truncate_to_width("Weekly digest", 9), "Weekly...");
/// assert_eq!(truncate_to_width("Weekly", 2), "We");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if max_width == 0 {
        return Cow::Borrowed("");
    }

    if max_width <= ELLIPSIS_WIDTH {
        let mut end = 0;
        let mut width = 0;
        for (idx, c) in s.char_indices() {
            let w = UnicodeWidthChar::width(c).unwrap_or(0);
            if width + w > max_width {
                break;
            }
            width += w;
            end = idx + c.len_utf8();
        }
        return if end == s.len() {
            Cow::Borrowed(s)
        } else {
            Cow::Owned(s[..end].to_string())
        };
    }

    let target = max_width - ELLIPSIS_WIDTH;
    let mut width = 0;
    let mut cut = None;

    for (idx, c) in s.char_indices() {
        let w = UnicodeWidthChar::width(c).unwrap_or(0);
        if cut.is_none() && width + w > target {
            cut = Some(idx);
        }
        if width + w > max_width {
            let cut = cut.unwrap_or(idx);
            return Cow::Owned(format!("{}{}", &s[..cut], ELLIPSIS));
        }
        width += w;
    }

    Cow::Borrowed(s)
}

fn is_stripped_control(b: u8) -> bool {
    b == 0x7f || (b < 0x20 && b != b'\t' && b != b'\n' && b != b'\r')
}

/// Remove terminal control bytes and ANSI escape sequences (CSI and OSC)
/// so a hostile server string cannot recolor, retitle or move the cursor.
/// Tab, newline and carriage return survive.
///
/// Borrows when there is nothing to strip.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    let bytes = s.as_bytes();
    if !bytes.iter().any(|&b| b == 0x1b || is_stripped_control(b)) {
        return Cow::Borrowed(s);
    }

    let len = bytes.len();
    let mut out = String::with_capacity(len);
    let mut i = 0;

    while i < len {
        let b = bytes[i];
        if b == 0x1b {
            match bytes.get(i + 1) {
                Some(b'[') => {
                    // CSI: parameters then one final byte in 0x40..=0x7e
                    i += 2;
                    while i < len {
                        let c = bytes[i];
                        i += 1;
                        if (0x40..=0x7e).contains(&c) {
                            break;
                        }
                    }
                }
                Some(b']') => {
                    // OSC: terminated by BEL or ESC \
                    i += 2;
                    while i < len {
                        if bytes[i] == 0x07 {
                            i += 1;
                            break;
                        }
                        if bytes[i] == 0x1b && bytes.get(i + 1) == Some(&b'\\') {
                            i += 2;
                            break;
                        }
                        i += 1;
                    }
                }
                _ => i += 1,
            }
        } else if is_stripped_control(b) {
            i += 1;
        } else {
            let start = i;
            i += 1;
            while i < len && bytes[i] != 0x1b && !is_stripped_control(bytes[i]) {
                i += 1;
            }
            // Only ASCII bytes end a run, so the slice is on char boundaries
            out.push_str(&s[start..i]);
        }
    }

    Cow::Owned(out)
}

/// One display line for a list row: stripped, newlines folded to spaces,
/// then truncated.
pub fn display_line(s: &str, max_width: usize) -> String {
    let clean = strip_control_chars(s);
    let folded: String = clean
        .split(['\n', '\r', '\t'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    truncate_to_width(&folded, max_width).into_owned()
}
