use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Date part of an ISO timestamp.
///
/// # Examples
/// ```
/// use hr_core::utils::text::format_datetime;
/// assert_eq!(format_datetime("2024-05-01T10:30:00+00:00"), "2024-05-01");
/// ```
pub fn format_datetime(datetime: &str) -> String {
    datetime.split('T').next().unwrap_or(datetime).to_string()
}

/// Truncate to a display width, counting wide characters (Arabic, CJK) by
/// their terminal width, and append `...` when shortened.
///
/// # Examples
/// ```
/// use hr_core::utils::text::truncate_text;
/// assert_eq!(truncate_text("Finance Department", 10), "Finance...");
/// ```
pub fn truncate_text(text: &str, max_width: usize) -> String {
    if text.width() <= max_width {
        return text.to_string();
    }

    const ELLIPSIS: &str = "...";
    if max_width <= ELLIPSIS.len() {
        return ELLIPSIS[..max_width].to_string();
    }

    let target_width = max_width - ELLIPSIS.len();
    let mut result = String::new();
    let mut current_width = 0;

    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if current_width + ch_width > target_width {
            break;
        }
        result.push(ch);
        current_width += ch_width;
    }

    result.push_str(ELLIPSIS);
    result
}

pub fn pad_to_width(text: &str, width: usize) -> String {
    let text_width = text.width();
    if text_width >= width {
        text.to_string()
    } else {
        format!("{}{}", text, " ".repeat(width - text_width))
    }
}

/// Show only the first and last characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
