/// Characters kept at the start of a masked token.
pub const VISIBLE_PREFIX: usize = 12;

/// Characters kept at the end of a masked token.
pub const VISIBLE_SUFFIX: usize = 8;

/// Number of mask characters shown in place of the hidden middle.
pub const MASK_WIDTH: usize = 20;

pub const MASK_CHAR: char = '•';

/// Redact a secret for display: first 12 + `•`×20 + last 8 characters.
///
/// Secrets shorter than prefix + suffix would leak almost entirely, so they
/// are replaced by the mask alone.
pub fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    let mask: String = std::iter::repeat_n(MASK_CHAR, MASK_WIDTH).collect();
    if chars.len() < VISIBLE_PREFIX + VISIBLE_SUFFIX {
        return mask;
    }

    let prefix: String = chars[..VISIBLE_PREFIX].iter().collect();
    let suffix: String = chars[chars.len() - VISIBLE_SUFFIX..].iter().collect();
    format!("{prefix}{mask}{suffix}")
}
