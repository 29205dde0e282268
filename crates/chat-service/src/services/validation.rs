//! Nickname and password rules applied at registration.

/// Nickname length bounds (inclusive).
pub const NICKNAME_MIN_LEN: usize = 4;
pub const NICKNAME_MAX_LEN: usize = 25;

/// Password length bounds in characters (inclusive).
pub const PASSWORD_MIN_LEN: usize = 6;
pub const PASSWORD_MAX_LEN: usize = 50;

/// Special characters accepted in passwords.
pub const PASSWORD_SPECIALS: &str = "!@#$%^&*()_+-=,.<>?;:{}[]";

/// Substrings a nickname may not contain, compared case-insensitively.
const BLOCKED_WORDS: &[&str] = &["fuck", "nigger"];

/// 4-25 characters of `[A-Za-z0-9_]` containing no blocked word.
pub fn is_valid_nickname(nickname: &str) -> bool {
    if !(NICKNAME_MIN_LEN..=NICKNAME_MAX_LEN).contains(&nickname.len()) {
        return false;
    }

    if !nickname
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return false;
    }

    let lower = nickname.to_ascii_lowercase();
    !BLOCKED_WORDS.iter().any(|word| lower.contains(word))
}

/// 6-50 characters, each a Latin letter, an ASCII digit or a listed special,
/// with at least one of each class.
pub fn is_valid_password(password: &str) -> bool {
    let len = password.chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return false;
    }

    let (mut has_letter, mut has_digit, mut has_special) = (false, false, false);
    for c in password.chars() {
        if is_latin_letter(c) {
            has_letter = true;
        } else if c.is_ascii_digit() {
            has_digit = true;
        } else if PASSWORD_SPECIALS.contains(c) {
            has_special = true;
        } else {
            return false;
        }
    }

    has_letter && has_digit && has_special
}

/// Alphabetic characters from the Basic Latin, Latin-1 Supplement, Latin
/// Extended-A/B and Latin Extended Additional blocks.
fn is_latin_letter(c: char) -> bool {
    c.is_alphabetic()
        && matches!(c as u32, 0x0041..=0x024F | 0x1E00..=0x1EFF)
        && c != '\u{00D7}'
        && c != '\u{00F7}'
}
