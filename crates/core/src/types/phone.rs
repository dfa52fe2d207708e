//! Brazilian phone number formatting for customer profiles.

/// Longest input kept: `55` + two-digit area code + nine-digit mobile.
const MAX_DIGITS: usize = 13;

/// Normalize free-form input into `+55 (11) 98765-4321` style.
///
/// Non-digits are dropped and input is capped at 13 digits. A leading `55`
/// country code is optional. Partial numbers are formatted as far as they go
/// so the value can be shown while it is still being typed. Returns `None`
/// when nothing beyond the country code remains.
///
/// ```
/// use pixstore_core::normalize_br_phone;
///
/// assert_eq!(normalize_br_phone("(11) 98765-4321").as_deref(), Some("+55 (11) 98765-4321"));
/// assert_eq!(normalize_br_phone("+55"), None);
/// ```
#[must_use]
pub fn normalize_br_phone(input: &str) -> Option<String> {
    let mut digits: String = input.chars().filter(char::is_ascii_digit).collect();
    digits.truncate(MAX_DIGITS);

    let national = if digits.len() > 11 && digits.starts_with("55") {
        &digits[2..]
    } else if digits == "55" {
        ""
    } else {
        digits.as_str()
    };

    if national.is_empty() {
        return None;
    }

    let (area, rest) = national.split_at(national.len().min(2));
    if rest.is_empty() {
        return Some(format!("+55 ({area}"));
    }

    // Nine-digit mobiles split 5-4, eight-digit landlines split 4-4.
    let split = if rest.len() > 8 { 5 } else { 4 };
    if rest.len() <= split {
        return Some(format!("+55 ({area}) {rest}"));
    }
    let (head, tail) = rest.split_at(split);
    Some(format!("+55 ({area}) {head}-{tail}"))
}
