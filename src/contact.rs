/// Reduce a phone-like string to its ASCII digits.
///
/// Reports, help records and profiles have no foreign keys between them; the
/// digits of the contact number are the join key. Missing input normalizes to
/// the empty string, which never matches anything.
pub fn normalize_contact(contact: Option<&str>) -> String {
    contact
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect()
}
