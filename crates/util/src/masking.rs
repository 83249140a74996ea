/// Masks the middle of a sensitive value, keeping `shown` characters at each end.
///
/// Values too short to keep both ends are masked entirely.
///
/// ```rust
/// use parrot_util::mask_middle;
///
/// assert_eq!(mask_middle("https://example.webhook.office.com/abc", 10), "https://ex...ce.com/abc");
/// ```
pub fn mask_middle(value: &str, shown: usize) -> String {
    let characters: Vec<char> = value.chars().collect();
    if characters.len() <= shown * 2 {
        return "...".to_string();
    }
    let head: String = characters[..shown].iter().collect();
    let tail: String = characters[characters.len() - shown..].iter().collect();
    format!("{head}...{tail}")
}
