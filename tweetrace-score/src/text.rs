//! Text cleaning before classification

use regex::Regex;

/// Strips URLs, mentions and punctuation other than `. ? !`
pub struct TextCleaner {
    url_regex: Regex,
    mention_regex: Regex,
    special_chars_regex: Regex,
    extra_spaces_regex: Regex,
}

impl TextCleaner {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            url_regex: Regex::new(r"https?://\S+|www\.\S+")?,
            mention_regex: Regex::new(r"@\w*")?,
            // \w is Unicode-aware, so umlauts and ß are kept
            special_chars_regex: Regex::new(r"[^\w.?!]")?,
            extra_spaces_regex: Regex::new(r"\s+")?,
        })
    }

    /// Clean `text`. URL and mention removal run before punctuation removal.
    ///
    /// Passes repeat until the text stops changing, so that removing a
    /// mention cannot leave a URL behind (`www@x.de` → `www.de`).
    pub fn clean(&self, text: &str) -> String {
        let mut current = self.clean_once(text);
        loop {
            let next = self.clean_once(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn clean_once(&self, text: &str) -> String {
        let text = self.url_regex.replace_all(text, "");
        let text = self.mention_regex.replace_all(&text, "");
        let text = self.special_chars_regex.replace_all(&text, " ");
        let text = self.extra_spaces_regex.replace_all(&text, " ");
        text.trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cleaner() -> TextCleaner {
        TextCleaner::new().unwrap()
    }

    #[test]
    fn test_url_and_mention_removed() {
        let cleaned = cleaner().clean("Check this https://x.co @user Scholz is great!!!");
        assert_eq!(cleaned, "Check this Scholz is great!!!");
    }

    #[test]
    fn test_www_url_removed() {
        assert_eq!(cleaner().clean("siehe www.spd.de/programm jetzt"), "siehe jetzt");
    }

    #[test]
    fn test_punctuation_replaced_by_space() {
        assert_eq!(
            cleaner().clean("Habeck, Baerbock & #Grüne: ja? nein!"),
            "Habeck Baerbock Grüne ja? nein!"
        );
    }

    #[test]
    fn test_umlauts_and_digits_kept() {
        assert_eq!(cleaner().clean("Straße über 2021..."), "Straße über 2021...");
    }

    #[test]
    fn test_whitespace_collapsed_and_trimmed() {
        assert_eq!(cleaner().clean("  Laschet \n\t sagt   nichts  "), "Laschet sagt nichts");
    }

    #[test]
    fn test_only_noise_becomes_empty() {
        assert_eq!(cleaner().clean("@a @b https://t.co/xyz"), "");
    }

    #[test]
    fn test_idempotent() {
        let c = cleaner();
        for input in [
            "Check this https://x.co @user Scholz is great!!!",
            "www@x.de Habeck",
            "RT @spd: Scholz 👍 | Kanzler? http://a.b/c",
            "«Zitat» – Laschet, 14.04.",
            "",
        ] {
            let once = c.clean(input);
            assert_eq!(c.clean(&once), once, "input: {input:?}");
            assert!(!once.contains("  "));
            assert!(!once.contains("http"));
            assert!(!once.contains('@'));
        }
    }
}
