/// Splits transcript text into words.
pub trait Tokenizer: Send + Sync {
    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str>;
}

/// Order-preserving, locale-naive split on Unicode whitespace.
#[derive(Clone, Copy, Debug, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.split_whitespace().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_any_whitespace() {
        let words = WhitespaceTokenizer.tokenize("  one\ttwo\n three  ");
        assert_eq!(words, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_keeps_punctuation_attached() {
        let words = WhitespaceTokenizer.tokenize("hello, world!");
        assert_eq!(words, vec!["hello,", "world!"]);
    }

    #[test]
    fn test_blank_text_has_no_words() {
        assert!(WhitespaceTokenizer.tokenize(" \n\t").is_empty());
    }
}
