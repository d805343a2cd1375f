/// Split normalized text into word tokens on whitespace.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("kucing  makan\nikan");
        assert_eq!(t, vec!["kucing", "makan", "ikan"]);
        assert!(tokenize("   ").is_empty());
    }
}
