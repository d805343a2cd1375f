use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

lazy_static! {
    static ref INDONESIAN: HashSet<&'static str> = {
        let words: &[&str] = &[
            "yang","untuk","pada","ke","para","namun","menurut","antara","dia","dua",
            "ia","seperti","jika","sehingga","kembali","dan","tidak","ini","karena",
            "kepada","oleh","saat","harus","sementara","setelah","belum","kami","sekitar",
            "bagi","serta","di","dari","telah","sebagai","masih","hal","ketika","adalah",
            "itu","dalam","bisa","bahwa","atau","hanya","kita","dengan","akan","juga",
            "ada","mereka","sudah","saya","terhadap","secara","agar","lain","anda",
            "begitu","mengapa","kenapa","yaitu","yakni","daripada","itulah","lagi","maka",
            "tentang","demi","dimana","kemana","kapan","sambil","sebelum","sesudah","supaya",
            "guna","kah","pun","sampai","sedangkan","selagi","tetapi","apakah",
            "kecuali","sebab","selain","seolah","seraya","seterusnya","tanpa","agak","boleh",
            "dapat","dsb","dst","dll","dahulu","dulunya","anu","demikian","tapi","ingin",
            "nggak","mari","nanti","melainkan","oh","ok","seharusnya","sebetulnya",
            "setiap","setidaknya","sesuatu","pasti","saja","toh","ya","walau","tolong",
            "tentu","amat","apalagi","bagaimanapun",
        ];
        words.iter().copied().collect()
    };
}

/// Closed-vocabulary filter applied after tokenization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopwordFilter {
    words: HashSet<String>,
}

impl StopwordFilter {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { words: words.into_iter().map(|w| w.into().to_lowercase()).collect() }
    }

    /// The embedded Indonesian function-word list.
    pub fn indonesian() -> Self {
        Self::new(INDONESIAN.iter().copied())
    }

    pub fn is_stopword(&self, token: &str) -> bool {
        self.words.contains(token)
    }

    pub fn filter(&self, tokens: Vec<String>) -> Vec<String> {
        tokens.into_iter().filter(|t| !self.is_stopword(t)).collect()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_indonesian_function_words() {
        let filter = StopwordFilter::indonesian();
        let tokens = vec!["kucing".to_string(), "dan".into(), "anjing".into(), "yang".into()];
        assert_eq!(filter.filter(tokens), vec!["kucing", "anjing"]);
    }

    #[test]
    fn caller_supplied_list_replaces_default() {
        let filter = StopwordFilter::new(["Kucing"]);
        assert!(filter.is_stopword("kucing"));
        assert!(!filter.is_stopword("dan"));
        assert_eq!(filter.len(), 1);
    }
}
