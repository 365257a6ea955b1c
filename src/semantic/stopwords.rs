//! Stop-word lists and dominant-language detection.

use hashbrown::HashSet;

/// Common English function words dropped before TF-IDF weighting.
pub const ENGLISH: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "an",
    "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are", "around",
    "as", "at", "be", "became", "because", "become", "becomes", "been", "before", "beforehand",
    "behind", "being", "below", "beside", "besides", "between", "beyond", "both", "but", "by",
    "can", "cannot", "could", "did", "do", "does", "done", "down", "due", "during", "each", "eg",
    "either", "else", "elsewhere", "enough", "etc", "even", "ever", "every", "everyone",
    "everything", "everywhere", "except", "few", "for", "former", "formerly", "from", "further",
    "had", "has", "have", "he", "hence", "her", "here", "hereafter", "hereby", "herein", "hers",
    "herself", "him", "himself", "his", "how", "however", "ie", "if", "in", "indeed", "into", "is",
    "it", "its", "itself", "just", "last", "latter", "least", "less", "ltd", "made", "many", "may",
    "me", "meanwhile", "might", "more", "moreover", "most", "mostly", "much", "must", "my",
    "myself", "namely", "neither", "never", "nevertheless", "next", "no", "nobody", "none",
    "noone", "nor", "not", "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one",
    "only", "onto", "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out",
    "over", "own", "per", "perhaps", "please", "rather", "re", "same", "seem", "seemed", "seeming",
    "seems", "several", "she", "should", "since", "so", "some", "somehow", "someone", "something",
    "sometime", "sometimes", "somewhere", "still", "such", "than", "that", "the", "their",
    "them", "themselves", "then", "thence", "there", "thereafter", "thereby", "therefore",
    "therein", "thereupon", "these", "they", "this", "those", "though", "through", "throughout",
    "thru", "thus", "to", "together", "too", "toward", "towards", "un", "under", "until", "up",
    "upon", "us", "very", "via", "was", "we", "well", "were", "what", "whatever", "when",
    "whence", "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon",
    "wherever", "whether", "which", "while", "whither", "who", "whoever", "whole", "whom",
    "whose", "why", "will", "with", "within", "without", "would", "yet", "you", "your", "yours",
    "yourself", "yourselves",
];

/// Script family that dominates a corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Japanese,
    Other,
}

impl Language {
    /// Stop words for this language. Only English has a list; Japanese text
    /// is not whitespace-delimited, so particles never surface as tokens.
    pub fn stop_words(self) -> HashSet<&'static str> {
        match self {
            Language::English => ENGLISH.iter().copied().collect(),
            Language::Japanese | Language::Other => HashSet::new(),
        }
    }
}

fn is_japanese(c: char) -> bool {
    matches!(c,
        '\u{3040}'..='\u{309F}'   // hiragana
        | '\u{30A0}'..='\u{30FF}' // katakana
        | '\u{4E00}'..='\u{9FFF}' // CJK unified ideographs
        | '\u{FF66}'..='\u{FF9F}' // half-width katakana
    )
}

/// Pick the language by script majority over all letters in `texts`.
pub fn dominant_language<'a>(texts: impl IntoIterator<Item = &'a str>) -> Language {
    let (mut latin, mut japanese) = (0usize, 0usize);
    for text in texts {
        for c in text.chars() {
            if c.is_ascii_alphabetic() {
                latin += 1;
            } else if is_japanese(c) {
                japanese += 1;
            }
        }
    }
    match (latin, japanese) {
        (0, 0) => Language::Other,
        (l, j) if l >= j => Language::English,
        _ => Language::Japanese,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominant_language() {
        assert_eq!(dominant_language(["The history of Rome"]), Language::English);
        assert_eq!(dominant_language(["吾輩は猫である", "名前はまだ無い"]), Language::Japanese);
        assert_eq!(dominant_language(["", "1234"]), Language::Other);
    }

    #[test]
    fn test_english_list_has_articles() {
        let stop = Language::English.stop_words();
        assert!(stop.contains("the"));
        assert!(!stop.contains("rome"));
        assert!(Language::Japanese.stop_words().is_empty());
    }
}
