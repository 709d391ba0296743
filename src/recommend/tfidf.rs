//! Term frequency / inverse document frequency vectors

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::Regex;

/// Words of two or more word characters
static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?u)\b\w\w+\b").expect("valid token regex"));

static STOP_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
        "alone", "along", "already", "also", "although", "always", "am", "among", "amongst", "an",
        "and", "another", "any", "anyhow", "anyone", "anything", "anyway", "anywhere", "are",
        "around", "as", "at", "back", "be", "became", "because", "become", "becomes", "been",
        "before", "beforehand", "behind", "being", "below", "beside", "besides", "between",
        "beyond", "both", "bottom", "but", "by", "call", "can", "cannot", "could", "de", "do",
        "done", "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else",
        "elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything",
        "everywhere", "except", "few", "fifteen", "fifty", "first", "five", "for", "former",
        "formerly", "forty", "found", "four", "from", "front", "full", "further", "get", "give",
        "go", "had", "has", "have", "he", "hence", "her", "here", "hereafter", "hereby", "herein",
        "hers", "herself", "him", "himself", "his", "how", "however", "hundred", "ie", "if", "in",
        "inc", "indeed", "into", "is", "it", "its", "itself", "keep", "last", "latter", "latterly",
        "least", "less", "ltd", "made", "many", "may", "me", "meanwhile", "might", "mine", "more",
        "moreover", "most", "mostly", "move", "much", "must", "my", "myself", "name", "namely",
        "neither", "never", "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor",
        "not", "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only",
        "onto", "or", "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over",
        "own", "part", "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem",
        "seemed", "seeming", "seems", "serious", "several", "she", "should", "show", "side",
        "since", "six", "sixty", "so", "some", "somehow", "someone", "something", "sometime",
        "sometimes", "somewhere", "still", "such", "take", "ten", "than", "that", "the", "their",
        "them", "themselves", "then", "thence", "there", "thereafter", "thereby", "therefore",
        "therein", "thereupon", "these", "they", "third", "this", "those", "though", "three",
        "through", "throughout", "thru", "thus", "to", "together", "too", "top", "toward",
        "towards", "twelve", "twenty", "two", "un", "under", "until", "up", "upon", "us", "very",
        "via", "was", "we", "well", "were", "what", "whatever", "when", "whence", "whenever",
        "where", "whereafter", "whereas", "whereby", "wherein", "whereupon", "wherever",
        "whether", "which", "while", "whither", "who", "whoever", "whole", "whom", "whose", "why",
        "will", "with", "within", "without", "would", "yet", "you", "your", "yours", "yourself",
        "yourselves",
    ]
    .into_iter()
    .collect()
});

/// Lowercased tokens with English stop words removed
pub fn tokenize(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    TOKEN
        .find_iter(&lower)
        .map(|m| m.as_str())
        .filter(|t| !STOP_WORDS.contains(t))
        .map(str::to_string)
        .collect()
}

/// Sparse L2-normalised vector keyed by vocabulary index
pub type SparseVector = HashMap<usize, f64>;

/// Vocabulary and smoothed idf weights fitted on a corpus
#[derive(Debug, Default)]
pub struct TfIdf {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
}

impl TfIdf {
    /// Fit on `documents` and return their vectors, in input order
    pub fn fit_transform(documents: &[String]) -> (Self, Vec<SparseVector>) {
        let tokenized: Vec<Vec<String>> = documents.iter().map(|d| tokenize(d)).collect();

        let mut vocabulary = HashMap::new();
        let mut df: Vec<usize> = Vec::new();
        for tokens in &tokenized {
            let unique: HashSet<&String> = tokens.iter().collect();
            for token in unique {
                let next = vocabulary.len();
                let index = *vocabulary.entry(token.clone()).or_insert(next);
                if index == df.len() {
                    df.push(0);
                }
                df[index] += 1;
            }
        }

        let n = documents.len() as f64;
        let idf = df
            .iter()
            .map(|&d| ((1.0 + n) / (1.0 + d as f64)).ln() + 1.0)
            .collect();

        let model = Self { vocabulary, idf };
        let vectors = tokenized.iter().map(|tokens| model.vectorize(tokens)).collect();
        (model, vectors)
    }

    /// Vectorize text against the fitted vocabulary; unknown terms are ignored
    pub fn transform(&self, text: &str) -> SparseVector {
        self.vectorize(&tokenize(text))
    }

    fn vectorize(&self, tokens: &[String]) -> SparseVector {
        let mut vector = SparseVector::new();
        for token in tokens {
            if let Some(&index) = self.vocabulary.get(token) {
                *vector.entry(index).or_insert(0.0) += 1.0;
            }
        }
        for (index, weight) in vector.iter_mut() {
            *weight *= self.idf[*index];
        }
        let norm = vector.values().map(|w| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            for weight in vector.values_mut() {
                *weight /= norm;
            }
        }
        vector
    }
}

/// Cosine similarity of two normalised vectors
pub fn cosine(a: &SparseVector, b: &SparseVector) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small
        .iter()
        .filter_map(|(k, v)| large.get(k).map(|w| v * w))
        .sum()
}
