//! TF-IDF vectorizer.
//!
//! A [`Vectorizer`] is fitted over a corpus of chunk texts and then projects
//! any text into a dense vector over the fitted vocabulary. Fitting is a full
//! rebuild: the previous vocabulary and weights are discarded.
//!
//! Vectors from different fits are not comparable, so every indexing or
//! query operation owns its own `Vectorizer` value. `transform` takes `&self`
//! and `fit` takes `&mut self`, which keeps a fitted model from changing
//! under a caller that is still transforming with it.
//!
//! # Weighting
//!
//! - `idf(t) = log10((N + 1) / (df(t) + 1)) + 1`
//! - `tf(t, text) = count(t, text) / tokens(text)`
//! - the resulting vector is L2-normalized
//!
//! Vector length equals the vocabulary size. There is no fixed dimension;
//! [`VectorizerParams::max_features`] only caps how many terms are kept.

use std::collections::{HashMap, HashSet};

use tracing::debug;

/// English stop words dropped by the tokenizer.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with", "this", "but", "they", "have",
    "had", "what", "when", "where", "who", "which", "why", "how",
];

/// Tokenizer and vocabulary settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorizerParams {
    /// Keep at most this many terms (most frequent first). `None` keeps all.
    pub max_features: Option<usize>,
    /// Tokens shorter than this many chars are dropped.
    pub min_term_chars: usize,
    /// Drop English stop words.
    pub stop_words: bool,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            max_features: None,
            min_term_chars: 2,
            stop_words: true,
        }
    }
}

/// A fitted (or empty) TF-IDF model.
#[derive(Debug, Clone, Default)]
pub struct Vectorizer {
    params: VectorizerParams,
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    num_documents: usize,
}

impl Vectorizer {
    pub fn new(params: VectorizerParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    /// Fit a fresh model over `corpus` in one call.
    pub fn fitted<S: AsRef<str>>(params: VectorizerParams, corpus: &[S]) -> Self {
        let mut v = Self::new(params);
        v.fit(corpus);
        v
    }

    /// Rebuild vocabulary and IDF weights from `corpus`.
    pub fn fit<S: AsRef<str>>(&mut self, corpus: &[S]) {
        self.vocabulary.clear();
        self.idf.clear();
        self.num_documents = corpus.len();

        if corpus.is_empty() {
            return;
        }

        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        let mut total_frequency: HashMap<String, usize> = HashMap::new();

        for text in corpus {
            let tokens = self.tokenize(text.as_ref());
            let mut seen: HashSet<&str> = HashSet::new();
            for token in &tokens {
                *total_frequency.entry(token.clone()).or_insert(0) += 1;
                if seen.insert(token.as_str()) {
                    *document_frequency.entry(token.clone()).or_insert(0) += 1;
                }
            }
        }

        let mut terms: Vec<(String, usize)> = total_frequency.into_iter().collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        if let Some(max) = self.params.max_features {
            terms.truncate(max);
        }

        let n = self.num_documents as f64;
        self.idf.reserve(terms.len());
        for (index, (term, _)) in terms.into_iter().enumerate() {
            let df = document_frequency.get(&term).copied().unwrap_or(1) as f64;
            self.idf.push(((n + 1.0) / (df + 1.0)).log10() + 1.0);
            self.vocabulary.insert(term, index);
        }

        debug!(
            documents = self.num_documents,
            vocabulary = self.vocabulary.len(),
            "vectorizer fitted"
        );
    }

    /// Project `text` onto the fitted vocabulary.
    ///
    /// Returns an empty vector when the model has no vocabulary, and an
    /// all-zero vector when `text` has no known terms.
    pub fn transform(&self, text: &str) -> Vec<f32> {
        if self.vocabulary.is_empty() {
            return Vec::new();
        }

        let tokens = self.tokenize(text);
        let mut vector = vec![0.0f32; self.vocabulary.len()];
        if tokens.is_empty() {
            return vector;
        }

        let mut term_frequency: HashMap<usize, usize> = HashMap::new();
        for token in &tokens {
            if let Some(&index) = self.vocabulary.get(token) {
                *term_frequency.entry(index).or_insert(0) += 1;
            }
        }

        let total = tokens.len() as f64;
        for (index, count) in term_frequency {
            vector[index] = ((count as f64 / total) * self.idf[index]) as f32;
        }

        l2_normalize(&mut vector);
        vector
    }

    /// Fit over `corpus`, then transform each of its texts.
    pub fn fit_transform<S: AsRef<str>>(&mut self, corpus: &[S]) -> Vec<Vec<f32>> {
        self.fit(corpus);
        corpus.iter().map(|t| self.transform(t.as_ref())).collect()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Number of texts the model was last fitted on.
    pub fn num_documents(&self) -> usize {
        self.num_documents
    }

    /// Fitted IDF weight for `term`, if it is in the vocabulary.
    pub fn idf(&self, term: &str) -> Option<f64> {
        self.vocabulary.get(term).map(|&i| self.idf[i])
    }

    /// Lowercase, split on anything that is not alphanumeric, then drop
    /// short tokens and stop words.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() >= self.params.min_term_chars && !t.is_empty())
            .filter(|t| !(self.params.stop_words && STOP_WORDS.contains(t)))
            .map(str::to_string)
            .collect()
    }
}

fn l2_normalize(vector: &mut [f32]) {
    let magnitude = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for x in vector.iter_mut() {
            *x /= magnitude;
        }
    }
}
