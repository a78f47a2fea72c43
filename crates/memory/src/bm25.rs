//! BM25 scoring over the chunk corpus, k1=1.4, b=0.75.

use std::collections::HashMap;

const K1: f64 = 1.4;
const B: f64 = 0.75;
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "to", "of", "in", "on", "and",
    "or", "for", "it", "this", "that", "with", "as", "at", "by",
];

pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .map(|t| t.to_lowercase())
        .filter(|t| t.len() > 2 && !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Precomputed statistics for one document (chunk) in the corpus.
pub struct DocStats {
    pub term_freq: HashMap<String, usize>,
    pub length: usize,
}

pub fn doc_stats(text: &str) -> DocStats {
    let tokens = tokenize(text);
    let length = tokens.len();
    let mut term_freq = HashMap::new();
    for t in tokens {
        *term_freq.entry(t).or_insert(0) += 1;
    }
    DocStats { term_freq, length }
}

/// Scorer holding corpus-wide statistics (document frequency, average
/// document length) needed to score a query against many documents.
pub struct Bm25Corpus {
    doc_freq: HashMap<String, usize>,
    avg_doc_len: f64,
    doc_count: usize,
}

impl Bm25Corpus {
    pub fn build<'a>(docs: impl Iterator<Item = &'a DocStats>) -> Self {
        let mut doc_freq: HashMap<String, usize> = HashMap::new();
        let mut total_len = 0usize;
        let mut doc_count = 0usize;
        for doc in docs {
            doc_count += 1;
            total_len += doc.length;
            for term in doc.term_freq.keys() {
                *doc_freq.entry(term.clone()).or_insert(0) += 1;
            }
        }
        let avg_doc_len = if doc_count > 0 {
            total_len as f64 / doc_count as f64
        } else {
            0.0
        };
        Self {
            doc_freq,
            avg_doc_len,
            doc_count,
        }
    }

    pub fn score(&self, query_terms: &[String], doc: &DocStats) -> f64 {
        if self.doc_count == 0 || doc.length == 0 {
            return 0.0;
        }
        let mut score = 0.0;
        for term in query_terms {
            let Some(&tf) = doc.term_freq.get(term) else {
                continue;
            };
            let df = *self.doc_freq.get(term).unwrap_or(&0);
            if df == 0 {
                continue;
            }
            let idf = ((self.doc_count as f64 - df as f64 + 0.5) / (df as f64 + 0.5) + 1.0).ln();
            let tf = tf as f64;
            let len_norm = 1.0 - B + B * (doc.length as f64 / self.avg_doc_len.max(1.0));
            score += idf * (tf * (K1 + 1.0)) / (tf + K1 * len_norm);
        }
        score.max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_term_match_scores_higher_than_unrelated_doc() {
        let relevant = doc_stats("rust programming language memory safety");
        let unrelated = doc_stats("cooking recipes for weeknight dinners");
        let corpus = Bm25Corpus::build([&relevant, &unrelated].into_iter());
        let query = tokenize("rust memory safety");

        let relevant_score = corpus.score(&query, &relevant);
        let unrelated_score = corpus.score(&query, &unrelated);
        assert!(relevant_score > unrelated_score);
    }

    #[test]
    fn stopwords_and_short_tokens_are_filtered() {
        let tokens = tokenize("the a an is of to it");
        assert!(tokens.is_empty());
    }

    #[test]
    fn empty_corpus_scores_zero() {
        let corpus = Bm25Corpus::build(std::iter::empty());
        let doc = doc_stats("anything");
        assert_eq!(corpus.score(&tokenize("anything"), &doc), 0.0);
    }
}
