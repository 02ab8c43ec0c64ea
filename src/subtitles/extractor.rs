//! Vocabulary extraction.
//!
//! Drives the tokenizer over the split sentences, keeps meaningful word
//! tokens, and emits the occurrence list (duplicates kept as a frequency
//! signal), the distinct term set, and one representative example sentence
//! per distinct (term, pos) pair. Deduplication by (term, pos) happens
//! here so storage only ever holds one canonical row per pair.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{VocabExample, VocabOccurrence};
use crate::nlp::{is_word_char, Token, TokenKind, Tokenizer};

#[derive(Debug, Default)]
pub struct ExtractedVocab {
  /// Every retained token, in sentence order. Duplicates across sentences
  /// are intentional.
  pub occurrences: Vec<VocabOccurrence>,
  /// Distinct lowercase surface terms
  pub terms: BTreeSet<String>,
  /// First-seen example per `term::pos` cache key
  pub examples: BTreeMap<String, VocabExample>,
}

/// A token counts as vocabulary when the tokenizer calls it a word and the
/// surface form contains Latin word characters.
fn is_vocab_token(token: &Token) -> bool {
  token.kind == TokenKind::Word && token.value.chars().any(is_word_char)
}

pub fn extract_vocabulary(sentences: &[String], tokenizer: &dyn Tokenizer) -> ExtractedVocab {
  let mut extracted = ExtractedVocab::default();

  for (sentence_index, sentence) in sentences.iter().enumerate() {
    for token in tokenizer.tokenize(sentence) {
      if !is_vocab_token(&token) {
        continue;
      }

      let term = token.value.to_lowercase();
      // Single letters and initials are noise
      if term.chars().count() <= 1 {
        continue;
      }

      let lemma = if token.lemma.is_empty() {
        term.clone()
      } else {
        token.lemma.to_lowercase()
      };
      let pos = if token.pos.is_empty() {
        "unknown".to_string()
      } else {
        token.pos.to_lowercase()
      };

      extracted.terms.insert(term.clone());

      let key = format!("{}::{}", term, pos);
      extracted.examples.entry(key).or_insert_with(|| VocabExample {
        surface_term: term.clone(),
        lemma: lemma.clone(),
        pos: pos.clone(),
        sentence: sentence.clone(),
      });

      extracted.occurrences.push(VocabOccurrence {
        term,
        lemma,
        pos,
        sentence: sentence.clone(),
        sentence_index,
      });
    }
  }

  extracted
}
