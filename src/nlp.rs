//! Tokenizer adapter.
//!
//! Tokenization and lemmatization are an external capability: the pipeline
//! only depends on the [`Tokenizer`] trait and the bootstrap decides which
//! implementation to inject. [`HeuristicTokenizer`] is the built-in binding:
//! a deterministic, dependency-free English tokenizer with suffix-based
//! lemmatization, good enough to run the pipeline end-to-end where no
//! part-of-speech tagging service is bound.

use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Word,
  Punctuation,
  Number,
  Other,
}

impl TokenKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Word => "word",
      Self::Punctuation => "punctuation",
      Self::Number => "number",
      Self::Other => "other",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  /// Surface form exactly as it appeared
  pub value: String,
  /// Dictionary/base form
  pub lemma: String,
  /// Part-of-speech tag, lowercase ("unknown" when the tagger cannot say)
  pub pos: String,
  pub kind: TokenKind,
}

/// Pluggable sentence tokenizer. Implementations must be deterministic so
/// pipeline runs are reproducible.
pub trait Tokenizer: Send + Sync {
  fn tokenize(&self, sentence: &str) -> Vec<Token>;
}

pub type SharedTokenizer = Arc<dyn Tokenizer>;

/// Latin/extended-Latin letter (including the accented ranges) or apostrophe
pub fn is_word_char(c: char) -> bool {
  c.is_ascii_alphabetic()
    || c == '\''
    || ('\u{C0}'..='\u{D6}').contains(&c)
    || ('\u{D8}'..='\u{F6}').contains(&c)
    || ('\u{F8}'..='\u{FF}').contains(&c)
}

/// Built-in deterministic tokenizer with heuristic English lemmatization.
#[derive(Debug, Default)]
pub struct HeuristicTokenizer;

impl HeuristicTokenizer {
  pub fn new() -> Self {
    Self
  }
}

impl Tokenizer for HeuristicTokenizer {
  fn tokenize(&self, sentence: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = sentence.chars().peekable();

    while let Some(&c) = chars.peek() {
      if c.is_whitespace() {
        chars.next();
        continue;
      }

      if is_word_char(c) {
        let mut value = String::new();
        while let Some(&w) = chars.peek() {
          if is_word_char(w) {
            value.push(w);
            chars.next();
          } else {
            break;
          }
        }
        let lemma = lemmatize(&value.to_lowercase());
        tokens.push(Token {
          value,
          lemma,
          pos: "unknown".to_string(),
          kind: TokenKind::Word,
        });
        continue;
      }

      if c.is_ascii_digit() {
        let mut value = String::new();
        while let Some(&d) = chars.peek() {
          if d.is_ascii_digit() || d == '.' || d == ',' {
            value.push(d);
            chars.next();
          } else {
            break;
          }
        }
        let lemma = value.clone();
        tokens.push(Token {
          value,
          lemma,
          pos: "num".to_string(),
          kind: TokenKind::Number,
        });
        continue;
      }

      chars.next();
      let kind = if c.is_ascii_punctuation() {
        TokenKind::Punctuation
      } else {
        TokenKind::Other
      };
      tokens.push(Token {
        value: c.to_string(),
        lemma: c.to_string(),
        pos: "punct".to_string(),
        kind,
      });
    }

    tokens
  }
}

/// Irregular forms worth special-casing before the suffix rules
const IRREGULAR_LEMMAS: [(&str, &str); 16] = [
  ("am", "be"),
  ("are", "be"),
  ("is", "be"),
  ("was", "be"),
  ("were", "be"),
  ("been", "be"),
  ("has", "have"),
  ("had", "have"),
  ("does", "do"),
  ("did", "do"),
  ("ran", "run"),
  ("went", "go"),
  ("gone", "go"),
  ("children", "child"),
  ("men", "man"),
  ("women", "woman"),
];

/// Heuristic lowercase-to-lemma mapping: possessives, common plural and
/// inflection suffixes. Falls back to the input when no rule applies.
fn lemmatize(word: &str) -> String {
  for (form, lemma) in IRREGULAR_LEMMAS {
    if word == form {
      return lemma.to_string();
    }
  }

  // Possessive markers
  if let Some(base) = word.strip_suffix("'s") {
    return lemmatize(base);
  }
  if let Some(base) = word.strip_suffix('\'') {
    return lemmatize(base);
  }

  if word.len() > 4 {
    if let Some(base) = word.strip_suffix("ies") {
      return format!("{}y", base);
    }
    if let Some(base) = word.strip_suffix("ied") {
      return format!("{}y", base);
    }
  }

  if word.len() > 5 {
    if let Some(base) = word.strip_suffix("ing") {
      return undouble(base);
    }
  }

  if word.len() > 4 {
    if let Some(base) = word.strip_suffix("ed") {
      return undouble(base);
    }
    if let Some(base) = word.strip_suffix("es") {
      if base.ends_with('s')
        || base.ends_with('x')
        || base.ends_with('z')
        || base.ends_with("ch")
        || base.ends_with("sh")
      {
        return base.to_string();
      }
    }
  }

  if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
    return word[..word.len() - 1].to_string();
  }

  word.to_string()
}

/// "stopp" -> "stop"; leaves "ss"/"ll" words alone only when not a
/// doubling artifact (we cannot tell, so anything doubled gets trimmed)
fn undouble(base: &str) -> String {
  let bytes = base.as_bytes();
  if bytes.len() >= 2 {
    let last = bytes[bytes.len() - 1];
    let prev = bytes[bytes.len() - 2];
    if last == prev && last.is_ascii_alphabetic() && !matches!(last, b'a' | b'e' | b'i' | b'o' | b'u') {
      return base[..base.len() - 1].to_string();
    }
  }
  base.to_string()
}
