//! Subtitle text normalization and sentence splitting.
//!
//! Plain text, SRT, and VTT are all handled by one heuristic line filter
//! rather than structural format detection: cue metadata lines are
//! discarded, the surviving dialogue lines are stripped of inline markup,
//! joined into one flat blob, and split into sentences on terminal
//! punctuation.

/// True if the line is cue metadata rather than dialogue
fn should_ignore_line(line: &str) -> bool {
  let trimmed = line.trim();
  if trimmed.is_empty() {
    return true;
  }
  if trimmed == "WEBVTT" {
    return true;
  }
  if trimmed.contains("-->") {
    return true;
  }
  if is_block_header(trimmed, "NOTE")
    || is_block_header(trimmed, "STYLE")
    || is_block_header(trimmed, "REGION")
  {
    return true;
  }
  // Bare cue-index integer
  if trimmed.chars().all(|c| c.is_ascii_digit()) {
    return true;
  }
  if contains_timestamp(trimmed) {
    return true;
  }
  false
}

/// `NOTE`, `STYLE`, `REGION` alone or followed by whitespace
fn is_block_header(line: &str, keyword: &str) -> bool {
  match line.strip_prefix(keyword) {
    Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
    None => false,
  }
}

/// Detects a raw `HH:MM:SS[.,]mmm` timestamp anywhere in the line
fn contains_timestamp(line: &str) -> bool {
  let bytes = line.as_bytes();
  if bytes.len() < 12 {
    return false;
  }
  for window in bytes.windows(12) {
    let digits_at = |positions: &[usize]| positions.iter().all(|&i| window[i].is_ascii_digit());
    if digits_at(&[0, 1, 3, 4, 6, 7, 9, 10, 11])
      && window[2] == b':'
      && window[5] == b':'
      && (window[8] == b'.' || window[8] == b',')
    {
      return true;
    }
  }
  false
}

/// Strip inline `<...>` markup tags and collapse internal whitespace
fn strip_markup(line: &str) -> String {
  let mut out = String::with_capacity(line.len());
  let mut in_tag = false;
  for c in line.chars() {
    match c {
      '<' => in_tag = true,
      '>' if in_tag => in_tag = false,
      _ if !in_tag => out.push(c),
      _ => {}
    }
  }
  collapse_whitespace(&out)
}

fn collapse_whitespace(text: &str) -> String {
  text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split flowing prose into sentences on whitespace following `.`, `!`,
/// or `?`. No abbreviation awareness; a blob without terminal punctuation
/// is one sentence.
pub fn split_sentences(text: &str) -> Vec<String> {
  let normalized = collapse_whitespace(text);
  if normalized.is_empty() {
    return Vec::new();
  }

  let mut sentences = Vec::new();
  let mut current = String::new();
  let mut prev_terminal = false;

  for c in normalized.chars() {
    if c.is_whitespace() && prev_terminal {
      let sentence = current.trim();
      if !sentence.is_empty() {
        sentences.push(sentence.to_string());
      }
      current.clear();
      prev_terminal = false;
      continue;
    }
    current.push(c);
    if !c.is_whitespace() {
      prev_terminal = matches!(c, '.' | '!' | '?');
    }
  }

  let sentence = current.trim();
  if !sentence.is_empty() {
    sentences.push(sentence.to_string());
  }

  sentences
}

/// Normalize raw subtitle text into an ordered sentence list.
/// Index in the returned vector is the authoritative sentence index.
pub fn sentences_from_subtitle_text(raw: &str) -> Vec<String> {
  let combined = raw
    .lines()
    .filter(|line| !should_ignore_line(line))
    .map(strip_markup)
    .filter(|line| !line.is_empty())
    .collect::<Vec<_>>()
    .join(" ");

  split_sentences(&combined)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_split_two_sentences() {
    assert_eq!(
      split_sentences("Hello world. How are you?"),
      vec!["Hello world.", "How are you?"]
    );
  }

  #[test]
  fn test_split_no_terminal_punctuation_is_one_sentence() {
    assert_eq!(
      split_sentences("just a fragment without an end"),
      vec!["just a fragment without an end"]
    );
  }

  #[test]
  fn test_split_empty_input() {
    assert!(split_sentences("").is_empty());
    assert!(split_sentences("   \t \n ").is_empty());
  }

  #[test]
  fn test_split_exclamation_and_question() {
    assert_eq!(
      split_sentences("Stop! Who goes there? Nobody."),
      vec!["Stop!", "Who goes there?", "Nobody."]
    );
  }

  #[test]
  fn test_split_collapses_whitespace() {
    assert_eq!(
      split_sentences("One.   Two.\n\nThree"),
      vec!["One.", "Two.", "Three"]
    );
  }

  #[test]
  fn test_ignores_cue_metadata_lines() {
    let input = "WEBVTT\n\n1\n00:00:01.000 --> 00:00:02.000\nHello <i>there</i>\n";
    assert_eq!(sentences_from_subtitle_text(input), vec!["Hello there"]);
  }

  #[test]
  fn test_ignores_srt_comma_timestamps() {
    let input = "2\n00:01:15,250 --> 00:01:17,900\nGood morning.\n";
    assert_eq!(sentences_from_subtitle_text(input), vec!["Good morning."]);
  }

  #[test]
  fn test_ignores_note_style_region_blocks() {
    let input = "NOTE this is a comment\nSTYLE\nREGION id=fred\nActual dialogue.";
    assert_eq!(sentences_from_subtitle_text(input), vec!["Actual dialogue."]);
  }

  #[test]
  fn test_note_prefix_word_is_kept() {
    // "NOTEBOOK" is dialogue, not a NOTE block header
    assert_eq!(
      sentences_from_subtitle_text("NOTEBOOK entry one."),
      vec!["NOTEBOOK entry one."]
    );
  }

  #[test]
  fn test_bare_timestamp_line_is_dropped() {
    let input = "00:00:01.000\nReal line here.";
    assert_eq!(sentences_from_subtitle_text(input), vec!["Real line here."]);
  }

  #[test]
  fn test_joins_cue_fragments_into_one_sentence() {
    let input = "1\n00:00:01.000 --> 00:00:02.000\nI never thought\n\n2\n00:00:02.500 --> 00:00:04.000\nit would end this way.\n";
    assert_eq!(
      sentences_from_subtitle_text(input),
      vec!["I never thought it would end this way."]
    );
  }

  #[test]
  fn test_markup_is_stripped() {
    assert_eq!(
      sentences_from_subtitle_text("<b>Bold</b> and <i>italic</i> words."),
      vec!["Bold and italic words."]
    );
  }

  #[test]
  fn test_empty_file_yields_no_sentences() {
    assert!(sentences_from_subtitle_text("").is_empty());
    assert!(sentences_from_subtitle_text("WEBVTT\n\n1\n00:00:01.000 --> 00:00:02.000\n").is_empty());
  }

  #[test]
  fn test_plain_text_passthrough() {
    let input = "Line one continues\nonto line two. And ends.";
    assert_eq!(
      sentences_from_subtitle_text(input),
      vec!["Line one continues onto line two.", "And ends."]
    );
  }
}
