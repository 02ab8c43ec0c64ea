//! Quiz candidate building and weighted sampling.
//!
//! Candidates are partitioned into pools (new, weak, repeat, low-repeat)
//! from the user's learning history, then sampled without replacement with
//! pool-specific weights. Sampling functions take the RNG as a parameter so
//! tests run seeded.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::config::{DEFAULT_QUESTIONS, DISTRACTOR_COUNT, MAX_QUESTIONS};
use crate::db::vocabulary::QuizCandidateRow;

#[derive(Debug, Clone)]
pub struct QuizCandidate {
  pub term: String,
  pub lemma: String,
  pub pos: String,
  pub meaning: String,
  /// Distinct episodes in the catalog containing this term
  pub repeat_count: i64,
  pub is_weak: bool,
  pub is_new: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizQuestion {
  pub id: String,
  pub term: String,
  pub lemma: String,
  pub pos: String,
  pub options: Vec<String>,
}

pub fn resolve_question_count(requested: Option<usize>) -> usize {
  requested.unwrap_or(DEFAULT_QUESTIONS).clamp(1, MAX_QUESTIONS)
}

/// Turn raw episode rows into sampler candidates. Rows without a usable
/// meaning or flagged corrupt are dropped; the rest are classified against
/// the user's weak-term and learned-lemma sets.
pub fn build_candidates(
  rows: Vec<QuizCandidateRow>,
  repeat_counts: &HashMap<String, i64>,
  weak_terms: &HashSet<String>,
  learned_lemmas: &HashSet<String>,
) -> Vec<QuizCandidate> {
  rows
    .into_iter()
    .filter_map(|row| {
      if row.is_corrupt {
        return None;
      }
      let meaning = row.meaning.as_deref()?.trim();
      if meaning.is_empty() {
        return None;
      }
      let is_weak = weak_terms.contains(&row.term);
      let is_new = !is_weak && !learned_lemmas.contains(&row.lemma);
      Some(QuizCandidate {
        meaning: meaning.to_string(),
        repeat_count: repeat_counts.get(&row.term).copied().unwrap_or(1),
        is_weak,
        is_new,
        term: row.term,
        lemma: row.lemma,
        pos: row.pos,
      })
    })
    .collect()
}

fn repeat_weight(c: &QuizCandidate) -> f64 {
  c.repeat_count.max(1) as f64
}

fn rarity_weight(c: &QuizCandidate) -> f64 {
  1.0 / (c.repeat_count + 1) as f64
}

/// Sample up to `count` items without replacement, weighted by `weight_fn`.
/// Draws a uniform threshold in [0, sum) and linear-scans for the hit.
fn take_weighted<R: Rng>(
  rng: &mut R,
  pool: &mut Vec<QuizCandidate>,
  count: usize,
  weight_fn: impl Fn(&QuizCandidate) -> f64,
) -> Vec<QuizCandidate> {
  let mut weights: Vec<f64> = pool.iter().map(&weight_fn).collect();
  let mut total: f64 = weights.iter().sum();
  let mut picked = Vec::with_capacity(count.min(pool.len()));

  while picked.len() < count && !pool.is_empty() {
    let idx = if total > 0.0 {
      let threshold = rng.random_range(0.0..total);
      let mut acc = 0.0;
      let mut hit = pool.len() - 1;
      for (i, w) in weights.iter().enumerate() {
        acc += w;
        if threshold < acc {
          hit = i;
          break;
        }
      }
      hit
    } else {
      0
    };

    total -= weights[idx];
    weights.swap_remove(idx);
    picked.push(pool.swap_remove(idx));
  }

  picked
}

fn ratio_count(total: usize, ratio: f64) -> usize {
  ((total as f64) * ratio).round() as usize
}

/// Pick `n` question terms from the candidate set.
///
/// Pool policy is a priority cascade: while new words exist they dominate
/// (95/4/1 new/weak/repeat); otherwise weak words dominate (80/20); with
/// neither, picks split 85/15 between high-repeat and low-repeat terms,
/// where low-repeat is the bottom fifth of the episode's repeat-count
/// distribution. Shortfall in one pool rolls into the next, and any final
/// remainder fills from everything left so the result reaches
/// min(n, candidates.len()).
pub fn sample_questions<R: Rng>(
  rng: &mut R,
  candidates: Vec<QuizCandidate>,
  n: usize,
) -> Vec<QuizCandidate> {
  let total = n.min(candidates.len());
  if total == 0 {
    return Vec::new();
  }

  let mut new_pool = Vec::new();
  let mut weak_pool = Vec::new();
  let mut repeat_pool = Vec::new();
  for c in candidates {
    if c.is_new {
      new_pool.push(c);
    } else if c.is_weak {
      weak_pool.push(c);
    } else {
      repeat_pool.push(c);
    }
  }

  let mut low_repeat_pool = Vec::new();
  let (new_target, weak_target, low_target, repeat_target) = if !new_pool.is_empty() {
    let weak_t = ratio_count(total, 0.04);
    let repeat_t = ratio_count(total, 0.01);
    (total.saturating_sub(weak_t + repeat_t), weak_t, 0, repeat_t)
  } else if !weak_pool.is_empty() {
    let repeat_t = ratio_count(total, 0.20);
    (0, total - repeat_t, 0, repeat_t)
  } else {
    // split the background pool: bottom fifth by repeat count is low-repeat
    repeat_pool.sort_by_key(|c| c.repeat_count);
    let low_size = (repeat_pool.len() / 5).max(1).min(repeat_pool.len());
    low_repeat_pool = repeat_pool.drain(..low_size).collect();
    let low_t = ratio_count(total, 0.15);
    (0, 0, low_t, total.saturating_sub(low_t))
  };

  let mut picked = Vec::with_capacity(total);
  let mut want = new_target;
  let taken = take_weighted(rng, &mut new_pool, want, repeat_weight);
  want = want - taken.len() + weak_target;
  picked.extend(taken);

  let taken = take_weighted(rng, &mut weak_pool, want, repeat_weight);
  want = want - taken.len() + low_target;
  picked.extend(taken);

  let taken = take_weighted(rng, &mut low_repeat_pool, want, rarity_weight);
  want = want - taken.len() + repeat_target;
  picked.extend(taken);

  let taken = take_weighted(rng, &mut repeat_pool, want, repeat_weight);
  picked.extend(taken);

  // remainder from everything not yet picked
  if picked.len() < total {
    let mut leftovers: Vec<QuizCandidate> = new_pool;
    leftovers.append(&mut weak_pool);
    leftovers.append(&mut low_repeat_pool);
    leftovers.append(&mut repeat_pool);
    let taken = take_weighted(rng, &mut leftovers, total - picked.len(), repeat_weight);
    picked.extend(taken);
  }

  picked
}

/// Attach shuffled answer options to each picked term. The distractor
/// universe is every distinct meaning across the filtered candidates; a
/// small universe yields fewer than the usual 3 distractors.
pub fn build_questions<R: Rng>(
  rng: &mut R,
  picked: &[QuizCandidate],
  universe: &[QuizCandidate],
) -> Vec<QuizQuestion> {
  let mut meanings: Vec<&str> = Vec::new();
  let mut seen = HashSet::new();
  for c in universe {
    if seen.insert(c.meaning.as_str()) {
      meanings.push(c.meaning.as_str());
    }
  }

  picked
    .iter()
    .map(|c| {
      let mut distractors: Vec<String> = meanings
        .iter()
        .filter(|m| **m != c.meaning)
        .map(|m| m.to_string())
        .collect();
      distractors.shuffle(rng);
      distractors.truncate(DISTRACTOR_COUNT);

      let mut options = distractors;
      options.push(c.meaning.clone());
      options.shuffle(rng);

      QuizQuestion {
        id: c.term.clone(),
        term: c.term.clone(),
        lemma: c.lemma.clone(),
        pos: c.pos.clone(),
        options,
      }
    })
    .collect()
}
