pub mod extractor;
pub mod normalize;

pub use extractor::{extract_vocabulary, ExtractedVocab};
pub use normalize::{sentences_from_subtitle_text, split_sentences};
