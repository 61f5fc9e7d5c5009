//! Concept vocabulary and tokenization
//!
//! Maps concept codes to integer vocabulary ids. The trait is the seam the
//! masking objective and the tokenization stage work against; the in-memory
//! `ConceptVocab` is the standard implementation.

use rustc_hash::FxHashMap;

/// Padding token
pub const PAD_TOKEN: &str = "[PAD]";
/// Mask token substituted for selected positions
pub const MASK_TOKEN: &str = "[MASK]";
/// Out-of-vocabulary token; also terminates masking when reached
pub const UNUSED_TOKEN: &str = "[UNUSED]";
/// End-of-sequence token
pub const END_TOKEN: &str = "[END]";

const RESERVED_TOKENS: [&str; 4] = [PAD_TOKEN, MASK_TOKEN, UNUSED_TOKEN, END_TOKEN];

/// Mapping between concept codes and integer vocabulary ids
pub trait ConceptTokenizer: Send + Sync {
    /// Encode a slice of concept codes; unknown codes map to the unused id
    fn encode(&self, codes: &[String]) -> Vec<i64>;

    /// Total vocabulary size, reserved tokens included
    fn vocab_size(&self) -> usize;

    /// Id of the mask token
    fn mask_token_index(&self) -> i64;

    /// Id unknown codes map to; masking stops when it is encountered
    fn unused_token_index(&self) -> i64;

    /// Id of the end-of-sequence token
    fn end_token_index(&self) -> i64;

    /// Id of the visit-start marker, if it is in the vocabulary
    fn visit_start_token_index(&self) -> Option<i64>;

    /// Id of the visit-end marker, if it is in the vocabulary
    fn visit_end_token_index(&self) -> Option<i64>;
}

/// In-memory vocabulary built from the concept codes of a corpus
#[derive(Debug, Clone)]
pub struct ConceptVocab {
    code_to_id: FxHashMap<String, i64>,
}

impl ConceptVocab {
    /// Build a vocabulary from an iterator of concept codes
    ///
    /// Reserved tokens occupy the first ids; the remaining codes are
    /// assigned ids in first-seen order, duplicates ignored.
    pub fn from_codes<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut code_to_id = FxHashMap::default();
        for token in RESERVED_TOKENS {
            let id = code_to_id.len() as i64;
            code_to_id.insert(token.to_string(), id);
        }
        for code in codes {
            let code = code.as_ref();
            if !code_to_id.contains_key(code) {
                let id = code_to_id.len() as i64;
                code_to_id.insert(code.to_string(), id);
            }
        }
        Self { code_to_id }
    }

    /// Id of a single code, if present
    #[must_use]
    pub fn id_of(&self, code: &str) -> Option<i64> {
        self.code_to_id.get(code).copied()
    }
}

impl ConceptTokenizer for ConceptVocab {
    fn encode(&self, codes: &[String]) -> Vec<i64> {
        let unused = self.unused_token_index();
        codes
            .iter()
            .map(|code| self.id_of(code).unwrap_or(unused))
            .collect()
    }

    fn vocab_size(&self) -> usize {
        self.code_to_id.len()
    }

    fn mask_token_index(&self) -> i64 {
        1
    }

    fn unused_token_index(&self) -> i64 {
        2
    }

    fn end_token_index(&self) -> i64 {
        3
    }

    fn visit_start_token_index(&self) -> Option<i64> {
        self.id_of(crate::models::record::VISIT_START_TOKEN)
    }

    fn visit_end_token_index(&self) -> Option<i64> {
        self.id_of(crate::models::record::VISIT_END_TOKEN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_ids_come_first() {
        let vocab = ConceptVocab::from_codes(["[VS]", "320128", "[VE]"]);
        assert_eq!(vocab.id_of(PAD_TOKEN), Some(0));
        assert_eq!(vocab.mask_token_index(), 1);
        assert_eq!(vocab.unused_token_index(), 2);
        assert_eq!(vocab.end_token_index(), 3);
        assert_eq!(vocab.id_of("[VS]"), Some(4));
        assert_eq!(vocab.vocab_size(), 7);
    }

    #[test]
    fn test_encode_maps_unknown_to_unused() {
        let vocab = ConceptVocab::from_codes(["320128"]);
        let ids = vocab.encode(&["320128".to_string(), "99999".to_string()]);
        assert_eq!(ids, vec![4, vocab.unused_token_index()]);
    }

    #[test]
    fn test_duplicates_keep_first_id() {
        let vocab = ConceptVocab::from_codes(["a", "b", "a"]);
        assert_eq!(vocab.id_of("a"), Some(4));
        assert_eq!(vocab.id_of("b"), Some(5));
        assert_eq!(vocab.vocab_size(), 6);
    }

    #[test]
    fn test_marker_lookup() {
        let vocab = ConceptVocab::from_codes(["[VS]", "[VE]"]);
        assert_eq!(vocab.visit_start_token_index(), Some(4));
        assert_eq!(vocab.visit_end_token_index(), Some(5));
        assert!(ConceptVocab::from_codes(["x"]).visit_start_token_index().is_none());
    }
}
