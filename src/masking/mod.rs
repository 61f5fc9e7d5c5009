//! Masked-token objective
//!
//! Selects positions of a tokenized sequence for the self-supervised
//! masked-prediction task: each eligible position is chosen independently
//! with probability 0.15, and a chosen position is replaced by the mask
//! token 80% of the time, by a random vocabulary id 10% of the time, and
//! left unchanged otherwise. Unchosen positions carry the ignore label.

use crate::error::{Result, TimelineError};
use crate::models::record::LABEL_IGNORE;
use crate::tokenizer::ConceptTokenizer;
use rand::Rng;
use rand::rngs::StdRng;

/// Independent selection probability per eligible position
pub const MASK_PROBABILITY: f64 = 0.15;

const MASK_REPLACE_PROBABILITY: f64 = 0.8;
const RANDOM_REPLACE_PROBABILITY: f64 = 0.1;

/// Apply the masked-token objective to one tokenized sequence
///
/// Returns the masked input ids and the label array. Labels hold the
/// original id at selected positions and the ignore value everywhere
/// else. Positions flagged in `mlm_skip_values` are never selected, and
/// selection stops at the first occurrence of the unused token id (the
/// tail beyond it is padding-equivalent).
pub fn mask_tokens(
    person_id: i64,
    input_ids: &[i64],
    mlm_skip_values: &[i32],
    tokenizer: &dyn ConceptTokenizer,
    rng: &mut StdRng,
) -> Result<(Vec<i64>, Vec<i64>)> {
    if input_ids.len() != mlm_skip_values.len() {
        return Err(TimelineError::data_integrity(
            person_id,
            format!(
                "input_ids has length {}, mlm_skip_values has length {}",
                input_ids.len(),
                mlm_skip_values.len()
            ),
        ));
    }

    let unused = tokenizer.unused_token_index();
    let mut masked = input_ids.to_vec();
    let mut labels = vec![LABEL_IGNORE; input_ids.len()];

    for (i, &id) in input_ids.iter().enumerate() {
        if id == unused {
            break;
        }
        if mlm_skip_values[i] == 1 {
            continue;
        }
        if rng.random::<f64>() >= MASK_PROBABILITY {
            continue;
        }
        labels[i] = id;
        let draw = rng.random::<f64>();
        if draw < MASK_REPLACE_PROBABILITY {
            masked[i] = tokenizer.mask_token_index();
        } else if draw < MASK_REPLACE_PROBABILITY + RANDOM_REPLACE_PROBABILITY {
            masked[i] = rng.random_range(0..tokenizer.vocab_size() as i64);
        }
    }
    Ok((masked, labels))
}
