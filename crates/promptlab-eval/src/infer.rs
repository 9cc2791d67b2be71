//! Heuristics for guessing which dataset fields hold the example input
//! and the ground-truth answer.

/// Candidate input field names, highest priority first.
const INPUT_CANDIDATES: &[&str] = &["input", "example", "question"];

/// Candidate ground-truth field names, highest priority first.
const GROUND_TRUTH_CANDIDATES: &[&str] = &["expected", "answer", "ground_truth", "output"];

/// Pick the most likely input field: the first candidate present, else
/// the first field, else `None` for an empty field list.
pub fn infer_input_field<'a>(fields: &[&'a str]) -> Option<&'a str> {
    for candidate in INPUT_CANDIDATES {
        if fields.iter().any(|f| f == candidate) {
            return Some(*candidate);
        }
    }
    fields.first().copied()
}

/// Pick the most likely ground-truth field. No positional fallback:
/// absence of ground truth is valid, not an error.
pub fn infer_ground_truth_field<'a>(fields: &[&'a str]) -> Option<&'a str> {
    for candidate in GROUND_TRUTH_CANDIDATES {
        if fields.iter().any(|f| f == candidate) {
            return Some(*candidate);
        }
    }
    None
}
