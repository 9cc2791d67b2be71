/// Model identifiers offered by the configuration surface for both
/// prompt execution and judging.
///
/// The list is advisory: identifiers outside it are passed through to
/// the API as opaque strings so newly released models keep working
/// without a code change.
pub const AVAILABLE_MODELS: &[&str] = &[
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4.1",
    "gpt-4.1-mini",
    "gpt-4.1-nano",
    "o3-mini",
    "o4-mini",
    "o3",
];

/// Whether the identifier is in the known catalog.
pub fn is_known_model(model: &str) -> bool {
    AVAILABLE_MODELS.contains(&model)
}
