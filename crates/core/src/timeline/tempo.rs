//! Decompose an arbitrary speed ratio into bounded tempo stages.

/// Lowest factor a single tempo stage accepts.
pub const MIN_STAGE: f64 = 0.5;
/// Highest factor a single tempo stage accepts.
pub const MAX_STAGE: f64 = 2.0;

/// Build the cascade of tempo stages whose product is `ratio`.
///
/// `ratio` is `original_duration / target_duration`. Every stage lies in
/// `[MIN_STAGE, MAX_STAGE]`; stages are applied left to right. Non-finite
/// or non-positive ratios degrade to the identity chain `[1.0]`.
pub fn build_tempo_chain(ratio: f64) -> Vec<f64> {
    let mut r = if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    };

    let mut stages = Vec::new();
    while r < MIN_STAGE || r > MAX_STAGE {
        let stage = if r < MIN_STAGE { MIN_STAGE } else { MAX_STAGE };
        stages.push(stage);
        r /= stage;
    }
    stages.push(r);
    stages
}

/// Duration of a clip after passing through a tempo chain.
pub fn chained_duration(base_duration_s: f64, stages: &[f64]) -> f64 {
    stages.iter().fold(base_duration_s, |dur, factor| dur / factor)
}
