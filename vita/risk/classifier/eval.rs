use rand::{rngs::SmallRng, seq::SliceRandom, SeedableRng};

/// Splits `count` row indices into shuffled (train, holdout) partitions.
///
/// The shuffle is seeded so repeated training runs evaluate on the same
/// partition and their accuracies stay comparable.
#[must_use]
pub fn train_test_split(count: usize, holdout_ratio: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..count).collect();
    let mut rng = SmallRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let ratio = holdout_ratio.clamp(0.1, 0.9);
    let holdout = ((count as f64 * ratio).round() as usize)
        .clamp(usize::from(count > 1), count.saturating_sub(1));
    let train = indices.split_off(holdout);
    (train, indices)
}

/// Fraction of positions where prediction matches the expected class.
#[must_use]
pub fn accuracy(expected: &[usize], predicted: &[usize]) -> f64 {
    if expected.is_empty() || expected.len() != predicted.len() {
        return 0.0;
    }
    let hits = expected
        .iter()
        .zip(predicted)
        .filter(|(e, p)| e == p)
        .count();
    hits as f64 / expected.len() as f64
}
