/// Per-class weights inversely proportional to class frequency, `n / (present * count)`.
///
/// Classes absent from `y` get a weight of zero.
pub fn balanced_class_weights(y: &[usize], n_classes: usize) -> Vec<f32> {
    let mut counts = vec![0usize; n_classes];
    for &class in y {
        if let Some(count) = counts.get_mut(class) {
            *count += 1;
        }
    }

    let present = counts.iter().filter(|&&c| c > 0).count();
    let n = y.len() as f32;

    counts
        .iter()
        .map(|&count| match count {
            0 => 0.0,
            count => n / (present * count) as f32,
        })
        .collect()
}

/// Expands the class weights into one weight per sample.
pub fn sample_weights(y: &[usize], class_weights: &[f32]) -> Vec<f32> {
    y.iter()
        .map(|&class| class_weights.get(class).copied().unwrap_or(0.0))
        .collect()
}
