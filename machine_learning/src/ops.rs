use ndarray::{Array2, Axis};

/// Index of the first maximum, `0` for an empty input.
pub fn argmax<'a, I>(values: I) -> usize
where
    I: IntoIterator<Item = &'a f32>,
{
    let mut best = (0, f32::NEG_INFINITY);
    for (i, &v) in values.into_iter().enumerate() {
        if v > best.1 {
            best = (i, v);
        }
    }

    best.0
}

/// Turns each row of logits into probabilities in place.
pub fn softmax_rows(z: &mut Array2<f32>) {
    for mut row in z.axis_iter_mut(Axis(0)) {
        let max = row.fold(f32::NEG_INFINITY, |m, &v| m.max(v));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        row /= sum;
    }
}

#[cfg(test)]
mod tests {
    use ndarray::array;

    use super::*;

    #[test]
    fn ties_go_to_the_lowest_index() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), 1);
        assert_eq!(argmax(&[0.0f32; 0]), 0);
    }

    #[test]
    fn softmax_rows_add_up_to_one() {
        let mut z = array![[1.0, 2.0, 3.0], [1000.0, 1000.0, 0.0]];
        softmax_rows(&mut z);

        for row in z.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-6);
        }
        assert!((z[[1, 0]] - 0.5).abs() < 1e-6);
        assert!(z[[0, 2]] > z[[0, 1]]);
    }
}
