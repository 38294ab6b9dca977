use ndarray::{Array1, ArrayView1};

/// Numerically stable softmax over a single row of logits.
pub(crate) fn softmax(logits: ArrayView1<f32>) -> Array1<f32> {
    let max = logits.fold(f32::NEG_INFINITY, |m, &x| m.max(x));
    if max == f32::INFINITY {
        // Infinite logits share all the mass
        let count = logits.iter().filter(|&&x| x == f32::INFINITY).count() as f32;
        return logits.mapv(|x| if x == f32::INFINITY { 1.0 / count } else { 0.0 });
    }
    let exps = logits.mapv(|x| (x - max).exp());
    let sum = exps.sum();
    if sum > 0.0 && sum.is_finite() {
        exps / sum
    } else {
        Array1::from_elem(logits.len(), 1.0 / logits.len() as f32)
    }
}

/// Index of the largest value; ties resolve to the lowest index.
pub(crate) fn argmax(values: ArrayView1<f32>) -> Option<(usize, f32)> {
    values.iter().copied().enumerate().fold(None, |best, (i, v)| match best {
        Some((_, b)) if b >= v || v.is_nan() => best,
        _ => Some((i, v)),
    })
}
