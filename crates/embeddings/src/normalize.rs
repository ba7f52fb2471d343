use crate::precision::Float;

/// L2 norm of a vector, accumulated in f64 regardless of element type.
pub fn l2_norm<T: Float>(v: &[T]) -> f64 {
    v.iter()
        .map(|x| {
            let x = x.to_f64();
            x * x
        })
        .sum::<f64>()
        .sqrt()
}

/// In-place L2 normalization. A zero vector is left untouched.
pub fn l2_normalize_in_place<T: Float>(v: &mut [T]) {
    let norm = l2_norm(v);
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x = T::from_f64(x.to_f64() / norm);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn l2_normalize_simple_vector() {
        let mut v = vec![3.0f32, 4.0];
        l2_normalize_in_place(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn l2_normalize_f64_unit_length() {
        let mut v: Vec<f64> = (0..1000).map(|i| i as f64).collect();
        l2_normalize_in_place(&mut v);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn l2_normalize_zero_vector() {
        let mut v = vec![0.0f64, 0.0, 0.0];
        l2_normalize_in_place(&mut v);
        assert_eq!(v, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn l2_normalize_tiny_values() {
        // f64 accumulation keeps these from underflowing to zero
        let mut v = vec![1e-20f32, 1e-20, 1e-20];
        l2_normalize_in_place(&mut v);
        assert!((l2_norm(&v) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn l2_normalize_empty_slice() {
        let mut v: Vec<f32> = vec![];
        l2_normalize_in_place(&mut v);
        assert!(v.is_empty());
    }

    #[test]
    fn l2_normalize_negative_values() {
        let mut v = vec![-3.0f64, -4.0];
        l2_normalize_in_place(&mut v);
        assert!((v[0] + 0.6).abs() < 1e-12);
        assert!((v[1] + 0.8).abs() < 1e-12);
    }
}
