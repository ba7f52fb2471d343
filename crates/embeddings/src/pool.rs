//! Mean pooling over per-token vectors followed by L2 normalization.
//!
//! Encoder-style backends return one vector per input token. [`mean_pool`]
//! collapses that matrix into a single unit vector for the whole input:
//! elementwise sum, divide by the token count, then scale to unit length. An
//! all-zero mean is returned as-is so no NaN ever leaks out.
//!
//! Accumulation happens in f64 for both element types; the result is narrowed
//! back to `T` once at the end.
use crate::normalize::l2_normalize_in_place;
use crate::precision::Float;
use crate::EmbeddingError;

/// One row of a token matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenVector<T> {
    /// Surface form of the token, when the backend reports it.
    pub token: Option<String>,
    pub values: Vec<T>,
}

impl<T> TokenVector<T> {
    pub fn new(token: Option<String>, values: Vec<T>) -> Self {
        Self { token, values }
    }
}

/// Result of pooling: the sentence vector and the token labels seen, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Pooled<T> {
    pub vector: Vec<T>,
    pub tokens: Vec<String>,
}

/// Pools a labelled token matrix.
pub fn mean_pool<T: Float>(rows: &[TokenVector<T>]) -> Result<Pooled<T>, EmbeddingError> {
    let vector = mean_pool_rows(rows.iter().map(|r| r.values.as_slice()))?;
    let tokens = rows.iter().filter_map(|r| r.token.clone()).collect();
    Ok(Pooled { vector, tokens })
}

/// Pools bare rows. Fails with [`EmbeddingError::DimensionMismatch`] when there
/// are no rows, the first row is empty, or any row differs in length from the
/// first. Nothing is returned on failure.
pub fn mean_pool_rows<'a, T, I>(rows: I) -> Result<Vec<T>, EmbeddingError>
where
    T: Float,
    I: IntoIterator<Item = &'a [T]>,
{
    let mut rows = rows.into_iter();
    let first = rows
        .next()
        .ok_or_else(|| EmbeddingError::DimensionMismatch("no token vectors to pool".into()))?;
    let dim = first.len();
    if dim == 0 {
        return Err(EmbeddingError::DimensionMismatch(
            "token vectors have zero dimensions".into(),
        ));
    }

    let mut sum: Vec<f64> = first.iter().map(|v| v.to_f64()).collect();
    let mut count = 1usize;
    for (idx, row) in rows.enumerate() {
        if row.len() != dim {
            return Err(EmbeddingError::DimensionMismatch(format!(
                "token {} has {} dimensions, expected {dim}",
                idx + 1,
                row.len()
            )));
        }
        for (acc, v) in sum.iter_mut().zip(row) {
            *acc += v.to_f64();
        }
        count += 1;
    }

    let n = count as f64;
    for acc in sum.iter_mut() {
        *acc /= n;
    }

    l2_normalize_in_place(&mut sum);
    Ok(sum.into_iter().map(T::from_f64).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn single_row_is_normalized() {
        let out = mean_pool_rows([[3.0f64, 4.0].as_slice()]).unwrap();
        assert!((out[0] - 0.6).abs() < 1e-12);
        assert!((out[1] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn zero_mean_stays_zero() {
        let out = mean_pool_rows([[1.0f32, -2.0].as_slice(), [-1.0f32, 2.0].as_slice()]).unwrap();
        assert_eq!(out, vec![0.0, 0.0]);
    }

    #[test]
    fn pooled_vector_has_unit_norm() {
        let rows = [[0.2f64, 0.9, -0.4].as_slice(), [1.5, 0.1, 0.3].as_slice()];
        let out = mean_pool_rows(rows).unwrap();
        assert!((crate::l2_norm(&out) - 1.0).abs() < 1e-12);
        assert!((out[0] / out[1] - 1.7 / 1.0).abs() < 1e-12);
    }

    #[test]
    fn collects_labels_in_order() {
        let rows = vec![
            TokenVector::new(Some("[CLS]".into()), vec![1.0f32, 0.0]),
            TokenVector::new(None, vec![0.0f32, 1.0]),
            TokenVector::new(Some("hello".into()), vec![1.0f32, 1.0]),
        ];
        let pooled = mean_pool(&rows).unwrap();
        assert_eq!(pooled.tokens, vec!["[CLS]".to_string(), "hello".to_string()]);
        assert_eq!(pooled.vector.len(), 2);
        assert!((pooled.vector[0] - pooled.vector[1]).abs() < 1e-6);
    }

    #[test]
    fn empty_matrix_is_rejected() {
        let rows: Vec<TokenVector<f32>> = Vec::new();
        let err = mean_pool(&rows).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DimensionMismatch);
    }

    #[test]
    fn zero_width_rows_are_rejected() {
        let rows = vec![TokenVector::<f64>::new(None, Vec::new())];
        assert!(matches!(
            mean_pool(&rows),
            Err(EmbeddingError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn ragged_row_reports_its_position() {
        let err = mean_pool_rows([[1.0f32, 2.0].as_slice(), [1.0f32].as_slice()]).unwrap_err();
        assert_eq!(
            err,
            EmbeddingError::DimensionMismatch("token 1 has 1 dimensions, expected 2".into())
        );
    }
}
