// DETERMINISTIC PERMUTATION ENGINE
//
// SAFETY INVARIANTS:
// 1. The order depends only on (item keys, seed, n); identical on every node
// 2. Items are ordered by the lowercase hex of sha256(key || seed || n),
//    ascending; ties keep their input order
// 3. Matrix row i is keyed by a parameter inside [width * i, width * (i + 1)),
//    so rows never share a parameter

use crate::error::ConsensusError;
use tally_crypto::{sha256, sha256_hex};

/// Permute `items` by their own string form.
pub fn shuffle<T>(items: &[T], seed: &str, n: u64) -> Vec<T>
where
    T: AsRef<str> + Clone,
{
    shuffle_by(items, seed, n, |item| item.as_ref().to_string())
}

/// Permute `items`, hashing `sort_key(item)` instead of the item itself.
pub fn shuffle_by<T, F>(items: &[T], seed: &str, n: u64, sort_key: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T) -> String,
{
    let mut keyed: Vec<(String, &T)> = items
        .iter()
        .map(|item| (sha256_hex(format!("{}{}{}", sort_key(item), seed, n)), item))
        .collect();
    keyed.sort_by(|a, b| a.0.cmp(&b.0));
    keyed.into_iter().map(|(_, item)| item.clone()).collect()
}

/// Parameter used for matrix row `row`. `None` for a zero width or when the
/// row's band does not fit in a u64.
pub fn row_parameter(seed: &str, width: u64, row: u64) -> Option<u64> {
    let band_start = width.checked_mul(row)?;
    let digest = sha256(format!("{}{}", seed, row));
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    let offset = u64::from_be_bytes(head).checked_rem(width)?;
    band_start.checked_add(offset)
}

/// `rows` distinct seed-keyed permutations of `items`.
pub fn matrix<T>(items: &[T], seed: &str, width: u64, rows: usize) -> Result<Vec<Vec<T>>, ConsensusError>
where
    T: AsRef<str> + Clone,
{
    if width == 0 {
        return Err(ConsensusError::InvalidMatrixShape("width must be > 0".to_string()));
    }
    if width.checked_mul(rows as u64).is_none() {
        return Err(ConsensusError::InvalidMatrixShape(format!(
            "{} rows of width {} overflow the parameter space",
            rows, width
        )));
    }

    (0..rows as u64)
        .map(|row| {
            row_parameter(seed, width, row)
                .map(|n| shuffle(items, seed, n))
                .ok_or_else(|| ConsensusError::InvalidMatrixShape(format!("row {} out of range", row)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn letters() -> Vec<String> {
        ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_shuffle_regression() {
        assert_eq!(shuffle(&letters(), "s", 0), vec!["d", "b", "c", "a"]);
        assert_eq!(shuffle(&letters(), "s", 1), vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn test_shuffle_by_key() {
        let items = vec![(1, "a"), (2, "b"), (3, "c"), (4, "d")];
        let order: Vec<&str> = shuffle_by(&items, "s", 0, |(_, k)| k.to_string())
            .into_iter()
            .map(|(_, k)| k)
            .collect();
        assert_eq!(order, vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn test_row_parameters() {
        let params: Vec<u64> = (0..3).filter_map(|i| row_parameter("s", 10, i)).collect();
        assert_eq!(params, vec![9, 15, 24]);
    }

    #[test]
    fn test_row_parameter_out_of_range() {
        assert_eq!(row_parameter("s", 0, 3), None);
        assert_eq!(row_parameter("s", u64::MAX, 2), None);
        assert_eq!(row_parameter("s", 2, u64::MAX), None);
        assert!(row_parameter("s", u64::MAX, 0).is_some());
    }

    #[test]
    fn test_matrix_regression() {
        let rows = matrix(&letters(), "s", 10, 3).unwrap();
        assert_eq!(
            rows,
            vec![
                vec!["c", "a", "b", "d"],
                vec!["d", "a", "c", "b"],
                vec!["d", "b", "a", "c"],
            ]
        );
    }

    #[test]
    fn test_matrix_rejects_zero_width() {
        assert!(matches!(
            matrix(&letters(), "s", 0, 3),
            Err(ConsensusError::InvalidMatrixShape(_))
        ));
        assert!(matrix(&letters(), "s", 4, 0).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_shuffle_is_reproducible_permutation(
            items in proptest::collection::vec("[a-z0-9]{1,12}", 0..20),
            seed in "[a-f0-9]{0,64}",
            n in any::<u64>(),
        ) {
            let first = shuffle(&items, &seed, n);
            prop_assert_eq!(&first, &shuffle(&items, &seed, n));

            let mut sorted_in = items.clone();
            let mut sorted_out = first.clone();
            sorted_in.sort();
            sorted_out.sort();
            prop_assert_eq!(sorted_in, sorted_out);
        }

        #[test]
        fn prop_row_parameter_in_band(seed in ".{0,40}", width in 1u64..10_000, row in 0u64..1_000) {
            let p = row_parameter(&seed, width, row).unwrap();
            prop_assert!(p >= width * row && p < width * (row + 1));
        }
    }
}
