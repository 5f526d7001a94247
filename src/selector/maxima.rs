//! Circular local-maximum search over a direction curve.

/// Bins whose value strictly exceeds both circular neighbours, in scan order.
///
/// Plateaus produce no maximum; a constant curve has none at all.
pub fn local_maxima(values: &[f32]) -> Vec<usize> {
    let n = values.len();
    if n < 3 {
        return Vec::new();
    }
    (0..n)
        .filter(|&i| {
            let prev = values[(i + n - 1) % n];
            let next = values[(i + 1) % n];
            values[i] > prev && values[i] > next
        })
        .collect()
}

/// Order `peaks` by descending value and keep the best `keep`.
///
/// The sort is stable, so equal values keep scan order (earliest found wins).
pub fn rank_peaks(values: &[f32], mut peaks: Vec<usize>, keep: usize) -> Vec<usize> {
    peaks.sort_by(|&a, &b| {
        values[b]
            .partial_cmp(&values[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    peaks.truncate(keep);
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_maxima_wrap_around() {
        let mut v = vec![0.0_f32; 12];
        v[0] = 3.0; // neighbours are v[11] and v[1]
        v[5] = 2.0;
        v[11] = 1.0;
        assert_eq!(local_maxima(&v), vec![0, 5]);
    }

    #[test]
    fn test_plateau_is_not_a_maximum() {
        let mut v = vec![0.0_f32; 10];
        v[3] = 1.0;
        v[4] = 1.0;
        assert!(local_maxima(&v).is_empty());
        assert!(local_maxima(&[2.0; 8]).is_empty());
    }

    #[test]
    fn test_rank_ties_keep_scan_order() {
        let v = vec![0.0, 5.0, 0.0, 7.0, 0.0, 5.0, 0.0, 1.0, 0.0, 5.0, 0.0];
        let peaks = local_maxima(&v);
        assert_eq!(peaks, vec![1, 3, 5, 7, 9]);
        assert_eq!(rank_peaks(&v, peaks, 3), vec![3, 1, 5]);
    }
}
