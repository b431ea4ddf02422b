//! Cross-source popularity scoring.

/// Weight given to monthly downloads in the combined score.
const DOWNLOAD_WEIGHT: f64 = 0.7;

/// Weight given to repository stars in the combined score.
const STAR_WEIGHT: f64 = 0.3;

/// Download count at which the download factor saturates.
const DOWNLOAD_CEILING: f64 = 1_000_000.0;

/// Star count at which the star factor saturates.
const STAR_CEILING: f64 = 10_000.0;

/// Combine monthly downloads and repository stars into one score in `[0, 1]`.
///
/// Negative inputs are treated as zero. The score is derived state: it must be
/// recomputed whenever either input changes, never copied forward.
#[must_use]
#[expect(clippy::cast_precision_loss, reason = "counts are far below the 2^52 precision limit")]
pub fn popularity_score(downloads: i64, stars: i64) -> f64 {
    let downloads = downloads.max(0) as f64;
    let stars = stars.max(0) as f64;

    let normalized_downloads = (downloads / DOWNLOAD_CEILING).min(1.0);
    let normalized_stars = (stars / STAR_CEILING).min(1.0);

    normalized_downloads * DOWNLOAD_WEIGHT + normalized_stars * STAR_WEIGHT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_inputs_score_zero() {
        assert_eq!(popularity_score(0, 0), 0.0);
    }

    #[test]
    fn test_saturated_inputs_score_one() {
        assert_eq!(popularity_score(1_000_000, 10_000), 1.0);
        assert_eq!(popularity_score(50_000_000, 500_000), 1.0);
    }

    #[test]
    fn test_half_downloads_no_stars() {
        let score = popularity_score(500_000, 0);
        assert!((score - 0.35).abs() < 1e-12);
    }

    #[test]
    fn test_negative_inputs_treated_as_zero() {
        assert_eq!(popularity_score(-5, -100), 0.0);
        assert_eq!(popularity_score(-5, 10_000), 0.3);
    }

    #[test]
    fn test_bounded_in_unit_interval() {
        for downloads in [0, 1, 1_000, 999_999, 1_000_000, i64::MAX] {
            for stars in [0, 1, 5_000, 10_000, i64::MAX] {
                let score = popularity_score(downloads, stars);
                assert!((0.0..=1.0).contains(&score), "score({downloads}, {stars}) = {score} out of range");
            }
        }
    }

    #[test]
    fn test_monotonic_in_each_argument() {
        let downloads = [0i64, 100, 10_000, 500_000, 1_000_000, 2_000_000];
        let stars = [0i64, 10, 1_000, 10_000, 20_000];

        for window in downloads.windows(2) {
            for &s in &stars {
                assert!(popularity_score(window[0], s) <= popularity_score(window[1], s));
            }
        }

        for window in stars.windows(2) {
            for &d in &downloads {
                assert!(popularity_score(d, window[0]) <= popularity_score(d, window[1]));
            }
        }
    }
}
