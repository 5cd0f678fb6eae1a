use rand::{seq::index, Rng};

use crate::error::NBackError;

/// Stimulus values for one modality. Values are 1-based and drawn from
/// `[1, domain_size]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StimulusSequence {
    values: Vec<u32>,
    lag: usize,
}

impl StimulusSequence {
    pub fn values(&self) -> &[u32] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<u32> {
        self.values.get(idx).copied()
    }

    pub fn lag(&self) -> usize {
        self.lag
    }

    /// True when the stimulus at `idx` equals the one `lag` steps earlier.
    /// Indices without enough history never match.
    pub fn is_match_at(&self, idx: usize) -> bool {
        idx >= self.lag
            && idx < self.values.len()
            && self.values[idx] == self.values[idx - self.lag]
    }

    pub fn match_count(&self) -> usize {
        (self.lag..self.values.len())
            .filter(|&i| self.is_match_at(i))
            .count()
    }
}

/// Number of forced matches for `eligible` positions at the given rate.
pub fn desired_matches(eligible: usize, target_match_percentage: u8) -> usize {
    let raw = (eligible as f64 * target_match_percentage as f64 / 100.0).round() as usize;
    raw.min(eligible)
}

/// Generate a sequence using the thread-local rng.
pub fn generate(
    length: usize,
    domain_size: u32,
    target_match_percentage: u8,
    lag: usize,
) -> Result<StimulusSequence, NBackError> {
    generate_with_rng(
        &mut rand::thread_rng(),
        length,
        domain_size,
        target_match_percentage,
        lag,
    )
}

/// Generate a sequence with exactly `desired_matches(length - lag, pct)`
/// positions equal to their lag-N predecessor.
///
/// Eligible positions are first split into forced matches and forced
/// non-matches, then the sequence is filled left to right. Matches at other
/// lags are not controlled.
pub fn generate_with_rng<R: Rng + ?Sized>(
    rng: &mut R,
    length: usize,
    domain_size: u32,
    target_match_percentage: u8,
    lag: usize,
) -> Result<StimulusSequence, NBackError> {
    if lag == 0 {
        return Err(NBackError::invalid("lag must be at least 1"));
    }
    if lag >= length {
        return Err(NBackError::invalid(format!(
            "lag {lag} must be smaller than the sequence length {length}"
        )));
    }
    if domain_size < 2 {
        return Err(NBackError::invalid(format!(
            "stimulus domain must hold at least 2 values, got {domain_size}"
        )));
    }
    if target_match_percentage > 100 {
        return Err(NBackError::invalid(format!(
            "match percentage must be within 0..=100, got {target_match_percentage}"
        )));
    }

    let eligible = length - lag;
    let wanted = desired_matches(eligible, target_match_percentage);

    let mut forced_match = vec![false; length];
    for offset in index::sample(rng, eligible, wanted).into_vec() {
        forced_match[lag + offset] = true;
    }

    let mut values: Vec<u32> = Vec::with_capacity(length);
    for (i, &is_match) in forced_match.iter().enumerate() {
        let value = if i < lag {
            rng.gen_range(1..=domain_size)
        } else if is_match {
            values[i - lag]
        } else {
            draw_excluding(rng, domain_size, values[i - lag])?
        };
        values.push(value);
    }

    Ok(StimulusSequence { values, lag })
}

/// Uniform draw from `[1, domain_size]` without `excluded`.
fn draw_excluding<R: Rng + ?Sized>(
    rng: &mut R,
    domain_size: u32,
    excluded: u32,
) -> Result<u32, NBackError> {
    if domain_size < 2 {
        return Err(NBackError::DomainTooSmall { domain_size });
    }
    let v = rng.gen_range(1..domain_size);
    Ok(if v >= excluded { v + 1 } else { v })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rand::{rngs::StdRng, SeedableRng};

    fn seeded(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn example_ten_by_nine_at_thirty_percent() {
        // 8 eligible positions, round(2.4) = 2
        for seed in 0..50 {
            let seq = generate_with_rng(&mut seeded(seed), 10, 9, 30, 2).unwrap();
            assert_eq!(seq.len(), 10);
            assert_eq!(seq.match_count(), 2);
        }
    }

    #[test]
    fn values_stay_in_domain() {
        for seed in 0..50 {
            let seq = generate_with_rng(&mut seeded(seed), 30, 4, 50, 3).unwrap();
            assert!(seq.values().iter().all(|v| (1..=4).contains(v)));
        }
    }

    #[test]
    fn match_count_is_exact_across_configs() {
        let configs = [
            (5usize, 2u32, 0u8, 1usize),
            (10, 9, 30, 2),
            (25, 16, 45, 3),
            (30, 25, 70, 5),
            (7, 8, 50, 6),
            (12, 3, 15, 1),
        ];
        for (seed, &(length, domain, pct, lag)) in configs.iter().enumerate() {
            let seq =
                generate_with_rng(&mut seeded(seed as u64), length, domain, pct, lag).unwrap();
            assert_eq!(
                seq.match_count(),
                desired_matches(length - lag, pct),
                "length={length} domain={domain} pct={pct} lag={lag}"
            );
        }
    }

    #[test]
    fn zero_percent_has_no_lag_matches() {
        for _ in 0..20 {
            let seq = generate(20, 2, 0, 2).unwrap();
            assert_eq!(seq.match_count(), 0);
            for i in 2..20 {
                assert_ne!(seq.values()[i], seq.values()[i - 2]);
            }
        }
    }

    #[test]
    fn hundred_percent_matches_everywhere() {
        let seq = generate(15, 9, 100, 3).unwrap();
        assert!((3..15).all(|i| seq.is_match_at(i)));
        assert_eq!(seq.match_count(), 12);
    }

    #[test]
    fn history_positions_never_match() {
        let seq = generate(6, 4, 100, 2).unwrap();
        assert!(!seq.is_match_at(0));
        assert!(!seq.is_match_at(1));
        assert!(!seq.is_match_at(6));
    }

    #[test]
    fn desired_matches_rounds_and_clamps() {
        assert_eq!(desired_matches(8, 30), 2);
        assert_eq!(desired_matches(3, 50), 2);
        assert_eq!(desired_matches(8, 0), 0);
        assert_eq!(desired_matches(8, 100), 8);
        assert_eq!(desired_matches(0, 100), 0);
    }

    #[test]
    fn rejects_bad_configurations() {
        assert_matches!(generate(5, 9, 30, 5), Err(NBackError::InvalidConfiguration(_)));
        assert_matches!(generate(5, 9, 30, 7), Err(NBackError::InvalidConfiguration(_)));
        assert_matches!(generate(5, 9, 30, 0), Err(NBackError::InvalidConfiguration(_)));
        assert_matches!(generate(5, 1, 30, 2), Err(NBackError::InvalidConfiguration(_)));
        assert_matches!(generate(5, 9, 101, 2), Err(NBackError::InvalidConfiguration(_)));
    }

    #[test]
    fn draw_excluding_never_returns_excluded() {
        let mut rng = seeded(7);
        for excluded in 1..=3 {
            for _ in 0..200 {
                let v = draw_excluding(&mut rng, 3, excluded).unwrap();
                assert_ne!(v, excluded);
                assert!((1..=3).contains(&v));
            }
        }
        assert_matches!(
            draw_excluding(&mut rng, 1, 1),
            Err(NBackError::DomainTooSmall { domain_size: 1 })
        );
    }

    #[test]
    fn draw_excluding_reaches_every_other_value() {
        let mut rng = seeded(11);
        let mut seen = [false; 6];
        for _ in 0..500 {
            let v = draw_excluding(&mut rng, 5, 3).unwrap();
            seen[v as usize] = true;
        }
        assert_eq!(seen, [false, true, true, false, true, true]);
    }
}
