//! Seeded probability helpers. Every random decision in the simulation goes
//! through one of these with an explicit RNG handle, so an episode is fully
//! reproducible from its seed.

use rand::distributions::WeightedIndex;
use rand::Rng;
use rand_distr::{Bernoulli, Distribution, Uniform};

/// Returns true with the given probability. Values outside [0, 1] are clamped.
pub fn resolve<R: Rng + ?Sized>(probability: f64, rng: &mut R) -> bool {
    if probability.is_nan() || probability <= 0.0 {
        return false;
    }
    if probability >= 1.0 {
        return true;
    }
    match Bernoulli::new(probability) {
        Ok(coin) => coin.sample(rng),
        Err(_) => false,
    }
}

/// Uniform draw in [lower, upper]. A degenerate range returns `lower`.
pub fn uniform_in<R: Rng + ?Sized>(lower: f64, upper: f64, rng: &mut R) -> f64 {
    if upper <= lower {
        return lower;
    }
    Uniform::new_inclusive(lower, upper).sample(rng)
}

/// Categorical draw over `weights`, returning the chosen index. `None` when
/// every weight is zero (or the slice is empty).
pub fn choose_weighted<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> Option<usize> {
    if weights.iter().all(|w| *w <= 0.0 || !w.is_finite()) {
        return None;
    }
    let cleaned: Vec<f64> = weights
        .iter()
        .map(|w| if w.is_finite() && *w > 0.0 { *w } else { 0.0 })
        .collect();
    WeightedIndex::new(&cleaned).ok().map(|dist| dist.sample(rng))
}

/// Uniform choice of one element.
pub fn choose<'a, T, R: Rng + ?Sized>(items: &'a [T], rng: &mut R) -> Option<&'a T> {
    if items.is_empty() {
        None
    } else {
        Some(&items[rng.gen_range(0..items.len())])
    }
}

/// Probability that an attack of the given skill compromises a node.
///
/// `p = s² / (s + d)` where `s` is the clamped skill and `d = 1 - vulnerability`
/// is the node's defence (zero when defences are ignored). The curve is
/// continuous, increasing in both skill and vulnerability, never exceeds the
/// skill itself, and reaches 1 only at full skill against an undefended node.
pub fn attack_success_probability(skill: f64, vulnerability: f64, use_vulnerability: bool) -> f64 {
    let skill = skill.clamp(0.0, 1.0);
    let defence = if use_vulnerability {
        1.0 - vulnerability.clamp(0.0, 1.0)
    } else {
        0.0
    };
    if skill + defence <= 0.0 {
        return 0.0;
    }
    (skill * skill / (skill + defence)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn resolve_edges_are_certain() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!((0..100).all(|_| resolve(1.0, &mut rng)));
        assert!((0..100).all(|_| !resolve(0.0, &mut rng)));
        assert!(!resolve(f64::NAN, &mut rng));
    }

    #[test]
    fn success_probability_shape() {
        assert_eq!(attack_success_probability(1.0, 1.0, true), 1.0);
        assert_eq!(attack_success_probability(0.0, 0.0, true), 0.0);
        assert_eq!(attack_success_probability(0.0, 1.0, true), 0.0);

        // ignoring defences reduces to the skill
        assert!((attack_success_probability(0.3, 0.0, false) - 0.3).abs() < 1e-12);

        let low = attack_success_probability(0.5, 0.2, true);
        let high = attack_success_probability(0.5, 0.8, true);
        assert!(low < high);

        let weak = attack_success_probability(0.2, 0.5, true);
        let strong = attack_success_probability(0.9, 0.5, true);
        assert!(weak < strong);
    }

    #[test]
    fn weighted_choice_skips_zero_weights() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..200 {
            assert_eq!(choose_weighted(&[0.0, 2.0, 0.0], &mut rng), Some(1));
        }
        assert_eq!(choose_weighted(&[0.0, 0.0], &mut rng), None);
        assert_eq!(choose_weighted(&[], &mut rng), None);
    }

    #[test]
    fn uniform_respects_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let v = uniform_in(0.2, 0.6, &mut rng);
            assert!((0.2..=0.6).contains(&v));
        }
        assert_eq!(uniform_in(0.4, 0.4, &mut rng), 0.4);
    }
}
