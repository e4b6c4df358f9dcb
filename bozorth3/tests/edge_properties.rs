//! Property tests over randomly generated minutia sets.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use bozorth3::consts::{MAX_MINUTIA_DISTANCE, MIN_COMPUTABLE_MINUTIAE};
use bozorth3::parsing::RawMinutia;
use bozorth3::{
    match_edges_into_pairs, match_templates, BozorthState, Format, PairHolder, Template,
};

fn random_minutiae(rng: &mut StdRng, count: usize) -> Vec<RawMinutia> {
    (0..count)
        .map(|_| RawMinutia {
            x: rng.gen_range(0..400),
            y: rng.gen_range(0..400),
            t: rng.gen_range(-179..=180),
            q: rng.gen_range(0..100),
            kind: None,
        })
        .collect()
}

fn random_template(rng: &mut StdRng, count: usize) -> Template {
    Template::from_raw(random_minutiae(rng, count), 150, Format::NistInternal)
}

#[test]
fn emitted_edges_are_sorted_and_within_bounds() {
    for seed in 0..8 {
        let mut rng = StdRng::seed_from_u64(seed);
        let count = rng.gen_range(MIN_COMPUTABLE_MINUTIAE..80);
        let template = random_template(&mut rng, count);

        for window in template.edges().windows(2) {
            let left = (
                window[0].distance_squared,
                window[0].min_beta,
                window[0].max_beta,
            );
            let right = (
                window[1].distance_squared,
                window[1].min_beta,
                window[1].max_beta,
            );
            assert!(left <= right, "edges out of order (seed {seed})");
        }

        for edge in template.edges() {
            assert!(edge.endpoint_k < edge.endpoint_j);
            assert!(edge.min_beta <= edge.max_beta);
            assert!(edge.min_beta > -180 && edge.min_beta <= 180);
            assert!(edge.max_beta > -180 && edge.max_beta <= 180);
            assert!(edge.distance_squared <= MAX_MINUTIA_DISTANCE * MAX_MINUTIA_DISTANCE);
            assert!(edge.theta_kj >= -90 && edge.theta_kj <= 90);
        }
    }
}

#[test]
fn candidate_pairs_are_normalized() {
    for seed in 0..8 {
        let mut rng = StdRng::seed_from_u64(1000 + seed);
        let probe = random_template(&mut rng, 40);
        let gallery = random_template(&mut rng, 40);

        let mut pairs = PairHolder::new();
        match_edges_into_pairs(
            probe.edges(),
            probe.minutiae(),
            gallery.edges(),
            gallery.minutiae(),
            &mut pairs,
        );

        for pair in pairs.pairs() {
            assert!(pair.delta_theta > -180 && pair.delta_theta <= 180);
            assert!(pair.probe_k < pair.probe_j);
            // kinds are unknown throughout, so no pair earns extra points
            assert_eq!(pair.points, 1);
        }
    }
}

#[test]
fn scoring_is_deterministic() {
    for seed in 0..4 {
        let mut rng = StdRng::seed_from_u64(2000 + seed);
        let probe = random_template(&mut rng, 50);
        let gallery = random_template(&mut rng, 50);

        let score = |probe: &Template, gallery: &Template| {
            let mut pairs = PairHolder::new();
            let mut state = BozorthState::new();
            match_templates(probe, gallery, Format::NistInternal, &mut pairs, &mut state)
        };

        assert_eq!(score(&probe, &gallery), score(&probe, &gallery));
        assert_eq!(score(&probe, &probe), score(&probe, &probe));
    }
}

#[test]
fn pruning_respects_the_limit() {
    for seed in 0..4 {
        let mut rng = StdRng::seed_from_u64(3000 + seed);
        let template = Template::from_raw(
            random_minutiae(&mut rng, 400),
            150,
            Format::NistInternal,
        );
        assert_eq!(template.minutiae().len(), 150);

        for window in template.minutiae().windows(2) {
            assert!((window[0].x, window[0].y) <= (window[1].x, window[1].y));
        }
    }
}
