use deckmc_core::estimator::{NAIVE_AVERAGE, RunningStats, SampleLog, recompute_stats};
use deckmc_core::model::{Card, Deck, Sample};
use deckmc_core::sampling::{
    FaceBiased, MultiProposal, Pmf, PmfConvention, Proposal, RedBiased, Uniform,
};
use deckmc_core::weighting::{
    ImportanceWeight, MisStrategies, MixingWeights, WeightingStrategy,
};
use rand::SeedableRng;
use rand::rngs::StdRng;

const DRAWS: usize = 50_000;
const TOLERANCE: f64 = 0.1;

fn run<P: Proposal>(proposal: &P, seed: u64, strategies: &[&dyn WeightingStrategy]) -> RunningStats {
    let mut rng = StdRng::seed_from_u64(seed);
    let log: SampleLog = proposal.draw_many(DRAWS, &mut rng).into_iter().collect();
    recompute_stats(log.as_slice(), strategies).expect("fixed-deck weights are defined")
}

fn assert_near(label: &str, got: f64, want: f64) {
    assert!(
        (got - want).abs() < TOLERANCE,
        "{label}: got {got:.4}, expected {want:.4} ± {TOLERANCE}"
    );
}

#[test]
fn uniform_naive_average_converges_to_seven() {
    let stats = run(&Uniform, 1, &[]);
    assert_near(NAIVE_AVERAGE, stats.naive_average, 7.0);
    assert!((stats.face_card_percentage - 1200.0 / 52.0).abs() < 1.0);
}

#[test]
fn face_biased_naive_is_biased_and_importance_weight_corrects_it() {
    for convention in [PmfConvention::Demo, PmfConvention::Normalized] {
        let proposal = FaceBiased::new(convention);
        let importance = ImportanceWeight::new(proposal);
        let stats = run(&proposal, 2, &[&importance]);
        assert_near(NAIVE_AVERAGE, stats.naive_average, 163.0 / 19.0);
        assert_near(
            "weighted_average",
            stats.weighted_average("weighted_average").unwrap_or_default(),
            7.0,
        );
        assert!((stats.face_card_percentage - 900.0 / 19.0).abs() < 1.0);
    }
}

#[test]
fn red_biased_importance_weight_recovers_seven() {
    let proposal = RedBiased::default();
    let importance = ImportanceWeight::new(proposal);
    let stats = run(&proposal, 3, &[&importance]);
    assert_near(NAIVE_AVERAGE, stats.naive_average, 7.0);
    assert_near(
        "weighted_average",
        stats.weighted_average("weighted_average").unwrap_or_default(),
        7.0,
    );
}

#[test]
fn mis_strategies_converge_to_seven() {
    for convention in [PmfConvention::Demo, PmfConvention::Normalized] {
        let mixture = MultiProposal::new(convention);
        let mis = MisStrategies::new(convention, MixingWeights::default());
        let stats = run(&mixture, 4, &mis.as_dyn());
        assert_near(NAIVE_AVERAGE, stats.naive_average, 148.0 / 19.0);
        assert_near(
            "memory_average",
            stats.weighted_average("memory_average").unwrap_or_default(),
            7.0,
        );
        assert_near(
            "balance_average",
            stats.weighted_average("balance_average").unwrap_or_default(),
            7.0,
        );
        let ess = stats.get("balance_average_ess").unwrap_or_default();
        assert!(ess > 0.8 * DRAWS as f64 && ess <= DRAWS as f64);
    }
}

/// Large-sample limit of a self-normalized estimate: `Σ q·v·w / Σ q·w` over the deck.
fn limit(sampling: &impl Pmf, strategy: &dyn WeightingStrategy) -> f64 {
    let (num, den) = Deck::standard()
        .iter()
        .fold((0.0, 0.0), |(num, den), card: Card| {
            let q = sampling.pmf(card);
            let w = strategy
                .weight(&Sample::from(card))
                .expect("balance weight ignores origin");
            (num + q * w * f64::from(card.value()), den + q * w)
        });
    num / den
}

#[test]
fn balance_heuristic_limit_is_exact_only_with_normalized_pmfs() {
    let exact = MultiProposal::new(PmfConvention::Normalized);

    let normalized = MisStrategies::new(PmfConvention::Normalized, MixingWeights::default());
    assert!((limit(&exact, &normalized.balance) - 7.0).abs() < 1e-9);

    let demo = MisStrategies::new(PmfConvention::Demo, MixingWeights::default());
    let biased = limit(&exact, &demo.balance);
    assert!((biased - 7.0077).abs() < 1e-3, "demo balance limit {biased}");
}

#[test]
fn same_seed_same_statistics() {
    let mis = MisStrategies::default();
    let a = run(&MultiProposal::default(), 99, &mis.as_dyn());
    let b = run(&MultiProposal::default(), 99, &mis.as_dyn());
    assert_eq!(a, b);
    let c = run(&MultiProposal::default(), 100, &mis.as_dyn());
    assert_ne!(a, c);
}
