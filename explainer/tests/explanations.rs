#![cfg(test)]
//! The explanation algorithms on small integer models, checked against a brute-force enumeration
//! of all subsets of the soft constraints.
use std::collections::BTreeSet;
use std::time::Duration;

use explainer::constraints;
use explainer::core::explanations::Choice;
use explainer::core::explanations::ConflictExtractor;
use explainer::core::explanations::CorrectionSetOptimizer;
use explainer::core::explanations::DiagnosisResult;
use explainer::core::explanations::DiagnosisSession;
use explainer::core::explanations::HittingSetOptimizer;
use explainer::core::explanations::LatticeSubset;
use explainer::core::explanations::ScriptedChoice;
use explainer::core::explanations::SubsetMapper;
use explainer::core::options::CorrectionStrategy;
use explainer::core::options::ExtractorOptions;
use explainer::core::options::HittingSetOptions;
use explainer::core::options::ShrinkOrder;
use explainer::core::termination::Indefinite;
use explainer::core::termination::TimeBudget;
use explainer::core::variables::Indicator;
use explainer::core::ExplanationError;
use explainer::core::Feasibility;
use explainer::oracles::ClauseOracle;
use explainer::oracles::FiniteDomainOracle;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `x` in 1..=2 with the soft constraints `x == 1` and `x == 2`.
fn two_values() -> ConflictExtractor<FiniteDomainOracle> {
    let mut oracle = FiniteDomainOracle::default();
    let x = oracle.new_variable(1, 2, "x");
    let soft = vec![
        constraints::equals([(1, x.clone())], 1),
        constraints::equals([(1, x)], 2),
    ];

    ConflictExtractor::new(oracle, vec![], soft, ExtractorOptions::default())
        .expect("linear constraints are reifiable")
}

/// `x` and `y` in 0..=3 with five soft constraints which have several overlapping conflicts.
fn overlapping_conflicts(options: ExtractorOptions) -> ConflictExtractor<FiniteDomainOracle> {
    let mut oracle = FiniteDomainOracle::default();
    let x = oracle.new_variable(0, 3, "x");
    let y = oracle.new_variable(0, 3, "y");
    let soft = vec![
        constraints::greater_than_or_equals([(1, x.clone()), (1, y.clone())], 5),
        constraints::less_than_or_equals([(1, x.clone())], 1),
        constraints::less_than_or_equals([(1, y.clone())], 2),
        constraints::equals([(1, x), (-1, y.clone())], 0),
        constraints::greater_than_or_equals([(1, y)], 1),
    ];

    ConflictExtractor::new(oracle, vec![], soft, options).expect("linear constraints are reifiable")
}

const NUM_SOFT: u32 = 5;
const WEIGHTS: [u64; NUM_SOFT as usize] = [3, 1, 2, 1, 1];

fn indicators(mask: u32) -> Vec<Indicator> {
    (0..NUM_SOFT)
        .filter(|id| mask & (1u32 << id) != 0)
        .map(Indicator::new)
        .collect()
}

fn mask(subset: &[Indicator]) -> u32 {
    subset.iter().map(|indicator| 1u32 << indicator.id()).sum()
}

fn weight(mask: u32) -> u64 {
    (0..NUM_SOFT)
        .filter(|id| mask & (1u32 << id) != 0)
        .map(|id| WEIGHTS[id as usize])
        .sum()
}

fn full_mask() -> u32 {
    (1u32 << NUM_SOFT) - 1
}

/// The feasibility of every subset, indexed by its mask.
fn brute_force() -> Vec<bool> {
    let mut extractor = overlapping_conflicts(ExtractorOptions::default());
    (0..=full_mask())
        .map(|mask| {
            extractor
                .check_subset(&indicators(mask), &mut Indefinite)
                .expect("no budget")
                .is_satisfiable()
        })
        .collect()
}

fn is_mus(feasible: &[bool], subset: u32) -> bool {
    !feasible[subset as usize]
        && (0..NUM_SOFT)
            .filter(|id| subset & (1u32 << id) != 0)
            .all(|id| feasible[(subset & !(1u32 << id)) as usize])
}

fn is_mss(feasible: &[bool], subset: u32) -> bool {
    feasible[subset as usize]
        && (0..NUM_SOFT)
            .filter(|id| subset & (1u32 << id) == 0)
            .all(|id| !feasible[(subset | (1u32 << id)) as usize])
}

#[test]
fn shrink_finds_the_conflict_between_two_values() {
    init_logging();
    let mut extractor = two_values();
    let all = extractor.model().indicators().collect::<Vec<_>>();

    let conflict = extractor.shrink(&all, &mut Indefinite).expect("conflict");

    assert_eq!(conflict, all);
}

#[test]
fn grow_from_nothing_keeps_a_single_value() {
    let mut extractor = two_values();

    let satisfiable = extractor.grow(&[], &mut Indefinite).expect("satisfiable");
    let correction = extractor
        .minimal_correction_subset(&[], &mut Indefinite)
        .expect("correction");

    assert_eq!(satisfiable.len(), 1);
    assert_eq!(correction.len(), 1);
    assert_ne!(satisfiable, correction);
}

#[test]
fn diagnosis_removing_the_first_constraint_restores_feasibility() {
    let mut session = DiagnosisSession::basic(two_values());
    let mut choices = ScriptedChoice::always(Choice::Remove(0));

    let result = session.run(&mut choices, &mut Indefinite);

    assert!(matches!(result, DiagnosisResult::Feasible { .. }));
    let removed = result
        .removed()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();
    assert_eq!(removed, vec!["x == 1"]);
    assert_eq!(
        choices.presented(),
        &[vec!["x == 1".to_owned(), "x == 2".to_owned()]]
    );
}

#[test]
fn diagnosis_can_be_aborted() {
    let mut session = DiagnosisSession::basic(two_values());

    let result = session.run(&mut ScriptedChoice::new([Choice::Abort]), &mut Indefinite);

    assert!(matches!(result, DiagnosisResult::Aborted { .. }));
    assert!(result.removed().is_empty());
    assert_eq!(session.remaining().len(), 2);
}

#[test]
fn optimal_conflict_avoids_expensive_constraints() {
    init_logging();
    let mut oracle = FiniteDomainOracle::default();
    let x = oracle.new_variable(0, 3, "x");
    let soft = vec![
        constraints::less_than_or_equals([(1, x.clone())], 1),
        constraints::greater_than_or_equals([(1, x.clone())], 2),
        constraints::not_equals([(1, x)], 3),
    ];
    let mut extractor =
        ConflictExtractor::new(oracle, vec![], soft, ExtractorOptions::default()).expect("model");

    let mut optimizer = HittingSetOptimizer::new(
        ClauseOracle::default(),
        vec![1, 1, 5],
        HittingSetOptions::default(),
    );
    let mut conflict = optimizer
        .optimal_mus(&mut extractor, &mut Indefinite)
        .expect("conflict");
    conflict.sort();

    assert_eq!(conflict, vec![Indicator::new(0), Indicator::new(1)]);
    assert_eq!(optimizer.weight(&conflict), 2);
}

#[test]
fn shrink_gives_a_minimal_subset_of_every_unsatisfiable_seed() {
    let feasible = brute_force();

    for seed in (0..=full_mask()).filter(|&seed| !feasible[seed as usize]) {
        let mut extractor = overlapping_conflicts(ExtractorOptions::default());
        let conflict = extractor
            .shrink(&indicators(seed), &mut Indefinite)
            .expect("the seed is unsatisfiable");

        let conflict = mask(&conflict);
        assert_eq!(conflict & !seed, 0, "the conflict is not a subset of the seed");
        assert!(is_mus(&feasible, conflict), "{conflict:#b} is not minimal");
    }
}

#[test]
fn shrink_rejects_satisfiable_seeds() {
    let mut extractor = overlapping_conflicts(ExtractorOptions::default());

    assert_eq!(
        extractor.shrink(&indicators(0b00110), &mut Indefinite),
        Err(ExplanationError::NoConflict)
    );
}

#[test]
fn grow_gives_a_maximal_superset_of_every_satisfiable_seed() {
    let feasible = brute_force();

    for order in [ShrinkOrder::ConstraintText, ShrinkOrder::InputOrder, ShrinkOrder::Shuffled] {
        for seed in (0..=full_mask()).filter(|&seed| feasible[seed as usize]) {
            let mut extractor = overlapping_conflicts(ExtractorOptions {
                shrink_order: order,
                ..ExtractorOptions::default()
            });
            let satisfiable = extractor
                .grow(&indicators(seed), &mut Indefinite)
                .expect("the seed is satisfiable");

            let satisfiable = mask(&satisfiable);
            assert_eq!(seed & !satisfiable, 0, "the result does not contain the seed");
            assert!(is_mss(&feasible, satisfiable), "{satisfiable:#b} is not maximal");
        }
    }
}

#[test]
fn minimal_correction_subset_is_the_complement_of_a_maximal_satisfiable_subset() {
    let feasible = brute_force();
    let mut extractor = overlapping_conflicts(ExtractorOptions {
        use_cache: false,
        ..ExtractorOptions::default()
    });

    let correction = mask(
        &extractor
            .minimal_correction_subset(&[], &mut Indefinite)
            .expect("correction"),
    );

    assert!(is_mss(&feasible, full_mask() & !correction));
}

#[test]
fn enumeration_finds_every_mus_and_mss_exactly_once() {
    init_logging();
    let feasible = brute_force();
    let mut mapper = SubsetMapper::new(
        overlapping_conflicts(ExtractorOptions::default()),
        ClauseOracle::default(),
    );

    let subsets = mapper.enumerate(&mut Indefinite).expect("no budget");

    let mut conflicts = BTreeSet::new();
    let mut satisfiable = BTreeSet::new();
    for subset in &subsets {
        let is_new = match subset {
            LatticeSubset::Mus(conflict) => conflicts.insert(mask(conflict)),
            LatticeSubset::Mss(subset) => satisfiable.insert(mask(subset)),
        };
        assert!(is_new, "{subset:?} was reported twice");
    }

    let expected_conflicts = (0..=full_mask())
        .filter(|&subset| is_mus(&feasible, subset))
        .collect::<BTreeSet<_>>();
    let expected_satisfiable = (0..=full_mask())
        .filter(|&subset| is_mss(&feasible, subset))
        .collect::<BTreeSet<_>>();
    assert_eq!(conflicts, expected_conflicts);
    assert_eq!(satisfiable, expected_satisfiable);
    assert!(mapper.next_subset(&mut Indefinite).expect("no budget").is_none());
}

#[test]
fn optimal_mus_has_minimum_weight_for_every_correction_strategy() {
    let feasible = brute_force();
    let minimum = (0..=full_mask())
        .filter(|&subset| !feasible[subset as usize])
        .map(weight)
        .min()
        .expect("the model is infeasible");

    for correction_strategy in [CorrectionStrategy::Greedy, CorrectionStrategy::Grow] {
        let mut extractor = overlapping_conflicts(ExtractorOptions::default());
        let mut optimizer = HittingSetOptimizer::new(
            ClauseOracle::default(),
            WEIGHTS.to_vec(),
            HittingSetOptions {
                correction_strategy,
            },
        );

        let conflict = optimizer
            .optimal_mus(&mut extractor, &mut Indefinite)
            .expect("conflict");

        assert!(!feasible[mask(&conflict) as usize]);
        assert_eq!(optimizer.weight(&conflict), minimum);
        assert_eq!(weight(mask(&conflict)), minimum);
    }
}

#[test]
fn optimal_mus_meets_the_exactly_one_restriction() {
    let feasible = brute_force();
    let restricted = 0b00011;
    let minimum = (0..=full_mask())
        .filter(|&subset| !feasible[subset as usize])
        .filter(|&subset| (subset & restricted).count_ones() == 1)
        .map(weight)
        .min();

    let mut extractor = overlapping_conflicts(ExtractorOptions::default());
    let mut optimizer = HittingSetOptimizer::new(
        ClauseOracle::default(),
        WEIGHTS.to_vec(),
        HittingSetOptions::default(),
    );
    optimizer.exactly_one_of(&indicators(restricted));

    match optimizer.optimal_mus(&mut extractor, &mut Indefinite) {
        Ok(conflict) => {
            let conflict = mask(&conflict);
            assert!(!feasible[conflict as usize]);
            assert_eq!((conflict & restricted).count_ones(), 1);
            assert_eq!(Some(weight(conflict)), minimum);
        }
        Err(error) => {
            assert_eq!(error, ExplanationError::NoConflict);
            assert_eq!(minimum, None);
        }
    }
}

#[test]
fn optimal_correction_subset_has_minimum_weight() {
    let feasible = brute_force();
    let minimum = (0..=full_mask())
        .filter(|&correction| feasible[(full_mask() & !correction) as usize])
        .map(weight)
        .min()
        .expect("the empty set of constraints is satisfiable");

    let mut extractor = overlapping_conflicts(ExtractorOptions::default());
    let mut optimizer = CorrectionSetOptimizer::new(ClauseOracle::default(), WEIGHTS.to_vec());

    let correction = optimizer
        .optimal_correction_subset(&mut extractor, &mut Indefinite)
        .expect("correction");

    assert!(feasible[(full_mask() & !mask(&correction)) as usize]);
    assert_eq!(optimizer.weight(&correction), minimum);
}

#[test]
fn diagnosis_always_ends_feasible_when_every_choice_is_a_removal() {
    let feasible = brute_force();

    for index in 0..2 {
        let mut session =
            DiagnosisSession::basic(overlapping_conflicts(ExtractorOptions::default()));
        let mut choices = ScriptedChoice::always(Choice::Remove(index));

        let result = session.run(&mut choices, &mut Indefinite);

        assert!(matches!(result, DiagnosisResult::Feasible { .. }));
        assert!(feasible[mask(session.remaining()) as usize]);
        assert!(session.removed().len() <= NUM_SOFT as usize);
        assert_eq!(choices.presented().len(), session.removed().len());
    }
}

#[test]
fn optimal_diagnosis_presents_minimum_weight_conflicts() {
    let mut session = DiagnosisSession::optimal(
        overlapping_conflicts(ExtractorOptions::default()),
        HittingSetOptimizer::new(
            ClauseOracle::default(),
            WEIGHTS.to_vec(),
            HittingSetOptions::default(),
        ),
    );

    let result = session.run(&mut ScriptedChoice::always(Choice::Remove(0)), &mut Indefinite);

    assert!(matches!(result, DiagnosisResult::Feasible { .. }));
}

#[test]
fn infeasible_hard_constraints_give_an_empty_conflict() {
    let mut oracle = FiniteDomainOracle::default();
    let x = oracle.new_variable(0, 3, "x");
    let hard = vec![
        constraints::less_than_or_equals([(1, x.clone())], 1),
        constraints::greater_than_or_equals([(1, x.clone())], 2),
    ];
    let soft = vec![constraints::not_equals([(1, x)], 0)];
    let mut extractor =
        ConflictExtractor::new(oracle, hard, soft, ExtractorOptions::default()).expect("model");

    assert_eq!(
        extractor.check_subset(&[], &mut Indefinite),
        Ok(Feasibility::Unsatisfiable(vec![]))
    );
    assert_eq!(
        extractor.shrink(&[Indicator::new(0)], &mut Indefinite),
        Ok(vec![])
    );

    let mut session = DiagnosisSession::basic(extractor);
    let result = session.run(&mut ScriptedChoice::always(Choice::Remove(0)), &mut Indefinite);
    assert!(matches!(
        result,
        DiagnosisResult::Failed {
            error: ExplanationError::HardConstraintsInfeasible,
            ..
        }
    ));
}

#[test]
fn soft_constraints_must_be_reifiable() {
    let mut oracle = FiniteDomainOracle::default();
    let x = oracle.new_variable(0, 1, "x");
    let y = oracle.new_variable(0, 1, "y");
    let soft = vec![
        constraints::equals([(1, x.clone())], 0),
        constraints::all_different([x, y]),
    ];

    let result = ConflictExtractor::new(oracle, vec![], soft, ExtractorOptions::default());

    assert!(matches!(
        result,
        Err(ExplanationError::NotReifiable { index: 1, .. })
    ));
}

#[test]
fn all_different_can_be_a_hard_constraint() {
    let mut oracle = FiniteDomainOracle::default();
    let x = oracle.new_variable(0, 1, "x");
    let y = oracle.new_variable(0, 1, "y");
    let hard = vec![constraints::all_different([x.clone(), y.clone()])];
    let soft = vec![
        constraints::equals([(1, x)], 0),
        constraints::equals([(1, y)], 0),
    ];
    let mut extractor =
        ConflictExtractor::new(oracle, hard, soft, ExtractorOptions::default()).expect("model");
    let all = extractor.model().indicators().collect::<Vec<_>>();

    assert_eq!(extractor.shrink(&all, &mut Indefinite), Ok(all));
}

#[test]
fn exhausted_budget_is_a_timeout() {
    let mut extractor = overlapping_conflicts(ExtractorOptions::default());
    let all = extractor.model().indicators().collect::<Vec<_>>();
    let mut budget = TimeBudget::starting_now(Duration::ZERO);

    assert_eq!(
        extractor.shrink(&all, &mut budget),
        Err(ExplanationError::Timeout)
    );
    assert_eq!(
        extractor.grow(&[], &mut budget),
        Err(ExplanationError::Timeout)
    );
}
