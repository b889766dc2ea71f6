use crate::anchoring::Augment;
use crate::constraints::{LexiconConstraints, UniformConstraints};
use crate::errors::TrellisError;
use crate::featurizer::IndexedFeaturizer;
use crate::label::LabelIndex;
use crate::model::CrfModel;
use crate::sequence::TaggedSequence;
use crate::test_utils::{FixedConstraints, FixedSurface, WordIdFeaturizer};

fn bio_index() -> LabelIndex<&'static str> {
    // B = 0, I = 1, O = 2, <S> = 3
    LabelIndex::new(["B", "I", "O"], "<S>")
}

fn bias_surface(n: usize) -> FixedSurface {
    FixedSurface::new(vec![vec![0]; n], vec![vec![0]; n])
}

#[test]
fn test_uniform_zero_weights() {
    let label_index = bio_index();
    let constraints = UniformConstraints::new(&label_index);
    let corpus =
        vec![TaggedSequence::new(vec!["B", "I", "O"], vec!["a", "b", "c"], "0").unwrap()];
    let featurizer =
        IndexedFeaturizer::build(constraints, bias_surface(3), &label_index, &corpus).unwrap();
    let model = CrfModel::with_initial_weights(label_index, featurizer, |_| 0.0).unwrap();

    let anchoring = model.inference().anchor(&["a", "b", "c"]).unwrap();
    let marginal = anchoring.marginal().unwrap();

    // Three legal tags per position, all paths tied: Z = 3^3.
    assert!((marginal.log_partition() - 27f64.ln()).abs() < 1e-9);
    for pos in 0..3 {
        for tag in 0..3 {
            assert!((marginal.position_marginal(pos, tag) - 1.0 / 3.0).abs() < 1e-9);
        }
        // The start sentinel is never emitted at a real position.
        assert_eq!(marginal.position_marginal(pos, 3), 0.0);
    }
}

#[test]
fn test_constrained_zero_weights() {
    let label_index = bio_index();
    let constraints = FixedConstraints::new(vec![vec![0], vec![1, 2]]);
    let corpus = vec![TaggedSequence::new(vec!["B", "I"], vec!["a", "b"], "0").unwrap()];
    let featurizer =
        IndexedFeaturizer::build(constraints, bias_surface(2), &label_index, &corpus).unwrap();
    let model = CrfModel::with_initial_weights(label_index, featurizer, |_| 0.0).unwrap();

    let anchoring = model.inference().anchor(&["a", "b"]).unwrap();
    let marginal = anchoring.marginal().unwrap();

    assert!((marginal.log_partition() - 2f64.ln()).abs() < 1e-9);
    assert!((marginal.position_marginal(0, 0) - 1.0).abs() < 1e-9);
    assert_eq!(marginal.position_marginal(0, 1), 0.0);
    assert!((marginal.position_marginal(1, 1) - 0.5).abs() < 1e-9);
    assert!((marginal.position_marginal(1, 2) - 0.5).abs() < 1e-9);
}

#[test]
fn test_deterministic_viterbi_matches_gold_score() {
    let label_index = bio_index();
    let constraints = UniformConstraints::new(&label_index);
    // One distinct surface feature per position.
    let surface = FixedSurface::new(vec![vec![1], vec![2]], vec![vec![0], vec![0]]);
    let corpus = vec![TaggedSequence::new(vec!["B", "I"], vec!["a", "b"], "0").unwrap()];
    let featurizer =
        IndexedFeaturizer::build(constraints, surface, &label_index, &corpus).unwrap();

    // Reward B at position 0 and I at position 1, making (B, I) the unique
    // best path with score 4.
    let f_b0 = featurizer.label_word()[1][&0];
    let f_i1 = featurizer.label_word()[2][&1];
    let mut weights = vec![0.0; featurizer.num_features() as usize];
    weights[f_b0 as usize] = 2.0;
    weights[f_i1 as usize] = 2.0;
    let model = CrfModel::new(label_index, featurizer, weights).unwrap();
    let inference = model.inference();

    let anchoring = inference.anchor(&["a", "b"]).unwrap();
    let path = anchoring.viterbi().unwrap();
    assert_eq!(path.tags(), &[0, 1]);
    assert!((path.score() - 4.0).abs() < 1e-9);

    let gold = anchoring.gold_marginal(&[0, 1]).unwrap();
    assert!((gold.log_partition() - path.score()).abs() < 1e-9);

    let (labels, score) = inference.decode(&anchoring).unwrap();
    assert_eq!(labels, vec!["B", "I"]);
    assert!((score - 4.0).abs() < 1e-9);
}

#[test]
fn test_empty_constraint_at_anchor_time() {
    let label_index = bio_index();
    // Known words constrain their tags; unknown words have no tags at all.
    let lexicon = LexiconConstraints::from_entries(
        [("a".to_string(), vec![0]), ("b".to_string(), vec![1, 2])],
        vec![],
    );
    let surface = WordIdFeaturizer::new(["a", "b"]);
    let corpus = vec![TaggedSequence::new(
        vec!["B", "I"],
        vec!["a".to_string(), "b".to_string()],
        "0",
    )
    .unwrap()];
    let featurizer = IndexedFeaturizer::build(lexicon, surface, &label_index, &corpus).unwrap();
    let model = CrfModel::with_initial_weights(label_index, featurizer, |_| 0.0).unwrap();

    let result = model
        .inference()
        .anchor(&["a".to_string(), "zzz".to_string()]);
    assert!(matches!(result, Err(TrellisError::EmptyConstraint(_))));
}

#[test]
fn test_posterior_decode_differs_from_viterbi() {
    // A = 0, B = 1, <S> = 2
    let label_index = LabelIndex::new(["A", "B"], "<S>");
    let constraints = UniformConstraints::new(&label_index);
    // No unary features: the model is driven purely by label bigrams.
    let surface = FixedSurface::new(vec![vec![], vec![]], vec![vec![0], vec![0]]);
    let corpus = vec![TaggedSequence::new(vec!["A", "B"], vec!["x", "y"], "0").unwrap()];
    let featurizer =
        IndexedFeaturizer::build(constraints, surface, &label_index, &corpus).unwrap();

    // Path masses: (A,A) = 2.4, (A,B) = 2.4, (B,A) = 0.01, (B,B) = 4.
    // Viterbi picks (B,B), yet position 0 puts 4.8/8.81 on A.
    let pair = featurizer.label_pair();
    let f_sa = pair[0][&(2 * 3)];
    let f_ba = pair[0][&3];
    let f_bb = pair[0][&4];
    let mut weights = vec![0.0; featurizer.num_features() as usize];
    weights[f_sa as usize] = 2.4f64.ln();
    weights[f_ba as usize] = 0.01f64.ln();
    weights[f_bb as usize] = 4f64.ln();
    let model = CrfModel::new(label_index, featurizer, weights).unwrap();
    let inference = model.inference();

    let anchoring = inference.anchor(&["x", "y"]).unwrap();
    let path = anchoring.viterbi().unwrap();
    assert_eq!(path.tags(), &[1, 1]);

    let marginal = anchoring.marginal().unwrap();
    assert_eq!(inference.annotate(&marginal), vec!["A", "B"]);
    assert!(marginal.position_marginal(0, 0) > marginal.position_marginal(0, 1));
}

#[test]
fn test_single_tag_universe() {
    // X = 0, <S> = 1: exactly one legal sequence.
    let label_index = LabelIndex::new(["X"], "<S>");
    let constraints = UniformConstraints::new(&label_index);
    let corpus =
        vec![TaggedSequence::new(vec!["X", "X", "X"], vec!["a", "b", "c"], "0").unwrap()];
    let featurizer =
        IndexedFeaturizer::build(constraints, bias_surface(3), &label_index, &corpus).unwrap();
    let model = CrfModel::with_initial_weights(label_index, featurizer, |f| f64::from(f) - 0.5)
        .unwrap();

    let anchoring = model.inference().anchor(&["a", "b", "c"]).unwrap();
    let path = anchoring.viterbi().unwrap();
    assert_eq!(path.tags(), &[0, 0, 0]);

    let marginal = anchoring.marginal().unwrap();
    let gold = anchoring.gold_marginal(&[0, 0, 0]).unwrap();
    assert!((marginal.log_partition() - gold.log_partition()).abs() < 1e-9);
    assert!((path.score() - gold.log_partition()).abs() < 1e-9);
}

#[test]
fn test_gold_outside_constraints_is_missing_features() {
    let label_index = bio_index();
    let constraints = FixedConstraints::new(vec![vec![0], vec![1]]);
    let corpus = vec![TaggedSequence::new(vec!["B", "I"], vec!["a", "b"], "0").unwrap()];
    let featurizer =
        IndexedFeaturizer::build(constraints, bias_surface(2), &label_index, &corpus).unwrap();
    let model = CrfModel::with_initial_weights(label_index, featurizer, |_| 0.0).unwrap();
    let inference = model.inference();

    let anchoring = inference.anchor(&["a", "b"]).unwrap();
    // The gold path emits I at position 0, which the constraints forbid.
    let gold = anchoring.gold_marginal(&[1, 1]).unwrap();
    assert_eq!(gold.log_partition(), f64::NEG_INFINITY);

    let mut counts = inference.empty_counts();
    let result = inference.accumulate(&gold, &mut counts, -1.0);
    assert!(matches!(result, Err(TrellisError::MissingFeatures(_))));
}

struct ForbidAll;

impl Augment for ForbidAll {
    fn score_transition(&self, _pos: usize, _prev: u32, _cur: u32) -> f64 {
        f64::NEG_INFINITY
    }
}

#[test]
fn test_infeasible_augment() {
    let label_index = bio_index();
    let constraints = UniformConstraints::new(&label_index);
    let corpus = vec![TaggedSequence::new(vec!["B", "I"], vec!["a", "b"], "0").unwrap()];
    let featurizer =
        IndexedFeaturizer::build(constraints, bias_surface(2), &label_index, &corpus).unwrap();
    let model = CrfModel::with_initial_weights(label_index, featurizer, |_| 0.0).unwrap();

    let anchoring = model
        .inference()
        .anchor_with(&["a", "b"], ForbidAll)
        .unwrap();
    assert!(matches!(
        anchoring.marginal(),
        Err(TrellisError::Infeasible(_))
    ));
    assert!(matches!(
        anchoring.viterbi(),
        Err(TrellisError::Infeasible(_))
    ));
}

#[test]
fn test_empty_sentence() {
    let label_index = bio_index();
    let constraints = UniformConstraints::new(&label_index);
    let corpus = vec![TaggedSequence::new(vec!["B"], vec!["a"], "0").unwrap()];
    let featurizer =
        IndexedFeaturizer::build(constraints, bias_surface(1), &label_index, &corpus).unwrap();
    let model = CrfModel::with_initial_weights(label_index, featurizer, |_| 0.0).unwrap();

    let anchoring = model.inference().anchor::<&str>(&[]).unwrap();
    let marginal = anchoring.marginal().unwrap();
    assert_eq!(marginal.log_partition(), 0.0);
    let path = anchoring.viterbi().unwrap();
    assert!(path.tags().is_empty());
    assert_eq!(path.score(), 0.0);
}
