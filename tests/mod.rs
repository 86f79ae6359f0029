use nalgebra::DMatrix;

use discrim::classify::{Classifier, ForestConfig, LinearDiscriminant, RandomForest};
use discrim::encode::EncodingSpec;
use discrim::label::{self, Label};
use discrim::pipeline::{self, FittedPipeline, PipelineConfig};
use discrim::score::ConfusionMatrix;
use discrim::table::{Dataset, Schema};

const EPS : f64 = 1e-9;

const SCHEMA : &str = "\
back,land,neptune,normal,satan.\n\
duration: continuous.\n\
protocol_type: symbolic.\n\
src_bytes: continuous.\n\
dst_bytes: continuous.\n\
flag: symbolic.\n";

/// Three cleanly separated classes over the numeric block, with nominal
/// columns whose levels vary enough that no dummy column is degenerate.
fn table(trailing_dot : bool) -> String {
    let protos = ["tcp", "udp", "icmp"];
    let flags = ["SF", "S0"];
    let mut rows = String::new();
    for (base, raw) in [(0.0, "normal"), (10.0, "neptune"), (20.0, "satan")].iter() {
        for i in 0..8 {
            let jitter = 0.1 * i as f64;
            let label = if trailing_dot {
                format!("{}.", raw)
            } else {
                raw.to_string()
            };
            rows.push_str(&format!(
                "{},{},{},{},{},{}\n",
                base + jitter,
                protos[i % 3],
                base * 10. + jitter,
                base * 3. + 2. * jitter,
                flags[i % 2],
                label
            ));
        }
    }
    rows
}

fn config() -> PipelineConfig {
    PipelineConfig {
        numeric_components : 2,
        dummy_components : 2,
        exclude : Vec::new()
    }
}

#[test]
fn two_point_scenario() {
    // Train on one "normal" and one "neptune" point; the test point repeats
    // the attack coordinates with the test-set trailing dot on its label.
    let features = DMatrix::from_row_slice(2, 2, &[0., 0., 5., 5.]);
    let labels = vec![
        label::normalize("normal").unwrap(),
        label::normalize("neptune").unwrap()
    ];
    let mut lda = LinearDiscriminant::new();
    lda.train(&features, &labels).unwrap();

    let test = DMatrix::from_row_slice(1, 2, &[5., 5.]);
    let predicted = lda.predict(&test).unwrap();
    let actual = vec![label::normalize("neptune.").unwrap()];
    assert_eq!(actual, vec![Label::Dos]);
    assert_eq!(predicted, actual);

    let cm = ConfusionMatrix::new(&predicted, &actual).unwrap();
    assert!((cm.weighted_f1() - 100.).abs() < EPS);
}

#[test]
fn reference_level_scenario() {
    // A two-level column fit on training data yields exactly one dummy
    // column; a test batch with only the reference level keeps that column,
    // all zeros.
    let train = [("protocol_type".to_string(), vec!["tcp".to_string(), "udp".to_string()])];
    let spec = EncodingSpec::fit(&train);
    assert_eq!(spec.column_names(), vec!["protocol_type_udp"]);

    let test = [("protocol_type".to_string(), vec!["tcp".to_string(); 4])];
    let encoded = spec.transform(&test).unwrap();
    assert_eq!(encoded.ncols(), 1);
    assert_eq!(encoded.nrows(), 4);
    assert!(encoded.iter().all(|x| *x == 0. ));
}

#[test]
fn end_to_end_both_models() {
    let schema = Schema::parse(SCHEMA).unwrap();
    let train = Dataset::from_csv(&table(false), &schema).unwrap();
    let test = Dataset::from_csv(&table(true), &schema).unwrap();

    let pipeline = FittedPipeline::fit(&train, config()).unwrap();
    let features = pipeline.features(&train).unwrap();
    assert_eq!(features.ncols(), 4);
    assert_eq!(features.nrows(), 24);

    let mut lda = LinearDiscriminant::new();
    let eval = pipeline::evaluate(&mut lda, &pipeline, &train, &test).unwrap();
    assert!((eval.weighted_f1 - 100.).abs() < EPS);

    let mut forest = RandomForest::new(ForestConfig { n_trees : 25, ..Default::default() });
    let eval = pipeline::evaluate(&mut forest, &pipeline, &train, &test).unwrap();
    assert!((eval.weighted_f1 - 100.).abs() < EPS);
    assert!(forest.importance().is_some());
}

#[test]
fn transform_replay_is_bit_identical() {
    let schema = Schema::parse(SCHEMA).unwrap();
    let train = Dataset::from_csv(&table(false), &schema).unwrap();
    let pipeline = FittedPipeline::fit(&train, config()).unwrap();
    let a = pipeline.features(&train).unwrap();
    let b = pipeline.features(&train).unwrap();
    assert_eq!(a, b);
}

#[test]
fn pipeline_survives_json_round_trip() {
    let schema = Schema::parse(SCHEMA).unwrap();
    let train = Dataset::from_csv(&table(false), &schema).unwrap();
    let pipeline = FittedPipeline::fit(&train, config()).unwrap();

    let json = serde_json::to_string(&pipeline).unwrap();
    let restored : FittedPipeline = serde_json::from_str(&json).unwrap();
    assert_eq!(
        pipeline.features(&train).unwrap(),
        restored.features(&train).unwrap()
    );
}

#[test]
fn unknown_test_label_aborts_the_load() {
    let schema = Schema::parse(SCHEMA).unwrap();
    let mut rows = table(false);
    rows.push_str("1.0,tcp,2.0,3.0,SF,slowloris\n");
    assert!(matches!(
        Dataset::from_csv(&rows, &schema),
        Err(discrim::Error::UnknownLabel(s)) if s == "slowloris"
    ));
}

#[test]
fn excluded_column_never_reaches_the_encoder() {
    let schema = Schema::parse(SCHEMA).unwrap();
    let train = Dataset::from_csv(&table(false), &schema).unwrap();
    let config = PipelineConfig {
        numeric_components : 2,
        dummy_components : 1,
        exclude : vec!["protocol_type".to_string()]
    };
    let pipeline = FittedPipeline::fit(&train, config).unwrap();

    // Only the flag column is encoded (one dummy), so the dummy branch has a
    // single component and the final matrix is 2 + 1 wide.
    let features = pipeline.features(&train).unwrap();
    assert_eq!(features.ncols(), 3);
}

#[test]
fn explained_variance_sums_to_one() {
    let schema = Schema::parse(SCHEMA).unwrap();
    let train = Dataset::from_csv(&table(false), &schema).unwrap();
    let pipeline = FittedPipeline::fit(&train, config()).unwrap();
    for reduction in [pipeline.numeric_reduction(), pipeline.dummy_reduction()].iter() {
        assert!((reduction.explained_variance().sum() - 1.).abs() < EPS);
        let cumulative = reduction.cumulative_variance();
        assert!((cumulative[cumulative.len() - 1] - 1.).abs() < EPS);
    }
}
