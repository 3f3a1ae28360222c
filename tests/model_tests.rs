use ndarray::{Array1, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use regtune::{
    RegressionModel,
    TrainingMode,
    TrainingSchedule,
};

fn linear_problem() -> (Array2<f64>, Array1<f64>) {
    let x = Array2::from_shape_fn((40, 2), |(r, c)| ((r * (c + 1)) % 17) as f64 / 17.0);
    let y = x.column(0).mapv(|a| 3.0 * a) + x.column(1).mapv(|b| -b) + 1.0;
    (x, y)
}

#[test]
fn test_parameter_count_accuracy() {
    let test_cases = vec![
        // (10 -> 5) + (5 -> 1): 50 + 5 + 5 + 1
        (10, vec![5], 61),
        // (20 -> 16 -> 12 -> 8) + (8 -> 1): 320 + 16 + 192 + 12 + 96 + 8 + 8 + 1
        (20, vec![16, 12, 8], 653),
        // (13 -> 13 -> 9) + (9 -> 1): 169 + 13 + 117 + 9 + 9 + 1
        (13, vec![13, 9], 318),
    ];

    for (inputs, hidden, expected_params) in test_cases {
        let model = RegressionModel::new(inputs, &hidden, &mut ChaCha8Rng::seed_from_u64(0)).unwrap();

        assert_eq!(
            model.parameter_count(),
            expected_params,
            "Parameter count mismatch for model with {} inputs and {:?}",
            inputs,
            hidden
        );
    }
}

#[test]
fn test_inference() {
    let model = RegressionModel::new(2, &[3], &mut ChaCha8Rng::seed_from_u64(1)).unwrap();

    let input = Array2::from_shape_vec((4, 2), vec![1.0, 2.0, 0.0, 0.0, -1.0, 3.0, 0.5, 0.5]).unwrap();
    let output = model.predict(&input).unwrap();

    // one scalar per row
    assert_eq!(output.len(), 4);
    assert_eq!(output, model.predict(&input).unwrap());
}

#[test]
fn test_training_reduces_error() {
    let (x, y) = linear_problem();
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let mut model = RegressionModel::new(2, &[8], &mut rng).unwrap();
    let before = model.score(&x, &y).unwrap();

    let schedule = TrainingSchedule { epoch_count: 200, batch_size: 8, learning_rate: 0.01 };
    let loss = model.train(&x, &y, &schedule, TrainingMode::Continue, &mut rng).unwrap();

    assert!(loss.is_finite());
    assert!(model.score(&x, &y).unwrap() < before);
}

#[test]
fn test_seeded_training_is_reproducible() {
    let (x, y) = linear_problem();
    let schedule = TrainingSchedule { epoch_count: 5, batch_size: 7, learning_rate: 0.01 };

    let run = || {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut model = RegressionModel::new(2, &[6, 4], &mut rng).unwrap();
        model.train(&x, &y, &schedule, TrainingMode::Continue, &mut rng).unwrap();
        model.train(&x, &y, &schedule, TrainingMode::Continue, &mut rng).unwrap();
        model
    };

    let a = run();
    let b = run();
    for (la, lb) in a.layers.iter().zip(b.layers.iter()) {
        assert_eq!(la.params().weights, lb.params().weights);
        assert_eq!(la.params().bias, lb.params().bias);
    }
}

#[test]
fn test_continue_training_carries_weights() {
    let (x, y) = linear_problem();
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let mut model = RegressionModel::new(2, &[5], &mut rng).unwrap();
    let schedule = TrainingSchedule { epoch_count: 3, batch_size: 10, learning_rate: 0.01 };

    model.train(&x, &y, &schedule, TrainingMode::Continue, &mut rng).unwrap();
    let after_first = model.layers[0].params().weights.clone();
    model.train(&x, &y, &schedule, TrainingMode::Continue, &mut rng).unwrap();

    assert_ne!(model.layers[0].params().weights, after_first);
    assert_eq!(model.optimizer_steps(), 24);
}

#[test]
fn test_perfect_prediction_scores_zero() {
    let (x, _) = linear_problem();
    let model = RegressionModel::new(2, &[4], &mut ChaCha8Rng::seed_from_u64(5)).unwrap();
    let predictions = model.predict(&x).unwrap();

    assert_eq!(model.score(&x, &predictions).unwrap(), 0.0);
}

#[test]
fn test_score_rejects_mismatched_targets() {
    let (x, _) = linear_problem();
    let model = RegressionModel::new(2, &[4], &mut ChaCha8Rng::seed_from_u64(5)).unwrap();

    assert!(model.score(&x, &Array1::zeros(3)).is_err());
}
