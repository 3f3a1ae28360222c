use ndarray::{array, Array2};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use regtune::{
    ActivationType,
    FeedForwardLayer,
};

fn rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(17)
}

#[test]
fn test_layer_initialization() {
    let layer = FeedForwardLayer::new(
        3,  // inputs
        4,  // neurons
        ActivationType::ReLU,
        &mut rng(),
    ).unwrap();

    let params = layer.params();
    assert_eq!(params.inputs, 3);
    assert_eq!(params.neurons, 4);

    // weights are (neurons × inputs)
    assert_eq!(params.weights.dim(), (4, 3));
    assert_eq!(params.bias.len(), 4);
}

#[test]
fn test_zero_width_rejected() {
    assert!(FeedForwardLayer::new(0, 4, ActivationType::ReLU, &mut rng()).is_err());
    assert!(FeedForwardLayer::new(3, 0, ActivationType::ReLU, &mut rng()).is_err());
}

#[test]
fn test_forward_propagate() {
    let mut layer = FeedForwardLayer::new(3, 2, ActivationType::ReLU, &mut rng()).unwrap();

    let input = array![[1.0, 2.0, 3.0], [-1.0, 0.0, 0.5]];
    let output = layer.forward(&input);

    assert_eq!(output.dim(), (2, 2));
    // ReLU ensures non-negative
    assert!(output.iter().all(|&x| x >= 0.0));
    assert_eq!(output, layer.infer(&input));
}

#[test]
#[should_panic(expected = "Input size does not match layer's input size")]
fn test_forward_propagate_invalid_input_size() {
    let mut layer = FeedForwardLayer::new(3, 2, ActivationType::ReLU, &mut rng()).unwrap();

    let invalid_input = array![[1.0, 2.0]];
    layer.forward(&invalid_input);
}

#[test]
fn test_parameter_count() {
    let layer = FeedForwardLayer::new(3, 4, ActivationType::ReLU, &mut rng()).unwrap();

    assert_eq!(layer.params().parameter_count(), 3 * 4 + 4);
}

#[test]
fn test_reinitialize_weights() {
    let mut generator = rng();
    let mut layer = FeedForwardLayer::new(3, 4, ActivationType::ReLU, &mut generator).unwrap();
    let initial_weights = layer.params().weights.clone();

    layer.initialize_weights(&mut generator).unwrap();

    assert_ne!(
        layer.params().weights,
        initial_weights,
        "Weights should be different after reinitialization"
    );
}

#[test]
fn test_linear_backward_matches_hand_computation() {
    let mut layer = FeedForwardLayer::new(2, 1, ActivationType::Linear, &mut rng()).unwrap();
    layer.params_mut().weights = array![[0.5, -1.0]];

    let input = array![[1.0, 2.0], [3.0, 4.0]];
    layer.forward(&input);
    let grad_input = layer.backward(&array![[1.0], [2.0]]);

    // dW = dzᵀ · x, db = Σ dz, dx = dz · W
    assert_eq!(layer.params().weight_grads, array![[7.0, 10.0]]);
    assert_eq!(layer.params().bias_grads, array![3.0]);
    assert_eq!(grad_input, array![[0.5, -1.0], [1.0, -2.0]]);
}

#[test]
fn test_relu_backward_masks_inactive_units() {
    let mut layer = FeedForwardLayer::new(1, 2, ActivationType::ReLU, &mut rng()).unwrap();
    layer.params_mut().weights = array![[1.0], [-1.0]];

    layer.forward(&array![[2.0]]);
    layer.backward(&Array2::ones((1, 2)));

    // second unit has negative pre-activation, so no gradient flows to it
    assert_eq!(layer.params().weight_grads, array![[2.0], [0.0]]);
}
