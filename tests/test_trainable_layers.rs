// Gradient checks for layers with hand-derived backward passes.
// Analytical gradients from backward() are compared against central
// finite differences of a scalar objective L = sum(y * w) with fixed weights w.

use approx::assert_relative_eq;
use neural_layers::kernels::Padding;
use neural_layers::layers::{
    AvgPool2DLayer, Conv2DLayer, DenseLayer, FlattenLayer, Layer, MaxPool2DLayer, TrainableLayer,
};
use neural_layers::tensor::{Mode, Tensor};
use neural_layers::utils::SimpleRng;

const H: f32 = 1e-2;

fn random_tensor(shape: &[usize], rng: &mut SimpleRng) -> Tensor {
    Tensor::from_shape_simple_fn(ndarray::IxDyn(shape), || rng.gen_range_f32(-1.0, 1.0))
}

fn element(t: &Tensor, idx: usize) -> f32 {
    t.iter().nth(idx).copied().unwrap()
}

fn nudge(t: &mut Tensor, idx: usize, delta: f32) {
    *t.iter_mut().nth(idx).unwrap() += delta;
}

fn objective(layer: &mut dyn Layer, x: &Tensor, w: &Tensor) -> f32 {
    let y = layer.forward(x, Mode::Inference).unwrap();
    (&y * w).sum()
}

fn build<L: Layer>(mut layer: L, input: &[usize], seed: u64) -> L {
    layer.set_input_shape(input);
    layer.init(&mut SimpleRng::new(seed)).unwrap();
    layer
}

/// Check dL/dx from backward against finite differences.
fn check_input_gradient(layer: &mut dyn Layer, x: &Tensor, rng: &mut SimpleRng, tol: f32) {
    let y = layer.forward(x, Mode::Training).unwrap();
    let w = random_tensor(y.shape(), rng);
    let dx = layer.backward(&w).unwrap();
    assert_eq!(dx.shape(), x.shape());

    for idx in 0..x.len() {
        let mut plus = x.clone();
        let mut minus = x.clone();
        nudge(&mut plus, idx, H);
        nudge(&mut minus, idx, -H);
        let numeric = (objective(layer, &plus, &w) - objective(layer, &minus, &w)) / (2.0 * H);
        let analytic = element(&dx, idx);
        assert!(
            (numeric - analytic).abs() < tol,
            "{} dx[{}]: numeric {} vs analytic {}",
            layer.display(),
            idx,
            numeric,
            analytic
        );
    }
}

/// Check every parameter gradient of a trainable layer against finite differences.
fn check_parameter_gradients<L: TrainableLayer>(layer: &mut L, x: &Tensor, rng: &mut SimpleRng) {
    let y = layer.forward(x, Mode::Training).unwrap();
    let w = random_tensor(y.shape(), rng);
    layer.backward(&w).unwrap();
    let grads: Vec<Tensor> = layer.gradients().into_iter().cloned().collect();
    assert_eq!(grads.len(), layer.parameters().len());

    for (slot, grad) in grads.iter().enumerate() {
        for idx in 0..grad.len() {
            nudge(layer.parameters_and_gradients()[slot].0, idx, H);
            let plus = objective(layer, x, &w);
            nudge(layer.parameters_and_gradients()[slot].0, idx, -2.0 * H);
            let minus = objective(layer, x, &w);
            nudge(layer.parameters_and_gradients()[slot].0, idx, H);

            let numeric = (plus - minus) / (2.0 * H);
            let analytic = element(grad, idx);
            assert!(
                (numeric - analytic).abs() < 2e-2,
                "{} slot {} [{}]: numeric {} vs analytic {}",
                layer.display(),
                slot,
                idx,
                numeric,
                analytic
            );
        }
    }
}

// ============================================================================
// Dense
// ============================================================================

mod dense_tests {
    use super::*;

    #[test]
    fn test_dense_input_gradient() {
        let mut rng = SimpleRng::new(1);
        let mut layer = build(DenseLayer::new(4), &[5], 42);
        let x = random_tensor(&[3, 5], &mut rng);
        check_input_gradient(&mut layer, &x, &mut rng, 2e-2);
    }

    #[test]
    fn test_dense_parameter_gradients() {
        let mut rng = SimpleRng::new(2);
        let mut layer = build(DenseLayer::new(3), &[4], 42);
        let x = random_tensor(&[2, 4], &mut rng);
        check_parameter_gradients(&mut layer, &x, &mut rng);
    }

    #[test]
    fn test_gradients_match_parameter_shapes() {
        let mut layer = build(DenseLayer::new(7), &[3], 42);
        let params: Vec<Vec<usize>> = layer.parameters().iter().map(|p| p.shape().to_vec()).collect();
        let grads: Vec<Vec<usize>> = layer.gradients().iter().map(|g| g.shape().to_vec()).collect();
        assert_eq!(params, vec![vec![3, 7], vec![7]]);
        assert_eq!(params, grads);

        // Gradients are zero until the first backward
        assert!(layer.gradients().iter().all(|g| g.iter().all(|&v| v == 0.0)));
        assert_eq!(layer.params(), 3 * 7 + 7);
        assert!(layer.as_trainable_mut().is_some());
    }
}

// ============================================================================
// Conv2D
// ============================================================================

mod conv2d_tests {
    use super::*;

    #[test]
    fn test_conv2d_valid_input_gradient() {
        let mut rng = SimpleRng::new(3);
        let mut layer = build(Conv2DLayer::new(2, (3, 3), Padding::Valid), &[5, 4, 2], 42);
        let x = random_tensor(&[2, 5, 4, 2], &mut rng);
        check_input_gradient(&mut layer, &x, &mut rng, 3e-2);
    }

    #[test]
    fn test_conv2d_same_input_gradient() {
        let mut rng = SimpleRng::new(4);
        let mut layer = build(Conv2DLayer::new(3, (3, 2), Padding::Same), &[4, 4, 1], 42);
        let x = random_tensor(&[1, 4, 4, 1], &mut rng);
        check_input_gradient(&mut layer, &x, &mut rng, 3e-2);
    }

    #[test]
    fn test_conv2d_parameter_gradients() {
        let mut rng = SimpleRng::new(5);
        let mut layer = build(Conv2DLayer::new(2, (2, 2), Padding::Same), &[3, 3, 2], 42);
        let x = random_tensor(&[2, 3, 3, 2], &mut rng);
        check_parameter_gradients(&mut layer, &x, &mut rng);
    }

    #[test]
    fn test_conv2d_parameter_count_follows_input_channels() {
        let layer = build(Conv2DLayer::new(16, (5, 5), Padding::Same), &[32, 32, 3], 1);
        assert_eq!(layer.params(), 5 * 5 * 3 * 16 + 16);
        assert_eq!(layer.output_shape(), Some(&[32, 32, 16][..]));
    }
}

// ============================================================================
// Pooling and Flatten
// ============================================================================

mod pooling_tests {
    use super::*;

    #[test]
    fn test_avg_pool_input_gradient() {
        let mut rng = SimpleRng::new(6);
        let mut layer = build(AvgPool2DLayer::new((2, 2)), &[4, 5, 2], 1);
        let x = random_tensor(&[2, 4, 5, 2], &mut rng);
        check_input_gradient(&mut layer, &x, &mut rng, 1e-2);
    }

    #[test]
    fn test_max_pool_input_gradient() {
        // Distinct, well-separated values keep every argmax stable under +/- H
        let mut rng = SimpleRng::new(7);
        let mut layer = build(MaxPool2DLayer::new((2, 2)), &[4, 4, 1], 1);
        let values: Vec<f32> = (0..16).map(|v| ((v * 7) % 16) as f32 * 0.5).collect();
        let x = Tensor::from_shape_vec(ndarray::IxDyn(&[1, 4, 4, 1]), values).unwrap();
        check_input_gradient(&mut layer, &x, &mut rng, 1e-2);
    }

    #[test]
    fn test_flatten_round_trip() {
        let mut layer = build(FlattenLayer::new(), &[3, 2, 2], 1);
        let mut rng = SimpleRng::new(8);
        let x = random_tensor(&[2, 3, 2, 2], &mut rng);
        let y = layer.forward(&x, Mode::Training).unwrap();
        assert_eq!(y.shape(), &[2, 12]);
        let dx = layer.backward(&y).unwrap();
        for (a, b) in dx.iter().zip(x.iter()) {
            assert_relative_eq!(*a, *b);
        }
    }
}
