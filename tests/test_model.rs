// End-to-end tests: Sequential models trained with each optimizer.

use neural_layers::kernels::Padding;
use neural_layers::layers::{
    Conv2DLayer, DenseLayer, FlattenLayer, MaxPool2DLayer, ReLULayer, SigmoidLayer, TanhLayer,
};
use neural_layers::losses::{BinaryCrossEntropy, Loss, MeanSquaredError};
use neural_layers::model::Sequential;
use neural_layers::optimizers::{Adam, Momentum, Optimizer, SGD};
use neural_layers::tensor::{from_vec, Mode, Tensor};
use neural_layers::utils::SimpleRng;
use neural_layers::NetError;

fn xor() -> (Tensor, Tensor) {
    let x = from_vec(&[4, 2], vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0, 1.0, 1.0]).unwrap();
    let y = from_vec(&[4, 1], vec![0.0, 1.0, 1.0, 0.0]).unwrap();
    (x, y)
}

fn xor_model(seed: u64) -> Sequential {
    let mut model = Sequential::new(vec![2]);
    model
        .add(DenseLayer::new(8))
        .add(TanhLayer::default())
        .add(DenseLayer::new(1))
        .add(SigmoidLayer::default());
    model.build(&mut SimpleRng::new(seed)).unwrap();
    model
}

fn train(model: &mut Sequential, loss: &dyn Loss, optimizer: &mut dyn Optimizer, epochs: usize) -> (f32, f32) {
    let (x, y) = xor();
    let first = model.train_step(&x, &y, loss, optimizer).unwrap();
    let mut last = first;
    for _ in 1..epochs {
        last = model.train_step(&x, &y, loss, optimizer).unwrap();
    }
    (first, last)
}

mod training_tests {
    use super::*;

    #[test]
    fn test_xor_adam_learns() {
        let mut model = xor_model(42);
        let mut adam = Adam::new(0.05, 0.9, 0.999, 1e-8);
        let (first, last) = train(&mut model, &MeanSquaredError, &mut adam, 1500);
        assert!(last < first, "loss went from {} to {}", first, last);
        assert!(last < 0.05, "final loss {}", last);

        let (x, y) = xor();
        let predictions = model.predict(&x).unwrap();
        for (p, t) in predictions.iter().zip(y.iter()) {
            assert!((p - t).abs() < 0.5, "predicted {} for target {}", p, t);
        }
    }

    #[test]
    fn test_xor_momentum_reduces_loss() {
        let mut model = xor_model(7);
        let mut momentum = Momentum::new(0.1, 0.9);
        let (first, last) = train(&mut model, &BinaryCrossEntropy, &mut momentum, 300);
        assert!(last < first, "loss went from {} to {}", first, last);
    }

    #[test]
    fn test_xor_sgd_reduces_loss() {
        let mut model = xor_model(3);
        let mut sgd = SGD::new(0.5);
        let (first, last) = train(&mut model, &MeanSquaredError, &mut sgd, 300);
        assert!(last < first, "loss went from {} to {}", first, last);
    }

    #[test]
    fn test_small_cnn_reduces_loss() {
        let mut model = Sequential::new(vec![6, 6, 1]);
        model
            .add(Conv2DLayer::new(3, (3, 3), Padding::Same))
            .add(ReLULayer::default())
            .add(MaxPool2DLayer::new((2, 2)))
            .add(FlattenLayer::new())
            .add(DenseLayer::new(1))
            .add(SigmoidLayer::default());
        model.build(&mut SimpleRng::new(11)).unwrap();

        // Bright left half vs bright right half
        let mut data = Vec::new();
        for sample in 0..2 {
            for _row in 0..6 {
                for col in 0..6 {
                    let left = col < 3;
                    data.push(if left == (sample == 0) { 1.0 } else { 0.0 });
                }
            }
        }
        let x = from_vec(&[2, 6, 6, 1], data).unwrap();
        let y = from_vec(&[2, 1], vec![1.0, 0.0]).unwrap();

        let mut adam = Adam::default();
        adam.set_learning_rate(0.01);
        let first = model.train_step(&x, &y, &BinaryCrossEntropy, &mut adam).unwrap();
        let mut last = first;
        for _ in 0..100 {
            last = model.train_step(&x, &y, &BinaryCrossEntropy, &mut adam).unwrap();
        }
        assert!(last < first, "loss went from {} to {}", first, last);
    }
}

mod contract_tests {
    use super::*;

    #[test]
    fn test_predict_before_build_fails() {
        let mut model = Sequential::new(vec![2]);
        model.add(DenseLayer::new(1));
        let (x, _) = xor();
        assert!(matches!(
            model.predict(&x),
            Err(NetError::UninitializedAccess { .. })
        ));
    }

    #[test]
    fn test_optimizer_state_is_per_parameter() {
        let mut model = xor_model(1);
        let mut adam = Adam::default();
        let (x, y) = xor();
        model.train_step(&x, &y, &MeanSquaredError, &mut adam).unwrap();
        model.train_step(&x, &y, &MeanSquaredError, &mut adam).unwrap();

        // Two dense layers (positions 0 and 2), two slots each
        use neural_layers::optimizers::ParamId;
        for layer in [0, 2] {
            for slot in 0..2 {
                assert_eq!(adam.steps(ParamId::new(layer, slot)), 2);
            }
        }
        assert_eq!(adam.steps(ParamId::new(1, 0)), 0);
    }

    #[test]
    fn test_training_mode_forward_then_backward() {
        let mut model = xor_model(5);
        let (x, _) = xor();
        let y = model.forward(&x, Mode::Training).unwrap();
        let dx = model.backward(&Tensor::ones(y.raw_dim())).unwrap();
        assert_eq!(dx.shape(), &[4, 2]);

        // Caches were consumed by the first backward
        assert!(model.backward(&Tensor::ones(y.raw_dim())).is_err());
    }

    #[test]
    fn test_target_shape_mismatch() {
        let mut model = xor_model(5);
        let (x, _) = xor();
        let wrong = Tensor::zeros(ndarray::IxDyn(&[4, 2]));
        let mut sgd = SGD::new(0.1);
        assert!(matches!(
            model.train_step(&x, &wrong, &MeanSquaredError, &mut sgd),
            Err(NetError::ShapeMismatch { .. })
        ));
    }
}
