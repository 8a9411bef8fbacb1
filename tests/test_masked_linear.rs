use bibd_rust::{BibdError, MaskOrientation, MaskedLinear, MaskedLinearConfig};
use burn::backend::{Autodiff, NdArray};
use burn::module::{Module, Param};
use burn::tensor::{Distribution, Tensor, TensorData, backend::Backend};

type TestBackend = NdArray<f32>;
type TestAutodiffBackend = Autodiff<TestBackend>;

fn values<B: Backend, const D: usize>(tensor: Tensor<B, D>) -> Vec<f32> {
    tensor.into_data().to_vec::<f32>().unwrap()
}

fn assert_close(actual: &[f32], expected: &[f32], tolerance: f32) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() <= tolerance, "index {i}: {a} != {e}");
    }
}

fn layer<B: Backend>(order: usize, device: &B::Device) -> MaskedLinear<B> {
    MaskedLinearConfig::for_order(order, MaskOrientation::PointsFromBlocks)
        .init(device)
        .unwrap()
}

#[test]
fn test_forward_shape() {
    let device = Default::default();
    let layer = layer::<TestBackend>(3, &device);
    let input = Tensor::<TestBackend, 2>::random([5, 12], Distribution::Normal(0.0, 1.0), &device);
    assert_eq!(layer.forward(input).dims(), [5, 9]);
}

#[test]
fn test_shape_mismatch_is_rejected() {
    let device = Default::default();
    let result = MaskedLinearConfig::new(5, 4, 2).init::<TestBackend>(&device);
    assert_eq!(
        result.unwrap_err(),
        BibdError::ShapeMismatch {
            expected: [4, 6],
            actual: [4, 5],
        }
    );

    // The generated orientation is only accepted when asked for.
    let result = MaskedLinearConfig::new(4, 6, 2).init::<TestBackend>(&device);
    assert!(matches!(result, Err(BibdError::ShapeMismatch { .. })));
    let result = MaskedLinearConfig::new(4, 6, 2)
        .with_orientation(MaskOrientation::BlocksFromPoints)
        .init::<TestBackend>(&device);
    assert!(result.is_ok());
}

#[test]
fn test_invalid_orders_are_rejected() {
    let device = Default::default();
    let result = MaskedLinearConfig::new(0, 0, 1).init::<TestBackend>(&device);
    assert_eq!(result.unwrap_err(), BibdError::InvalidOrder { order: 1 });

    let config = MaskedLinearConfig::for_order(6, MaskOrientation::PointsFromBlocks);
    assert_eq!(
        config.init::<TestBackend>(&device).unwrap_err(),
        BibdError::NotPrimePower { order: 6 }
    );
    assert!(
        config
            .with_require_prime_power(false)
            .init::<TestBackend>(&device)
            .is_ok()
    );
}

#[test]
fn test_masked_weights_are_inert() {
    let device = Default::default();
    let layer = layer::<TestBackend>(2, &device);
    let input = Tensor::<TestBackend, 2>::random([3, 6], Distribution::Normal(0.0, 1.0), &device);

    // Push every masked-out weight far away from its initial value.
    let outside = layer.mask().neg().add_scalar(1.0);
    let mut perturbed = layer.clone();
    perturbed.weight = Param::from_tensor(layer.weight.val() + outside * 100.0);

    let expected = values(layer.forward(input.clone()));
    let actual = values(perturbed.forward(input));
    assert_close(&actual, &expected, 1e-5);
}

#[test]
fn test_unmasked_weights_are_live() {
    let device = Default::default();
    let layer = layer::<TestBackend>(2, &device);
    let input = Tensor::<TestBackend, 2>::ones([1, 6], &device);

    let mut perturbed = layer.clone();
    perturbed.weight = Param::from_tensor(layer.weight.val() + layer.mask());

    // Each point output sees r + 1 = 3 blocks.
    let base = values(layer.forward(input.clone()));
    let shifted = values(perturbed.forward(input));
    let expected: Vec<f32> = base.iter().map(|v| v + 3.0).collect();
    assert_close(&shifted, &expected, 1e-5);
}

#[test]
fn test_forward_is_idempotent() {
    let device = Default::default();
    let layer = layer::<TestBackend>(3, &device);
    let input = Tensor::<TestBackend, 2>::random([4, 12], Distribution::Normal(0.0, 1.0), &device);
    let first = values(layer.forward(input.clone()));
    let second = values(layer.forward(input));
    assert_eq!(first, second);
}

#[test]
fn test_forward_does_not_mutate_weight() {
    let device = Default::default();
    let layer = layer::<TestBackend>(3, &device);
    let before = values(layer.weight.val());
    let input = Tensor::<TestBackend, 2>::random([2, 12], Distribution::Normal(0.0, 1.0), &device);
    let _ = layer.forward(input);
    assert_eq!(values(layer.weight.val()), before);
}

#[test]
fn test_gradients_follow_the_mask() {
    let device = Default::default();
    let layer = layer::<TestAutodiffBackend>(3, &device);
    let [d_output, d_input] = [9, 12];
    let batch = 4;

    let x: Vec<f32> = (0..batch * d_input).map(|i| ((i * 7) % 11) as f32 / 5.0 - 1.0).collect();
    let c: Vec<f32> = (0..batch * d_output).map(|i| ((i * 5) % 13) as f32 / 6.0 - 1.0).collect();

    let input = Tensor::<TestAutodiffBackend, 2>::from_data(
        TensorData::new(x.clone(), [batch, d_input]),
        &device,
    )
    .require_grad();
    let coefficients = Tensor::<TestAutodiffBackend, 2>::from_data(
        TensorData::new(c.clone(), [batch, d_output]),
        &device,
    );

    // loss = Σ c ⊙ (x · (W ⊙ M)ᵀ), so dL/dy = c.
    let loss = (layer.forward(input.clone()) * coefficients).sum();
    let grads = loss.backward();

    let weight_grad = values(layer.weight.grad(&grads).unwrap());
    let input_grad = values(input.grad(&grads).unwrap());
    let mask = values(layer.mask());
    let effective = values(layer.effective_weight());

    // Dense linear-layer gradient: cᵀ · x.
    let mut dense = vec![0.0f32; d_output * d_input];
    for o in 0..d_output {
        for i in 0..d_input {
            dense[o * d_input + i] = (0..batch).map(|b| c[b * d_output + o] * x[b * d_input + i]).sum();
        }
    }
    for (idx, &m) in mask.iter().enumerate() {
        if m == 0.0 {
            assert_eq!(weight_grad[idx], 0.0, "masked entry {idx} received gradient");
        } else {
            assert!((weight_grad[idx] - dense[idx]).abs() < 1e-4, "entry {idx}");
        }
    }

    // Input gradient: c · (W ⊙ M).
    let mut expected_input = vec![0.0f32; batch * d_input];
    for b in 0..batch {
        for i in 0..d_input {
            expected_input[b * d_input + i] = (0..d_output)
                .map(|o| c[b * d_output + o] * effective[o * d_input + i])
                .sum();
        }
    }
    assert_close(&input_grad, &expected_input, 1e-4);
}

#[test]
fn test_mask_is_not_recorded() {
    let device = Default::default();
    let config = MaskedLinearConfig::for_order(3, MaskOrientation::PointsFromBlocks);
    let trained = config.init::<TestBackend>(&device).unwrap();
    let input = Tensor::<TestBackend, 2>::random([2, 12], Distribution::Normal(0.0, 1.0), &device);

    // The mask does not count towards the trainable parameters.
    assert_eq!(trained.num_params(), 9 * 12);

    let record = trained.clone().into_record();
    let restored = config.init::<TestBackend>(&device).unwrap().load_record(record);

    assert_eq!(values(restored.mask()), values(trained.mask()));
    assert_close(
        &values(restored.forward(input.clone())),
        &values(trained.forward(input)),
        1e-6,
    );
}
