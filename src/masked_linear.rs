use burn::module::Param;
use burn::prelude::*;
use burn::tensor::{Distribution, Tensor, backend::Backend};
use log::debug;

use crate::error::BibdError;
use crate::mask::{MaskOrientation, generate_mask, generate_mask_checked};

/// Configuration for a [`MaskedLinear`] layer.
///
/// `[d_output, d_input]` must equal `orientation.shape(order)`; this is
/// checked by [`MaskedLinearConfig::init`].
#[derive(Config, Debug)]
pub struct MaskedLinearConfig {
    pub d_input: usize,
    pub d_output: usize,
    /// BIBD order `r`.
    pub order: usize,
    #[config(default = "MaskOrientation::PointsFromBlocks")]
    pub orientation: MaskOrientation,
    /// Reject orders that are not prime powers instead of building an
    /// unbalanced mask.
    #[config(default = "true")]
    pub require_prime_power: bool,
    /// Kaiming gain: weights are drawn from `N(0, init_gain / sqrt(d_input))`.
    #[config(default = "std::f64::consts::SQRT_2")]
    pub init_gain: f64,
}

impl MaskedLinearConfig {
    /// Config whose dimensions match the mask of `order` in `orientation`.
    pub fn for_order(order: usize, orientation: MaskOrientation) -> Self {
        let [d_output, d_input] = orientation.shape(order);
        Self::new(d_input, d_output, order).with_orientation(orientation)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<MaskedLinear<B>, BibdError> {
        let mask = if self.require_prime_power {
            generate_mask_checked(self.order)?
        } else {
            generate_mask(self.order)?
        };

        let expected = self.orientation.shape(self.order);
        let actual = [self.d_output, self.d_input];
        if expected != actual {
            return Err(BibdError::ShapeMismatch { expected, actual });
        }

        let std = self.init_gain / (self.d_input as f64).sqrt();
        let weight = Tensor::random(actual, Distribution::Normal(0.0, std), device);

        debug!(
            "MaskedLinear order={} {:?}: {} -> {}, std={std:.4}",
            self.order, self.orientation, self.d_input, self.d_output
        );

        Ok(MaskedLinear {
            weight: Param::from_tensor(weight),
            mask: mask.to_tensor(self.orientation, device),
            order: self.order,
        })
    }
}

/// Linear layer whose connectivity is fixed by a BIBD incidence mask.
///
/// The mask is a plain tensor field, so burn treats it as a module constant:
/// optimizers never see it and it is left out of records. It is rebuilt from
/// `order` by [`MaskedLinearConfig::init`].
#[derive(Module, Debug)]
pub struct MaskedLinear<B: Backend> {
    /// Dense weight `[d_output, d_input]`. Entries where the mask is zero
    /// have no effect on the output and receive zero gradient.
    pub weight: Param<Tensor<B, 2>>,
    mask: Tensor<B, 2>,
    order: usize,
}

impl<B: Backend> MaskedLinear<B> {
    /// # Shapes
    ///   - Input [batch_size, d_input]
    ///   - Output [batch_size, d_output]
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        input.matmul(self.effective_weight().transpose())
    }

    /// `weight ⊙ mask`, computed into a fresh tensor.
    pub fn effective_weight(&self) -> Tensor<B, 2> {
        self.weight.val() * self.mask.clone()
    }

    pub fn mask(&self) -> Tensor<B, 2> {
        self.mask.clone()
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn orientation(&self) -> MaskOrientation {
        // r² never equals r(r+1), so the output width identifies the side.
        let [d_output, _] = self.mask.dims();
        if d_output == self.order * self.order {
            MaskOrientation::PointsFromBlocks
        } else {
            MaskOrientation::BlocksFromPoints
        }
    }

    pub fn d_input(&self) -> usize {
        self.mask.dims()[1]
    }

    pub fn d_output(&self) -> usize {
        self.mask.dims()[0]
    }

    /// Number of live weights: `r(r+1)` blocks of `r` points each.
    pub fn connection_count(&self) -> usize {
        self.order * self.order * (self.order + 1)
    }
}
