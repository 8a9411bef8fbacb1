use burn::{
	nn::{Dropout, DropoutConfig, Linear, LinearConfig, Relu},
	prelude::*,
};

use crate::{
	error::BibdError,
	mask::MaskOrientation,
	masked_linear::{MaskedLinear, MaskedLinearConfig},
};

/// BibdBlock: expand the `r²` points onto their `r(r+1)` blocks, contract back
/// to points, and add the block input as a skip connection.
#[derive(Module, Debug)]
pub struct BibdBlock<B: Backend> {
	expand: MaskedLinear<B>,
	contract: MaskedLinear<B>,
	activation: Relu,
}

#[derive(Config, Debug)]
pub struct BibdBlockConfig {
	pub order: usize,
	#[config(default = "true")]
	pub require_prime_power: bool,
}

impl BibdBlockConfig {
	pub fn init<B: Backend>(&self, device: &B::Device) -> Result<BibdBlock<B>, BibdError> {
		let expand = MaskedLinearConfig::for_order(self.order, MaskOrientation::BlocksFromPoints)
			.with_require_prime_power(self.require_prime_power)
			.init(device)?;
		let contract = MaskedLinearConfig::for_order(self.order, MaskOrientation::PointsFromBlocks)
			.with_require_prime_power(self.require_prime_power)
			.init(device)?;
		Ok(BibdBlock {
			expand,
			contract,
			activation: Relu::new(),
		})
	}
}

impl<B: Backend> BibdBlock<B> {
	/// # Shapes
	///   - Input [batch_size, r²]
	///   - Output [batch_size, r²]
	pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
		let x = self.expand.forward(input.clone());
		let x = self.activation.forward(x);
		let x = self.contract.forward(x);
		self.activation.forward(x + input)
	}

	/// Width of the block input and output, `r²`.
	pub fn width(&self) -> usize {
		self.expand.d_input()
	}
}

#[derive(Module, Debug)]
pub struct BibdMlp<B: Backend> {
	stem: Linear<B>,
	blocks: Vec<BibdBlock<B>>,
	dropout: Dropout,
	activation: Relu,
	head: Linear<B>,
}

#[derive(Config, Debug)]
pub struct BibdMlpConfig {
	pub d_input: usize,
	pub num_classes: usize,
	pub order: usize,
	#[config(default = 1)]
	pub num_blocks: usize,
	#[config(default = "0.0")]
	pub dropout: f64,
	/// Forwarded to every [`BibdBlockConfig`].
	#[config(default = "true")]
	pub require_prime_power: bool,
}

impl BibdMlpConfig {
	/// Returns the initialized model.
	pub fn init<B: Backend>(&self, device: &B::Device) -> Result<BibdMlp<B>, BibdError> {
		let width = self.order * self.order;
		let block = BibdBlockConfig::new(self.order).with_require_prime_power(self.require_prime_power);
		let blocks = (0..self.num_blocks)
			.map(|_| block.init(device))
			.collect::<Result<Vec<_>, _>>()?;
		Ok(BibdMlp {
			stem: LinearConfig::new(self.d_input, width).init(device),
			blocks,
			dropout: DropoutConfig::new(self.dropout).init(),
			activation: Relu::new(),
			head: LinearConfig::new(width, self.num_classes).init(device),
		})
	}
}

impl<B: Backend> BibdMlp<B> {
	/// # Shapes
	///   - Input [batch_size, d_input]
	///   - Output [batch_size, num_classes]
	pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
		let mut x = self.activation.forward(self.stem.forward(input));
		for block in &self.blocks {
			x = block.forward(x);
		}
		let x = self.dropout.forward(x);
		self.head.forward(x)
	}

	pub fn num_blocks(&self) -> usize {
		self.blocks.len()
	}
}
