//! Sequential model: an ordered pipeline of layers
//!
//! `Sequential` wires each layer's output shape into the next layer's input
//! shape, runs forward passes front to back and backward passes back to
//! front, and drives one optimisation step by handing every owned parameter
//! to an [`Optimizer`] under a stable [`ParamId`].

use log::{debug, info};

use crate::error::{NetError, NetResult};
use crate::layers::Layer;
use crate::losses::{mean_loss, Loss};
use crate::optimizers::{Optimizer, ParamId};
use crate::tensor::{check_conforms, Mode, Shape, Tensor};
use crate::utils::SimpleRng;

/// An ordered sequence of layers sharing one input shape.
///
/// # Example
///
/// ```
/// use neural_layers::layers::{DenseLayer, SigmoidLayer};
/// use neural_layers::model::Sequential;
/// use neural_layers::utils::SimpleRng;
///
/// let mut model = Sequential::new(vec![2]);
/// model.add(DenseLayer::new(4)).add(SigmoidLayer::default());
/// model.build(&mut SimpleRng::new(42)).unwrap();
/// assert_eq!(model.output_shape(), Some(&[4][..]));
/// assert_eq!(model.params(), 2 * 4 + 4);
/// ```
pub struct Sequential {
    input_shape: Shape,
    layers: Vec<Box<dyn Layer>>,
    built: bool,
}

impl Sequential {
    /// Creates an empty model.
    ///
    /// # Arguments
    ///
    /// * `input_shape` - Shape of one sample, without the batch axis
    pub fn new(input_shape: Shape) -> Self {
        Self {
            input_shape,
            layers: Vec::new(),
            built: false,
        }
    }

    /// Append a layer. The model must be (re)built before the next pass.
    ///
    /// # Returns
    ///
    /// The model, so calls can be chained.
    ///
    /// # Example
    ///
    /// ```
    /// use neural_layers::layers::{DenseLayer, ReLULayer};
    /// use neural_layers::model::Sequential;
    /// use neural_layers::utils::SimpleRng;
    ///
    /// let mut model = Sequential::new(vec![3]);
    /// model.add(DenseLayer::new(4)).add(ReLULayer::default());
    /// model.build(&mut SimpleRng::new(7)).unwrap();
    ///
    /// model.add(DenseLayer::new(2));
    /// assert_eq!(model.output_shape(), None);
    /// model.build(&mut SimpleRng::new(7)).unwrap();
    /// assert_eq!(model.output_shape(), Some(&[2][..]));
    /// ```
    pub fn add<L: Layer + 'static>(&mut self, layer: L) -> &mut Self {
        self.add_boxed(Box::new(layer))
    }

    pub fn add_boxed(&mut self, layer: Box<dyn Layer>) -> &mut Self {
        self.layers.push(layer);
        self.built = false;
        self
    }

    pub fn input_shape(&self) -> &[usize] {
        &self.input_shape
    }

    /// Output shape of the last layer, once built.
    pub fn output_shape(&self) -> Option<&[usize]> {
        if !self.built {
            return None;
        }
        match self.layers.last() {
            Some(layer) => layer.output_shape(),
            None => Some(self.input_shape.as_slice()),
        }
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Propagate shapes through the pipeline and initialize every layer in order.
    pub fn build(&mut self, rng: &mut SimpleRng) -> NetResult<()> {
        self.built = false;
        let mut shape = self.input_shape.clone();
        for layer in self.layers.iter_mut() {
            layer.set_input_shape(&shape);
            layer.init(rng)?;
            shape = layer
                .output_shape()
                .ok_or_else(|| NetError::uninitialized(layer.display(), "init"))?
                .to_vec();
        }
        self.built = true;

        info!(
            "Built model: {} layers, {} parameters, {:?} -> {:?}",
            self.layers.len(),
            self.params(),
            self.input_shape,
            shape
        );
        for line in self.summary().lines() {
            info!("{}", line);
        }
        Ok(())
    }

    /// Total trainable scalars across all layers.
    pub fn params(&self) -> usize {
        self.layers.iter().map(|layer| layer.params()).sum()
    }

    /// One line per layer: index, display name, output shape and parameter count.
    pub fn summary(&self) -> String {
        let mut out = format!("{:<4} {:<16} {:<20} {:>10}\n", "#", "Layer", "Output", "Params");
        for (i, layer) in self.layers.iter().enumerate() {
            let output = match layer.output_shape() {
                Some(shape) => format!("{:?}", shape),
                None => "?".to_string(),
            };
            out.push_str(&format!(
                "{:<4} {:<16} {:<20} {:>10}\n",
                i,
                layer.display(),
                output,
                layer.params()
            ));
        }
        out.push_str(&format!("Total params: {}", self.params()));
        out
    }

    fn require_built(&self, operation: &'static str) -> NetResult<()> {
        if self.built {
            Ok(())
        } else {
            Err(NetError::uninitialized("Sequential", operation))
        }
    }

    pub fn forward(&mut self, x: &Tensor, mode: Mode) -> NetResult<Tensor> {
        self.require_built("forward")?;
        check_conforms(x, &self.input_shape)?;
        let mut out = x.clone();
        for layer in self.layers.iter_mut() {
            out = layer.forward(&out, mode)?;
        }
        Ok(out)
    }

    /// Feed `dy` through the layers in reverse; returns the gradient for the model input.
    pub fn backward(&mut self, dy: &Tensor) -> NetResult<Tensor> {
        self.require_built("backward")?;
        let mut grad = dy.clone();
        for layer in self.layers.iter_mut().rev() {
            grad = layer.backward(&grad)?;
        }
        Ok(grad)
    }

    /// Forward pass in inference mode.
    pub fn predict(&mut self, x: &Tensor) -> NetResult<Tensor> {
        self.forward(x, Mode::Inference)
    }

    /// One optimisation step on a batch; returns the mean loss before the update.
    ///
    /// The reported loss is the mean over every element of the output, so the
    /// output gradient is `func_prime` divided by that same element count. The
    /// parameter gradients handed to the optimizer are then exactly the
    /// gradients of the returned value.
    ///
    /// # Arguments
    ///
    /// * `x` - Input batch conforming to the model's input shape
    /// * `y` - Targets shaped like the model output
    /// * `loss` - Objective to minimise
    /// * `optimizer` - Update rule applied to every owned parameter
    ///
    /// # Returns
    ///
    /// The mean loss of the forward pass, computed before parameters change.
    pub fn train_step(
        &mut self,
        x: &Tensor,
        y: &Tensor,
        loss: &dyn Loss,
        optimizer: &mut dyn Optimizer,
    ) -> NetResult<f32> {
        let y_pred = self.forward(x, Mode::Training)?;
        let loss_value = mean_loss(loss, y, &y_pred)?;

        let elements = y_pred.len().max(1);
        let dy = loss.func_prime(y, &y_pred)? / elements as f32;
        self.backward(&dy)?;
        self.apply_gradients(optimizer)?;

        let batch = y_pred.shape().first().copied().unwrap_or(0);
        debug!("{} = {:.6} (batch of {})", loss.name(), loss_value, batch);
        Ok(loss_value)
    }

    /// Hand every owned parameter and its latest gradient to `optimizer`.
    pub fn apply_gradients(&mut self, optimizer: &mut dyn Optimizer) -> NetResult<()> {
        for (index, layer) in self.layers.iter_mut().enumerate() {
            if let Some(trainable) = layer.as_trainable_mut() {
                for (slot, (param, grad)) in trainable.parameters_and_gradients().into_iter().enumerate() {
                    optimizer.update_params(ParamId::new(index, slot), param, grad)?;
                }
            }
        }
        Ok(())
    }
}
