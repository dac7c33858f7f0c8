use burn::{
    config::Config,
    module::Module,
    nn::{Linear, LinearConfig, ReLU},
    tensor::{activation::softmax, backend::Backend, Tensor},
};

/// Feed-forward yield-class classifier: two hidden layers, one logit per class.
#[derive(Module, Debug)]
pub struct Classifier<B: Backend> {
    input: Linear<B>,
    hidden: Linear<B>,
    output: Linear<B>,
    activation: ReLU,
}

#[derive(Config, Debug)]
pub struct ClassifierConfig {
    pub input_size: usize,
    pub num_classes: usize,
    #[config(default = 64)]
    pub hidden_size: usize,
    #[config(default = 32)]
    pub hidden_size_2: usize,
}

impl ClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Classifier<B> {
        Classifier {
            input: LinearConfig::new(self.input_size, self.hidden_size).init(device),
            hidden: LinearConfig::new(self.hidden_size, self.hidden_size_2).init(device),
            output: LinearConfig::new(self.hidden_size_2, self.num_classes).init(device),
            activation: ReLU::new(),
        }
    }

    pub fn init_with<B: Backend>(&self, record: ClassifierRecord<B>) -> Classifier<B> {
        Classifier {
            input: LinearConfig::new(self.input_size, self.hidden_size)
                .init_with(record.input),
            hidden: LinearConfig::new(self.hidden_size, self.hidden_size_2)
                .init_with(record.hidden),
            output: LinearConfig::new(self.hidden_size_2, self.num_classes)
                .init_with(record.output),
            activation: ReLU::new(),
        }
    }

    /// Declared input shape, batch dimension left open.
    pub fn input_shape(&self) -> [Option<usize>; 2] {
        [None, Some(self.input_size)]
    }
}

impl<B: Backend> Classifier<B> {
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.input.forward(features);
        let x = self.activation.forward(x);

        let x = self.hidden.forward(x);
        let x = self.activation.forward(x);

        self.output.forward(x)
    }

    /// Class probabilities per row.
    pub fn predict_proba(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        softmax(self.forward(features), 1)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use burn::{
        backend::{ndarray::NdArrayDevice, NdArray},
        tensor::{Data, Shape},
    };

    use super::*;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_probabilities_sum_to_one() {
        let device = NdArrayDevice::Cpu;
        let model = ClassifierConfig::new(5, 3).init::<TestBackend>(&device);

        let features = Tensor::<TestBackend, 2>::from_data(
            Data::new(vec![0.1f32, -0.4, 1.2, 0.0, 3.0], Shape::new([1, 5])).convert(),
            &device,
        );
        let probs = model.predict_proba(features);
        assert_eq!(probs.dims(), [1, 3]);

        let values = probs.to_data().convert::<f32>().value;
        assert_relative_eq!(values.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_input_shape_leaves_batch_open() {
        let config = ClassifierConfig::new(7, 3);
        assert_eq!(config.input_shape(), [None, Some(7)]);
        assert_eq!(config.hidden_size, 64);
    }
}
