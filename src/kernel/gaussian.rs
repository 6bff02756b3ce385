use super::Kernel;

/// The RBF / Gaussian kernel `K(x, y) = exp(-gamma * ||x - y||^2)`.
#[derive(Debug, Clone)]
pub struct GaussianKernel {
    gamma: f64,
    components: Vec<(f64, Vec<f64>)>,
}

impl GaussianKernel {
    /// Build a Gaussian kernel with the given `gamma` bandwidth parameter.
    pub fn new(gamma: f64) -> GaussianKernel {
        GaussianKernel {
            gamma,
            components: Vec::new(),
        }
    }

    fn squared_distance(x: &[f64], y: &[f64]) -> f64 {
        x.iter()
            .zip(y.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }
}

impl Kernel<Vec<f64>> for GaussianKernel {
    fn compute(&self, x: &Vec<f64>, y: &Vec<f64>) -> f64 {
        (-self.gamma * GaussianKernel::squared_distance(x, y)).exp()
    }

    fn compute_sum(&self, x: &Vec<f64>) -> f64 {
        self.components
            .iter()
            .map(|(w, c)| w * self.compute(c, x))
            .sum()
    }

    fn add_component(&mut self, weight: f64, x: Vec<f64>) {
        self.components.push((weight, x));
    }

    fn clear_components(&mut self) {
        self.components.clear();
    }

    fn has_components(&self) -> bool {
        !self.components.is_empty()
    }

    fn fork_new(&self) -> GaussianKernel {
        GaussianKernel::new(self.gamma)
    }
}
