use super::Kernel;

/// `K(x, y) = x · y`, the plain dot-product kernel.
///
/// Reference implementation, grounded on
/// `examples/03hcl-smartcore/src/math/distance/euclidian.rs`'s style of
/// small free-standing vector-math helpers.
#[derive(Debug, Clone, Default)]
pub struct LinearKernel {
    components: Vec<(f64, Vec<f64>)>,
}

impl LinearKernel {
    /// A fresh kernel with no accumulated components.
    pub fn new() -> LinearKernel {
        LinearKernel {
            components: Vec::new(),
        }
    }

    fn dot(x: &[f64], y: &[f64]) -> f64 {
        x.iter().zip(y.iter()).map(|(a, b)| a * b).sum()
    }
}

impl Kernel<Vec<f64>> for LinearKernel {
    fn compute(&self, x: &Vec<f64>, y: &Vec<f64>) -> f64 {
        LinearKernel::dot(x, y)
    }

    fn compute_sum(&self, x: &Vec<f64>) -> f64 {
        self.components
            .iter()
            .map(|(w, c)| w * LinearKernel::dot(c, x))
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

    fn fork_new(&self) -> LinearKernel {
        LinearKernel::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dot_product() {
        let k = LinearKernel::new();
        assert_eq!(k.compute(&vec![1.0, 2.0], &vec![3.0, 4.0]), 11.0);
    }

    #[test]
    fn compute_sum_accumulates_weighted_components() {
        let mut k = LinearKernel::new();
        assert!(!k.has_components());
        k.add_component(0.5, vec![1.0, 0.0]);
        k.add_component(-0.25, vec![0.0, 1.0]);
        assert!(k.has_components());
        assert_eq!(k.compute_sum(&vec![2.0, 2.0]), 0.5 * 2.0 + (-0.25) * 2.0);
    }

    #[test]
    fn fork_has_no_components() {
        let mut k = LinearKernel::new();
        k.add_component(1.0, vec![1.0, 1.0]);
        let forked = k.fork_new();
        assert!(!forked.has_components());
    }
}
