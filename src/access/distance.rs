use crate::vault::FeatureVector;

/// Similarity function between a probe and a set of templates
///
/// Returns one distance per template, in template order. Smaller is closer.
pub trait DistanceFn {
    fn distances(&self, templates: &[FeatureVector], probe: &FeatureVector) -> Vec<f64>;
}

impl<F> DistanceFn for F
where
    F: Fn(&[FeatureVector], &FeatureVector) -> Vec<f64>,
{
    fn distances(&self, templates: &[FeatureVector], probe: &FeatureVector) -> Vec<f64> {
        self(templates, probe)
    }
}

/// L2 distance between face encodings
///
/// Templates whose length differs from the probe are infinitely far away.
#[derive(Debug, Clone, Copy, Default)]
pub struct EuclideanDistance;

impl EuclideanDistance {
    pub fn between(a: &FeatureVector, b: &FeatureVector) -> f64 {
        if a.len() != b.len() {
            return f64::INFINITY;
        }
        a.as_slice()
            .iter()
            .zip(b.as_slice())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }
}

impl DistanceFn for EuclideanDistance {
    fn distances(&self, templates: &[FeatureVector], probe: &FeatureVector) -> Vec<f64> {
        templates
            .iter()
            .map(|template| Self::between(template, probe))
            .collect()
    }
}
