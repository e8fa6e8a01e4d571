use ndarray::{Array2, ArrayView2, Axis};
use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::prelude::*;

use crate::{
    BackendKind, MlErr, Result,
    artifact::Artifact,
    backend::{check_features, check_fit_inputs},
    ops::argmax,
    tree::{
        self, Tree,
        cart::{CartParams, fit_classifier},
    },
    weights::{balanced_class_weights, sample_weights},
};

#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub tree: CartParams,
    /// Weight samples inversely to their class frequency.
    pub balanced: bool,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            tree: CartParams {
                max_depth: 10,
                min_samples_split: 5,
                min_samples_leaf: 2,
                max_features: None,
            },
            balanced: true,
            seed: 42,
        }
    }
}

/// A bagged ensemble of classification trees, each seeing a bootstrap sample of the rows and
/// `sqrt(features)` candidate features per split.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    trees: Vec<Tree>,
    n_features: usize,
    n_classes: usize,
}

impl RandomForest {
    pub fn fit(
        x: ArrayView2<f32>,
        y: &[usize],
        n_classes: usize,
        params: &ForestParams,
    ) -> Result<Self> {
        check_fit_inputs(x, y, n_classes)?;

        let n = x.nrows();
        let class_weights = match params.balanced {
            true => balanced_class_weights(y, n_classes),
            false => vec![1.0; n_classes],
        };
        let base = sample_weights(y, &class_weights);

        let tree_params = CartParams {
            max_features: params
                .tree
                .max_features
                .or(Some(((x.ncols() as f32).sqrt() as usize).max(1))),
            ..params.tree.clone()
        };

        let trees = (0..params.n_trees.max(1))
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(params.seed.wrapping_add(t as u64));

                let mut weights = vec![0.0; n];
                for _ in 0..n {
                    weights[rng.random_range(0..n)] += 1.0;
                }
                weights.iter_mut().zip(&base).for_each(|(w, b)| *w *= b);

                fit_classifier(x, y, &weights, n_classes, &tree_params, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!(trees = trees.len(); "fitted random forest");

        Ok(Self {
            trees,
            n_features: x.ncols(),
            n_classes,
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    /// Averages the leaf class distributions of every tree.
    pub fn predict_proba(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_features(x, self.n_features)?;

        let mut proba = Array2::zeros((x.nrows(), self.n_classes));
        for (row, mut out) in x.axis_iter(Axis(0)).zip(proba.axis_iter_mut(Axis(0))) {
            for tree in &self.trees {
                out.iter_mut()
                    .zip(tree.leaf(row))
                    .for_each(|(o, p)| *o += p);
            }
        }

        proba /= self.trees.len() as f32;
        Ok(proba)
    }

    pub fn predict(&self, x: ArrayView2<f32>) -> Result<Vec<usize>> {
        let proba = self.predict_proba(x)?;
        Ok(proba.outer_iter().map(|row| argmax(row.iter())).collect())
    }

    /// Mean of the per tree normalized impurity decrease, normalized again to add up to one.
    pub fn feature_importances(&self) -> Vec<f32> {
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            let mut importance = tree.importance().to_vec();
            tree::normalize(&mut importance);
            total.iter_mut().zip(importance).for_each(|(t, i)| *t += i);
        }

        tree::normalize(&mut total);
        total
    }

    pub fn to_artifact(&self) -> Artifact {
        let mut artifact = Artifact::new(BackendKind::Forest);
        artifact.set_meta("num_features", self.n_features);
        artifact.set_meta("num_classes", self.n_classes);
        tree::pack(&self.trees, self.n_classes, self.n_features, &mut artifact);
        artifact
    }

    pub fn from_artifact(artifact: &Artifact) -> Result<Self> {
        let n_features = artifact.meta_usize("num_features")?;
        let n_classes = artifact.meta_usize("num_classes")?;
        let trees = tree::unpack(artifact, n_classes, n_features)?;
        if trees.is_empty() {
            return Err(MlErr::Artifact("the forest has no trees".into()));
        }

        Ok(Self {
            trees,
            n_features,
            n_classes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::blobs;

    #[test]
    fn learns_separable_blobs() {
        let (x, y) = blobs(3, 20, 4, 7);
        let forest = RandomForest::fit(x.view(), &y, 3, &ForestParams::default()).unwrap();

        let predictions = forest.predict(x.view()).unwrap();
        let correct = predictions.iter().zip(&y).filter(|(p, t)| p == t).count();

        assert!(correct as f32 / y.len() as f32 > 0.9);
    }

    #[test]
    fn fixed_seed_is_deterministic() {
        let (x, y) = blobs(2, 15, 4, 1);
        let params = ForestParams {
            n_trees: 10,
            ..Default::default()
        };

        let a = RandomForest::fit(x.view(), &y, 2, &params).unwrap();
        let b = RandomForest::fit(x.view(), &y, 2, &params).unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn importances_add_up_to_one() {
        let (x, y) = blobs(3, 10, 6, 3);
        let forest = RandomForest::fit(x.view(), &y, 3, &ForestParams::default()).unwrap();

        let importances = forest.feature_importances();

        assert_eq!(importances.len(), 6);
        assert!((importances.iter().sum::<f32>() - 1.0).abs() < 1e-4);
    }

    #[test]
    fn artifact_predicts_the_same() {
        let (x, y) = blobs(3, 10, 4, 9);
        let params = ForestParams {
            n_trees: 5,
            ..Default::default()
        };
        let forest = RandomForest::fit(x.view(), &y, 3, &params).unwrap();

        let bytes = forest.to_artifact().to_bytes().unwrap();
        let restored = RandomForest::from_artifact(&Artifact::from_bytes(&bytes).unwrap()).unwrap();

        assert_eq!(restored.predict(x.view()).unwrap(), forest.predict(x.view()).unwrap());
    }
}
