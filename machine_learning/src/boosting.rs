use ndarray::{Array2, ArrayView2};
use rayon::prelude::*;
use serde::Serialize;

use crate::{
    BackendKind, MlErr, Result,
    artifact::Artifact,
    backend::{check_features, check_fit_inputs},
    ops::{argmax, softmax_rows},
    tree::{
        self, Node, Tree,
        regression::{GradientTreeParams, fit_gradient_tree},
    },
    weights::{balanced_class_weights, sample_weights},
};

/// Identifies the layout of the portable json dump.
pub const PORTABLE_FORMAT: &str = "room-presence-gbt/1";

/// Hessians never drop below this, so leaves with saturated probabilities stay finite.
const MIN_HESSIAN: f32 = 1e-16;

#[derive(Debug, Clone, PartialEq)]
pub struct BoostParams {
    pub n_rounds: usize,
    pub tree: GradientTreeParams,
    pub balanced: bool,
}

impl Default for BoostParams {
    fn default() -> Self {
        Self {
            n_rounds: 100,
            tree: GradientTreeParams {
                max_depth: 6,
                lambda: 1.0,
                min_child_weight: 1.0,
                learning_rate: 0.1,
            },
            balanced: true,
        }
    }
}

/// Multiclass gradient boosting over a softmax objective. Every round grows one gradient tree
/// per class, trees are stored round after round.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientBoosting {
    trees: Vec<Tree>,
    n_features: usize,
    n_classes: usize,
}

impl GradientBoosting {
    pub fn fit(
        x: ArrayView2<f32>,
        y: &[usize],
        n_classes: usize,
        params: &BoostParams,
    ) -> Result<Self> {
        check_fit_inputs(x, y, n_classes)?;

        let n = x.nrows();
        let class_weights = match params.balanced {
            true => balanced_class_weights(y, n_classes),
            false => vec![1.0; n_classes],
        };
        let weights = sample_weights(y, &class_weights);

        let mut margins = Array2::<f32>::zeros((n, n_classes));
        let mut trees = Vec::with_capacity(params.n_rounds * n_classes);

        for round in 0..params.n_rounds {
            let mut proba = margins.clone();
            softmax_rows(&mut proba);

            let round_trees: Vec<Tree> = (0..n_classes)
                .into_par_iter()
                .map(|class| {
                    let (grad, hess): (Vec<f32>, Vec<f32>) = (0..n)
                        .map(|i| {
                            let p = proba[[i, class]];
                            let target = if y[i] == class { 1.0 } else { 0.0 };
                            let w = weights[i];
                            ((p - target) * w, (2.0 * p * (1.0 - p)).max(MIN_HESSIAN) * w)
                        })
                        .unzip();

                    fit_gradient_tree(x, &grad, &hess, &params.tree)
                })
                .collect();

            for (class, tree) in round_trees.iter().enumerate() {
                for (i, row) in x.outer_iter().enumerate() {
                    margins[[i, class]] += tree.leaf(row)[0];
                }
            }

            if margins.iter().any(|m| !m.is_finite()) {
                return Err(MlErr::Numerical(format!(
                    "boosting diverged at round {round}"
                )));
            }

            trees.extend(round_trees);
        }

        log::debug!(rounds = params.n_rounds, classes = n_classes; "fitted gradient boosting");

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

    /// The raw per class scores, before the softmax.
    pub fn predict_margins(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        check_features(x, self.n_features)?;

        let mut margins = Array2::zeros((x.nrows(), self.n_classes));
        for (i, row) in x.outer_iter().enumerate() {
            for (t, tree) in self.trees.iter().enumerate() {
                margins[[i, t % self.n_classes]] += tree.leaf(row)[0];
            }
        }

        Ok(margins)
    }

    pub fn predict_proba(&self, x: ArrayView2<f32>) -> Result<Array2<f32>> {
        let mut margins = self.predict_margins(x)?;
        softmax_rows(&mut margins);
        Ok(margins)
    }

    pub fn predict(&self, x: ArrayView2<f32>) -> Result<Vec<usize>> {
        let margins = self.predict_margins(x)?;
        Ok(margins.outer_iter().map(|row| argmax(row.iter())).collect())
    }

    /// Total split gain per feature, normalized to add up to one.
    pub fn feature_importances(&self) -> Vec<f32> {
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            total
                .iter_mut()
                .zip(tree.importance())
                .for_each(|(t, i)| *t += i);
        }

        tree::normalize(&mut total);
        total
    }

    pub fn to_artifact(&self) -> Artifact {
        let mut artifact = Artifact::new(BackendKind::Boosted);
        artifact.set_meta("num_features", self.n_features);
        artifact.set_meta("num_classes", self.n_classes);
        tree::pack(&self.trees, 1, self.n_features, &mut artifact);
        artifact
    }

    pub fn from_artifact(artifact: &Artifact) -> Result<Self> {
        let n_features = artifact.meta_usize("num_features")?;
        let n_classes = artifact.meta_usize("num_classes")?;
        let trees = tree::unpack(artifact, 1, n_features)?;

        if n_classes == 0 || trees.is_empty() || trees.len() % n_classes != 0 {
            return Err(MlErr::Artifact(format!(
                "{} trees cannot be split evenly among {n_classes} classes",
                trees.len()
            )));
        }

        Ok(Self {
            trees,
            n_features,
            n_classes,
        })
    }

    /// Dumps the ensemble as plain json so it can be evaluated without this crate. The score of
    /// class `c` is the sum of the leaves reached in every tree whose `class` is `c`, and the
    /// probabilities are the softmax of those scores. `run_id` ties the dump to the training run
    /// that produced it.
    ///
    /// # Errors
    /// Returns `MlErr::Numerical` if any threshold or leaf is not finite.
    pub fn to_portable_json(&self, run_id: &str) -> Result<String> {
        let trees = self
            .trees
            .iter()
            .enumerate()
            .map(|(t, tree)| {
                let nodes = tree
                    .nodes()
                    .iter()
                    .map(|node| match node {
                        Node::Split {
                            feature,
                            threshold,
                            left,
                            right,
                        } if threshold.is_finite() => Ok(PortableNode::Split {
                            feature: *feature,
                            threshold: *threshold,
                            left: *left,
                            right: *right,
                        }),
                        Node::Leaf { value } if value.iter().all(|v| v.is_finite()) => {
                            Ok(PortableNode::Leaf { leaf: value[0] })
                        }
                        _ => Err(MlErr::Numerical(format!("tree {t} holds a non finite value"))),
                    })
                    .collect::<Result<Vec<_>>>()?;

                Ok(PortableTree {
                    class: t % self.n_classes,
                    nodes,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let model = PortableModel {
            format: PORTABLE_FORMAT,
            run_id,
            objective: "multi:softprob",
            num_class: self.n_classes,
            num_feature: self.n_features,
            trees,
        };

        serde_json::to_string_pretty(&model).map_err(|e| MlErr::Artifact(e.to_string()))
    }
}

#[derive(Serialize)]
struct PortableModel<'a> {
    format: &'static str,
    run_id: &'a str,
    objective: &'static str,
    num_class: usize,
    num_feature: usize,
    trees: Vec<PortableTree>,
}

#[derive(Serialize)]
struct PortableTree {
    class: usize,
    nodes: Vec<PortableNode>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum PortableNode {
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        leaf: f32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::blobs;

    fn quick() -> BoostParams {
        BoostParams {
            n_rounds: 15,
            ..Default::default()
        }
    }

    #[test]
    fn learns_separable_blobs() {
        let (x, y) = blobs(3, 20, 4, 5);
        let model = GradientBoosting::fit(x.view(), &y, 3, &quick()).unwrap();

        let predictions = model.predict(x.view()).unwrap();
        let correct = predictions.iter().zip(&y).filter(|(p, t)| p == t).count();

        assert!(correct as f32 / y.len() as f32 > 0.9);
        assert_eq!(model.trees.len(), 15 * 3);
    }

    #[test]
    fn probabilities_are_a_distribution() {
        let (x, y) = blobs(3, 10, 4, 2);
        let model = GradientBoosting::fit(x.view(), &y, 3, &quick()).unwrap();

        let proba = model.predict_proba(x.view()).unwrap();
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn artifact_predicts_the_same() {
        let (x, y) = blobs(2, 10, 4, 8);
        let model = GradientBoosting::fit(x.view(), &y, 2, &quick()).unwrap();

        let bytes = model.to_artifact().to_bytes().unwrap();
        let restored =
            GradientBoosting::from_artifact(&Artifact::from_bytes(&bytes).unwrap()).unwrap();

        assert_eq!(restored, model);
    }

    #[test]
    fn portable_dump_lists_every_tree() {
        let (x, y) = blobs(2, 10, 4, 4);
        let model = GradientBoosting::fit(x.view(), &y, 2, &quick()).unwrap();

        let json: serde_json::Value = serde_json::from_str(&model.to_portable_json("0badc0de").unwrap()).unwrap();

        assert_eq!(json["format"], PORTABLE_FORMAT);
        assert_eq!(json["run_id"], "0badc0de");
        assert_eq!(json["num_class"], 2);
        assert_eq!(json["trees"].as_array().unwrap().len(), 30);
        assert_eq!(json["trees"][1]["class"], 1);
    }

    #[test]
    fn non_finite_leaves_cannot_be_dumped() {
        let (x, y) = blobs(2, 5, 2, 4);
        let mut model = GradientBoosting::fit(x.view(), &y, 2, &quick()).unwrap();

        let mut artifact = model.to_artifact();
        let values = artifact.tensor("node_value").unwrap().clone();
        artifact.insert(
            "node_value",
            crate::artifact::Tensor::new(values.shape, vec![f32::NAN; values.data.len()]).unwrap(),
        );
        model = GradientBoosting::from_artifact(&artifact).unwrap();

        assert!(matches!(model.to_portable_json("r"), Err(MlErr::Numerical(_))));
    }
}
