use std::num::NonZeroUsize;

use ndarray::ArrayView2;
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    BackendKind, MlErr, Result,
    arch::{
        Model, Sequential,
        activations::ActFn,
        layers::Layer,
        loss::CrossEntropy,
    },
    artifact::{Artifact, Tensor},
    backend::{check_features, check_fit_inputs},
    dataset::Dataset,
    initialization::dense_params,
    ops::argmax,
    optimization::{Adam, AdamParams},
    training::ModelTrainer,
};

#[derive(Debug, Clone, PartialEq)]
pub struct NetworkParams {
    pub hidden: Vec<usize>,
    pub dropout: f32,
    pub optimizer: AdamParams,
    pub epochs: usize,
    pub batch_size: NonZeroUsize,
    pub seed: u64,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self {
            hidden: vec![64, 32],
            dropout: 0.3,
            optimizer: AdamParams::default(),
            epochs: 100,
            batch_size: NonZeroUsize::new(32).unwrap_or(NonZeroUsize::MIN),
            seed: 42,
        }
    }
}

/// A feed forward classifier: dense ReLU layers followed by dropout, and a final dense layer
/// producing one logit per class.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    /// Input width, hidden widths and class count.
    layout: Vec<usize>,
    params: Vec<f32>,
}

fn dims(layout: &[usize]) -> Vec<(usize, usize)> {
    layout.windows(2).map(|w| (w[0], w[1])).collect()
}

fn build(layout: &[usize], dropout: f32, seed: u64) -> Sequential {
    let dims = dims(layout);
    let last = dims.len().saturating_sub(1);

    Sequential::new(dims.into_iter().enumerate().flat_map(|(i, dim)| {
        if i == last {
            vec![Layer::dense(dim, None)]
        } else {
            vec![
                Layer::dense(dim, Some(ActFn::relu())),
                Layer::dropout(dropout, seed.wrapping_add(i as u64)),
            ]
        }
    }))
}

impl Network {
    pub fn fit(
        x: ArrayView2<f32>,
        y: &[usize],
        n_classes: usize,
        params: &NetworkParams,
    ) -> Result<Self> {
        check_fit_inputs(x, y, n_classes)?;

        let mut layout = vec![x.ncols()];
        layout.extend(&params.hidden);
        layout.push(n_classes);

        if layout.contains(&0) {
            return Err(MlErr::InvalidParam(format!("invalid layer widths {layout:?}")));
        }

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut weights = dense_params(&dims(&layout), &mut rng)?;

        let model = build(&layout, params.dropout, params.seed);
        let optimizer = Adam::new(model.size(), params.optimizer);
        let dataset = Dataset::one_hot(x, y, n_classes)?;

        let mut trainer = ModelTrainer::new(
            model,
            optimizer,
            dataset,
            params.epochs,
            params.batch_size,
            CrossEntropy::new(),
            rng,
        );
        let losses = trainer.train(&mut weights)?;

        if weights.iter().any(|w| !w.is_finite()) {
            return Err(MlErr::Numerical("network weights are not finite".into()));
        }

        if let Some(loss) = losses.last() {
            log::debug!(epochs = losses.len(), loss = *loss; "fitted network");
        }

        Ok(Self {
            layout,
            params: weights,
        })
    }

    pub fn n_features(&self) -> usize {
        self.layout[0]
    }

    pub fn n_classes(&self) -> usize {
        self.layout[self.layout.len() - 1]
    }

    pub fn predict(&self, x: ArrayView2<f32>) -> Result<Vec<usize>> {
        check_features(x, self.n_features())?;

        let logits = build(&self.layout, 0., 0).infer(&self.params, x)?;
        Ok(logits.outer_iter().map(|row| argmax(row.iter())).collect())
    }

    pub fn to_artifact(&self) -> Artifact {
        let mut artifact = Artifact::new(BackendKind::Network);
        artifact.set_meta("num_features", self.n_features());
        artifact.set_meta("num_classes", self.n_classes());
        artifact.insert(
            "layout",
            Tensor::vector(self.layout.iter().map(|&w| w as f32).collect()),
        );
        artifact.insert("params", Tensor::vector(self.params.clone()));
        artifact
    }

    pub fn from_artifact(artifact: &Artifact) -> Result<Self> {
        let layout = artifact
            .tensor("layout")?
            .indices()?
            .into_iter()
            .map(|w| w.filter(|&w| w > 0))
            .collect::<Option<Vec<usize>>>()
            .filter(|layout| layout.len() >= 2)
            .ok_or_else(|| MlErr::Artifact("invalid network layout".into()))?;

        let params = artifact.tensor("params")?.data.clone();
        let expected: usize = dims(&layout).iter().map(|(i, o)| (i + 1) * o).sum();
        if params.len() != expected {
            return Err(MlErr::SizeMismatch {
                what: "network parameters",
                got: params.len(),
                expected,
            });
        }

        Ok(Self { layout, params })
    }
}
