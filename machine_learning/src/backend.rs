use std::{
    fmt::{self, Display},
    str::FromStr,
};

use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "network")]
use crate::network::{Network, NetworkParams};
use crate::{
    MlErr, Result,
    artifact::Artifact,
    boosting::{BoostParams, GradientBoosting},
    forest::{ForestParams, RandomForest},
};

/// The model families a run can train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Forest,
    Boosted,
    Network,
}

impl BackendKind {
    pub const ALL: [BackendKind; 3] = [Self::Forest, Self::Boosted, Self::Network];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Forest => "forest",
            Self::Boosted => "boosted",
            Self::Network => "network",
        }
    }

    /// Whether this build can train the backend.
    pub fn is_available(&self) -> bool {
        match self {
            Self::Network => cfg!(feature = "network"),
            Self::Forest | Self::Boosted => true,
        }
    }
}

impl Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = MlErr;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "forest" | "rf" => Ok(Self::Forest),
            "boosted" | "xgb" => Ok(Self::Boosted),
            "network" | "mlp" => Ok(Self::Network),
            other => Err(MlErr::InvalidParam(format!("unknown backend `{other}`"))),
        }
    }
}

/// Fails unless `x` and `y` line up, are non empty and every label is below `n_classes`.
pub(crate) fn check_fit_inputs(x: ArrayView2<f32>, y: &[usize], n_classes: usize) -> Result<()> {
    if x.nrows() == 0 {
        return Err(MlErr::EmptyInput("training set"));
    }

    if x.nrows() != y.len() {
        return Err(MlErr::SizeMismatch {
            what: "training targets",
            got: y.len(),
            expected: x.nrows(),
        });
    }

    if n_classes < 2 {
        return Err(MlErr::NotEnoughClasses { got: n_classes });
    }

    if let Some(&class) = y.iter().find(|&&c| c >= n_classes) {
        return Err(MlErr::InvalidParam(format!(
            "class {class} is out of range for {n_classes} classes"
        )));
    }

    Ok(())
}

pub(crate) fn check_features(x: ArrayView2<f32>, n_features: usize) -> Result<()> {
    if x.ncols() != n_features {
        return Err(MlErr::SizeMismatch {
            what: "features",
            got: x.ncols(),
            expected: n_features,
        });
    }

    Ok(())
}

/// An untrained backend together with its hyperparameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    Forest(ForestParams),
    Boosted(BoostParams),
    #[cfg(feature = "network")]
    Network(NetworkParams),
}

impl Backend {
    /// Creates the backend `kind` with its default hyperparameters.
    ///
    /// # Errors
    /// Returns `MlErr::Unavailable` if this build can't train `kind`.
    pub fn new(kind: BackendKind) -> Result<Self> {
        match kind {
            BackendKind::Forest => Ok(Self::Forest(ForestParams::default())),
            BackendKind::Boosted => Ok(Self::Boosted(BoostParams::default())),
            #[cfg(feature = "network")]
            BackendKind::Network => Ok(Self::Network(NetworkParams::default())),
            #[cfg(not(feature = "network"))]
            BackendKind::Network => Err(MlErr::Unavailable {
                kind,
                reason: "built without the `network` feature",
            }),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Forest(_) => BackendKind::Forest,
            Self::Boosted(_) => BackendKind::Boosted,
            #[cfg(feature = "network")]
            Self::Network(_) => BackendKind::Network,
        }
    }

    /// Trains a new model on `x` and `y`, whose labels must lie within `0..n_classes`.
    pub fn fit(&self, x: ArrayView2<f32>, y: &[usize], n_classes: usize) -> Result<Trained> {
        let trained = match self {
            Self::Forest(params) => Trained::Forest(RandomForest::fit(x, y, n_classes, params)?),
            Self::Boosted(params) => {
                Trained::Boosted(GradientBoosting::fit(x, y, n_classes, params)?)
            }
            #[cfg(feature = "network")]
            Self::Network(params) => Trained::Network(Network::fit(x, y, n_classes, params)?),
        };

        Ok(trained)
    }
}

/// A fitted model of any backend.
#[derive(Debug, Clone, PartialEq)]
pub enum Trained {
    Forest(RandomForest),
    Boosted(GradientBoosting),
    #[cfg(feature = "network")]
    Network(Network),
}

impl Trained {
    pub fn kind(&self) -> BackendKind {
        match self {
            Self::Forest(_) => BackendKind::Forest,
            Self::Boosted(_) => BackendKind::Boosted,
            #[cfg(feature = "network")]
            Self::Network(_) => BackendKind::Network,
        }
    }

    pub fn n_features(&self) -> usize {
        match self {
            Self::Forest(m) => m.n_features(),
            Self::Boosted(m) => m.n_features(),
            #[cfg(feature = "network")]
            Self::Network(m) => m.n_features(),
        }
    }

    pub fn n_classes(&self) -> usize {
        match self {
            Self::Forest(m) => m.n_classes(),
            Self::Boosted(m) => m.n_classes(),
            #[cfg(feature = "network")]
            Self::Network(m) => m.n_classes(),
        }
    }

    /// Predicts a class index for every row of `x`.
    pub fn predict(&self, x: ArrayView2<f32>) -> Result<Vec<usize>> {
        match self {
            Self::Forest(m) => m.predict(x),
            Self::Boosted(m) => m.predict(x),
            #[cfg(feature = "network")]
            Self::Network(m) => m.predict(x),
        }
    }

    /// Normalized per feature importance, `None` for backends that don't expose one.
    pub fn feature_importances(&self) -> Option<Vec<f32>> {
        match self {
            Self::Forest(m) => Some(m.feature_importances()),
            Self::Boosted(m) => Some(m.feature_importances()),
            #[cfg(feature = "network")]
            Self::Network(_) => None,
        }
    }

    /// Pairs the importances with `names` and sorts them from most to least important.
    pub fn ranked_importances(&self, names: &[String]) -> Option<Vec<(String, f32)>> {
        let importances = self.feature_importances()?;
        let mut ranked: Vec<(String, f32)> = names.iter().cloned().zip(importances).collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        Some(ranked)
    }

    pub fn to_artifact(&self) -> Artifact {
        match self {
            Self::Forest(m) => m.to_artifact(),
            Self::Boosted(m) => m.to_artifact(),
            #[cfg(feature = "network")]
            Self::Network(m) => m.to_artifact(),
        }
    }

    pub fn from_artifact(artifact: &Artifact) -> Result<Self> {
        match artifact.kind() {
            BackendKind::Forest => Ok(Self::Forest(RandomForest::from_artifact(artifact)?)),
            BackendKind::Boosted => Ok(Self::Boosted(GradientBoosting::from_artifact(artifact)?)),
            #[cfg(feature = "network")]
            BackendKind::Network => Ok(Self::Network(Network::from_artifact(artifact)?)),
            #[cfg(not(feature = "network"))]
            kind @ BackendKind::Network => Err(MlErr::Unavailable {
                kind,
                reason: "built without the `network` feature",
            }),
        }
    }

    /// A plain json rendition for consumers outside this crate, stamped with `run_id`. Only
    /// offered by the boosted backend.
    pub fn portable_json(&self, run_id: &str) -> Option<Result<String>> {
        match self {
            Self::Boosted(m) => Some(m.to_portable_json(run_id)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::blobs;

    #[test]
    fn kinds_parse_with_aliases() {
        assert_eq!("rf".parse::<BackendKind>().unwrap(), BackendKind::Forest);
        assert_eq!("boosted".parse::<BackendKind>().unwrap(), BackendKind::Boosted);
        assert_eq!("mlp".parse::<BackendKind>().unwrap(), BackendKind::Network);
        assert!("svm".parse::<BackendKind>().is_err());

        for kind in BackendKind::ALL {
            assert_eq!(kind.as_str().parse::<BackendKind>().unwrap(), kind);
        }
    }

    #[test]
    fn rejects_bad_training_inputs() {
        let (x, y) = blobs(2, 5, 3, 0);
        let backend = Backend::new(BackendKind::Forest).unwrap();

        assert!(matches!(
            backend.fit(x.view(), &y[1..], 2),
            Err(MlErr::SizeMismatch { .. })
        ));
        assert!(matches!(
            backend.fit(x.view(), &y, 1),
            Err(MlErr::NotEnoughClasses { got: 1 })
        ));
    }

    #[test]
    fn prediction_checks_the_feature_count() {
        let (x, y) = blobs(2, 5, 3, 0);
        let (wide, _) = blobs(2, 5, 4, 0);
        let trained = Backend::Boosted(BoostParams {
            n_rounds: 2,
            ..Default::default()
        })
        .fit(x.view(), &y, 2)
        .unwrap();

        assert!(matches!(
            trained.predict(wide.view()),
            Err(MlErr::SizeMismatch { what: "features", .. })
        ));
    }

    #[test]
    fn ranked_importances_are_sorted() {
        let (x, y) = blobs(2, 10, 3, 0);
        let trained = Backend::new(BackendKind::Forest)
            .unwrap()
            .fit(x.view(), &y, 2)
            .unwrap();
        let names: Vec<String> = ["a", "b", "c"].map(String::from).to_vec();

        let ranked = trained.ranked_importances(&names).unwrap();

        assert_eq!(ranked.len(), 3);
        assert!(ranked.windows(2).all(|w| w[0].1 >= w[1].1));
    }

    #[test]
    fn artifacts_restore_the_right_backend() {
        let (x, y) = blobs(2, 8, 3, 0);
        let trained = Backend::Forest(ForestParams {
            n_trees: 3,
            ..Default::default()
        })
        .fit(x.view(), &y, 2)
        .unwrap();

        let bytes = trained.to_artifact().to_bytes().unwrap();
        let restored = Trained::from_artifact(&Artifact::from_bytes(&bytes).unwrap()).unwrap();

        assert_eq!(restored.kind(), BackendKind::Forest);
        assert_eq!(restored, trained);
        assert!(restored.portable_json("r").is_none());
    }
}
