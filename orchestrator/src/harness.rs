use log::{info, warn};
use machine_learning::{
    Backend, BackendKind, MlErr, Trained,
    metrics::accuracy,
    model_selection::{CvScores, Split, cross_val_accuracy, cv_folds, train_test_split},
};
use ndarray::{ArrayView2, Axis};

use crate::{OrchestratorError, Result, configs::TrainingConfig};

const TOP_IMPORTANCES: usize = 10;

/// How a trained backend fared.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub model: Trained,
    /// `None` when the training rows hold fewer than two classes or cross validation failed.
    pub cv: Option<CvScores>,
    /// Accuracy over the held out rows.
    pub accuracy: f32,
    /// One prediction per held out row.
    pub predictions: Vec<usize>,
    /// The most important features first, for backends that rank them.
    pub importances: Option<Vec<(String, f32)>>,
}

#[derive(Debug)]
pub enum Outcome {
    Trained(Box<Evaluation>),
    /// This build can't train the backend.
    Unavailable(String),
    Failed(MlErr),
}

#[derive(Debug)]
pub struct BackendRun {
    pub kind: BackendKind,
    pub outcome: Outcome,
}

/// Every requested backend, in request order, scored against the same held out rows.
#[derive(Debug)]
pub struct Evaluations {
    pub y_test: Vec<usize>,
    pub runs: Vec<BackendRun>,
}

impl Evaluations {
    pub fn trained(&self) -> impl Iterator<Item = (BackendKind, &Evaluation)> {
        self.runs.iter().filter_map(|run| match &run.outcome {
            Outcome::Trained(eval) => Some((run.kind, eval.as_ref())),
            _ => None,
        })
    }

    /// The backend with the highest held out accuracy, the earliest requested on ties.
    pub fn best(&self) -> Option<(BackendKind, &Evaluation)> {
        self.trained().fold(None, |best, (kind, eval)| match best {
            Some((_, b)) if b.accuracy >= eval.accuracy => best,
            _ => Some((kind, eval)),
        })
    }
}

/// Splits the rows once and trains, scores and cross validates every backend of `config` on it,
/// each with its default parameters.
///
/// A backend that is unavailable or fails doesn't stop the others.
///
/// # Errors
/// When the rows can't be split or no backend could be trained.
pub fn evaluate(
    x: ArrayView2<f32>,
    y: &[usize],
    n_classes: usize,
    feature_names: &[String],
    config: &TrainingConfig,
) -> Result<Evaluations> {
    let backends = config
        .backends
        .iter()
        .map(|&kind| (kind, Backend::new(kind)))
        .collect();
    evaluate_backends(x, y, n_classes, feature_names, config, backends)
}

/// Same as [`evaluate`], with the backends already built. `config.backends` is ignored, the
/// split and cross validation settings still come from `config`.
pub fn evaluate_backends(
    x: ArrayView2<f32>,
    y: &[usize],
    n_classes: usize,
    feature_names: &[String],
    config: &TrainingConfig,
    backends: Vec<(BackendKind, machine_learning::Result<Backend>)>,
) -> Result<Evaluations> {
    let Split { train, test } = train_test_split(y, config.test_fraction, config.seed)?;
    info!(train = train.len(), test = test.len(); "split the dataset");

    let x_train = x.select(Axis(0), &train);
    let y_train: Vec<usize> = train.iter().map(|&r| y[r]).collect();
    let x_test = x.select(Axis(0), &test);
    let y_test: Vec<usize> = test.iter().map(|&r| y[r]).collect();

    let folds = cv_folds(&y_train, config.max_folds);
    if folds.is_none() {
        warn!("the training rows hold a single room, skipping cross validation");
    }

    let mut runs = Vec::with_capacity(backends.len());
    for (kind, backend) in backends {
        let backend = match backend {
            Ok(backend) => backend,
            Err(MlErr::Unavailable { reason, .. }) => {
                warn!(backend:% = kind; "unavailable: {reason}");
                runs.push(BackendRun {
                    kind,
                    outcome: Outcome::Unavailable(reason.to_string()),
                });
                continue;
            }
            Err(e) => {
                warn!(backend:% = kind; "skipping: {e}");
                runs.push(BackendRun {
                    kind,
                    outcome: Outcome::Failed(e),
                });
                continue;
            }
        };

        info!(backend:% = kind; "training");
        let fitted = backend
            .fit(x_train.view(), &y_train, n_classes)
            .and_then(|model| Ok((model.predict(x_test.view())?, model)));

        let outcome = match fitted {
            Ok((predictions, model)) => {
                let cv = folds.and_then(|folds| {
                    cross_val_accuracy(&backend, x_train.view(), &y_train, n_classes, folds)
                        .inspect_err(|e| warn!(backend:% = kind; "cross validation failed: {e}"))
                        .ok()
                });

                let accuracy = accuracy(&y_test, &predictions);
                let importances = model.ranked_importances(feature_names).map(|mut ranked| {
                    ranked.truncate(TOP_IMPORTANCES);
                    ranked
                });
                info!(backend:% = kind, accuracy = accuracy; "evaluated");

                Outcome::Trained(Box::new(Evaluation {
                    model,
                    cv,
                    accuracy,
                    predictions,
                    importances,
                }))
            }
            Err(e) => {
                warn!(backend:% = kind; "training failed: {e}");
                Outcome::Failed(e)
            }
        };

        runs.push(BackendRun { kind, outcome });
    }

    let evaluations = Evaluations { y_test, runs };
    if evaluations.best().is_none() {
        return Err(OrchestratorError::NoBackendTrained);
    }

    Ok(evaluations)
}
