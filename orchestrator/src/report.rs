use std::fmt::{self, Display, Write};

use dataset::LabelSpace;
use machine_learning::metrics::{
    ClassScores, ClassificationReport, ConfusionMatrix, present_labels,
};

use crate::harness::{Evaluations, Outcome};

/// The human readable outcome of a training run: per backend scores, the ranking, and the
/// detailed report of the best backend.
pub struct RunReport<'a> {
    evaluations: &'a Evaluations,
    labels: &'a LabelSpace,
}

impl<'a> RunReport<'a> {
    pub fn new(evaluations: &'a Evaluations, labels: &'a LabelSpace) -> Self {
        Self {
            evaluations,
            labels,
        }
    }

    /// The confusion matrix of the best backend over the labels present in its held out truth or
    /// predictions.
    pub fn confusion(&self) -> Option<ConfusionMatrix> {
        let (_, best) = self.evaluations.best()?;
        let y_test = &self.evaluations.y_test;
        let present = present_labels(y_test, &best.predictions);
        Some(ConfusionMatrix::new(y_test, &best.predictions, &present))
    }

    fn room(&self, idx: usize) -> &str {
        self.labels.room(idx).unwrap_or("?")
    }

    fn write_backends(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for run in &self.evaluations.runs {
            writeln!(f, "== {} ==", run.kind)?;
            match &run.outcome {
                Outcome::Trained(eval) => {
                    match &eval.cv {
                        Some(cv) => writeln!(
                            f,
                            "CV accuracy: {:.4} (+/- {:.4}) over {} folds",
                            cv.mean(),
                            cv.std() * 2.0,
                            cv.scores.len()
                        )?,
                        None => writeln!(f, "CV accuracy: skipped")?,
                    }
                    writeln!(f, "Test accuracy: {:.4}", eval.accuracy)?;

                    if let Some(importances) = &eval.importances {
                        writeln!(f, "Top feature importances:")?;
                        for (name, score) in importances {
                            writeln!(f, "  {name:20} {score:.4}")?;
                        }
                    }
                }
                Outcome::Unavailable(reason) => writeln!(f, "unavailable: {reason}")?,
                Outcome::Failed(e) => writeln!(f, "failed: {e}")?,
            }
            writeln!(f)?;
        }

        Ok(())
    }

    fn write_summary(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let best = self.evaluations.best().map(|(kind, _)| kind);

        let mut ranked: Vec<_> = self.evaluations.trained().collect();
        ranked.sort_by(|a, b| b.1.accuracy.total_cmp(&a.1.accuracy));

        writeln!(f, "RESULTS SUMMARY")?;
        for (kind, eval) in ranked {
            let marker = if Some(kind) == best { " <- best" } else { "" };
            writeln!(f, "  {:10} {:.4}{marker}", kind.as_str(), eval.accuracy)?;
        }
        for run in &self.evaluations.runs {
            if !matches!(run.outcome, Outcome::Trained(_)) {
                writeln!(f, "  {:10} not trained", run.kind.as_str())?;
            }
        }

        Ok(())
    }

    fn write_classification(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((kind, best)) = self.evaluations.best() else {
            return Ok(());
        };
        let y_test = &self.evaluations.y_test;
        let present = present_labels(y_test, &best.predictions);
        let report = ClassificationReport::new(y_test, &best.predictions, &present);

        writeln!(f, "Classification report ({kind}):")?;
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for (label, s) in &report.classes {
            write_scores(f, self.room(*label), s)?;
        }
        writeln!(f)?;

        let support = report.macro_avg.support;
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9.2} {support:>9}",
            "accuracy", "", "", report.accuracy
        )?;
        write_scores(f, "macro avg", &report.macro_avg)?;
        write_scores(f, "weighted avg", &report.weighted_avg)
    }

    fn write_confusion(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(matrix) = self.confusion() else {
            return Ok(());
        };

        writeln!(f, "Confusion matrix (rows: true, columns: predicted):")?;
        write!(f, "{:>14}", "")?;
        for &label in matrix.labels() {
            write!(f, " {:>10}", self.room(label))?;
        }
        writeln!(f)?;

        for (&label, row) in matrix.labels().iter().zip(matrix.rows()) {
            write!(f, "{:>14}", self.room(label))?;
            for count in row {
                write!(f, " {count:>10}")?;
            }
            writeln!(f)?;
        }

        Ok(())
    }

    /// The best backend's confusion matrix as CSV, with room names heading rows and columns.
    pub fn confusion_csv(&self) -> Option<String> {
        let matrix = self.confusion()?;
        let rooms: Vec<&str> = matrix.labels().iter().map(|&l| self.room(l)).collect();

        let mut csv = String::from("true\\predicted");
        for room in &rooms {
            csv.push(',');
            csv.push_str(room);
        }
        csv.push('\n');

        for (room, row) in rooms.iter().zip(matrix.rows()) {
            csv.push_str(room);
            for count in row {
                let _ = write!(csv, ",{count}");
            }
            csv.push('\n');
        }

        Some(csv)
    }
}

fn write_scores(f: &mut fmt::Formatter<'_>, name: &str, s: &ClassScores) -> fmt::Result {
    writeln!(
        f,
        "{name:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        s.precision, s.recall, s.f1, s.support
    )
}

impl Display for RunReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_backends(f)?;
        self.write_summary(f)?;
        writeln!(f)?;
        self.write_classification(f)?;
        writeln!(f)?;
        self.write_confusion(f)
    }
}

#[cfg(test)]
mod tests {
    use machine_learning::{Backend, BackendKind};
    use ndarray::array;

    use super::*;
    use crate::harness::{BackendRun, Evaluation};

    fn evaluations() -> Evaluations {
        let x = array![[0.0f32], [1.0], [5.0], [6.0]];
        let model = Backend::new(BackendKind::Forest)
            .unwrap()
            .fit(x.view(), &[0, 0, 1, 1], 3)
            .unwrap();

        Evaluations {
            y_test: vec![0, 0, 2],
            runs: vec![
                BackendRun {
                    kind: BackendKind::Forest,
                    outcome: Outcome::Trained(Box::new(Evaluation {
                        model,
                        cv: None,
                        accuracy: 2.0 / 3.0,
                        predictions: vec![0, 2, 2],
                        importances: Some(vec![("s1_dist".into(), 1.0)]),
                    })),
                },
                BackendRun {
                    kind: BackendKind::Network,
                    outcome: Outcome::Unavailable("missing".into()),
                },
            ],
        }
    }

    fn labels() -> LabelSpace {
        LabelSpace::from_targets(["hall", "kitchen", "office"])
    }

    #[test]
    fn confusion_skips_absent_labels() {
        let evaluations = evaluations();
        let labels = labels();
        let report = RunReport::new(&evaluations, &labels);

        assert_eq!(
            report.confusion_csv().unwrap(),
            "true\\predicted,hall,office\nhall,1,1\noffice,0,1\n"
        );
    }

    #[test]
    fn text_report_marks_the_best_backend() {
        let evaluations = evaluations();
        let labels = labels();
        let text = RunReport::new(&evaluations, &labels).to_string();

        assert!(text.contains("forest     0.6667 <- best"));
        assert!(text.contains("network    not trained"));
        assert!(text.contains("unavailable: missing"));
        assert!(text.contains("s1_dist"));
        assert!(!text.contains("kitchen"));
    }
}
