//! Held-out evaluation metrics.
//!
//! Computes confusion-matrix-derived metrics from predicted and ground-truth
//! labels. Malignant (label 1) is the positive class.

use cytotrace_core::Diagnosis;
use serde::{Deserialize, Serialize};

/// Confusion matrix for binary classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Malignant predicted malignant.
    pub tp: usize,
    /// Benign predicted benign.
    pub tn: usize,
    /// Benign predicted malignant.
    pub fp: usize,
    /// Malignant predicted benign.
    pub fn_: usize,
}

impl ConfusionMatrix {
    /// Tally predictions against labels (0 = benign, 1 = malignant).
    pub fn from_labels(predictions: &[u8], labels: &[u8]) -> Self {
        assert_eq!(
            predictions.len(),
            labels.len(),
            "predictions and labels must have same length"
        );
        let mut cm = Self::default();
        for (&pred, &label) in predictions.iter().zip(labels.iter()) {
            match (label == 1, pred == 1) {
                (true, true) => cm.tp += 1,
                (false, false) => cm.tn += 1,
                (false, true) => cm.fp += 1,
                (true, false) => cm.fn_ += 1,
            }
        }
        cm
    }

    /// Total number of samples.
    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}

fn f1(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

/// Validation metrics computed from a confusion matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub fpr: f64,
    pub confusion: ConfusionMatrix,
}

/// Compute validation metrics from predicted and ground-truth labels.
///
/// Class 0 = benign, class 1 = malignant.
pub fn compute_validation_metrics(predictions: &[u8], labels: &[u8]) -> ValidationMetrics {
    let cm = ConfusionMatrix::from_labels(predictions, labels);
    let precision = ratio(cm.tp, cm.tp + cm.fp);
    let recall = ratio(cm.tp, cm.tp + cm.fn_);
    ValidationMetrics {
        accuracy: ratio(cm.tp + cm.tn, cm.total()),
        precision,
        recall,
        f1: f1(precision, recall),
        fpr: ratio(cm.fp, cm.fp + cm.tn),
        confusion: cm,
    }
}

impl std::fmt::Display for ValidationMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "acc={:.4} prec={:.4} rec={:.4} f1={:.4} fpr={:.4} (tp={} fp={} tn={} fn={})",
            self.accuracy,
            self.precision,
            self.recall,
            self.f1,
            self.fpr,
            self.confusion.tp,
            self.confusion.fp,
            self.confusion.tn,
            self.confusion.fn_,
        )
    }
}

/// Precision / recall / F1 for one class treated as positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassScores {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class breakdown plus macro and support-weighted averages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub benign: ClassScores,
    pub malignant: ClassScores,
    pub accuracy: f64,
    pub macro_avg: ClassScores,
    pub weighted_avg: ClassScores,
}

impl ClassificationReport {
    pub fn from_confusion(cm: &ConfusionMatrix) -> Self {
        let scores = |tp: usize, fp: usize, fn_: usize| {
            let precision = ratio(tp, tp + fp);
            let recall = ratio(tp, tp + fn_);
            ClassScores {
                precision,
                recall,
                f1: f1(precision, recall),
                support: tp + fn_,
            }
        };
        // For the benign row, benign is the positive class.
        let benign = scores(cm.tn, cm.fn_, cm.fp);
        let malignant = scores(cm.tp, cm.fp, cm.fn_);

        let total = cm.total();
        let macro_avg = ClassScores {
            precision: (benign.precision + malignant.precision) / 2.0,
            recall: (benign.recall + malignant.recall) / 2.0,
            f1: (benign.f1 + malignant.f1) / 2.0,
            support: total,
        };
        let weight = |b: f64, m: f64| {
            if total == 0 {
                0.0
            } else {
                (b * benign.support as f64 + m * malignant.support as f64) / total as f64
            }
        };
        let weighted_avg = ClassScores {
            precision: weight(benign.precision, malignant.precision),
            recall: weight(benign.recall, malignant.recall),
            f1: weight(benign.f1, malignant.f1),
            support: total,
        };

        Self {
            accuracy: ratio(cm.tp + cm.tn, total),
            benign,
            malignant,
            macro_avg,
            weighted_avg,
        }
    }

    /// Scores for one class.
    pub fn class(&self, diagnosis: Diagnosis) -> &ClassScores {
        match diagnosis {
            Diagnosis::Benign => &self.benign,
            Diagnosis::Malignant => &self.malignant,
        }
    }
}

impl std::fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let row = |f: &mut std::fmt::Formatter<'_>, name: &str, s: &ClassScores| {
            writeln!(
                f,
                "{:>14} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                name, s.precision, s.recall, s.f1, s.support
            )
        };
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        writeln!(f)?;
        row(f, "0 (benign)", &self.benign)?;
        row(f, "1 (malignant)", &self.malignant)?;
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        row(f, "macro avg", &self.macro_avg)?;
        row(f, "weighted avg", &self.weighted_avg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Labels and predictions for a 569-row dataset's 114-row held-out split:
    /// 71 benign, 43 malignant; one benign misread, three malignant missed.
    fn held_out_split() -> (Vec<u8>, Vec<u8>) {
        let mut labels = vec![0u8; 71];
        labels.extend(std::iter::repeat(1u8).take(43));
        let mut preds = labels.clone();
        preds[10] = 1;
        preds[75] = 0;
        preds[90] = 0;
        preds[113] = 0;
        (preds, labels)
    }

    #[test]
    fn test_held_out_split_metrics() {
        let (preds, labels) = held_out_split();
        let m = compute_validation_metrics(&preds, &labels);
        assert_eq!(m.confusion.tp, 40);
        assert_eq!(m.confusion.tn, 70);
        assert_eq!(m.confusion.fp, 1);
        assert_eq!(m.confusion.fn_, 3);
        assert_eq!(m.confusion.total(), 114);
        assert!((m.accuracy - 110.0 / 114.0).abs() < 1e-12);
        assert!((m.precision - 40.0 / 41.0).abs() < 1e-12);
        assert!((m.recall - 40.0 / 43.0).abs() < 1e-12);
        assert!((m.f1 - 80.0 / 84.0).abs() < 1e-12);
        assert!((m.fpr - 1.0 / 71.0).abs() < 1e-12);
    }

    #[test]
    fn test_always_benign_model_scores_no_recall() {
        let (_, labels) = held_out_split();
        let preds = vec![0u8; labels.len()];
        let m = compute_validation_metrics(&preds, &labels);
        assert!((m.accuracy - 71.0 / 114.0).abs() < 1e-12);
        assert_eq!(m.precision, 0.0);
        assert_eq!(m.recall, 0.0);
        assert_eq!(m.f1, 0.0);
        assert_eq!(m.fpr, 0.0);

        let r = ClassificationReport::from_confusion(&m.confusion);
        assert!((r.benign.recall - 1.0).abs() < 1e-12);
        assert!((r.benign.precision - 71.0 / 114.0).abs() < 1e-12);
        assert_eq!(r.malignant.support, 43);
    }

    #[test]
    fn test_split_without_malignant_rows() {
        let labels = vec![0u8; 20];
        let mut preds = labels.clone();
        preds[3] = 1;
        let m = compute_validation_metrics(&preds, &labels);
        assert!((m.accuracy - 0.95).abs() < 1e-12);
        assert_eq!(m.recall, 0.0);
        assert!((m.fpr - 0.05).abs() < 1e-12);
    }

    #[test]
    fn test_empty() {
        let m = compute_validation_metrics(&[], &[]);
        assert_eq!(m.confusion.total(), 0);
        assert_eq!(m.accuracy, 0.0);
    }

    #[test]
    fn test_classification_report() {
        // 3 TP, 1 FP, 2 TN, 1 FN
        let cm = ConfusionMatrix {
            tp: 3,
            tn: 2,
            fp: 1,
            fn_: 1,
        };
        let r = ClassificationReport::from_confusion(&cm);
        assert_eq!(r.malignant.support, 4);
        assert_eq!(r.benign.support, 3);
        assert!((r.benign.precision - 2.0 / 3.0).abs() < 1e-9);
        assert!((r.benign.recall - 2.0 / 3.0).abs() < 1e-9);
        assert!((r.malignant.precision - 0.75).abs() < 1e-9);
        assert!((r.macro_avg.precision - (2.0 / 3.0 + 0.75) / 2.0).abs() < 1e-9);
        let weighted = (2.0 / 3.0 * 3.0 + 0.75 * 4.0) / 7.0;
        assert!((r.weighted_avg.recall - weighted).abs() < 1e-9);
        assert!((r.accuracy - 5.0 / 7.0).abs() < 1e-9);
        assert_eq!(r.class(Diagnosis::Benign).support, 3);
    }

    #[test]
    fn test_report_rendering() {
        let cm = ConfusionMatrix {
            tp: 40,
            tn: 70,
            fp: 2,
            fn_: 2,
        };
        let text = ClassificationReport::from_confusion(&cm).to_string();
        assert!(text.contains("precision"));
        assert!(text.contains("1 (malignant)"));
        assert!(text.contains("weighted avg"));
        assert!(text.contains("114"));
    }
}
