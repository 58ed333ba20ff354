//! Held-out Evaluation

use std::fmt;

/// Precision, recall and F1 for one class
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Binary classification report: class 0 is legitimate, class 1 fraud
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub classes: [ClassMetrics; 2],
    pub total: usize,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl ClassificationReport {
    /// Compare predicted labels against actual ones. Undefined ratios are 0.
    pub fn compute(actual: &[u8], predicted: &[u8]) -> Self {
        // confusion[actual][predicted]
        let mut confusion = [[0usize; 2]; 2];
        for (&y, &p) in actual.iter().zip(predicted) {
            confusion[usize::from(y.min(1))][usize::from(p.min(1))] += 1;
        }
        let total = confusion.iter().flatten().sum();
        let correct = confusion[0][0] + confusion[1][1];

        let classes = [0, 1].map(|c| {
            let other = 1 - c;
            let tp = confusion[c][c];
            let support = tp + confusion[c][other];
            let precision = ratio(tp, tp + confusion[other][c]);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassMetrics {
                precision,
                recall,
                f1,
                support,
            }
        });

        Self {
            accuracy: ratio(correct, total),
            classes,
            total,
        }
    }

    pub fn fraud(&self) -> &ClassMetrics {
        &self.classes[1]
    }

    /// Unweighted mean over both classes
    pub fn macro_avg(&self) -> ClassMetrics {
        let [a, b] = self.classes;
        ClassMetrics {
            precision: (a.precision + b.precision) / 2.0,
            recall: (a.recall + b.recall) / 2.0,
            f1: (a.f1 + b.f1) / 2.0,
            support: self.total,
        }
    }

    /// Support-weighted mean over both classes
    pub fn weighted_avg(&self) -> ClassMetrics {
        let weight = |m: &ClassMetrics| ratio(m.support, self.total);
        let [a, b] = self.classes;
        ClassMetrics {
            precision: a.precision * weight(&a) + b.precision * weight(&b),
            recall: a.recall * weight(&a) + b.recall * weight(&b),
            f1: a.f1 * weight(&a) + b.f1 * weight(&b),
            support: self.total,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = |f: &mut fmt::Formatter<'_>, name: &str, m: &ClassMetrics| {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )
        };

        writeln!(f, "Accuracy: {:.4}", self.accuracy)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        row(f, "0", &self.classes[0])?;
        row(f, "1", &self.classes[1])?;
        row(f, "macro avg", &self.macro_avg())?;
        row(f, "weighted avg", &self.weighted_avg())
    }
}
