use std::fmt::{self, Display};

use serde::{Serialize, Deserialize};

use crate::error::Error;
use crate::label::Label;

const N_CLASSES : usize = 5;

/// 5x5 confusion grid over the fixed label space: rows are true classes,
/// columns are predicted classes, both in [Label::ALL] order. Computed once
/// per evaluation run and read-only afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts : [[usize; N_CLASSES]; N_CLASSES]
}

/// Derived per-class metrics. Ratios are in [0, 1]; a class with no true or
/// no predicted examples scores 0 rather than raising.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassMetrics {

    pub label : Label,

    /// True examples of this class in the evaluation set.
    pub support : usize,

    pub precision : f64,

    pub recall : f64,

    pub f1 : f64

}

impl ConfusionMatrix {

    pub fn new(predicted : &[Label], actual : &[Label]) -> Result<Self, Error> {
        if predicted.len() != actual.len() {
            return Err(Error::SchemaMismatch {
                ctx : "scoring",
                expected : actual.len(),
                found : predicted.len()
            });
        }
        let mut counts = [[0; N_CLASSES]; N_CLASSES];
        for (p, a) in predicted.iter().zip(actual.iter()) {
            counts[a.index()][p.index()] += 1;
        }
        Ok(Self { counts })
    }

    pub fn count(&self, actual : Label, predicted : Label) -> usize {
        self.counts[actual.index()][predicted.index()]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|row| row.iter().sum::<usize>() ).sum()
    }

    /// Precision, recall and F1 per class, with undefined ratios (empty
    /// denominators) treated as 0.
    pub fn class_metrics(&self) -> Vec<ClassMetrics> {
        Label::ALL.iter().map(|label| {
            let k = label.index();
            let tp = self.counts[k][k];
            let pred : usize = (0..N_CLASSES).map(|a| self.counts[a][k] ).sum();
            let support : usize = self.counts[k].iter().sum();
            let precision = ratio(tp, pred);
            let recall = ratio(tp, support);
            let f1 = if precision + recall > 0. {
                2. * precision * recall / (precision + recall)
            } else {
                0.
            };
            ClassMetrics { label : *label, support, precision, recall, f1 }
        }).collect()
    }

    /// Support-weighted F1 on a 0-100 scale: perfect predictions score 100,
    /// a run with no correct prediction scores 0.
    pub fn weighted_f1(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.;
        }
        let weighted : f64 = self.class_metrics().iter()
            .map(|m| m.support as f64 / total as f64 * m.f1 )
            .sum();
        100. * weighted
    }

}

fn ratio(num : usize, den : usize) -> f64 {
    if den == 0 {
        0.
    } else {
        num as f64 / den as f64
    }
}

impl Display for ConfusionMatrix {

    fn fmt(&self, f : &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>10}", "actual\\pred")?;
        for label in Label::ALL.iter() {
            write!(f, "{:>8}", label.name())?;
        }
        writeln!(f)?;
        for actual in Label::ALL.iter() {
            write!(f, "{:>10}", actual.name())?;
            for predicted in Label::ALL.iter() {
                write!(f, "{:>8}", self.count(*actual, *predicted))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }

}

#[cfg(test)]
mod test {

    use super::*;

    const EPS : f64 = 1e-9;

    #[test]
    fn perfect_predictions_score_100() {
        let actual = vec![Label::Dos, Label::Probe, Label::Normal, Label::Normal, Label::U2r];
        let cm = ConfusionMatrix::new(&actual, &actual).unwrap();
        assert!((cm.weighted_f1() - 100.).abs() < EPS);
    }

    #[test]
    fn all_wrong_scores_0() {
        let actual = vec![Label::Dos, Label::Probe, Label::Normal];
        let predicted = vec![Label::Probe, Label::Normal, Label::Dos];
        let cm = ConfusionMatrix::new(&predicted, &actual).unwrap();
        assert!(cm.weighted_f1().abs() < EPS);
    }

    #[test]
    fn absent_class_does_not_raise() {
        // No R2L or U2R anywhere; their metrics are defined as 0.
        let actual = vec![Label::Dos, Label::Dos, Label::Normal];
        let predicted = vec![Label::Dos, Label::Normal, Label::Normal];
        let cm = ConfusionMatrix::new(&predicted, &actual).unwrap();
        let metrics = cm.class_metrics();
        let r2l = &metrics[Label::R2l.index()];
        assert_eq!(r2l.support, 0);
        assert_eq!(r2l.f1, 0.);
        assert!(cm.weighted_f1() > 0.);
    }

    #[test]
    fn weighting_follows_support() {
        // DoS (2 of 3 examples) predicted perfectly, normal (1 of 3) always missed:
        // weighted F1 is pulled toward the DoS score.
        let actual = vec![Label::Dos, Label::Dos, Label::Normal];
        let predicted = vec![Label::Dos, Label::Dos, Label::Probe];
        let cm = ConfusionMatrix::new(&predicted, &actual).unwrap();
        assert!((cm.weighted_f1() - 100. * 2. / 3.).abs() < EPS);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let actual = vec![Label::Dos];
        let predicted = vec![Label::Dos, Label::Normal];
        assert!(matches!(
            ConfusionMatrix::new(&predicted, &actual),
            Err(Error::SchemaMismatch { .. })
        ));
    }

}
