use indicatif::ProgressBar;
use nalgebra::{DMatrix, DVector};
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use serde::{Serialize, Deserialize};

use crate::error::Error;
use crate::label::Label;
use super::Classifier;

const N_CLASSES : usize = 5;

/// Forest hyperparameters. Everything random (bootstrap draws, per-split
/// feature subsets) flows from the single seed, so a configuration fully
/// determines the trained model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {

    pub n_trees : usize,

    pub max_depth : Option<usize>,

    /// Nodes with fewer rows than this become leaves.
    pub min_samples_split : usize,

    /// Features examined per split; defaults to sqrt(p) when unset.
    pub features_per_split : Option<usize>,

    pub seed : u64,

    /// Show a progress bar while growing trees (CLI use).
    #[serde(default)]
    pub progress : bool

}

impl Default for ForestConfig {

    fn default() -> Self {
        Self {
            n_trees : 100,
            max_depth : Some(16),
            min_samples_split : 2,
            features_per_split : None,
            seed : 42,
            progress : false
        }
    }

}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf { class : usize },
    Split { feature : usize, threshold : f64, left : Box<Node>, right : Box<Node> }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Fitted {

    trees : Vec<Node>,

    /// Mean decrease in Gini per feature, normalized so the most important
    /// feature scores 1.
    importance : DVector<f64>,

    n_features : usize

}

/// Random forest over the coarse label space: bootstrap row sampling per
/// tree, a fresh random feature subset per split, Gini-minimizing binary
/// splits, and a majority vote across trees at prediction time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {

    config : ForestConfig,

    fitted : Option<Fitted>

}

impl RandomForest {

    pub fn new(config : ForestConfig) -> Self {
        Self { config, fitted : None }
    }

    /// Per-feature importance scores, available after training. Usable for
    /// feature selection upstream of a refit.
    pub fn importance(&self) -> Option<&DVector<f64>> {
        self.fitted.as_ref().map(|f| &f.importance )
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

}

fn gini(counts : &[usize; N_CLASSES], total : usize) -> f64 {
    if total == 0 {
        return 0.;
    }
    let mut sum_sq = 0.;
    for c in counts {
        let p = *c as f64 / total as f64;
        sum_sq += p * p;
    }
    1. - sum_sq
}

fn count(rows : &[usize], classes : &[usize]) -> [usize; N_CLASSES] {
    let mut counts = [0; N_CLASSES];
    for i in rows {
        counts[classes[*i]] += 1;
    }
    counts
}

fn majority(counts : &[usize; N_CLASSES]) -> usize {
    let mut best = 0;
    for k in 1..N_CLASSES {
        if counts[k] > counts[best] {
            best = k;
        }
    }
    best
}

struct Grower<'a> {

    features : &'a DMatrix<f64>,

    classes : &'a [usize],

    config : &'a ForestConfig,

    mtry : usize,

    /// Gini decrease accumulated over every split of every tree.
    importance : DVector<f64>

}

impl<'a> Grower<'a> {

    fn grow_tree(&mut self, rows : Vec<usize>, rng : &mut StdRng) -> Node {
        self.grow_node(rows, 0, rng)
    }

    fn grow_node(&mut self, rows : Vec<usize>, depth : usize, rng : &mut StdRng) -> Node {
        let counts = count(&rows, self.classes);
        let parent_gini = gini(&counts, rows.len());
        let depth_reached = self.config.max_depth.map(|d| depth >= d ).unwrap_or(false);
        if parent_gini == 0. || rows.len() < self.config.min_samples_split || depth_reached {
            return Node::Leaf { class : majority(&counts) };
        }

        let p = self.features.ncols();
        let candidates = sample(rng, p, self.mtry).into_vec();
        let mut best : Option<(usize, f64, f64)> = None;
        for feature in candidates {
            let mut values : Vec<(f64, usize)> = rows.iter()
                .map(|i| (self.features[(*i, feature)], self.classes[*i]) )
                .collect();
            values.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal) );

            let total = values.len();
            let mut left = [0usize; N_CLASSES];
            let mut right = count(&rows, self.classes);
            for i in 0..total - 1 {
                left[values[i].1] += 1;
                right[values[i].1] -= 1;
                if values[i].0 == values[i + 1].0 {
                    continue;
                }
                let nl = i + 1;
                let nr = total - nl;
                let weighted = (nl as f64 * gini(&left, nl) + nr as f64 * gini(&right, nr))
                    / total as f64;
                let improves = match best {
                    Some((_, _, score)) => weighted < score,
                    None => weighted < parent_gini
                };
                if improves {
                    let threshold = 0.5 * (values[i].0 + values[i + 1].0);
                    best = Some((feature, threshold, weighted));
                }
            }
        }

        let (feature, threshold, score) = match best {
            Some(b) => b,
            None => return Node::Leaf { class : majority(&counts) }
        };
        self.importance[feature] += (parent_gini - score) * rows.len() as f64;

        let (left_rows, right_rows) : (Vec<usize>, Vec<usize>) = rows.into_iter()
            .partition(|i| self.features[(*i, feature)] <= threshold );
        Node::Split {
            feature,
            threshold,
            left : Box::new(self.grow_node(left_rows, depth + 1, rng)),
            right : Box::new(self.grow_node(right_rows, depth + 1, rng))
        }
    }

}

fn route(node : &Node, features : &DMatrix<f64>, row : usize) -> usize {
    match node {
        Node::Leaf { class } => *class,
        Node::Split { feature, threshold, left, right } => {
            if features[(row, *feature)] <= *threshold {
                route(left, features, row)
            } else {
                route(right, features, row)
            }
        }
    }
}

impl Classifier for RandomForest {

    fn train(&mut self, features : &DMatrix<f64>, labels : &[Label]) -> Result<(), Error> {
        let n = features.nrows();
        let p = features.ncols();
        if labels.len() != n {
            return Err(Error::SchemaMismatch {
                ctx : "forest training",
                expected : n,
                found : labels.len()
            });
        }
        if n == 0 || p == 0 {
            return Err(Error::Numeric("empty training batch".to_string()));
        }
        let classes : Vec<usize> = labels.iter().map(|l| l.index() ).collect();
        let mtry = self.config.features_per_split
            .unwrap_or_else(|| ((p as f64).sqrt().round() as usize).max(1) )
            .min(p);

        let mut grower = Grower {
            features,
            classes : &classes,
            config : &self.config,
            mtry,
            importance : DVector::zeros(p)
        };
        let mut rng = StdRng::seed_from_u64(self.config.seed);
        let bar = if self.config.progress {
            ProgressBar::new(self.config.n_trees as u64)
        } else {
            ProgressBar::hidden()
        };
        let mut trees = Vec::with_capacity(self.config.n_trees);
        for _ in 0..self.config.n_trees {
            let bootstrap : Vec<usize> = (0..n).map(|_| rng.gen_range(0, n) ).collect();
            trees.push(grower.grow_tree(bootstrap, &mut rng));
            bar.inc(1);
        }
        bar.finish_and_clear();

        let mut importance = grower.importance;
        let max = importance.max();
        if max > 0. {
            importance /= max;
        }
        self.fitted = Some(Fitted { trees, importance, n_features : p });
        Ok(())
    }

    fn predict(&self, features : &DMatrix<f64>) -> Result<Vec<Label>, Error> {
        let fitted = self.fitted.as_ref().ok_or(Error::Untrained("forest"))?;
        if features.ncols() != fitted.n_features {
            return Err(Error::FeatureMismatch {
                expected : fitted.n_features,
                found : features.ncols()
            });
        }
        let mut out = Vec::with_capacity(features.nrows());
        for i in 0..features.nrows() {
            let mut votes = [0usize; N_CLASSES];
            for tree in &fitted.trees {
                votes[route(tree, features, i)] += 1;
            }
            out.push(Label::ALL[majority(&votes)]);
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "forest"
    }

}
