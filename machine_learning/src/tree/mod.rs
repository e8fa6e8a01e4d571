//! Binary decision trees shared by the forest and the boosted backends.

pub mod cart;
pub mod regression;

use ndarray::ArrayView1;

use crate::{
    MlErr, Result,
    artifact::{Artifact, Tensor},
};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Rows with `x[feature] <= threshold` go to `left`, the rest to `right`.
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f32>,
    },
}

/// An arena of nodes rooted at index 0, where children are always stored after their parent.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    nodes: Vec<Node>,
    /// Total impurity decrease (or gain) contributed by each feature.
    importance: Vec<f32>,
}

impl Tree {
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn importance(&self) -> &[f32] {
        &self.importance
    }

    /// Walks the tree with `row` and returns the value of the leaf it lands on.
    pub fn leaf(&self, row: ArrayView1<f32>) -> &[f32] {
        let mut i = 0;
        loop {
            match &self.nodes[i] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => i = if row[*feature] <= *threshold { *left } else { *right },
                Node::Leaf { value } => return value,
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], i: usize) -> usize {
            match &nodes[i] {
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
                Node::Leaf { .. } => 0,
            }
        }

        walk(&self.nodes, 0)
    }
}

/// Incrementally grows a [`Tree`], reserving parents before their children are known.
pub(crate) struct TreeBuilder {
    nodes: Vec<Node>,
    importance: Vec<f32>,
}

impl TreeBuilder {
    pub(crate) fn new(n_features: usize) -> Self {
        Self {
            nodes: Vec::new(),
            importance: vec![0.0; n_features],
        }
    }

    pub(crate) fn reserve(&mut self) -> usize {
        self.nodes.push(Node::Leaf { value: Vec::new() });
        self.nodes.len() - 1
    }

    pub(crate) fn set(&mut self, id: usize, node: Node) {
        self.nodes[id] = node;
    }

    pub(crate) fn credit(&mut self, feature: usize, amount: f32) {
        self.importance[feature] += amount;
    }

    pub(crate) fn build(self) -> Tree {
        Tree {
            nodes: self.nodes,
            importance: self.importance,
        }
    }
}

/// Normalizes `values` in place so they add up to one, leaving all-zero input untouched.
pub(crate) fn normalize(values: &mut [f32]) {
    let total: f32 = values.iter().sum();
    if total > 0.0 {
        values.iter_mut().for_each(|v| *v /= total);
    }
}

/// Stores `trees` in `artifact` as a set of node arrays concatenated tree after tree, with
/// `tree_offsets` marking where each tree starts. Child indices are local to their tree and
/// `-1` marks the missing feature and children of a leaf.
pub(crate) fn pack(trees: &[Tree], value_width: usize, n_features: usize, artifact: &mut Artifact) {
    let mut offsets = vec![0.0];
    let mut features = Vec::new();
    let mut thresholds = Vec::new();
    let mut lefts = Vec::new();
    let mut rights = Vec::new();
    let mut values = Vec::new();
    let mut importance = Vec::with_capacity(trees.len() * n_features);

    for tree in trees {
        for node in &tree.nodes {
            match node {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    features.push(*feature as f32);
                    thresholds.push(*threshold);
                    lefts.push(*left as f32);
                    rights.push(*right as f32);
                    values.extend(std::iter::repeat_n(0.0, value_width));
                }
                Node::Leaf { value } => {
                    features.push(-1.0);
                    thresholds.push(0.0);
                    lefts.push(-1.0);
                    rights.push(-1.0);
                    values.extend_from_slice(value);
                }
            }
        }

        offsets.push(features.len() as f32);
        importance.extend_from_slice(&tree.importance);
    }

    let n_nodes = features.len();
    artifact.insert("tree_offsets", Tensor::vector(offsets));
    artifact.insert("node_feature", Tensor::vector(features));
    artifact.insert("node_threshold", Tensor::vector(thresholds));
    artifact.insert("node_left", Tensor::vector(lefts));
    artifact.insert("node_right", Tensor::vector(rights));
    artifact.insert(
        "node_value",
        Tensor {
            shape: vec![n_nodes, value_width],
            data: values,
        },
    );
    artifact.insert(
        "importance",
        Tensor {
            shape: vec![trees.len(), n_features],
            data: importance,
        },
    );
}

/// Rebuilds the trees stored by [`pack`], checking every index so traversal can't go astray.
pub(crate) fn unpack(artifact: &Artifact, value_width: usize, n_features: usize) -> Result<Vec<Tree>> {
    let offsets = artifact.tensor("tree_offsets")?.indices()?;
    let features = artifact.tensor("node_feature")?.indices()?;
    let thresholds = &artifact.tensor("node_threshold")?.data;
    let lefts = artifact.tensor("node_left")?.indices()?;
    let rights = artifact.tensor("node_right")?.indices()?;
    let values = &artifact.tensor("node_value")?.data;
    let importance = &artifact.tensor("importance")?.data;

    let n_nodes = features.len();
    let n_trees = offsets.len().saturating_sub(1);
    for (what, got, expected) in [
        ("thresholds", thresholds.len(), n_nodes),
        ("left children", lefts.len(), n_nodes),
        ("right children", rights.len(), n_nodes),
        ("node values", values.len(), n_nodes * value_width),
        ("importances", importance.len(), n_trees * n_features),
    ] {
        if got != expected {
            return Err(MlErr::SizeMismatch {
                what,
                got,
                expected,
            });
        }
    }

    let bad = |msg: String| MlErr::Artifact(msg);
    let mut trees = Vec::with_capacity(n_trees);

    for t in 0..n_trees {
        let (Some(start), Some(end)) = (offsets[t], offsets[t + 1]) else {
            return Err(bad(format!("tree {t} has a negative offset")));
        };
        if start >= end || end > n_nodes {
            return Err(bad(format!("tree {t} spans an invalid range {start}..{end}")));
        }

        let len = end - start;
        let mut nodes = Vec::with_capacity(len);

        for local in 0..len {
            let g = start + local;
            let node = match (features[g], lefts[g], rights[g]) {
                (Some(feature), Some(left), Some(right)) => {
                    if feature >= n_features {
                        return Err(bad(format!("tree {t} splits on unknown feature {feature}")));
                    }
                    if left <= local || right <= local || left >= len || right >= len {
                        return Err(bad(format!("tree {t} node {local} has invalid children")));
                    }

                    Node::Split {
                        feature,
                        threshold: thresholds[g],
                        left,
                        right,
                    }
                }
                (None, None, None) => Node::Leaf {
                    value: values[g * value_width..(g + 1) * value_width].to_vec(),
                },
                _ => return Err(bad(format!("tree {t} node {local} is malformed"))),
            };

            nodes.push(node);
        }

        trees.push(Tree {
            nodes,
            importance: importance[t * n_features..(t + 1) * n_features].to_vec(),
        });
    }

    Ok(trees)
}
