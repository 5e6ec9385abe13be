//! Poseidon-2 Merkle tree over hand-class leaves.
//!
//! Both tables are committed under the same shape: leaves padded with zero
//! to 2^13, hashed pairwise to a single root. A hand-eval proof carries the
//! 13 siblings of its class leaf.

use crate::crypto::poseidon::hash_two;
use crate::crypto::BaseField;
use ark_ff::Zero;

/// log2 of the padded leaf count.
pub const TREE_DEPTH: usize = 13;

#[derive(Clone, Debug)]
pub struct MerkleTree {
    /// `levels[0]` is the padded leaf layer; the last level is the root.
    levels: Vec<Vec<BaseField>>,
    depth: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerklePath {
    pub leaf_index: usize,
    /// Sibling per level, leaf layer first.
    pub siblings: Vec<BaseField>,
}

impl MerkleTree {
    /// Builds a depth-`depth` tree over the given leaves, zero-padded.
    pub fn with_depth(mut leaves: Vec<BaseField>, depth: usize) -> Self {
        let width = 1usize << depth;
        assert!(
            leaves.len() <= width,
            "{} leaves exceed capacity {}",
            leaves.len(),
            width
        );
        leaves.resize(width, BaseField::zero());

        let mut levels = vec![leaves];
        for _ in 0..depth {
            let below = levels.last().unwrap();
            let above: Vec<BaseField> = below
                .chunks(2)
                .map(|pair| hash_two(pair[0], pair[1]))
                .collect();
            levels.push(above);
        }
        Self { levels, depth }
    }

    /// The standard shape for hand-rank tables.
    pub fn from_leaves(leaves: Vec<BaseField>) -> Self {
        Self::with_depth(leaves, TREE_DEPTH)
    }

    pub fn root(&self) -> BaseField {
        self.levels[self.depth][0]
    }

    pub fn path(&self, leaf_index: usize) -> Option<MerklePath> {
        if leaf_index >= self.levels[0].len() {
            return None;
        }
        let mut siblings = Vec::with_capacity(self.depth);
        let mut index = leaf_index;
        for level in 0..self.depth {
            siblings.push(self.levels[level][index ^ 1]);
            index >>= 1;
        }
        Some(MerklePath {
            leaf_index,
            siblings,
        })
    }
}

/// Recomputes the root from a leaf and its sibling path.
pub fn verify_path(root: BaseField, leaf: BaseField, path: &MerklePath) -> bool {
    let mut acc = leaf;
    let mut index = path.leaf_index;
    for sibling in &path.siblings {
        acc = if index & 1 == 0 {
            hash_two(acc, *sibling)
        } else {
            hash_two(*sibling, acc)
        };
        index >>= 1;
    }
    acc == root
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves(n: u64) -> Vec<BaseField> {
        (1..=n).map(BaseField::from).collect()
    }

    #[test]
    fn every_leaf_verifies_against_the_root() {
        let tree = MerkleTree::with_depth(leaves(5), 3);
        let root = tree.root();
        for (i, leaf) in leaves(5).into_iter().enumerate() {
            let path = tree.path(i).unwrap();
            assert!(verify_path(root, leaf, &path));
        }
        // Padding leaves verify too; their pre-image is the zero field element.
        let path = tree.path(7).unwrap();
        assert!(verify_path(root, BaseField::zero(), &path));
    }

    #[test]
    fn wrong_leaf_fails() {
        let tree = MerkleTree::with_depth(leaves(4), 2);
        let path = tree.path(2).unwrap();
        assert!(!verify_path(tree.root(), BaseField::from(99u64), &path));
    }

    #[test]
    fn path_index_is_positional() {
        let tree = MerkleTree::with_depth(leaves(4), 2);
        let path_a = tree.path(1).unwrap();
        // Leaf 2's value under leaf 1's path must not verify.
        assert!(!verify_path(tree.root(), BaseField::from(3u64), &path_a));
    }

    #[test]
    fn hand_class_trees_have_the_pinned_shape() {
        use crate::ranking::tables::tables;
        // Building the full 8192-leaf tree is exercised in the table module's
        // integration test; here we pin the leaf hashing convention on a
        // prefix so the test stays fast.
        let t = tables();
        let prefix: Vec<BaseField> = t.flush[..8]
            .iter()
            .map(|class| class.leaf_hash().unwrap())
            .collect();
        let tree = MerkleTree::with_depth(prefix.clone(), 3);
        let path = tree.path(0).unwrap();
        assert!(verify_path(tree.root(), prefix[0], &path));
    }
}
