use std::cmp::Reverse;

use libtetris::{GameState, LockResult, Piece};
use ordered_float::OrderedFloat;
use rand::distributions::WeightedIndex;
use rand::prelude::*;

use crate::evaluation::Evaluator;
use crate::moves::{self, Placement};

/// Index of the root in the node arena.
pub const ROOT: usize = 0;

/// Search tree over game states, stored as an arena of nodes addressed by index.
///
/// A node owns its children through their indices and only refers back to its parent. Children
/// that topped out, and children whose whole subtree turned out to top out, are moved into their
/// parent's `orphans`: they can't be selected or become the best line, but still show up when
/// the candidates are listed.
pub struct Tree {
    nodes: Vec<Node>,
    backbuffer: Vec<Node>,
    use_hold: bool,
}

#[derive(Clone, Debug)]
pub struct Node {
    pub parent: Option<usize>,
    /// Live children, sorted best first once the node has been backpropagated through.
    pub children: Vec<usize>,
    pub orphans: Vec<usize>,
    /// The placement that led here from the parent and what it did. `None` for the root.
    pub arrival: Option<(Placement, LockResult)>,
    pub state: GameState,
    pub value: f64,
    pub dead: bool,
    pub expanded: bool,
}

impl Tree {
    pub fn new(state: GameState, use_hold: bool) -> Self {
        Tree {
            nodes: vec![Node::root(state, 0.0)],
            backbuffer: vec![],
            use_hold,
        }
    }

    pub fn node(&self, id: usize) -> &Node {
        &self.nodes[id]
    }

    pub fn root(&self) -> &Node {
        &self.nodes[ROOT]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the root has been expanded and every move from it tops out.
    pub fn is_dead(&self) -> bool {
        let root = self.root();
        root.expanded && root.children.is_empty()
    }

    /// Walks down from the root, picking among the children of each node with weight
    /// 1/(rank+1)^2, until it reaches a node without live children.
    pub fn select(&self, rng: &mut impl Rng) -> usize {
        let mut current = ROOT;
        loop {
            let children = &self.nodes[current].children;
            if children.is_empty() {
                return current;
            }
            let weights = (0..children.len()).map(|rank| 1.0 / ((rank + 1) * (rank + 1)) as f64);
            let index = WeightedIndex::new(weights)
                .map(|sampler| rng.sample(sampler))
                .unwrap_or(0);
            current = children[index];
        }
    }

    /// Generates and evaluates the children of a leaf. Returns false if there was nothing to do,
    /// either because the node is already expanded or because it has run out of pieces.
    pub fn expand(&mut self, node: usize, eval: &impl Evaluator) -> bool {
        if self.nodes[node].expanded || self.nodes[node].state.queue.is_empty() {
            return false;
        }

        let placements = moves::find_placements(&self.nodes[node].state, self.use_hold);
        for mv in placements {
            let (state, lock) = self.nodes[node].state.apply(&mv.location, mv.source);
            let value = eval.evaluate(&state);
            let dead = lock.topped_out;
            let id = self.nodes.len();
            self.nodes.push(Node {
                parent: Some(node),
                children: vec![],
                orphans: vec![],
                arrival: Some((mv, lock)),
                state,
                value,
                dead,
                expanded: false,
            });
            if dead {
                self.nodes[node].orphans.push(id);
            } else {
                self.nodes[node].children.push(id);
            }
        }
        self.nodes[node].expanded = true;
        true
    }

    /// Walks from `node` up to the root, sorting every node's children best first and taking
    /// the value of the best one.
    pub fn backprop(&mut self, node: usize) {
        let mut current = Some(node);
        while let Some(id) = current {
            let parent = self.nodes[id].parent;
            if self.nodes[id].children.is_empty() {
                if self.nodes[id].expanded {
                    if let Some(p) = parent {
                        // Path is death; prune
                        self.nodes[id].dead = true;
                        let siblings = &mut self.nodes[p].children;
                        siblings.retain(|&c| c != id);
                        self.nodes[p].orphans.push(id);
                    }
                }
            } else {
                let mut children = std::mem::take(&mut self.nodes[id].children);
                let nodes = &self.nodes;
                children.sort_by_key(|&c| Reverse(OrderedFloat(nodes[c].value)));
                self.nodes[id].value = self.nodes[children[0]].value;
                self.nodes[id].children = children;
            }
            current = parent;
        }
    }

    /// Root children best first, followed by the orphaned ones.
    pub fn candidates(&self) -> impl Iterator<Item = &Node> {
        let root = self.root();
        root.children
            .iter()
            .chain(root.orphans.iter())
            .map(move |&id| &self.nodes[id])
    }

    /// The chain of best children from the root down to a leaf.
    pub fn plan(&self) -> Vec<&Node> {
        let mut plan = vec![];
        let mut current = ROOT;
        while let Some(&best) = self.nodes[current].children.first() {
            plan.push(&self.nodes[best]);
            current = best;
        }
        plan
    }

    /// Makes the root child reached by `mv` the new root, keeping its subtree. Returns false if
    /// no child matches, leaving the tree untouched.
    pub fn advance(&mut self, mv: &Placement) -> bool {
        let root = self.root();
        let child = root
            .children
            .iter()
            .chain(root.orphans.iter())
            .copied()
            .find(|&id| self.nodes[id].placement().map_or(false, |m| m.same_move(mv)));
        match child {
            Some(child) => {
                self.gc(child);
                true
            }
            None => false,
        }
    }

    /// Replaces the whole tree with a single unexpanded root.
    pub fn rebuild(&mut self, state: GameState) {
        self.nodes.clear();
        self.nodes.push(Node::root(state, 0.0));
    }

    /// Appends a newly revealed piece to every state in the tree. Leaves that ran out of pieces
    /// become expandable again.
    pub fn add_next_piece(&mut self, piece: Piece) {
        for node in &mut self.nodes {
            node.state.add_next_piece(piece);
        }
    }

    /// Copies the subtree under `new_root` into the backbuffer and swaps it in.
    fn gc(&mut self, new_root: usize) {
        self.backbuffer.clear();
        self.backbuffer.push(Node {
            parent: None,
            arrival: None,
            children: vec![],
            orphans: vec![],
            ..self.nodes[new_root].clone()
        });

        let mut stack = vec![(ROOT, new_root)];
        while let Some((new, orig)) = stack.pop() {
            // Remaining work for this node is to copy children over.
            let old = &self.nodes;
            let children = copy(&mut stack, &old[orig].children, new, old, &mut self.backbuffer);
            let orphans = copy(&mut stack, &old[orig].orphans, new, old, &mut self.backbuffer);
            self.backbuffer[new].children = children;
            self.backbuffer[new].orphans = orphans;
        }

        std::mem::swap(&mut self.nodes, &mut self.backbuffer);
        self.backbuffer.clear();

        fn copy(
            stack: &mut Vec<(usize, usize)>,
            copying: &[usize],
            new: usize,
            old: &[Node],
            nodes: &mut Vec<Node>,
        ) -> Vec<usize> {
            let mut ids = Vec::with_capacity(copying.len());
            for &child in copying {
                let idx = nodes.len();
                nodes.push(Node {
                    parent: Some(new),
                    children: vec![],
                    orphans: vec![],
                    ..old[child].clone()
                });
                stack.push((idx, child));
                ids.push(idx);
            }
            ids
        }
    }
}

impl Node {
    fn root(state: GameState, value: f64) -> Self {
        Node {
            parent: None,
            children: vec![],
            orphans: vec![],
            arrival: None,
            state,
            value,
            dead: false,
            expanded: false,
        }
    }

    pub fn placement(&self) -> Option<&Placement> {
        self.arrival.as_ref().map(|(mv, _)| mv)
    }
}
