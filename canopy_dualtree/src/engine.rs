// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Generic multi-tree traversal with deferred contributions.
//!
//! A [`Traversal`] walks tuples of `K` nodes drawn from `K` trees, starting
//! from the tuple of roots. At each tuple it asks the [`Problem`] for a
//! provable bound on the tuple's contribution (the *delta*) and whether that
//! bound is tight enough to commit without looking at individual points. A
//! committed delta is parked on the receiving nodes as a *postponed*
//! contribution and pushed towards the leaves lazily. Otherwise the engine
//! either evaluates all point combinations exactly (every node is a leaf) or
//! splits every internal node and recurses over the child combinations.
//!
//! Per-node *summaries* bound the eventual value of every point below a node,
//! excluding that node's own postponed contribution. They are rebuilt from
//! the children after each recursion and from the points after each base
//! case, and may only tighten over a run; a run that loosens one panics.

use alloc::vec;
use alloc::vec::Vec;
use core::fmt::Debug;

use canopy_kdtree::{KdTree, Node, NodeId};

bitflags::bitflags! {
    /// A set of positions within a node tuple.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Positions: u8 {
        /// The first position.
        const FIRST  = 0b0000_0001;
        /// The second position.
        const SECOND = 0b0000_0010;
        /// The third position.
        const THIRD  = 0b0000_0100;
    }
}

impl Positions {
    /// The set holding only `position`.
    pub fn at(position: usize) -> Self {
        Self::from_bits_truncate(1_u8 << position)
    }

    /// Whether `position` is in the set.
    pub fn has(self, position: usize) -> bool {
        self.contains(Self::at(position))
    }
}

/// Per-run state of one node of the receiving tree.
#[derive(Clone, Debug)]
pub struct NodeState<S, P> {
    /// Bound on the eventual value of every point below the node, excluding
    /// [`NodeState::postponed`].
    pub summary: S,
    /// Committed contributions not yet pushed to the children.
    pub postponed: P,
}

/// State of one node in a traversal of problem `R`.
pub type StateOf<R, const K: usize> =
    NodeState<<R as Problem<K>>::Summary, <R as Problem<K>>::Postponed>;

/// A pruning problem over tuples of `K` nodes.
///
/// The data types are plain aggregates; all behavior lives here. Receiving
/// positions (see [`Problem::receivers`]) must all refer to the first tree,
/// whose points the results are indexed by.
pub trait Problem<const K: usize> {
    /// Build-time node statistic of the trees.
    type Stat;
    /// Per-point payload of the trees.
    type Payload;
    /// Bound on the contribution of one tuple.
    type Delta;
    /// Committed but unflushed contributions on a node.
    type Postponed: Clone;
    /// Bound on the eventual values of the points below a node.
    type Summary: Clone;
    /// Per-point result accumulator.
    type Point: Clone;

    /// Positions whose nodes receive contributions.
    fn receivers(&self) -> Positions;

    /// Whether the tuple should be visited. Symmetric problems reject all but
    /// one ordering of each node multiset.
    fn is_canonical(&self, _nodes: &[&Node<Self::Stat>; K]) -> bool {
        true
    }

    /// Result of a point before any contribution.
    fn initial_point(&self) -> Self::Point;

    /// The empty postponed contribution.
    fn zero_postponed(&self) -> Self::Postponed;

    /// Summary of a node before any contribution.
    fn initial_summary(&self) -> Self::Summary;

    /// Identity of [`Problem::accumulate`].
    fn empty_summary(&self) -> Self::Summary;

    /// Provable bound on the contribution of every point combination drawn
    /// from `nodes`.
    fn compute_delta(&self, nodes: &[&Node<Self::Stat>; K]) -> Self::Delta;

    /// Whether `delta` may be committed without further refinement.
    ///
    /// `states[p]` is present for each position that receives `delta`, and
    /// absent for non-receiving positions and for repeats of a node already
    /// present at an earlier position.
    fn can_summarize(
        &self,
        nodes: &[&Node<Self::Stat>; K],
        delta: &Self::Delta,
        states: &[Option<&StateOf<Self, K>>; K],
    ) -> bool;

    /// Commit the share of `delta` received at `position`.
    fn apply_delta(&self, postponed: &mut Self::Postponed, delta: &Self::Delta, position: usize);

    /// Merge `from` into `into`.
    fn apply_postponed(&self, into: &mut Self::Postponed, from: &Self::Postponed);

    /// Exact contribution of every point combination drawn from leaf `nodes`.
    ///
    /// `points` is indexed by position in the first tree.
    fn base_case(
        &self,
        trees: &[&KdTree<Self::Stat, Self::Payload>; K],
        nodes: &[&Node<Self::Stat>; K],
        points: &mut [Self::Point],
    );

    /// Fold a postponed contribution into one point.
    fn flush(&self, point: &mut Self::Point, postponed: &Self::Postponed);

    /// Summary of a leaf from the results of its points.
    fn summarize(&self, points: &[Self::Point]) -> Self::Summary;

    /// Widen `into` by a child's summary with its postponed contribution applied.
    fn accumulate(&self, into: &mut Self::Summary, summary: &Self::Summary, postponed: &Self::Postponed);

    /// Whether `after` is at least as tight as `before`.
    fn is_tightened(&self, before: &Self::Summary, after: &Self::Summary) -> bool;
}

/// Counters describing one traversal run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TraversalStats {
    /// Tuples reached, including non-canonical ones.
    pub tuples_visited: u64,
    /// Tuples rejected as non-canonical.
    pub non_canonical: u64,
    /// Tuples committed from their delta.
    pub prunes: u64,
    /// Tuples of leaves evaluated exactly.
    pub base_cases: u64,
}

/// Per-point results of a run, in the first tree's order.
#[derive(Clone, Debug)]
pub struct TraversalOutput<P> {
    /// One result per point of the first tree.
    pub points: Vec<P>,
    /// Run counters.
    pub stats: TraversalStats,
}

/// One run of a [`Problem`] over `K` trees.
///
/// The trees are borrowed immutably; all mutable state lives in the
/// traversal and is discarded with it.
pub struct Traversal<'a, R: Problem<K>, const K: usize> {
    problem: &'a R,
    trees: [&'a KdTree<R::Stat, R::Payload>; K],
    receivers: Positions,
    states: Vec<StateOf<R, K>>,
    points: Vec<R::Point>,
    stats: TraversalStats,
}

impl<R: Problem<K>, const K: usize> Debug for Traversal<'_, R, K> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Traversal")
            .field("arity", &K)
            .field("receivers", &self.receivers)
            .field("nodes", &self.states.len())
            .field("points", &self.points.len())
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<'a, R: Problem<K>, const K: usize> Traversal<'a, R, K> {
    /// Prepare a run with fresh node states and point results.
    ///
    /// # Panics
    ///
    /// If `K` is not 1, 2 or 3, or a receiving position uses a tree other
    /// than the first.
    pub fn new(problem: &'a R, trees: [&'a KdTree<R::Stat, R::Payload>; K]) -> Self {
        assert!((1..=3).contains(&K), "traversals span one to three trees, got {K}");
        let receivers = problem.receivers();
        for (p, tree) in trees.iter().enumerate() {
            assert!(
                !receivers.has(p) || core::ptr::eq(*tree, trees[0]),
                "receiving position {p} must use the first tree"
            );
        }
        let state = NodeState {
            summary: problem.initial_summary(),
            postponed: problem.zero_postponed(),
        };
        Self {
            problem,
            trees,
            receivers,
            states: vec![state; trees[0].num_nodes()],
            points: vec![problem.initial_point(); trees[0].len()],
            stats: TraversalStats::default(),
        }
    }

    /// Run to completion and flush every postponed contribution to the points.
    pub fn run(mut self) -> TraversalOutput<R::Point> {
        let roots = self.trees.map(|t| t.root());
        self.visit(roots);
        self.finalize();
        log::debug!(
            "traversal of {} points finished: {} tuples ({} non-canonical), {} prunes, {} base cases",
            self.points.len(),
            self.stats.tuples_visited,
            self.stats.non_canonical,
            self.stats.prunes,
            self.stats.base_cases,
        );
        TraversalOutput {
            points: self.points,
            stats: self.stats,
        }
    }

    fn visit(&mut self, ids: [NodeId; K]) {
        let problem = self.problem;
        let trees = self.trees;
        let nodes: [&'a Node<R::Stat>; K] = core::array::from_fn(|p| trees[p].node(ids[p]));
        self.stats.tuples_visited += 1;
        if !problem.is_canonical(&nodes) {
            self.stats.non_canonical += 1;
            return;
        }

        let owners = self.owners(&ids);
        let delta = problem.compute_delta(&nodes);
        let states: [Option<&StateOf<R, K>>; K] =
            core::array::from_fn(|p| owners.has(p).then(|| &self.states[ids[p].get()]));
        if problem.can_summarize(&nodes, &delta, &states) {
            for (p, id) in ids.iter().enumerate() {
                if owners.has(p) {
                    problem.apply_delta(&mut self.states[id.get()].postponed, &delta, p);
                }
            }
            self.stats.prunes += 1;
            log::trace!("committed tuple {ids:?}");
            return;
        }

        if nodes.iter().all(|n| n.is_leaf()) {
            self.stats.base_cases += 1;
            problem.base_case(&trees, &nodes, &mut self.points);
            for (p, node) in nodes.iter().enumerate() {
                if owners.has(p) {
                    let summary = problem.summarize(&self.points[node.range()]);
                    self.replace_summary(ids[p], summary, None);
                }
            }
            return;
        }

        let children: [Option<[NodeId; 2]>; K] = core::array::from_fn(|p| nodes[p].children());
        let mut split = Positions::empty();
        for (p, c) in children.iter().enumerate() {
            if c.is_some() {
                split |= Positions::at(p);
            }
        }

        // Parents hand their committed work to their children before the
        // children are visited.
        let mut before: [Option<R::Summary>; K] = core::array::from_fn(|_| None);
        for p in 0..K {
            if let (true, Some(c)) = (owners.has(p), children[p]) {
                before[p] = Some(self.effective(ids[p]));
                self.push_down(ids[p], c);
            }
        }

        let mask = usize::from(split.bits());
        for combo in 0..(1_usize << K) {
            if combo & !mask != 0 {
                continue;
            }
            let next: [NodeId; K] = core::array::from_fn(|p| match children[p] {
                Some(c) => c[(combo >> p) & 1],
                None => ids[p],
            });
            self.visit(next);
        }

        for p in 0..K {
            if let (true, Some(c)) = (owners.has(p), children[p]) {
                let summary = self.gather(c);
                self.replace_summary(ids[p], summary, before[p].take());
            }
        }
    }

    /// Receiving positions, keeping only the first position of each node.
    fn owners(&self, ids: &[NodeId; K]) -> Positions {
        let mut owners = Positions::empty();
        for p in 0..K {
            let repeat = (0..p).any(|q| owners.has(q) && ids[q] == ids[p]);
            if self.receivers.has(p) && !repeat {
                owners |= Positions::at(p);
            }
        }
        owners
    }

    fn push_down(&mut self, id: NodeId, children: [NodeId; 2]) {
        let pending = core::mem::replace(
            &mut self.states[id.get()].postponed,
            self.problem.zero_postponed(),
        );
        for c in children {
            self.problem
                .apply_postponed(&mut self.states[c.get()].postponed, &pending);
        }
    }

    fn gather(&self, children: [NodeId; 2]) -> R::Summary {
        let mut summary = self.problem.empty_summary();
        for c in children {
            let state = &self.states[c.get()];
            self.problem
                .accumulate(&mut summary, &state.summary, &state.postponed);
        }
        summary
    }

    /// Summary of a node with its own postponed contribution applied.
    fn effective(&self, id: NodeId) -> R::Summary {
        let state = &self.states[id.get()];
        let mut summary = self.problem.empty_summary();
        self.problem
            .accumulate(&mut summary, &state.summary, &state.postponed);
        summary
    }

    /// Install a rebuilt summary. `before` is the node's effective summary
    /// from before its postponed contribution moved, if it did.
    ///
    /// # Panics
    ///
    /// If the effective summary loosened.
    fn replace_summary(&mut self, id: NodeId, summary: R::Summary, before: Option<R::Summary>) {
        let before = before.unwrap_or_else(|| self.effective(id));
        let mut after = self.problem.empty_summary();
        self.problem
            .accumulate(&mut after, &summary, &self.states[id.get()].postponed);
        assert!(
            self.problem.is_tightened(&before, &after),
            "summary of node {} loosened",
            id.get()
        );
        self.states[id.get()].summary = summary;
    }

    /// Push every remaining postponed contribution down to the leaves and
    /// into the points, once per leaf.
    fn finalize(&mut self) {
        let tree = self.trees[0];
        let mut stack = vec![(tree.root(), self.problem.zero_postponed())];
        while let Some((id, inherited)) = stack.pop() {
            let mut pending = core::mem::replace(
                &mut self.states[id.get()].postponed,
                self.problem.zero_postponed(),
            );
            self.problem.apply_postponed(&mut pending, &inherited);
            let node = tree.node(id);
            match node.children() {
                Some([left, right]) => {
                    stack.push((left, pending.clone()));
                    stack.push((right, pending));
                }
                None => {
                    for point in &mut self.points[node.range()] {
                        self.problem.flush(point, &pending);
                    }
                }
            }
        }
    }
}
