//! Distributed neighbor-joining.
//!
//! Every iteration must end with all ranks agreeing on one merge. Each
//! computing rank scans its partition of the active-pair combinations for a
//! local best join candidate; an all-reduce with the [`closest`] operator
//! then selects the global winner identically on every rank, and everyone
//! applies the same merge to its bookkeeping. Divergent per-rank choices are
//! impossible by construction.
//!
//! The candidate comparison keeps the pair with the larger recorded Q value
//! (strict `>`). The matrix entries flowing in are alignment scores, i.e. a
//! similarity-oriented convention; the comparison direction matches it and
//! is covered by the hand-computed tests below. Distance values are not
//! validated: a malformed entry propagates through the arithmetic.

use anyhow::Result;

use crate::cluster::partition;
use crate::context::Context;
use crate::matrix::DistanceMatrix;
use crate::phylogeny::tree::{GuideTree, NodeHandle};

/// A transient merge proposal: two positions into the shared active-node
/// list (`x > y`), their joinability value and, once raised by the proposing
/// rank, the branch lengths toward each child.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoinCandidate {
    pub x: u32,
    pub y: u32,
    pub q: f64,
    pub delta: [f64; 2],
}

impl JoinCandidate {
    /// The reduction identity: loses against any real candidate.
    pub fn sentinel() -> Self {
        JoinCandidate {
            x: 0,
            y: 0,
            q: f64::NEG_INFINITY,
            delta: [0.0, 0.0],
        }
    }
}

/// Reduction operator selecting the winning candidate: keeps the one with
/// the larger Q value; on a tie the second operand wins, since the
/// comparison is strict. Associative and commutative over distinct values.
pub fn closest(a: JoinCandidate, b: JoinCandidate) -> JoinCandidate {
    if a.q > b.q {
        a
    } else {
        b
    }
}

/// Neighbor-joining bookkeeping, maintained identically on every rank.
struct State {
    matrix: DistanceMatrix,
    /// Total divergence per slot: sum of distances to all other active slots.
    cache: Vec<f64>,
    /// Active matrix slots; a slot is retired when its node is merged away.
    active: Vec<usize>,
    /// Tree handle currently occupying each slot.
    map: Vec<NodeHandle>,
}

/// Builds the guide tree for `count` leaves from the distance matrix.
///
/// Iterates until exactly one active node remains; `count` leaves produce
/// exactly `count - 1` internal nodes, the last of which is the root.
pub fn run(ctx: &Context, matrix: &DistanceMatrix, count: usize) -> Result<GuideTree> {
    let mut tree = GuideTree::with_leaves(count);

    if count == 0 {
        return Ok(tree);
    }
    if count == 1 {
        tree.set_root(0);
        return Ok(tree);
    }

    let mut state = State {
        cache: init_cache(matrix, count),
        matrix: matrix.clone(),
        active: (0..count).collect(),
        map: (0..count as NodeHandle).collect(),
    };

    while state.active.len() > 2 {
        let m = state.active.len();
        let total = m * (m - 1) / 2;

        // Only computing ranks vote; the coordinator (and any worker beyond
        // the useful width) contributes the reduction identity.
        let local = match ctx.comm.worker_index() {
            Some(worker) => {
                let workers = ctx.comm.worker_count().min(m - 1);
                if worker < workers {
                    let (offset, len) = partition(total, workers, worker);
                    pick_joinable(&state, m, offset, len)
                } else {
                    JoinCandidate::sentinel()
                }
            }
            None => JoinCandidate::sentinel(),
        };

        let vote = ctx.comm.allreduce_candidate(local, closest)?;
        join_pair(&mut state, &mut tree, &vote);
    }

    // The divergence correction is undefined for the final pair; its
    // distance is split evenly between the two remaining nodes.
    let (x, y) = (state.active[0], state.active[1]);
    let half = 0.5 * state.matrix.get(x, y);
    let root = tree.join(state.map[x], half, state.map[y], half);
    tree.set_root(root);

    Ok(tree)
}

/// Sums each slot's distances to every other slot.
fn init_cache(matrix: &DistanceMatrix, count: usize) -> Vec<f64> {
    let mut cache = vec![0.0; count];
    for x in 1..count {
        for y in 0..x {
            let distance = matrix.get(x, y);
            cache[x] += distance;
            cache[y] += distance;
        }
    }
    cache
}

/// Decodes a combination offset into its pair of positions `(x, y)`,
/// `x > y`, following the packed enumeration order.
fn offset_to_pair(offset: usize) -> (usize, usize) {
    let mut x = ((1.0 + (1.0 + 8.0 * offset as f64).sqrt()) / 2.0) as usize;
    x = x.max(1);
    while x * (x - 1) / 2 > offset {
        x -= 1;
    }
    while (x + 1) * x / 2 <= offset {
        x += 1;
    }
    (x, offset - x * (x - 1) / 2)
}

/// Scans `len` combinations starting at `offset` for the local best
/// candidate, then raises it with its branch-length deltas.
fn pick_joinable(state: &State, m: usize, offset: usize, len: usize) -> JoinCandidate {
    let mut chosen = JoinCandidate::sentinel();
    let (mut x, mut y) = offset_to_pair(offset);

    for _ in 0..len {
        let (sx, sy) = (state.active[x], state.active[y]);
        let q = (m as f64 - 2.0) * state.matrix.get(sx, sy) - state.cache[sx] - state.cache[sy];

        if q > chosen.q {
            chosen = JoinCandidate {
                x: x as u32,
                y: y as u32,
                q,
                delta: [0.0, 0.0],
            };
        }

        y += 1;
        if y == x {
            x += 1;
            y = 0;
        }
    }

    raise_candidate(state, m, chosen)
}

/// Completes a candidate with the branch lengths toward each child; the
/// other ranks cannot derive them from the reduced pair alone.
fn raise_candidate(state: &State, m: usize, mut candidate: JoinCandidate) -> JoinCandidate {
    if candidate.q == f64::NEG_INFINITY {
        return candidate;
    }

    let x = state.active[candidate.x as usize];
    let y = state.active[candidate.y as usize];
    let distance = state.matrix.get(x, y);

    let dx = 0.5 * distance + (state.cache[x] - state.cache[y]) / (2.0 * (m as f64 - 2.0));
    candidate.delta = [dx, distance - dx];
    candidate
}

/// Applies the agreed merge: creates the internal node, reuses slot `x` for
/// the merged node's distances and retires slot `y`.
fn join_pair(state: &mut State, tree: &mut GuideTree, vote: &JoinCandidate) {
    let xp = vote.x as usize;
    let yp = vote.y as usize;
    let x = state.active[xp];
    let y = state.active[yp];

    let parent = tree.join(state.map[x], vote.delta[0], state.map[y], vote.delta[1]);

    let joined = state.matrix.get(x, y);
    let mut new_sum = 0.0;

    for &slot in &state.active {
        if slot == x || slot == y {
            continue;
        }
        let previous = state.matrix.get(slot, x) + state.matrix.get(slot, y);
        let current = 0.5 * (previous - joined);
        state.matrix.set(slot, x, current);
        state.cache[slot] += current - previous;
        new_sum += current;
    }

    state.cache[x] = new_sum;
    state.map[x] = parent;
    state.active.remove(yp);
}
