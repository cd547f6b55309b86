//! Cluster-tree node bookkeeping.
//!
//! A [`Cluster`] records the density interval over which a group of points
//! held together: the mutual-reachability threshold at which it was born, the
//! threshold at which it lost its last point, and the stability accumulated
//! as points peeled off in between. Parent links are labels into the owning
//! cluster vector, never references, so the tree carries no ownership cycles.

use std::collections::BTreeSet;

use crate::error::EngawaError;

#[derive(Clone, Debug)]
pub(crate) struct Cluster {
    label: usize,
    birth_level: f64,
    death_level: f64,
    num_points: i64,
    offset: i64,
    stability: f64,
    propagated_stability: f64,
    propagated_lowest_child_death_level: f64,
    num_constraints_satisfied: u64,
    propagated_num_constraints_satisfied: u64,
    parent: Option<usize>,
    has_children: bool,
    virtual_child_points: BTreeSet<usize>,
    propagated_descendants: Vec<usize>,
}

impl Cluster {
    pub(crate) fn new(
        label: usize,
        parent: Option<usize>,
        birth_level: f64,
        num_points: i64,
    ) -> Self {
        Self {
            label,
            birth_level,
            death_level: 0.0,
            num_points,
            offset: 0,
            stability: 0.0,
            propagated_stability: 0.0,
            propagated_lowest_child_death_level: f64::INFINITY,
            num_constraints_satisfied: 0,
            propagated_num_constraints_satisfied: 0,
            parent,
            has_children: false,
            virtual_child_points: BTreeSet::new(),
            propagated_descendants: Vec::new(),
        }
    }

    pub(crate) const fn label(&self) -> usize {
        self.label
    }

    pub(crate) const fn birth_level(&self) -> f64 {
        self.birth_level
    }

    pub(crate) const fn death_level(&self) -> f64 {
        self.death_level
    }

    pub(crate) const fn stability(&self) -> f64 {
        self.stability
    }

    pub(crate) const fn offset(&self) -> i64 {
        self.offset
    }

    pub(crate) fn set_offset(&mut self, offset: i64) {
        self.offset = offset;
    }

    pub(crate) const fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub(crate) const fn has_children(&self) -> bool {
        self.has_children
    }

    pub(crate) fn mark_has_children(&mut self) {
        self.has_children = true;
    }

    pub(crate) const fn propagated_lowest_child_death_level(&self) -> f64 {
        self.propagated_lowest_child_death_level
    }

    pub(crate) fn propagated_descendants(&self) -> &[usize] {
        &self.propagated_descendants
    }

    /// Removes `count` points at density threshold `level`, accumulating the
    /// excess-of-mass stability contribution. The root is born at a NaN
    /// threshold and contributes no stability.
    pub(crate) fn detach_points(&mut self, count: i64, level: f64) -> Result<(), EngawaError> {
        self.num_points -= count;
        if !self.birth_level.is_nan() {
            self.stability += count as f64 * (1.0 / level - 1.0 / self.birth_level);
        }

        if self.num_points == 0 {
            self.death_level = level;
        } else if self.num_points < 0 {
            return Err(EngawaError::NegativePointCount {
                label: self.label,
                points: self.num_points,
            });
        }
        Ok(())
    }

    /// Records points that fell off as noise while still attributable to this
    /// cluster; used by the constraint-satisfaction hook.
    pub(crate) fn add_virtual_child_points(&mut self, points: impl IntoIterator<Item = usize>) {
        self.virtual_child_points.extend(points);
    }

    #[cfg(test)]
    pub(crate) fn virtual_child_contains(&self, point: usize) -> bool {
        self.virtual_child_points.contains(&point)
    }

    /// Resolves the lowest descendant death level once this cluster is being
    /// propagated; a still-infinite value means no descendant died before it.
    pub(crate) fn settle_lowest_child_death_level(&mut self) {
        if self.propagated_lowest_child_death_level == f64::INFINITY {
            self.propagated_lowest_child_death_level = self.death_level;
        }
    }

    /// Folds this cluster's propagated totals into its parent, choosing
    /// between the cluster itself and its already-chosen descendants.
    pub(crate) fn propagate_into(&self, parent: &mut Self) {
        if self.propagated_lowest_child_death_level < parent.propagated_lowest_child_death_level {
            parent.propagated_lowest_child_death_level = self.propagated_lowest_child_death_level;
        }

        if !self.has_children
            || self.num_constraints_satisfied > self.propagated_num_constraints_satisfied
        {
            parent.propagated_num_constraints_satisfied += self.num_constraints_satisfied;
            parent.propagated_stability += self.stability;
            parent.propagated_descendants.push(self.label);
        } else if self.num_constraints_satisfied < self.propagated_num_constraints_satisfied {
            parent.propagated_num_constraints_satisfied += self.propagated_num_constraints_satisfied;
            parent.propagated_stability += self.propagated_stability;
            parent
                .propagated_descendants
                .extend(self.propagated_descendants.iter().copied());
        } else {
            // Tie on satisfied constraints: the side with greater stability
            // wins, preferring the cluster itself on an exact tie.
            if self.stability >= self.propagated_stability {
                parent.propagated_num_constraints_satisfied += self.num_constraints_satisfied;
                parent.propagated_stability += self.stability;
                parent.propagated_descendants.push(self.label);
            } else {
                parent.propagated_num_constraints_satisfied +=
                    self.propagated_num_constraints_satisfied;
                parent.propagated_stability += self.propagated_stability;
                parent
                    .propagated_descendants
                    .extend(self.propagated_descendants.iter().copied());
            }
        }
    }

    #[cfg(test)]
    pub(crate) const fn propagated_stability(&self) -> f64 {
        self.propagated_stability
    }

    #[cfg(test)]
    pub(crate) const fn num_points(&self) -> i64 {
        self.num_points
    }
}
