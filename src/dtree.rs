// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Binary decision tree execution.
//!
//! A __decision__ is a named check that answers yes or no, with an optional
//! successor decision hanging off of each answer. Walking a tree of decisions
//! from its root executes exactly one root-to-terminal path: each check picks
//! the branch to descend into, a missing branch ends the walk, and the first
//! check that fails aborts the whole walk with its error untouched.
//!
//! The engine knows nothing about what the checks do. It is generic over a
//! caller-supplied context type that gets threaded mutably through every
//! check, and over the caller's error type. Any branching workflow of
//! idempotent checks can be expressed with it.
//!
//! # Declarative Tables
//!
//! Trees are assembled from a flat table of [`NodeSpec`] rows. Each row names
//! its decision and, by name, the decisions to run on a yes or no answer. The
//! first row is the root. Naming successors instead of positioning them in an
//! index-encoded array keeps a reshuffled table from silently rewiring the
//! tree: a row that references a name that does not exist, or that is already
//! claimed by another parent, is a build error rather than a miscount.
//!
//! A decision owns its two successors outright. No sharing, no cycles; every
//! table that links the same name twice is rejected, and so is a row that
//! nothing reaches from the root.

use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Check function of a single decision.
///
/// Answers yes (`true`) or no (`false`) against the caller's context, or
/// fails with the caller's error type.
pub type Exec<C, E> = Box<dyn FnMut(&mut C) -> std::result::Result<bool, E>>;

/// A named check with owned yes/no successor decisions.
///
/// Built once from a [`NodeSpec`] table, never mutated afterwards, and
/// discarded with the walk that owns it.
pub struct Decision<C, E> {
    name: String,
    exec: Exec<C, E>,
    yes: Option<Box<Decision<C, E>>>,
    no: Option<Box<Decision<C, E>>>,
}

impl<C, E> Decision<C, E> {
    /// Link a table of [`NodeSpec`] rows into an owned decision tree.
    ///
    /// The first row becomes the root. Successors are looked up by name and
    /// consumed as they are linked, so each row ends up with exactly one
    /// parent.
    ///
    /// # Errors
    ///
    /// - Return [`TreeError::EmptyTable`] if the table has no rows.
    /// - Return [`TreeError::DuplicateDecision`] if two rows share a name.
    /// - Return [`TreeError::UnknownSuccessor`] if a row references a name
    ///   that is not in the table.
    /// - Return [`TreeError::SharedSuccessor`] if two rows claim the same
    ///   successor, which also covers any cycle through the table.
    /// - Return [`TreeError::UnreachableDecision`] if a row is never linked
    ///   from the root.
    pub fn from_table(table: impl IntoIterator<Item = NodeSpec<C, E>>) -> Result<Self> {
        let specs = table.into_iter().collect::<Vec<_>>();
        let root_name = match specs.first() {
            Some(spec) => spec.name.clone(),
            None => return Err(TreeError::EmptyTable),
        };

        let mut names = HashSet::new();
        for spec in &specs {
            if !names.insert(spec.name.clone()) {
                return Err(TreeError::DuplicateDecision {
                    name: spec.name.clone(),
                });
            }
        }

        let mut pool = specs
            .into_iter()
            .map(|spec| (spec.name.clone(), spec))
            .collect::<HashMap<_, _>>();
        let root = link(&root_name, &root_name, &mut pool, &names)?;

        if let Some(name) = pool.into_keys().next() {
            return Err(TreeError::UnreachableDecision { name });
        }

        Ok(root)
    }

    /// Name of this decision.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Walk the tree from this decision to a terminal.
    ///
    /// Runs each check along the way, descending into the yes branch on a
    /// `true` answer and the no branch on a `false` answer. A missing branch
    /// terminates the walk successfully. No decision runs more than once, and
    /// decisions off the taken path never run at all.
    ///
    /// # Errors
    ///
    /// - Return the first check's error unchanged; the walk stops right
    ///   there, with no retry and no recovery.
    pub fn execute(&mut self, ctx: &mut C) -> std::result::Result<(), E> {
        let mut node = Some(self);
        while let Some(current) = node {
            let outcome = (current.exec)(ctx)?;
            debug!(decision = %current.name, outcome, "decided");
            node = if outcome {
                current.yes.as_deref_mut()
            } else {
                current.no.as_deref_mut()
            };
        }

        Ok(())
    }
}

fn link<C, E>(
    name: &str,
    parent: &str,
    pool: &mut HashMap<String, NodeSpec<C, E>>,
    names: &HashSet<String>,
) -> Result<Decision<C, E>> {
    let Some(spec) = pool.remove(name) else {
        return Err(if names.contains(name) {
            TreeError::SharedSuccessor {
                parent: parent.to_owned(),
                successor: name.to_owned(),
            }
        } else {
            TreeError::UnknownSuccessor {
                parent: parent.to_owned(),
                successor: name.to_owned(),
            }
        });
    };

    let yes = match spec.yes {
        Some(successor) => Some(Box::new(link(&successor, name, pool, names)?)),
        None => None,
    };
    let no = match spec.no {
        Some(successor) => Some(Box::new(link(&successor, name, pool, names)?)),
        None => None,
    };

    Ok(Decision {
        name: spec.name,
        exec: spec.exec,
        yes,
        no,
    })
}

/// One row of a decision table.
///
/// Names a decision, its check, and the decisions to run on each answer.
pub struct NodeSpec<C, E> {
    name: String,
    exec: Exec<C, E>,
    yes: Option<String>,
    no: Option<String>,
}

impl<C, E> NodeSpec<C, E> {
    /// Construct new table row with no successors.
    pub fn new(
        name: impl Into<String>,
        exec: impl FnMut(&mut C) -> std::result::Result<bool, E> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            exec: Box::new(exec),
            yes: None,
            no: None,
        }
    }

    /// Name the decision to run on a yes answer.
    pub fn yes(mut self, successor: impl Into<String>) -> Self {
        self.yes = Some(successor.into());
        self
    }

    /// Name the decision to run on a no answer.
    pub fn no(mut self, successor: impl Into<String>) -> Self {
        self.no = Some(successor.into());
        self
    }
}

/// Decision table linking error types.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    /// Table has no rows to link.
    #[error("decision table is empty")]
    EmptyTable,

    /// Two rows share the same decision name.
    #[error("decision {name:?} is defined more than once")]
    DuplicateDecision { name: String },

    /// A row references a successor that is not in the table.
    #[error("decision {parent:?} references unknown successor {successor:?}")]
    UnknownSuccessor { parent: String, successor: String },

    /// Two rows claim the same successor.
    #[error("decision {parent:?} claims successor {successor:?} already owned by another decision")]
    SharedSuccessor { parent: String, successor: String },

    /// A row is never reached from the root.
    #[error("decision {name:?} is unreachable from the root")]
    UnreachableDecision { name: String },
}

/// Friendly result alias :3
pub type Result<T, E = TreeError> = std::result::Result<T, E>;
