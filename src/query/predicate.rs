//! Boolean predicate IR produced by the compiler and consumed by the SQL
//! lowering.
//!
//! The IR keeps SQL's three-valued logic in mind: leaf comparisons carry their
//! own `inverted` flag which is lowered per operator, while `Not` nodes are a
//! plain SQL `NOT (...)`. [`Predicate::normalize`] pushes every `Not` down to
//! the leaves without changing which rows match.

use crate::query::fields::{EntityField, MetadataField};
use crate::query::{Modifier, Operator, RelationKind};

/// A column of the media view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaColumn {
    Id,
    Metadata(MetadataField),
}

/// A column reference, checked against the table it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnRef {
    Media(MediaColumn),
    Entity(RelationKind, EntityField),
}

/// A literal bound as a statement parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Text(String),
    Integer(i64),
    Real(f64),
}

/// A single field comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub column: ColumnRef,
    pub modifier: Option<Modifier>,
    pub operator: Operator,
    pub operand: Option<Operand>,
    pub inverted: bool,
}

impl Comparison {
    fn negated(mut self) -> Self {
        self.inverted = !self.inverted;
        self
    }
}

/// Media id containment in the set of media linked to matching entities.
#[derive(Debug, Clone, PartialEq)]
pub struct Membership {
    pub relation: RelationKind,
    pub catalog: String,
    pub filter: Box<Predicate>,
    pub recursive: bool,
    pub negated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    True,
    False,
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),
    Compare(Comparison),
    Member(Membership),
}

impl Predicate {
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Predicate {
        Predicate::Not(Box::new(self))
    }

    /// Push negation to the leaves.
    ///
    /// De Morgan's laws hold in three-valued logic, so this never changes the
    /// result. At the leaves, NULL-safe operators absorb the negation into
    /// their own `inverted` flag. Pattern operators are not NULL-safe, so they
    /// keep an explicit `Not` and behave exactly like the grouped SQL form.
    pub fn normalize(self) -> Predicate {
        self.push_not(false)
    }

    fn push_not(self, negate: bool) -> Predicate {
        match self {
            Predicate::True if negate => Predicate::False,
            Predicate::False if negate => Predicate::True,
            Predicate::True | Predicate::False => self,
            Predicate::Not(inner) => inner.push_not(!negate),
            Predicate::And(children) => {
                let children = children.into_iter().map(|c| c.push_not(negate)).collect();
                if negate {
                    Predicate::Or(children)
                } else {
                    Predicate::And(children)
                }
            }
            Predicate::Or(children) => {
                let children = children.into_iter().map(|c| c.push_not(negate)).collect();
                if negate {
                    Predicate::And(children)
                } else {
                    Predicate::Or(children)
                }
            }
            Predicate::Compare(comparison) => {
                if !negate {
                    Predicate::Compare(comparison)
                } else if comparison.operator.is_pattern() {
                    Predicate::Compare(comparison).not()
                } else {
                    Predicate::Compare(comparison.negated())
                }
            }
            Predicate::Member(mut membership) => {
                membership.filter = Box::new(membership.filter.normalize());
                membership.negated ^= negate;
                Predicate::Member(membership)
            }
        }
    }

    /// True when no `Not` node wraps anything but a pattern comparison.
    pub fn is_normalized(&self) -> bool {
        match self {
            Predicate::True | Predicate::False | Predicate::Compare(_) => true,
            Predicate::Not(inner) => {
                matches!(inner.as_ref(), Predicate::Compare(c) if c.operator.is_pattern())
            }
            Predicate::And(children) | Predicate::Or(children) => {
                children.iter().all(Predicate::is_normalized)
            }
            Predicate::Member(m) => m.filter.is_normalized(),
        }
    }
}
