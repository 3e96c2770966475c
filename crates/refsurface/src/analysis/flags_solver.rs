//! Flags decomposition solver
//!
//! Reconstructs a bitwise expression over an enum's named members that
//! evaluates exactly to a raw constant. Only disjoint OR coverings are
//! searched; a value coverable solely by overlapping members fails with
//! [`FlagsSolveError::Unsupported`] instead of degrading to an inferior
//! rendering. That refusal is intentional and load-bearing: callers treat it
//! as an unsupported construct, not as a missing optimization.

use crate::error::{EngineError, FlagsSolveError};
use crate::symbols::{Member, TypeId, TypeKind, Universe};

/// A nonzero enum member the solver may use, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagsMember {
    /// Member index within the declaring enum.
    pub member_index: usize,
    pub name: String,
    pub value: u64,
}

/// A bitwise expression tree over enum members. Only `Member` and flat `Or`
/// nodes are ever produced by the solver; the other variants exist for
/// renderers that consume hand-written expressions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlagsOperation {
    Member(FlagsMember),
    Or(Vec<FlagsOperation>),
    And(Vec<FlagsOperation>),
    Xor(Vec<FlagsOperation>),
    Not(Box<FlagsOperation>),
}

impl FlagsOperation {
    /// Build an `Or`, flattening any nested `Or` operands into one flat
    /// N-ary node. At least two operands must remain after flattening.
    pub fn or(operands: Vec<FlagsOperation>) -> FlagsOperation {
        let mut flattened = Vec::with_capacity(operands.len());
        for operand in operands {
            match operand {
                FlagsOperation::Or(inner) => flattened.extend(inner),
                other => flattened.push(other),
            }
        }
        debug_assert!(flattened.len() >= 2, "Or requires at least two operands");
        FlagsOperation::Or(flattened)
    }

    /// Bitwise value of the expression.
    pub fn evaluate(&self) -> u64 {
        match self {
            FlagsOperation::Member(member) => member.value,
            FlagsOperation::Or(operands) => {
                operands.iter().fold(0, |acc, op| acc | op.evaluate())
            }
            FlagsOperation::And(operands) => operands
                .iter()
                .fold(u64::MAX, |acc, op| acc & op.evaluate()),
            FlagsOperation::Xor(operands) => {
                operands.iter().fold(0, |acc, op| acc ^ op.evaluate())
            }
            FlagsOperation::Not(operand) => !operand.evaluate(),
        }
    }
}

impl std::fmt::Display for FlagsOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn join(
            f: &mut std::fmt::Formatter<'_>,
            operands: &[FlagsOperation],
            separator: &str,
        ) -> std::fmt::Result {
            for (i, operand) in operands.iter().enumerate() {
                if i != 0 {
                    write!(f, "{separator}")?;
                }
                write!(f, "{operand}")?;
            }
            Ok(())
        }

        match self {
            FlagsOperation::Member(member) => write!(f, "{}", member.name),
            FlagsOperation::Or(operands) => join(f, operands, " | "),
            FlagsOperation::And(operands) => join(f, operands, " & "),
            FlagsOperation::Xor(operands) => join(f, operands, " ^ "),
            FlagsOperation::Not(operand) => {
                if matches!(
                    operand.as_ref(),
                    FlagsOperation::Or(_) | FlagsOperation::And(_) | FlagsOperation::Xor(_)
                ) {
                    write!(f, "~({operand})")
                } else {
                    write!(f, "~{operand}")
                }
            }
        }
    }
}

/// Solver over one enum's members. Zero-valued members are dropped up front;
/// they can never contribute to a nonzero decomposition.
#[derive(Debug)]
pub struct FlagsSolver {
    members: Vec<FlagsMember>,
}

impl FlagsSolver {
    /// Collect the nonzero constant members of `enum_id` in declaration
    /// order, normalizing every underlying integer width to a `u64` bit
    /// pattern.
    pub fn for_enum(universe: &Universe, enum_id: TypeId) -> Result<Self, EngineError> {
        let ty = universe.ty(enum_id);
        if !matches!(ty.kind, TypeKind::Enum { .. }) {
            return Err(EngineError::unsupported(
                universe.qualified_name(enum_id),
                "flags decomposition requested for a non-enum type",
            ));
        }

        let mut members = Vec::new();
        for (member_index, member) in ty.members.iter().enumerate() {
            let Member::Field(field) = member else {
                continue;
            };
            let Some(constant) = &field.constant else {
                continue;
            };
            let Some(value) = constant.as_bits() else {
                return Err(EngineError::unsupported(
                    universe.qualified_name(enum_id),
                    format!("enum member `{}` has a non-integral constant", field.name),
                ));
            };
            if value == 0 {
                continue;
            }
            members.push(FlagsMember {
                member_index,
                name: field.name.clone(),
                value,
            });
        }

        Ok(FlagsSolver { members })
    }

    #[cfg(test)]
    fn from_values(values: &[(&str, u64)]) -> Self {
        FlagsSolver {
            members: values
                .iter()
                .enumerate()
                .filter(|(_, (_, value))| *value != 0)
                .map(|(i, (name, value))| FlagsMember {
                    member_index: i,
                    name: (*name).to_string(),
                    value: *value,
                })
                .collect(),
        }
    }

    /// Decompose `value` into an expression over the enum's members.
    pub fn solve(&self, value: u64) -> Result<FlagsOperation, FlagsSolveError> {
        self.solve_inner(value)
            .ok_or(FlagsSolveError::Unsupported { value })
    }

    fn solve_inner(&self, value: u64) -> Option<FlagsOperation> {
        // An exactly matching member always beats a compound equivalent;
        // declaration order breaks ties.
        for member in &self.members {
            if member.value == value {
                return Some(FlagsOperation::Member(member.clone()));
            }
        }

        // Greedy depth-first over disjoint covers: take the first member
        // whose bits all lie inside the target and recurse on the remainder.
        // No backtracking across siblings once a remainder decomposes.
        for member in &self.members {
            if member.value & !value != 0 {
                continue;
            }
            let remaining = value & !member.value;
            if let Some(rest) = self.solve_inner(remaining) {
                return Some(FlagsOperation::or(vec![
                    FlagsOperation::Member(member.clone()),
                    rest,
                ]));
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn disjoint_cover_evaluates_to_target() {
        let solver = FlagsSolver::from_values(&[("A", 1), ("B", 2), ("C", 4)]);
        let operation = solver.solve(7).unwrap();
        assert_eq!(operation.evaluate(), 7);
        assert_eq!(operation.to_string(), "A | B | C");
    }

    #[test]
    fn exact_member_beats_compound_equivalent() {
        let solver = FlagsSolver::from_values(&[("A", 1), ("B", 2), ("AB", 3)]);
        let operation = solver.solve(3).unwrap();
        assert_eq!(operation, FlagsOperation::Member(FlagsMember {
            member_index: 2,
            name: "AB".to_string(),
            value: 3,
        }));
    }

    #[test]
    fn declaration_order_breaks_value_ties() {
        let solver = FlagsSolver::from_values(&[("First", 8), ("Second", 8)]);
        let FlagsOperation::Member(member) = solver.solve(8).unwrap() else {
            panic!("expected a single member");
        };
        assert_eq!(member.name, "First");
    }

    #[test]
    fn zero_without_zero_member_fails() {
        let solver = FlagsSolver::from_values(&[("A", 1), ("B", 2)]);
        assert_eq!(
            solver.solve(0),
            Err(FlagsSolveError::Unsupported { value: 0 })
        );
    }

    #[test]
    fn overlapping_only_cover_is_refused() {
        // 3 | 5 == 7, but the members overlap in bit 0; no disjoint cover of
        // 7 exists, so the solver must refuse rather than emit `3 | 5`.
        let solver = FlagsSolver::from_values(&[("Low", 3), ("High", 5)]);
        assert_eq!(
            solver.solve(7),
            Err(FlagsSolveError::Unsupported { value: 7 })
        );
    }

    #[test]
    fn mixed_single_and_compound_remainder() {
        let solver = FlagsSolver::from_values(&[("ReadWrite", 3), ("Execute", 4), ("Read", 1)]);
        let operation = solver.solve(7).unwrap();
        assert_eq!(operation.evaluate(), 7);
        assert_eq!(operation.to_string(), "ReadWrite | Execute");
    }

    #[test]
    fn or_construction_flattens_nested_ors() {
        let member = |name: &str, value: u64| {
            FlagsOperation::Member(FlagsMember {
                member_index: 0,
                name: name.to_string(),
                value,
            })
        };
        let nested = FlagsOperation::or(vec![
            member("A", 1),
            FlagsOperation::or(vec![member("B", 2), member("C", 4)]),
        ]);
        let FlagsOperation::Or(operands) = &nested else {
            panic!("expected Or");
        };
        assert_eq!(operands.len(), 3);
        assert_eq!(nested.to_string(), "A | B | C");
    }

    #[test]
    fn not_rendering_parenthesizes_compound_operands() {
        let member = |name: &str, value: u64| {
            FlagsOperation::Member(FlagsMember {
                member_index: 0,
                name: name.to_string(),
                value,
            })
        };
        let not_compound = FlagsOperation::Not(Box::new(FlagsOperation::or(vec![
            member("A", 1),
            member("B", 2),
        ])));
        assert_eq!(not_compound.to_string(), "~(A | B)");
        assert_eq!(not_compound.evaluate(), !3);

        let not_single = FlagsOperation::Not(Box::new(member("A", 1)));
        assert_eq!(not_single.to_string(), "~A");
    }
}
