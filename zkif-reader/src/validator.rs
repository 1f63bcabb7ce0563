//! Structural validation of a message stream
//!
//! Checks that a sequence of messages describes a coherent statement:
//! - Exactly one circuit, received before the other messages
//! - Variable ids below the circuit's `free_variable_id`
//! - Each variable assigned at most once, with one value width throughout
//! - For a prover, every variable used in a constraint has a value
//!
//! No field arithmetic is performed: values are opaque bytes here.

use crate::messages::Messages;
use std::collections::BTreeMap;
use thiserror::Error;
use zkif_spec::{
    Circuit, ConstraintSystem, Message, MessageType, R1csConstraints, Variables, VariableId,
    Witness,
};

/// Validation error types
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("No circuit message")]
    MissingCircuit,

    #[error("Multiple circuit messages")]
    MultipleCircuits,

    #[error("{0} message received before the circuit")]
    MessageBeforeCircuit(MessageType),

    #[error("Variable {id} is not below free_variable_id {free_variable_id}")]
    IdOutOfBounds {
        id: VariableId,
        free_variable_id: VariableId,
    },

    #[error("Variable {0} is assigned more than once")]
    MultipleAssignments(VariableId),

    #[error("Value of variable {id} has {found} bytes, expected {expected}")]
    InconsistentValueSize {
        id: VariableId,
        expected: usize,
        found: usize,
    },

    #[error("Variable {0} is used in a constraint but never assigned")]
    Unassigned(VariableId),

    #[error("Coefficient of variable {0} is empty")]
    EmptyCoefficient(VariableId),

    #[error("Unreadable message: {0}")]
    Unreadable(String),
}

/// Validation warning types (not errors, but worth noting)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// Defined but never referenced by a constraint
    UnusedVariable(VariableId),
}

/// Validation result
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<Violation>,
    pub warnings: Vec<Warning>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if validation passed (no errors)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    fn add_error(&mut self, error: Violation) {
        self.errors.push(error);
    }

    fn add_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Undefined,
    Defined,
    Used,
}

/// Accumulates violations over a stream of messages
#[derive(Debug, Clone, Default)]
pub struct Validator {
    as_prover: bool,
    got_circuit: bool,
    free_variable_id: Option<VariableId>,
    value_size: Option<usize>,
    variables: BTreeMap<VariableId, Status>,
    result: ValidationResult,
}

impl Validator {
    /// Witness messages are ignored and assignments are not required
    pub fn new_as_verifier() -> Self {
        Self::default()
    }

    /// Every variable used in a constraint must be assigned
    pub fn new_as_prover() -> Self {
        Self {
            as_prover: true,
            ..Self::default()
        }
    }

    /// Ingest every message of a collection, recording unreadable ones
    pub fn ingest_messages(&mut self, messages: &Messages) {
        for message in messages {
            match message {
                Ok(message) => self.ingest_message(&message),
                Err(err) => self.result.add_error(Violation::Unreadable(err.to_string())),
            }
        }
    }

    pub fn ingest_message(&mut self, message: &Message<'_>) {
        match message {
            Message::Circuit(circuit) => self.ingest_circuit(circuit),
            Message::R1csConstraints(r1cs) => self.ingest_r1cs(r1cs),
            Message::Witness(witness) => self.ingest_witness(witness),
        }
    }

    pub fn ingest_circuit(&mut self, circuit: &Circuit<'_>) {
        if self.got_circuit {
            self.result.add_error(Violation::MultipleCircuits);
        }
        self.got_circuit = true;

        // A zero free id places no bound
        let free = circuit.free_variable_id();
        if free.get() > 0 {
            self.free_variable_id = Some(free);
        }

        self.variables.insert(VariableId::ONE, Status::Defined);

        if let Some(connections) = circuit.connections() {
            self.define_all(&connections);
        }
    }

    pub fn ingest_witness(&mut self, witness: &Witness<'_>) {
        if !self.as_prover {
            return;
        }
        self.ensure_circuit(MessageType::Witness);
        self.define_all(&witness.assigned_variables());
    }

    pub fn ingest_r1cs(&mut self, r1cs: &R1csConstraints<'_>) {
        match r1cs.constraint_system() {
            Ok(system) => self.ingest_constraint_system(&system),
            Err(err) => {
                self.ensure_circuit(MessageType::R1csConstraints);
                self.result.add_error(Violation::Unreadable(err.to_string()));
            }
        }
    }

    pub fn ingest_constraint_system(&mut self, system: &ConstraintSystem<'_>) {
        self.ensure_circuit(MessageType::R1csConstraints);

        for constraint in system.iter() {
            match constraint {
                Ok(constraint) => {
                    self.use_terms(&constraint.linear_combination_a);
                    self.use_terms(&constraint.linear_combination_b);
                    self.use_terms(&constraint.linear_combination_c);
                }
                Err(err) => self.result.add_error(Violation::Unreadable(err.to_string())),
            }
        }
    }

    /// Close the stream and report
    pub fn finish(mut self) -> ValidationResult {
        if !self.got_circuit {
            self.result.add_error(Violation::MissingCircuit);
        }

        for (id, status) in &self.variables {
            if *status == Status::Defined {
                self.result.add_warning(Warning::UnusedVariable(*id));
            }
        }

        tracing::debug!(
            errors = self.result.errors.len(),
            warnings = self.result.warnings.len(),
            as_prover = self.as_prover,
            "validation finished"
        );
        self.result
    }

    // ========================================================================
    // Checks
    // ========================================================================

    fn define_all(&mut self, vars: &Variables<'_>) {
        if vars.has_values() {
            self.ensure_value_size(vars);
        }
        for var in vars {
            self.ensure_id_bound(var.id);
            if self.status(var.id) != Status::Undefined {
                self.result.add_error(Violation::MultipleAssignments(var.id));
            }
            self.variables.insert(var.id, Status::Defined);
        }
    }

    fn use_terms(&mut self, terms: &Variables<'_>) {
        for term in terms {
            if self.status(term.id) == Status::Undefined {
                self.ensure_id_bound(term.id);
                if self.as_prover {
                    self.result.add_error(Violation::Unassigned(term.id));
                }
            }
            if !term.has_value() {
                self.result.add_error(Violation::EmptyCoefficient(term.id));
            }
            self.variables.insert(term.id, Status::Used);
        }
    }

    fn ensure_value_size(&mut self, vars: &Variables<'_>) {
        let found = vars.element_size();
        match self.value_size {
            None => self.value_size = Some(found),
            Some(expected) if expected != found => {
                // Report against the first variable of the offending record
                if let Some(first) = vars.get(0) {
                    self.result.add_error(Violation::InconsistentValueSize {
                        id: first.id,
                        expected,
                        found,
                    });
                }
            }
            Some(_) => {}
        }
    }

    fn ensure_id_bound(&mut self, id: VariableId) {
        if let Some(free_variable_id) = self.free_variable_id {
            if id >= free_variable_id {
                self.result.add_error(Violation::IdOutOfBounds {
                    id,
                    free_variable_id,
                });
            }
        }
    }

    fn ensure_circuit(&mut self, message_type: MessageType) {
        if !self.got_circuit {
            self.result.add_error(Violation::MessageBeforeCircuit(message_type));
        }
    }

    fn status(&self, id: VariableId) -> Status {
        self.variables.get(&id).copied().unwrap_or(Status::Undefined)
    }
}

/// Validate a whole collection in one call
pub fn validate(messages: &Messages, as_prover: bool) -> ValidationResult {
    let mut validator = if as_prover {
        Validator::new_as_prover()
    } else {
        Validator::new_as_verifier()
    };
    validator.ingest_messages(messages);
    validator.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use zkif_spec::{
        BilinearConstraintOwned, CircuitOwned, ConstraintSystemOwned, VariablesOwned,
        WitnessOwned,
    };

    fn vars(pairs: &[(u64, u8)]) -> VariablesOwned {
        VariablesOwned {
            variable_ids: pairs.iter().map(|(id, _)| VariableId::new(*id)).collect(),
            values: pairs.iter().map(|(_, v)| *v).collect(),
        }
    }

    /// Public x=3, y=4, z=25; private xx=9, yy=16
    fn circuit() -> Vec<u8> {
        CircuitOwned {
            free_variable_id: VariableId::new(6),
            connections: Some(vars(&[(1, 3), (2, 4), (3, 25)])),
            ..CircuitOwned::default()
        }
        .to_bytes()
        .unwrap()
    }

    fn witness(pairs: &[(u64, u8)]) -> Vec<u8> {
        WitnessOwned {
            assigned_variables: vars(pairs),
        }
        .to_bytes()
        .unwrap()
    }

    /// x * x = xx, y * y = yy, (xx + yy) * 1 = z
    fn constraints() -> Vec<u8> {
        let constraint = |a: &[(u64, u8)], b: &[(u64, u8)], c: &[(u64, u8)]| BilinearConstraintOwned {
            linear_combination_a: vars(a),
            linear_combination_b: vars(b),
            linear_combination_c: vars(c),
        };
        ConstraintSystemOwned {
            constraints: vec![
                constraint(&[(1, 1)], &[(1, 1)], &[(4, 1)]),
                constraint(&[(2, 1)], &[(2, 1)], &[(5, 1)]),
                constraint(&[(4, 1), (5, 1)], &[(0, 1)], &[(3, 1)]),
            ],
            ..ConstraintSystemOwned::default()
        }
        .to_bytes()
        .unwrap()
    }

    fn collect(buffers: Vec<Vec<u8>>) -> Messages {
        let mut messages = Messages::default();
        for buf in buffers {
            messages.push_message(buf).unwrap();
        }
        messages
    }

    #[test]
    fn test_valid_prover_stream() {
        let messages = collect(vec![circuit(), witness(&[(4, 9), (5, 16)]), constraints()]);
        let result = validate(&messages, true);
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(!result.has_warnings(), "{:?}", result.warnings);
    }

    #[test]
    fn test_verifier_needs_no_witness() {
        let messages = collect(vec![circuit(), constraints()]);
        let result = validate(&messages, false);
        assert!(result.is_valid(), "{:?}", result.errors);
    }

    #[test]
    fn test_prover_missing_assignments() {
        let messages = collect(vec![circuit(), constraints()]);
        let result = validate(&messages, true);
        assert_eq!(
            result.errors,
            vec![
                Violation::Unassigned(VariableId::new(4)),
                Violation::Unassigned(VariableId::new(5)),
            ]
        );
    }

    #[test]
    fn test_missing_and_multiple_circuits() {
        let result = validate(&collect(vec![]), false);
        assert_eq!(result.errors, vec![Violation::MissingCircuit]);

        let result = validate(&collect(vec![circuit(), circuit()]), false);
        assert!(result.errors.contains(&Violation::MultipleCircuits));
    }

    #[test]
    fn test_message_before_circuit() {
        let messages = collect(vec![constraints(), circuit()]);
        let result = validate(&messages, false);
        assert_eq!(
            result.errors[0],
            Violation::MessageBeforeCircuit(MessageType::R1csConstraints)
        );
    }

    #[test]
    fn test_id_out_of_bounds_and_unused() {
        let messages = collect(vec![
            circuit(),
            witness(&[(4, 9), (5, 16), (6, 1)]),
            constraints(),
        ]);
        let result = validate(&messages, true);
        assert_eq!(
            result.errors,
            vec![Violation::IdOutOfBounds {
                id: VariableId::new(6),
                free_variable_id: VariableId::new(6),
            }]
        );
        assert_eq!(result.warnings, vec![Warning::UnusedVariable(VariableId::new(6))]);
    }

    #[test]
    fn test_multiple_assignments() {
        let messages = collect(vec![
            circuit(),
            witness(&[(4, 9)]),
            witness(&[(4, 9), (5, 16)]),
            constraints(),
        ]);
        let result = validate(&messages, true);
        assert_eq!(
            result.errors,
            vec![Violation::MultipleAssignments(VariableId::new(4))]
        );
    }

    #[test]
    fn test_inconsistent_value_size() {
        let wide = WitnessOwned::from_pairs([
            (VariableId::new(4), [9u8, 0]),
            (VariableId::new(5), [16, 0]),
        ])
        .unwrap()
        .to_bytes()
        .unwrap();
        let messages = collect(vec![circuit(), wide, constraints()]);
        let result = validate(&messages, true);
        assert_eq!(
            result.errors,
            vec![Violation::InconsistentValueSize {
                id: VariableId::new(4),
                expected: 1,
                found: 2,
            }]
        );
    }

    #[test]
    fn test_verifier_ignores_witness() {
        let messages = collect(vec![circuit(), witness(&[(4, 9), (4, 9)]), constraints()]);
        assert!(validate(&messages, false).is_valid());
    }

    #[test]
    fn test_violation_messages() {
        assert_eq!(
            Violation::MessageBeforeCircuit(MessageType::Witness).to_string(),
            "Witness message received before the circuit"
        );
        assert_eq!(
            Violation::Unassigned(VariableId::new(7)).to_string(),
            "Variable 7 is used in a constraint but never assigned"
        );
    }
}
