//! Size statistics of a constraint system

use crate::error::{ReaderError, Result};
use crate::messages::Messages;
use serde::{Deserialize, Serialize};
use std::fmt;
use zkif_spec::Variables;

/// Counts gathered from a [`Messages`] collection
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub num_messages: u64,
    pub num_public_inputs: u64,
    pub num_private_variables: u64,
    pub multiplications: u64,
    pub additions: u64,
    pub additions_a: u64,
    pub additions_b: u64,
    pub additions_c: u64,
}

impl Stats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shorthand for `Stats::new()` followed by [`Stats::ingest`]
    pub fn from_messages(messages: &Messages) -> Result<Self> {
        let mut stats = Self::new();
        stats.ingest(messages)?;
        Ok(stats)
    }

    /// Add the counts of `messages`.
    ///
    /// Variable counts come from the last circuit and are replaced, not summed.
    pub fn ingest(&mut self, messages: &Messages) -> Result<()> {
        let circuit = messages.last_circuit()?.ok_or(ReaderError::MissingCircuit)?;

        self.num_public_inputs = circuit.connections().map_or(0, |c| c.len() as u64);
        // Variable 0 is the constant one
        self.num_private_variables = circuit
            .free_variable_id()
            .get()
            .saturating_sub(self.num_public_inputs)
            .saturating_sub(1);

        for message in messages {
            message?;
            self.num_messages += 1;
        }

        for constraint in messages.iter_constraints() {
            let constraint = constraint?;
            self.multiplications += 1;
            self.additions_a += additions(&constraint.linear_combination_a);
            self.additions_b += additions(&constraint.linear_combination_b);
            self.additions_c += additions(&constraint.linear_combination_c);
        }

        self.additions = self.additions_a + self.additions_b + self.additions_c;
        tracing::debug!(
            multiplications = self.multiplications,
            additions = self.additions,
            "collected stats"
        );
        Ok(())
    }
}

/// A linear combination of n terms costs n - 1 additions
fn additions(lc: &Variables<'_>) -> u64 {
    lc.len().saturating_sub(1) as u64
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Messages:          {}", self.num_messages)?;
        writeln!(f, "Public inputs:     {}", self.num_public_inputs)?;
        writeln!(f, "Private variables: {}", self.num_private_variables)?;
        writeln!(f, "Multiplications:   {}", self.multiplications)?;
        write!(
            f,
            "Additions:         {} (a: {}, b: {}, c: {})",
            self.additions, self.additions_a, self.additions_b, self.additions_c
        )
    }
}
