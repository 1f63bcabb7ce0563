//! Stress tests for the message core
//!
//! Tests with large witnesses, long streams, and arbitrary corruption.

use proptest::prelude::*;
use zkif_reader::{validate, Messages, Stats};
use zkif_spec::{
    read_message, read_messages, write_circuit, CircuitOwned, VariableId, WitnessOwned,
};

// ============================================================================
// Large Message Tests
// ============================================================================

#[test]
fn test_large_witness() {
    let count = 10_000u64;
    let witness = WitnessOwned::from_pairs((0..count).map(|id| {
        let mut value = [0u8; 32];
        value[..8].copy_from_slice(&id.to_le_bytes());
        (VariableId::new(id), value)
    }))
    .unwrap();

    let bytes = witness.to_bytes().unwrap();
    let vars = read_message(&bytes)
        .unwrap()
        .into_witness()
        .unwrap()
        .assigned_variables();

    assert_eq!(vars.len(), count as usize);
    assert_eq!(vars.element_size(), 32);
    for (expected, var) in (0..count).zip(vars.iter()) {
        assert_eq!(var.id.get(), expected);
        assert_eq!(&var.value[..8], &expected.to_le_bytes());
    }
}

#[test]
fn test_long_stream() {
    let mut stream = Vec::new();
    for k in 0..1000u64 {
        stream.extend(write_circuit(VariableId::new(k)).unwrap());
    }

    let ids: Vec<u64> = read_messages(&stream)
        .map(|m| m.unwrap().into_circuit().unwrap().free_variable_id().get())
        .collect();
    assert_eq!(ids, (0..1000).collect::<Vec<_>>());
}

#[test]
fn test_many_witness_buffers() {
    let mut messages = Messages::default();
    messages
        .push_message(CircuitOwned::simple_inputs(500).to_bytes().unwrap())
        .unwrap();
    for id in 1..=500u64 {
        let witness = WitnessOwned::from_pairs([(VariableId::new(id), [id as u8])]).unwrap();
        messages.push_message(witness.to_bytes().unwrap()).unwrap();
    }

    assert_eq!(messages.iter_witness().count(), 500);
    let stats = Stats::from_messages(&messages).unwrap();
    assert_eq!(stats.num_messages, 501);
    assert_eq!(stats.num_public_inputs, 500);
    assert_eq!(stats.num_private_variables, 0);
}

// ============================================================================
// Corruption Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Any single-byte change is either rejected or still parses; nothing panics
    #[test]
    fn test_corrupted_byte_never_panics(index in any::<prop::sample::Index>(), byte in any::<u8>()) {
        let witness = WitnessOwned::from_pairs([
            (VariableId::new(3), [1u8, 2, 3, 4]),
            (VariableId::new(4), [5, 6, 7, 8]),
        ]).unwrap();
        let mut bytes = witness.to_bytes().unwrap();
        let at = index.index(bytes.len());
        bytes[at] = byte;

        if let Ok(message) = read_message(&bytes) {
            if let Ok(witness) = message.into_witness() {
                let vars = witness.assigned_variables();
                prop_assert_eq!(vars.iter().count(), vars.len());
            }
        }

        let mut messages = Messages::default();
        if messages.push_message(bytes).is_ok() {
            let _ = validate(&messages, true);
        }
    }

    #[test]
    fn test_random_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        for message in read_messages(&bytes) {
            let _ = message;
        }
    }
}
