//! Wire-level properties of framed messages

use proptest::prelude::*;
use zkif_spec::flatbuffers::FlatBufferBuilder;
use zkif_spec::{
    finish_message, pack, read_message, write_circuit, write_witness, Message, MessageType,
    VariableId, VariablesOwned, WitnessOwned, ZkifError, MAX_EXACT_F64_ID,
};

/// Frame a finished FlatBuffers region with the length prefix and identifier
fn frame(region: &[u8]) -> Vec<u8> {
    let mut bytes = ((region.len() + 4) as u32).to_le_bytes().to_vec();
    bytes.extend_from_slice(b"zkif");
    bytes.extend_from_slice(region);
    bytes
}

/// Root { message_type: tag, message: Circuit { free_variable_id } }, written
/// field by field with the generic FlatBuffers builder
fn raw_circuit_message(tag: u8, free_variable_id: u64) -> Vec<u8> {
    let mut builder = FlatBufferBuilder::new();

    let start = builder.start_table();
    builder.push_slot::<u64>(6, free_variable_id, 0);
    let circuit = builder.end_table(start);

    let start = builder.start_table();
    builder.push_slot_always(6, circuit.as_union_value());
    builder.push_slot_always::<u8>(4, tag);
    let root = builder.end_table(start);
    builder.finish_minimal(root);

    frame(builder.finished_data())
}

// ============================================================================
// Circuit round trips
// ============================================================================

#[test]
fn test_circuit_boundary_ids() {
    let boundary = [0, 1, 1u64 << 32, MAX_EXACT_F64_ID, 1 << 53, u64::MAX];

    for k in boundary {
        let bytes = write_circuit(VariableId::new(k)).unwrap();
        let circuit = read_message(&bytes).unwrap().into_circuit().unwrap();
        assert_eq!(circuit.free_variable_id().get(), k);
    }
}

#[test]
fn test_circuit_free_id_three() {
    let bytes = write_circuit(VariableId::new(3)).unwrap();

    let prefix = u32::from_le_bytes(bytes[0..4].try_into().unwrap()) as usize;
    assert_eq!(prefix, bytes.len() - 4);
    assert_eq!(&bytes[4..8], b"zkif");

    match read_message(&bytes).unwrap() {
        Message::Circuit(circuit) => assert_eq!(circuit.free_variable_id(), VariableId::new(3)),
        other => panic!("expected circuit, got {}", other.message_type()),
    }
}

#[test]
fn test_foreign_builder_circuit() {
    let bytes = raw_circuit_message(1, 3);
    let circuit = read_message(&bytes).unwrap().into_circuit().unwrap();
    assert_eq!(circuit.free_variable_id(), VariableId::new(3));
    assert!(circuit.connections().is_none());
    assert!(circuit.configuration().is_none());
}

// ============================================================================
// Witness packing
// ============================================================================

#[test]
fn test_witness_example_values() {
    let packed = pack([
        (VariableId::new(0), [1u8, 0, 0, 0]),
        (VariableId::new(1), [10, 11, 12, 13]),
        (VariableId::new(2), [20, 21, 22, 24]),
    ])
    .unwrap();
    assert_eq!(packed.values, vec![1, 0, 0, 0, 10, 11, 12, 13, 20, 21, 22, 24]);

    let bytes = write_witness(&packed).unwrap();
    let vars = read_message(&bytes)
        .unwrap()
        .into_witness()
        .unwrap()
        .assigned_variables();

    assert_eq!(vars.len(), 3);
    assert_eq!(vars.element_size(), 4);
    let chunks: Vec<&[u8]> = vars.iter().map(|v| v.value).collect();
    assert_eq!(
        chunks,
        vec![&[1u8, 0, 0, 0][..], &[10, 11, 12, 13][..], &[20, 21, 22, 24][..]]
    );
}

#[test]
fn test_empty_witness() {
    let packed = pack(Vec::<(VariableId, [u8; 4])>::new()).unwrap();
    assert!(packed.variable_ids.is_empty());
    assert!(packed.values.is_empty());

    let bytes = write_witness(&packed).unwrap();
    let vars = read_message(&bytes)
        .unwrap()
        .into_witness()
        .unwrap()
        .assigned_variables();
    assert!(vars.is_empty());
    assert_eq!(vars.element_size(), 0);
    assert_eq!(vars.iter().count(), 0);
}

#[test]
fn test_misaligned_witness() {
    let misaligned = VariablesOwned {
        variable_ids: vec![VariableId::new(0), VariableId::new(1), VariableId::new(2)],
        values: vec![0; 11],
    };
    assert!(matches!(
        write_witness(&misaligned),
        Err(ZkifError::MisalignedValueArray { num_ids: 3, num_bytes: 11 })
    ));

    // A producer that skips the check: the reader still refuses it
    let witness = WitnessOwned {
        assigned_variables: VariablesOwned {
            variable_ids: vec![VariableId::new(0), VariableId::new(1)],
            values: vec![1, 2, 3],
        },
    };
    let mut builder = FlatBufferBuilder::new();
    let table = witness.build(&mut builder);
    let bytes = finish_message(builder, MessageType::Witness, table).unwrap();

    assert!(matches!(
        read_message(&bytes),
        Err(ZkifError::MisalignedValueArray { num_ids: 2, num_bytes: 3 })
    ));
}

#[test]
fn test_every_truncation_fails() {
    let packed = pack([(VariableId::new(7), [1u8; 32])]).unwrap();
    let bytes = write_witness(&packed).unwrap();

    for len in 0..bytes.len() {
        assert!(read_message(&bytes[..len]).is_err(), "prefix of {} bytes parsed", len);
    }
}

#[test]
fn test_unknown_tag_is_error() {
    for tag in [0u8, 4, 200, 255] {
        let bytes = raw_circuit_message(tag, 5);
        match read_message(&bytes) {
            Err(ZkifError::UnknownMessageType(t)) => assert_eq!(t, tag),
            other => panic!("tag {} gave {:?}", tag, other.map(|m| m.message_type())),
        }
    }
}

// ============================================================================
// Property tests
// ============================================================================

fn arb_assignments() -> impl Strategy<Value = Vec<(u64, Vec<u8>)>> {
    (1usize..=33).prop_flat_map(|width| {
        prop::collection::vec(
            (any::<u64>(), prop::collection::vec(any::<u8>(), width)),
            0..24,
        )
    })
}

proptest! {
    #[test]
    fn test_witness_roundtrip(pairs in arb_assignments()) {
        let packed = pack(pairs.iter().map(|(id, v)| (VariableId::new(*id), v))).unwrap();
        let bytes = write_witness(&packed).unwrap();
        let vars = read_message(&bytes).unwrap().into_witness().unwrap().assigned_variables();

        let decoded: Vec<(u64, Vec<u8>)> = vars.iter().map(|v| (v.id.get(), v.value.to_vec())).collect();
        prop_assert_eq!(decoded, pairs);
    }

    #[test]
    fn test_circuit_roundtrip(k in any::<u64>()) {
        let bytes = write_circuit(VariableId::new(k)).unwrap();
        let circuit = read_message(&bytes).unwrap().into_circuit().unwrap();
        prop_assert_eq!(circuit.free_variable_id().get(), k);
    }

    #[test]
    fn test_misaligned_unpack(num_ids in 1usize..16, extra in 1usize..16, width in 1usize..8) {
        prop_assume!(extra % num_ids != 0);
        let owned = VariablesOwned {
            variable_ids: (0..num_ids as u64).map(VariableId::new).collect(),
            values: vec![0; num_ids * width + extra],
        };
        let misaligned = matches!(
            owned.element_size(),
            Err(ZkifError::MisalignedValueArray { .. })
        );
        prop_assert!(misaligned);
    }
}
