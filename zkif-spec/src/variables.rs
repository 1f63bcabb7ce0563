//! # Variables: packed assignments
//!
//! A set of `(id, value)` pairs travels as two parallel arrays: a vector of
//! u64 ids and one flat byte vector holding every value back to back. All
//! values share one width, which is never stored; readers infer it as
//! `values.len() / ids.len()` and reject arrays that do not divide evenly.
//!
//! ```text
//! ids:    [0, 1, 2]
//! values: [1,0,0,0, 10,11,12,13, 20,21,22,24]   element size = 12 / 3 = 4
//! ```
//!
//! An id list with an empty value array is legal: it lists variables without
//! assigning them (element size 0).

use crate::error::{Result, ZkifError};
use crate::id::VariableId;
use crate::schema::{end_table, VariablesTable};
use flatbuffers::{FlatBufferBuilder, Vector, VectorIter, WIPOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::{Copied, Map};

/// Width of one value, inferred from the two array lengths
pub fn element_size(num_ids: usize, num_bytes: usize) -> Result<usize> {
    if num_ids == 0 {
        return match num_bytes {
            0 => Ok(0),
            _ => Err(ZkifError::MisalignedValueArray { num_ids, num_bytes }),
        };
    }
    if num_bytes % num_ids != 0 {
        return Err(ZkifError::MisalignedValueArray { num_ids, num_bytes });
    }
    Ok(num_bytes / num_ids)
}

/// One variable and its value bytes (empty when unassigned)
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Variable<'a> {
    pub id: VariableId,
    pub value: &'a [u8],
}

impl<'a> Variable<'a> {
    pub fn has_value(&self) -> bool {
        !self.value.is_empty()
    }
}

impl fmt::Debug for Variable<'_> {
    /// `var_3` when unassigned, `var_3=[9,8,0,6]` otherwise (trailing zeros trimmed)
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((first, rest)) = self.value.split_first() else {
            return write!(f, "var_{}", self.id);
        };
        write!(f, "var_{}=[{}", self.id, first)?;

        let trail = rest.iter().rposition(|b| *b != 0).map_or(0, |i| i + 1);
        for b in &rest[..trail] {
            write!(f, ",{}", b)?;
        }
        write!(f, "]")
    }
}

/// Lazy iterator over packed assignments, in index order
#[derive(Clone, Debug)]
pub struct VariableIter<'a, I> {
    ids: I,
    values: &'a [u8],
    element_size: usize,
}

impl<'a, I: Iterator<Item = VariableId>> Iterator for VariableIter<'a, I> {
    type Item = Variable<'a>;

    fn next(&mut self) -> Option<Variable<'a>> {
        let id = self.ids.next()?;
        // values.len() == remaining ids * element_size, checked on construction
        let (value, rest) = self.values.split_at(self.element_size);
        self.values = rest;
        Some(Variable { id, value })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl<'a, I: ExactSizeIterator<Item = VariableId>> ExactSizeIterator for VariableIter<'a, I> {}

/// Ids read straight from the wire
pub type WireIds<'a> = Map<VectorIter<'a, u64>, fn(u64) -> VariableId>;

/// Ids of an owned record
pub type OwnedIds<'a> = Copied<std::slice::Iter<'a, VariableId>>;

// ============================================================================
// Wire view
// ============================================================================

/// Packed assignments borrowed from a parsed message
#[derive(Clone, Copy, Debug)]
pub struct Variables<'a> {
    ids: Vector<'a, u64>,
    values: &'a [u8],
    element_size: usize,
}

impl<'a> Variables<'a> {
    /// Pair up the two arrays, rejecting misaligned value arrays
    pub fn new(ids: Vector<'a, u64>, values: &'a [u8]) -> Result<Self> {
        let element_size = element_size(ids.len(), values.len())?;
        Ok(Self {
            ids,
            values,
            element_size,
        })
    }

    /// Missing vectors read as empty
    pub(crate) fn from_table(table: VariablesTable<'a>) -> Result<Self> {
        let ids = table.variable_ids().unwrap_or_default();
        let values = table.values().unwrap_or(&[]);
        Self::new(ids, values)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[inline]
    pub fn element_size(&self) -> usize {
        self.element_size
    }

    /// True when the record carries values, not just ids
    #[inline]
    pub fn has_values(&self) -> bool {
        !self.values.is_empty()
    }

    pub fn variable_ids(&self) -> WireIds<'a> {
        self.ids.iter().map(VariableId::new as fn(u64) -> VariableId)
    }

    /// The flat value array
    #[inline]
    pub fn values(&self) -> &'a [u8] {
        self.values
    }

    pub fn get(&self, index: usize) -> Option<Variable<'a>> {
        if index >= self.ids.len() {
            return None;
        }
        let id = VariableId::new(self.ids.get(index));
        let start = index * self.element_size;
        Some(Variable {
            id,
            value: &self.values[start..start + self.element_size],
        })
    }

    /// Restartable: every call starts again from index 0
    pub fn iter(&self) -> VariableIter<'a, WireIds<'a>> {
        VariableIter {
            ids: self.variable_ids(),
            values: self.values,
            element_size: self.element_size,
        }
    }
}

/// Same ids and value bytes, wherever they sit in their buffers
impl PartialEq for Variables<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.ids.bytes() == other.ids.bytes() && self.values == other.values
    }
}

impl Eq for Variables<'_> {}

impl<'a> IntoIterator for Variables<'a> {
    type Item = Variable<'a>;
    type IntoIter = VariableIter<'a, WireIds<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &Variables<'a> {
    type Item = Variable<'a>;
    type IntoIter = VariableIter<'a, WireIds<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Unpack parallel arrays read from the wire
pub fn unpack<'a>(ids: Vector<'a, u64>, values: &'a [u8]) -> Result<Variables<'a>> {
    Variables::new(ids, values)
}

// ============================================================================
// Owned form
// ============================================================================

/// Packed assignments owned by a producer
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct VariablesOwned {
    pub variable_ids: Vec<VariableId>,
    pub values: Vec<u8>,
}

impl VariablesOwned {
    /// Ids without values
    pub fn unassigned(variable_ids: impl IntoIterator<Item = VariableId>) -> Self {
        Self {
            variable_ids: variable_ids.into_iter().collect(),
            values: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.variable_ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.variable_ids.is_empty()
    }

    pub fn element_size(&self) -> Result<usize> {
        element_size(self.variable_ids.len(), self.values.len())
    }

    /// Iterate the pairs, failing first if the arrays are misaligned
    pub fn iter(&self) -> Result<VariableIter<'_, OwnedIds<'_>>> {
        Ok(VariableIter {
            ids: self.variable_ids.iter().copied(),
            values: &self.values,
            element_size: self.element_size()?,
        })
    }

    /// Bytes these arrays add to a message, roughly
    pub(crate) fn size_hint(&self) -> usize {
        self.variable_ids.len() * 8 + self.values.len() + 32
    }

    /// Write the Variables table
    pub fn build<'b>(&self, builder: &mut FlatBufferBuilder<'b>) -> WIPOffset<VariablesTable<'b>> {
        let ids = builder.create_vector_from_iter(self.variable_ids.iter().map(|id| id.get()));
        let values = builder.create_vector(self.values.as_slice());

        let start = builder.start_table();
        builder.push_slot_always(VariablesTable::VT_VALUES, values);
        builder.push_slot_always(VariablesTable::VT_VARIABLE_IDS, ids);
        end_table(builder, start)
    }
}

impl From<Variables<'_>> for VariablesOwned {
    fn from(vars: Variables<'_>) -> Self {
        Self {
            variable_ids: vars.variable_ids().collect(),
            values: vars.values().to_vec(),
        }
    }
}

/// Pack `(id, value)` pairs into parallel arrays.
///
/// Every value must have the same width as the first one; ids and values
/// keep the input order. Zero-width values are accepted and give the
/// unassigned shape: ids with an empty value array, element size 0.
pub fn pack<I, V>(pairs: I) -> Result<VariablesOwned>
where
    I: IntoIterator<Item = (VariableId, V)>,
    V: AsRef<[u8]>,
{
    let pairs = pairs.into_iter();
    let mut owned = VariablesOwned {
        variable_ids: Vec::with_capacity(pairs.size_hint().0),
        values: Vec::new(),
    };
    let mut expected = None;

    for (index, (id, value)) in pairs.enumerate() {
        let value = value.as_ref();
        match expected {
            None => expected = Some(value.len()),
            Some(width) if width != value.len() => {
                return Err(ZkifError::InconsistentElementSize {
                    index,
                    expected: width,
                    found: value.len(),
                });
            }
            Some(_) => {}
        }
        owned.variable_ids.push(id);
        owned.values.extend_from_slice(value);
    }

    Ok(owned)
}
