//! # Key-value attributes
//!
//! Free-form metadata attached to circuits (`configuration`) and constraint
//! systems (`info`). The key is a string; the value is any mix of a byte
//! string, a text string and an integer.

use crate::schema::{end_table, table_wrapper, KeyValues};
use flatbuffers::{
    FlatBufferBuilder, ForwardsUOffset, InvalidFlatbuffer, VOffsetT, Vector, Verifiable, Verifier,
    WIPOffset,
};
use serde::{Deserialize, Serialize};

table_wrapper!(
    /// One attribute borrowed from a parsed message
    KeyValue
);

impl<'a> KeyValue<'a> {
    pub const VT_KEY: VOffsetT = 4;
    pub const VT_DATA: VOffsetT = 6;
    pub const VT_TEXT: VOffsetT = 8;
    pub const VT_NUMBER: VOffsetT = 10;

    /// Verified present
    #[inline]
    pub fn key(&self) -> &'a str {
        self.field::<ForwardsUOffset<&'a str>>(Self::VT_KEY)
            .unwrap_or_default()
    }

    #[inline]
    pub fn data(&self) -> Option<&'a [u8]> {
        self.field::<ForwardsUOffset<Vector<'a, u8>>>(Self::VT_DATA)
            .map(|v| v.bytes())
    }

    #[inline]
    pub fn text(&self) -> Option<&'a str> {
        self.field::<ForwardsUOffset<&'a str>>(Self::VT_TEXT)
    }

    #[inline]
    pub fn number(&self) -> i64 {
        self.field::<i64>(Self::VT_NUMBER).unwrap_or(0)
    }
}

impl Verifiable for KeyValue<'_> {
    fn run_verifier(v: &mut Verifier, pos: usize) -> std::result::Result<(), InvalidFlatbuffer> {
        v.visit_table(pos)?
            .visit_field::<ForwardsUOffset<&str>>("key", Self::VT_KEY, true)?
            .visit_field::<ForwardsUOffset<Vector<'_, u8>>>("data", Self::VT_DATA, false)?
            .visit_field::<ForwardsUOffset<&str>>("text", Self::VT_TEXT, false)?
            .visit_field::<i64>("number", Self::VT_NUMBER, false)?
            .finish();
        Ok(())
    }
}

/// One attribute owned by a producer
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct KeyValueOwned {
    pub key: String,
    pub data: Option<Vec<u8>>,
    pub text: Option<String>,
    pub number: i64,
}

impl KeyValueOwned {
    pub fn text(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn data(key: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            data: Some(data.into()),
            ..Self::default()
        }
    }

    pub fn number(key: impl Into<String>, number: i64) -> Self {
        Self {
            key: key.into(),
            number,
            ..Self::default()
        }
    }

    /// Bytes this attribute adds to a message, roughly
    pub(crate) fn size_hint(&self) -> usize {
        let data = self.data.as_ref().map_or(0, Vec::len);
        let text = self.text.as_ref().map_or(0, String::len);
        self.key.len() + data + text + 48
    }

    /// Write the KeyValue table
    pub fn build<'b>(&self, builder: &mut FlatBufferBuilder<'b>) -> WIPOffset<KeyValue<'b>> {
        let key = builder.create_string(&self.key);
        let data = self.data.as_ref().map(|data| builder.create_vector(data.as_slice()));
        let text = self.text.as_ref().map(|text| builder.create_string(text));

        let start = builder.start_table();
        builder.push_slot::<i64>(KeyValue::VT_NUMBER, self.number, 0);
        if let Some(text) = text {
            builder.push_slot_always(KeyValue::VT_TEXT, text);
        }
        if let Some(data) = data {
            builder.push_slot_always(KeyValue::VT_DATA, data);
        }
        builder.push_slot_always(KeyValue::VT_KEY, key);
        end_table(builder, start)
    }

    /// Write a vector of KeyValue tables
    pub(crate) fn build_all<'b>(
        attributes: &[KeyValueOwned],
        builder: &mut FlatBufferBuilder<'b>,
    ) -> WIPOffset<Vector<'b, ForwardsUOffset<KeyValue<'b>>>> {
        let tables: Vec<_> = attributes.iter().map(|kv| kv.build(builder)).collect();
        builder.create_vector(tables.as_slice())
    }

    /// Copy every attribute of a wire vector
    pub fn from_vector(attributes: KeyValues<'_>) -> Vec<KeyValueOwned> {
        attributes.iter().map(KeyValueOwned::from).collect()
    }
}

impl From<KeyValue<'_>> for KeyValueOwned {
    fn from(kv: KeyValue<'_>) -> Self {
        Self {
            key: kv.key().to_string(),
            data: kv.data().map(<[u8]>::to_vec),
            text: kv.text().map(str::to_string),
            number: kv.number(),
        }
    }
}
