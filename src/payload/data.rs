//! Decoding of channel values from response payload bytes.
//!
//! Each response carries a datatype tag selecting the interpretation of
//! the value bytes that follow it. All multi-byte encodings are
//! little-endian on the wire.

use crate::constants::*;
use nom::combinator::map;
use nom::number::complete::{le_f32, le_f64, le_i16, le_i32, le_i8, le_u16, le_u32, le_u8};
use nom::IResult;
use serde::Serialize;
use thiserror::Error;

/// A decoded channel value.
///
/// Integers of every width collapse into `Integer`; both float widths
/// collapse into `Float`. `NoData` stands in when the device reported an
/// error status or the value could not be decoded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ChannelValue {
    Integer(i64),
    Float(f64),
    Boolean(bool),
    NoData,
}

/// Errors local to value decoding; the query layer degrades them to
/// `NoData` results instead of failing the whole query.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    #[error("Unknown datatype tag: 0x{0:02X}")]
    UnknownTag(u8),

    #[error("Value too short for tag 0x{tag:02X}: {len} bytes")]
    ShortData { tag: u8, len: usize },
}

/// Decodes the value bytes according to the datatype tag.
pub fn decode_channel_value(tag: u8, data: &[u8]) -> Result<ChannelValue, ValueError> {
    let parsed: IResult<&[u8], ChannelValue> = match tag {
        UMB_TYPE_U8 => map(le_u8, |v| ChannelValue::Integer(v as i64))(data),
        UMB_TYPE_I8 => map(le_i8, |v| ChannelValue::Integer(v as i64))(data),
        UMB_TYPE_U16 => map(le_u16, |v| ChannelValue::Integer(v as i64))(data),
        UMB_TYPE_I16 => map(le_i16, |v| ChannelValue::Integer(v as i64))(data),
        UMB_TYPE_U32 => map(le_u32, |v| ChannelValue::Integer(v as i64))(data),
        UMB_TYPE_I32 => map(le_i32, |v| ChannelValue::Integer(v as i64))(data),
        UMB_TYPE_F32 => map(le_f32, |v| ChannelValue::Float(v as f64))(data),
        UMB_TYPE_F64 => map(le_f64, ChannelValue::Float)(data),
        UMB_TYPE_BOOL => map(le_u8, |v| ChannelValue::Boolean(v != 0))(data),
        other => return Err(ValueError::UnknownTag(other)),
    };

    parsed.map(|(_, value)| value).map_err(|_| ValueError::ShortData {
        tag,
        len: data.len(),
    })
}
