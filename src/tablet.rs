//! Typed cell values, series metadata enums, and columnar row batches.
//!
//! A [`Tablet`] is a column-major batch of rows for a single device, the
//! unit of bulk insertion. Construction validates that every parallel
//! array lines up before anything is encoded or dispatched: one timestamp
//! per row, one value per row in every column, and cell types matching the
//! declared column types.
use std::str::FromStr;

use bincode::{Decode, Encode};
use thiserror::Error;

use crate::buffer::{BufferError, ByteBuffer};

/// Data type of a single measurement column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum DataType {
    Boolean,
    Int32,
    Int64,
    Float,
    Double,
    Text,
}

/// On-wire encoding requested for a new time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum TsEncoding {
    Plain,
    PlainDictionary,
    Rle,
    Diff,
    Ts2Diff,
    Bitmap,
    GorillaV1,
    Regular,
    Gorilla,
}

/// Compression requested for a new time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub enum Compressor {
    Uncompressed,
    Snappy,
    Gzip,
    Lzo,
    Sdt,
    Paa,
    Pla,
    Lz4,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized {0} '{1}'")]
pub struct UnknownKeyword(&'static str, String);

impl FromStr for DataType {
    type Err = UnknownKeyword;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "boolean" | "bool" => Ok(DataType::Boolean),
            "int32" => Ok(DataType::Int32),
            "int64" => Ok(DataType::Int64),
            "float" => Ok(DataType::Float),
            "double" => Ok(DataType::Double),
            "text" => Ok(DataType::Text),
            _ => Err(UnknownKeyword("data type", s.to_string())),
        }
    }
}

impl FromStr for TsEncoding {
    type Err = UnknownKeyword;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "plain" => Ok(TsEncoding::Plain),
            "plain_dictionary" => Ok(TsEncoding::PlainDictionary),
            "rle" => Ok(TsEncoding::Rle),
            "diff" => Ok(TsEncoding::Diff),
            "ts_2diff" | "ts2diff" => Ok(TsEncoding::Ts2Diff),
            "bitmap" => Ok(TsEncoding::Bitmap),
            "gorilla_v1" => Ok(TsEncoding::GorillaV1),
            "regular" => Ok(TsEncoding::Regular),
            "gorilla" => Ok(TsEncoding::Gorilla),
            _ => Err(UnknownKeyword("encoding", s.to_string())),
        }
    }
}

impl FromStr for Compressor {
    type Err = UnknownKeyword;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uncompressed" => Ok(Compressor::Uncompressed),
            "snappy" => Ok(Compressor::Snappy),
            "gzip" => Ok(Compressor::Gzip),
            "lzo" => Ok(Compressor::Lzo),
            "sdt" => Ok(Compressor::Sdt),
            "paa" => Ok(Compressor::Paa),
            "pla" => Ok(Compressor::Pla),
            "lz4" => Ok(Compressor::Lz4),
            _ => Err(UnknownKeyword("compressor", s.to_string())),
        }
    }
}

impl From<DataType> for u8 {
    fn from(value: DataType) -> Self {
        match value {
            DataType::Boolean => 0x0,
            DataType::Int32 => 0x1,
            DataType::Int64 => 0x2,
            DataType::Float => 0x3,
            DataType::Double => 0x4,
            DataType::Text => 0x5,
        }
    }
}

impl TryFrom<u8> for DataType {
    type Error = BufferError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x0 => Ok(DataType::Boolean),
            0x1 => Ok(DataType::Int32),
            0x2 => Ok(DataType::Int64),
            0x3 => Ok(DataType::Float),
            0x4 => Ok(DataType::Double),
            0x5 => Ok(DataType::Text),
            _ => Err(BufferError::Marker(value)),
        }
    }
}

/// One typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Text(String),
}

impl Value {
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Bool(_) => DataType::Boolean,
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::Float(_) => DataType::Float,
            Value::Double(_) => DataType::Double,
            Value::Text(_) => DataType::Text,
        }
    }

    pub(crate) fn encode_into(&self, buffer: &mut ByteBuffer) {
        match self {
            Value::Bool(v) => buffer.add_bool(*v),
            Value::Int32(v) => buffer.add_i32(*v),
            Value::Int64(v) => buffer.add_i64(*v),
            Value::Float(v) => buffer.add_f32(*v),
            Value::Double(v) => buffer.add_f64(*v),
            Value::Text(v) => buffer.add_str(v),
        }
    }

    /// Decode a value of a known type from a buffer.
    pub fn decode(buffer: &mut ByteBuffer, data_type: DataType) -> Result<Self, BufferError> {
        Ok(match data_type {
            DataType::Boolean => Value::Bool(buffer.get_bool()?),
            DataType::Int32 => Value::Int32(buffer.get_i32()?),
            DataType::Int64 => Value::Int64(buffer.get_i64()?),
            DataType::Float => Value::Float(buffer.get_f32()?),
            DataType::Double => Value::Double(buffer.get_f64()?),
            DataType::Text => Value::Text(buffer.get_str()?),
        })
    }
}

/// Encode one row of values as `type marker, value` pairs.
pub fn encode_row(values: &[Value]) -> Vec<u8> {
    let mut buffer = ByteBuffer::new();
    for value in values {
        buffer.add_byte(value.data_type().into());
        value.encode_into(&mut buffer);
    }
    buffer.into_bytes()
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TabletError {
    #[error("tablet for '{device}' declares {measurements} measurements but holds {columns} value columns")]
    ColumnCount {
        device: String,
        measurements: usize,
        columns: usize,
    },

    #[error("column '{column}' holds {values} values for {rows} timestamps")]
    RowCount {
        column: String,
        values: usize,
        rows: usize,
    },

    #[error("column '{column}' is declared {declared:?} but holds a {actual:?} value")]
    CellType {
        column: String,
        declared: DataType,
        actual: DataType,
    },
}

/// Column-major batch of rows for one device.
#[derive(Debug, Clone)]
pub struct Tablet {
    device_id: String,
    measurements: Vec<(String, DataType)>,
    timestamps: Vec<i64>,
    values: Vec<Vec<Value>>,
}

impl Tablet {
    /// Build a tablet, rejecting any misaligned or mistyped column before
    /// encoding or dispatch can happen.
    pub fn new(
        device_id: impl Into<String>,
        measurements: Vec<(String, DataType)>,
        timestamps: Vec<i64>,
        values: Vec<Vec<Value>>,
    ) -> Result<Self, TabletError> {
        let device_id = device_id.into();

        if values.len() != measurements.len() {
            return Err(TabletError::ColumnCount {
                device: device_id,
                measurements: measurements.len(),
                columns: values.len(),
            });
        }

        for ((name, declared), column) in measurements.iter().zip(&values) {
            if column.len() != timestamps.len() {
                return Err(TabletError::RowCount {
                    column: name.clone(),
                    values: column.len(),
                    rows: timestamps.len(),
                });
            }

            if let Some(cell) = column.iter().find(|v| v.data_type() != *declared) {
                return Err(TabletError::CellType {
                    column: name.clone(),
                    declared: *declared,
                    actual: cell.data_type(),
                });
            }
        }

        Ok(Self {
            device_id,
            measurements,
            timestamps,
            values,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn row_count(&self) -> usize {
        self.timestamps.len()
    }

    pub fn measurement_names(&self) -> Vec<String> {
        self.measurements.iter().map(|(name, _)| name.clone()).collect()
    }

    pub fn data_types(&self) -> Vec<DataType> {
        self.measurements.iter().map(|(_, t)| *t).collect()
    }

    /// Timestamps as 8-byte big-endian values, one per row.
    pub fn encode_timestamps(&self) -> Vec<u8> {
        let mut buffer = ByteBuffer::new();
        for ts in &self.timestamps {
            buffer.add_i64(*ts);
        }
        buffer.into_bytes()
    }

    /// Values column by column, untagged; column types travel separately
    /// in the request.
    pub fn encode_values(&self) -> Vec<u8> {
        let mut buffer = ByteBuffer::new();
        for column in &self.values {
            for value in column {
                value.encode_into(&mut buffer);
            }
        }
        buffer.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn measurements() -> Vec<(String, DataType)> {
        vec![
            ("temperature".to_string(), DataType::Float),
            ("status".to_string(), DataType::Boolean),
        ]
    }

    #[test]
    fn tablet_requires_one_column_per_measurement() {
        let result = Tablet::new(
            "root.sg1.d1",
            measurements(),
            vec![1, 2],
            vec![vec![Value::Float(1.0), Value::Float(2.0)]],
        );

        assert_eq!(
            result.unwrap_err(),
            TabletError::ColumnCount {
                device: "root.sg1.d1".to_string(),
                measurements: 2,
                columns: 1,
            }
        );
    }

    #[test]
    fn tablet_requires_one_value_per_timestamp() {
        let result = Tablet::new(
            "root.sg1.d1",
            measurements(),
            vec![1, 2],
            vec![
                vec![Value::Float(1.0), Value::Float(2.0)],
                vec![Value::Bool(true)],
            ],
        );

        assert_eq!(
            result.unwrap_err(),
            TabletError::RowCount {
                column: "status".to_string(),
                values: 1,
                rows: 2,
            }
        );
    }

    #[test]
    fn tablet_rejects_mistyped_cells() {
        let result = Tablet::new(
            "root.sg1.d1",
            measurements(),
            vec![1],
            vec![vec![Value::Float(1.0)], vec![Value::Int32(0)]],
        );

        assert_eq!(
            result.unwrap_err(),
            TabletError::CellType {
                column: "status".to_string(),
                declared: DataType::Boolean,
                actual: DataType::Int32,
            }
        );
    }

    #[test]
    fn timestamps_encode_eight_bytes_per_row() {
        let tablet = Tablet::new(
            "root.sg1.d1",
            measurements(),
            vec![10, 20, 30],
            vec![
                vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)],
                vec![Value::Bool(true), Value::Bool(false), Value::Bool(true)],
            ],
        )
        .unwrap();

        let bytes = tablet.encode_timestamps();
        assert_eq!(bytes.len(), 3 * 8);

        let mut buffer = ByteBuffer::from_bytes(bytes);
        assert_eq!(buffer.get_i64().unwrap(), 10);
        assert_eq!(buffer.get_i64().unwrap(), 20);
        assert_eq!(buffer.get_i64().unwrap(), 30);
    }

    #[test]
    fn values_encode_column_major() {
        let tablet = Tablet::new(
            "root.sg1.d1",
            measurements(),
            vec![10, 20],
            vec![
                vec![Value::Float(1.5), Value::Float(2.5)],
                vec![Value::Bool(true), Value::Bool(false)],
            ],
        )
        .unwrap();

        let mut buffer = ByteBuffer::from_bytes(tablet.encode_values());
        assert_eq!(buffer.get_f32().unwrap(), 1.5);
        assert_eq!(buffer.get_f32().unwrap(), 2.5);
        assert!(buffer.get_bool().unwrap());
        assert!(!buffer.get_bool().unwrap());
        assert!(!buffer.has_remaining());
    }

    #[test]
    fn row_encoding_tags_each_value() {
        let row = vec![Value::Int64(9), Value::Text("ok".to_string())];
        let mut buffer = ByteBuffer::from_bytes(encode_row(&row));

        let marker: DataType = buffer.get_byte().unwrap().try_into().unwrap();
        assert_eq!(marker, DataType::Int64);
        assert_eq!(
            Value::decode(&mut buffer, marker).unwrap(),
            Value::Int64(9)
        );

        let marker: DataType = buffer.get_byte().unwrap().try_into().unwrap();
        assert_eq!(marker, DataType::Text);
        assert_eq!(
            Value::decode(&mut buffer, marker).unwrap(),
            Value::Text("ok".to_string())
        );
        assert!(!buffer.has_remaining());
    }

    #[test]
    fn keywords_parse_case_insensitively() {
        assert_eq!("INT64".parse::<DataType>().unwrap(), DataType::Int64);
        assert_eq!("rle".parse::<TsEncoding>().unwrap(), TsEncoding::Rle);
        assert_eq!("Snappy".parse::<Compressor>().unwrap(), Compressor::Snappy);
        assert!("int128".parse::<DataType>().is_err());
    }
}
