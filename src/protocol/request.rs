use bincode::{Decode, Encode};

use crate::tablet::{Compressor, DataType, TsEncoding};

/// One encoded row for a single device at a single timestamp.
///
/// `values` carries the row through the buffer codec: a type marker byte
/// followed by the value bytes, once per measurement.
#[derive(Debug, Clone, Encode, Decode, PartialEq)]
pub struct RecordPayload {
    pub device_id: String,
    pub measurements: Vec<String>,
    pub values: Vec<u8>,
    pub timestamp: i64,
}

/// A columnar batch ready for the wire: untagged column-major values and
/// 8-byte timestamps, with the column types declared once.
#[derive(Debug, Clone, Encode, Decode, PartialEq)]
pub struct TabletPayload {
    pub device_id: String,
    pub measurements: Vec<String>,
    pub data_types: Vec<DataType>,
    pub values: Vec<u8>,
    pub timestamps: Vec<u8>,
    pub row_count: i32,
}

/// One variant per remote operation. Every variant past the handshake
/// carries the session identifier issued by the server.
#[derive(Debug, Clone, Encode, Decode, PartialEq)]
pub enum Request {
    OpenSession {
        protocol_version: i32,
        zone_id: String,
        username: String,
        password: String,
    },
    RequestStatementId {
        session_id: i64,
    },
    CloseSession {
        session_id: i64,
    },
    SetStorageGroup {
        session_id: i64,
        group: String,
    },
    DeleteStorageGroups {
        session_id: i64,
        groups: Vec<String>,
    },
    CreateTimeseries {
        session_id: i64,
        path: String,
        data_type: DataType,
        encoding: TsEncoding,
        compressor: Compressor,
    },
    CreateMultiTimeseries {
        session_id: i64,
        paths: Vec<String>,
        data_types: Vec<DataType>,
        encodings: Vec<TsEncoding>,
        compressors: Vec<Compressor>,
    },
    DeleteTimeseries {
        session_id: i64,
        paths: Vec<String>,
    },
    DeleteData {
        session_id: i64,
        paths: Vec<String>,
        start_time: i64,
        end_time: i64,
    },
    SetTimeZone {
        session_id: i64,
        time_zone: String,
    },
    GetTimeZone {
        session_id: i64,
    },
    InsertRecord {
        session_id: i64,
        record: RecordPayload,
    },
    InsertRecords {
        session_id: i64,
        records: Vec<RecordPayload>,
    },
    InsertRecordsOfOneDevice {
        session_id: i64,
        device_id: String,
        measurements: Vec<Vec<String>>,
        values: Vec<Vec<u8>>,
        timestamps: Vec<i64>,
    },
    InsertTablet {
        session_id: i64,
        tablet: TabletPayload,
    },
    InsertTablets {
        session_id: i64,
        tablets: Vec<TabletPayload>,
    },
    // validation-only twins: the server checks the payload but stores nothing
    TestInsertRecord {
        session_id: i64,
        record: RecordPayload,
    },
    TestInsertRecords {
        session_id: i64,
        records: Vec<RecordPayload>,
    },
    TestInsertTablet {
        session_id: i64,
        tablet: TabletPayload,
    },
    TestInsertTablets {
        session_id: i64,
        tablets: Vec<TabletPayload>,
    },
}
