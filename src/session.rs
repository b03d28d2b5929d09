//! Session lifecycle and administrative operations.
//!
//! A [`Session`] is a stateful, authenticated channel to the remote
//! database. It is constructed closed, opened by a handshake that
//! negotiates protocol version, credentials, server-issued session and
//! statement identifiers, and a time zone, then used for administrative
//! and row-mutation operations until it is closed exactly once.
//!
//! # Overview
//!
//! Every operation follows one shape: build a request tagged with the
//! session identifier, dispatch it synchronously against the
//! [`RemoteService`] boundary, and gate the reply through [`verify`]:
//! 0 for a success status, -1 otherwise. Transport failures are raised;
//! application failures are logged and returned as result codes.
//!
//! A session is single-owner: every operation takes `&mut self`, one
//! request is outstanding at a time, and sharing across threads requires
//! external serialization.
//!
//! # Key Components
//!
//! - [`Session`]: the connection manager and operation surface.
//! - [`SessionConfig`]: connection settings fixed for the session's life.
//! - [`verify`]: the single success/failure gate for every operation.
//!
//! # See Also
//!
//! - [`protocol`](crate::protocol): request/response records and transport.
//! - [`tablet`](crate::tablet): columnar batches for bulk insertion.
use std::net::TcpStream;

use log::{debug, error, info, warn};
use thiserror::Error;

use crate::{
    protocol::{
        PROTOCOL_VERSION, ProtocolTransport, RecordPayload, RemoteService, Request, Response,
        Status, TabletPayload, TransportError, WireEncoding,
    },
    tablet::{Compressor, DataType, Tablet, TabletError, TsEncoding, Value, encode_row},
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),

    #[error("session is not open")]
    Closed,

    #[error("session has already been closed")]
    Expired,

    #[error("server protocol version {0} is not supported")]
    UnsupportedProtocol(i32),

    #[error("server rejected the session: {0}")]
    Handshake(String),

    #[error("unexpected '{0}' response")]
    UnexpectedResponse(&'static str),

    #[error("{what} differ in length: {left} vs {right}")]
    Misaligned {
        what: &'static str,
        left: usize,
        right: usize,
    },

    #[error("timestamps are not in ascending order")]
    Unsorted,

    #[error(transparent)]
    Tablet(#[from] TabletError),
}

/// Connection settings, fixed for the lifetime of a session.
///
/// An empty `time_zone` means the server's default is adopted at
/// handshake; a non-empty one is pushed to the server instead.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub fetch_size: i32,
    pub time_zone: String,
}

impl SessionConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: "root".to_string(),
            password: "root".to_string(),
            fetch_size: 10_000,
            time_zone: String::new(),
        }
    }
}

/// Server-issued identity of the session, owned in one place so every
/// operation consults the same open/closed state.
#[derive(Debug, Default)]
struct SessionState {
    session_id: i64,
    statement_id: i64,
    time_zone: String,
    is_open: bool,
    retired: bool,
}

/// Stateful client session against a remote time-series database.
///
/// Constructed closed; [`Session::open`] runs the handshake. After
/// [`Session::close`] the value is permanently unusable; reconnecting
/// takes a new `Session`.
pub struct Session {
    config: SessionConfig,
    state: SessionState,
    service: Option<Box<dyn RemoteService>>,
}

/// Single success gate for every remote status: 0 iff the status carries
/// the success code, otherwise the message is logged and -1 returned.
pub fn verify(status: &Status) -> i32 {
    if status.is_success() {
        return 0;
    }
    warn!("error status is [{}] {}", status.code, status.message);
    -1
}

impl Session {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_config(SessionConfig::new(host, port))
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            config,
            state: SessionState::default(),
            service: None,
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.config.username = username.into();
        self.config.password = password.into();
        self
    }

    pub fn with_fetch_size(mut self, fetch_size: i32) -> Self {
        self.config.fetch_size = fetch_size;
        self
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.config.time_zone = time_zone.into();
        self
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open
    }

    /// Session identifier issued by the server; zero until opened.
    pub fn session_id(&self) -> i64 {
        self.state.session_id
    }

    /// Statement identifier issued by the server; zero until opened.
    pub fn statement_id(&self) -> i64 {
        self.state.statement_id
    }

    /// Connect to the configured endpoint and run the handshake.
    ///
    /// A no-op when already open. `enable_compact_encoding` selects the
    /// wire framing flavor; it does not change any session logic.
    pub fn open(&mut self, enable_compact_encoding: bool) -> Result<(), SessionError> {
        if self.state.is_open {
            return Ok(());
        }
        if self.state.retired {
            return Err(SessionError::Expired);
        }

        let stream = TcpStream::connect((self.config.host.as_str(), self.config.port))
            .map_err(TransportError::Io)?;
        let encoding = if enable_compact_encoding {
            WireEncoding::Compact
        } else {
            WireEncoding::Verbose
        };

        self.attach(Box::new(ProtocolTransport::new(stream, encoding)))
    }

    /// Run the handshake over an established channel.
    ///
    /// On any failure the channel is dropped, which closes the underlying
    /// transport, and the session stays closed.
    pub(crate) fn attach(&mut self, mut service: Box<dyn RemoteService>) -> Result<(), SessionError> {
        if self.state.is_open {
            return Ok(());
        }
        if self.state.retired {
            return Err(SessionError::Expired);
        }

        match handshake(service.as_mut(), &self.config) {
            Ok(state) => {
                info!(
                    "session {} open against {}:{}",
                    state.session_id, self.config.host, self.config.port
                );
                self.state = state;
                self.service = Some(service);
                Ok(())
            }
            Err(e) => {
                error!(
                    "handshake with {}:{} failed: {e}",
                    self.config.host, self.config.port
                );
                Err(e)
            }
        }
    }

    /// Tear the session down. A no-op when never opened or already closed.
    ///
    /// The close request is best-effort: a server that is down or refuses
    /// is logged, and the transport is released regardless.
    pub fn close(&mut self) {
        if !self.state.is_open {
            return;
        }

        let session_id = self.state.session_id;
        if let Some(service) = self.service.as_deref_mut() {
            match service.dispatch(Request::CloseSession { session_id }) {
                Ok(Response::Status(status)) if !status.is_success() => {
                    warn!("server refused to close session: {}", status.message);
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("error closing session at server, maybe it is down: {e}");
                }
            }
        }

        self.service = None;
        self.state.is_open = false;
        self.state.retired = true;
        info!("session {session_id} closed");
    }

    pub fn set_storage_group(&mut self, group: &str) -> Result<i32, SessionError> {
        let req = Request::SetStorageGroup {
            session_id: self.state.session_id,
            group: group.to_string(),
        };
        self.execute(req)
    }

    pub fn delete_storage_group(&mut self, group: &str) -> Result<i32, SessionError> {
        self.delete_storage_groups(vec![group.to_string()])
    }

    pub fn delete_storage_groups(&mut self, groups: Vec<String>) -> Result<i32, SessionError> {
        let req = Request::DeleteStorageGroups {
            session_id: self.state.session_id,
            groups,
        };
        self.execute(req)
    }

    pub fn create_time_series(
        &mut self,
        path: &str,
        data_type: DataType,
        encoding: TsEncoding,
        compressor: Compressor,
    ) -> Result<i32, SessionError> {
        let req = Request::CreateTimeseries {
            session_id: self.state.session_id,
            path: path.to_string(),
            data_type,
            encoding,
            compressor,
        };
        self.execute(req)
    }

    pub fn create_multi_time_series(
        &mut self,
        paths: Vec<String>,
        data_types: Vec<DataType>,
        encodings: Vec<TsEncoding>,
        compressors: Vec<Compressor>,
    ) -> Result<i32, SessionError> {
        aligned("paths and data types", paths.len(), data_types.len())?;
        aligned("paths and encodings", paths.len(), encodings.len())?;
        aligned("paths and compressors", paths.len(), compressors.len())?;

        let req = Request::CreateMultiTimeseries {
            session_id: self.state.session_id,
            paths,
            data_types,
            encodings,
            compressors,
        };
        self.execute(req)
    }

    pub fn delete_time_series(&mut self, paths: Vec<String>) -> Result<i32, SessionError> {
        let req = Request::DeleteTimeseries {
            session_id: self.state.session_id,
            paths,
        };
        self.execute(req)
    }

    /// Delete all points in `[start_time, end_time]` for the given paths.
    pub fn delete_data(
        &mut self,
        paths: Vec<String>,
        start_time: i64,
        end_time: i64,
    ) -> Result<i32, SessionError> {
        let req = Request::DeleteData {
            session_id: self.state.session_id,
            paths,
            start_time,
            end_time,
        };
        self.execute(req)
    }

    /// Push a time zone to the server; the local cache follows on success.
    pub fn set_time_zone(&mut self, time_zone: &str) -> Result<i32, SessionError> {
        let req = Request::SetTimeZone {
            session_id: self.state.session_id,
            time_zone: time_zone.to_string(),
        };
        let code = self.execute(req)?;
        if code == 0 {
            self.state.time_zone = time_zone.to_string();
        }
        Ok(code)
    }

    /// Session time zone; the server is consulted at most once, after
    /// which the cached value is returned until `set_time_zone` replaces
    /// it.
    pub fn get_time_zone(&mut self) -> Result<String, SessionError> {
        if !self.state.time_zone.is_empty() {
            return Ok(self.state.time_zone.clone());
        }

        let service = self.service.as_deref_mut().ok_or(SessionError::Closed)?;
        let resp = dispatch(
            service,
            Request::GetTimeZone {
                session_id: self.state.session_id,
            },
        )?;
        match resp {
            Response::TimeZone { status, time_zone } => {
                if verify(&status) == 0 {
                    self.state.time_zone = time_zone.clone();
                }
                Ok(time_zone)
            }
            other => Err(SessionError::UnexpectedResponse(other.kind())),
        }
    }

    /// Insert one row for one device.
    pub fn insert_record(
        &mut self,
        device_id: &str,
        measurements: Vec<String>,
        values: Vec<Value>,
        timestamp: i64,
    ) -> Result<i32, SessionError> {
        let record = build_record(device_id.to_string(), measurements, values, timestamp)?;
        let req = Request::InsertRecord {
            session_id: self.state.session_id,
            record,
        };
        self.execute(req)
    }

    /// Insert one row each for several devices.
    pub fn insert_records(
        &mut self,
        device_ids: Vec<String>,
        measurements: Vec<Vec<String>>,
        values: Vec<Vec<Value>>,
        timestamps: Vec<i64>,
    ) -> Result<i32, SessionError> {
        let records = build_records(device_ids, measurements, values, timestamps)?;
        let req = Request::InsertRecords {
            session_id: self.state.session_id,
            records,
        };
        self.execute(req)
    }

    /// Insert many rows for one device, in any timestamp order.
    ///
    /// Rows are sorted by ascending timestamp first; each row's
    /// measurements and values travel with its timestamp through the
    /// sort.
    pub fn insert_records_of_one_device(
        &mut self,
        device_id: &str,
        timestamps: Vec<i64>,
        measurements: Vec<Vec<String>>,
        values: Vec<Vec<Value>>,
    ) -> Result<i32, SessionError> {
        aligned("timestamps and measurement rows", timestamps.len(), measurements.len())?;
        aligned("timestamps and value rows", timestamps.len(), values.len())?;

        let mut rows: Vec<(i64, Vec<String>, Vec<Value>)> = timestamps
            .into_iter()
            .zip(measurements)
            .zip(values)
            .map(|((ts, m), v)| (ts, m, v))
            .collect();
        rows.sort_by_key(|(ts, ..)| *ts);

        let mut timestamps = Vec::with_capacity(rows.len());
        let mut measurements = Vec::with_capacity(rows.len());
        let mut values = Vec::with_capacity(rows.len());
        for (ts, m, v) in rows {
            timestamps.push(ts);
            measurements.push(m);
            values.push(v);
        }

        self.insert_records_of_one_device_sorted(device_id, timestamps, measurements, values)
    }

    /// Insert many rows for one device; timestamps must already ascend.
    pub fn insert_records_of_one_device_sorted(
        &mut self,
        device_id: &str,
        timestamps: Vec<i64>,
        measurements: Vec<Vec<String>>,
        values: Vec<Vec<Value>>,
    ) -> Result<i32, SessionError> {
        aligned("timestamps and measurement rows", timestamps.len(), measurements.len())?;
        aligned("timestamps and value rows", timestamps.len(), values.len())?;
        if !timestamps.is_sorted() {
            return Err(SessionError::Unsorted);
        }

        let mut encoded = Vec::with_capacity(values.len());
        for (row_measurements, row_values) in measurements.iter().zip(&values) {
            aligned(
                "row measurements and values",
                row_measurements.len(),
                row_values.len(),
            )?;
            encoded.push(encode_row(row_values));
        }

        let req = Request::InsertRecordsOfOneDevice {
            session_id: self.state.session_id,
            device_id: device_id.to_string(),
            measurements,
            values: encoded,
            timestamps,
        };
        self.execute(req)
    }

    /// Insert a columnar batch for one device.
    pub fn insert_tablet(&mut self, tablet: &Tablet) -> Result<i32, SessionError> {
        let req = Request::InsertTablet {
            session_id: self.state.session_id,
            tablet: tablet_payload(tablet),
        };
        self.execute(req)
    }

    pub fn insert_tablets(&mut self, tablets: &[Tablet]) -> Result<i32, SessionError> {
        let req = Request::InsertTablets {
            session_id: self.state.session_id,
            tablets: tablets.iter().map(tablet_payload).collect(),
        };
        self.execute(req)
    }

    /// Like [`Session::insert_record`], but the server only validates the
    /// payload and stores nothing.
    pub fn test_insert_record(
        &mut self,
        device_id: &str,
        measurements: Vec<String>,
        values: Vec<Value>,
        timestamp: i64,
    ) -> Result<i32, SessionError> {
        let record = build_record(device_id.to_string(), measurements, values, timestamp)?;
        let req = Request::TestInsertRecord {
            session_id: self.state.session_id,
            record,
        };
        self.execute(req)
    }

    pub fn test_insert_records(
        &mut self,
        device_ids: Vec<String>,
        measurements: Vec<Vec<String>>,
        values: Vec<Vec<Value>>,
        timestamps: Vec<i64>,
    ) -> Result<i32, SessionError> {
        let records = build_records(device_ids, measurements, values, timestamps)?;
        let req = Request::TestInsertRecords {
            session_id: self.state.session_id,
            records,
        };
        self.execute(req)
    }

    pub fn test_insert_tablet(&mut self, tablet: &Tablet) -> Result<i32, SessionError> {
        let req = Request::TestInsertTablet {
            session_id: self.state.session_id,
            tablet: tablet_payload(tablet),
        };
        self.execute(req)
    }

    pub fn test_insert_tablets(&mut self, tablets: &[Tablet]) -> Result<i32, SessionError> {
        let req = Request::TestInsertTablets {
            session_id: self.state.session_id,
            tablets: tablets.iter().map(tablet_payload).collect(),
        };
        self.execute(req)
    }

    /// The request/dispatch/verify pattern every administrative operation
    /// funnels through.
    fn execute(&mut self, request: Request) -> Result<i32, SessionError> {
        let service = self.service.as_deref_mut().ok_or(SessionError::Closed)?;
        match dispatch(service, request)? {
            Response::Status(status) => Ok(verify(&status)),
            other => Err(SessionError::UnexpectedResponse(other.kind())),
        }
    }
}

fn dispatch(
    service: &mut dyn RemoteService,
    request: Request,
) -> Result<Response, SessionError> {
    debug!("dispatching request: {request:?}");
    match service.dispatch(request) {
        Ok(resp) => Ok(resp),
        Err(e) => {
            error!("request dispatch failed: {e}");
            Err(e.into())
        }
    }
}

fn handshake(
    service: &mut dyn RemoteService,
    config: &SessionConfig,
) -> Result<SessionState, SessionError> {
    let open = Request::OpenSession {
        protocol_version: PROTOCOL_VERSION,
        zone_id: config.time_zone.clone(),
        username: config.username.clone(),
        password: config.password.clone(),
    };
    let (status, server_version, session_id) = match dispatch(service, open)? {
        Response::OpenSession {
            status,
            server_protocol_version,
            session_id,
        } => (status, server_protocol_version, session_id),
        other => return Err(SessionError::UnexpectedResponse(other.kind())),
    };

    if server_version != PROTOCOL_VERSION {
        warn!(
            "protocol differs, client version is {PROTOCOL_VERSION} but server version is {server_version}"
        );
    }
    if server_version == 0 {
        return Err(SessionError::UnsupportedProtocol(server_version));
    }
    if !status.is_success() {
        return Err(SessionError::Handshake(status.message));
    }

    let statement_id = match dispatch(service, Request::RequestStatementId { session_id })? {
        Response::StatementId(id) => id,
        other => return Err(SessionError::UnexpectedResponse(other.kind())),
    };

    let time_zone = if config.time_zone.is_empty() {
        // adopt the server's default
        match dispatch(service, Request::GetTimeZone { session_id })? {
            Response::TimeZone { status, time_zone } => {
                verify(&status);
                time_zone
            }
            other => return Err(SessionError::UnexpectedResponse(other.kind())),
        }
    } else {
        let push = Request::SetTimeZone {
            session_id,
            time_zone: config.time_zone.clone(),
        };
        match dispatch(service, push)? {
            Response::Status(status) => verify(&status),
            other => return Err(SessionError::UnexpectedResponse(other.kind())),
        };
        config.time_zone.clone()
    };

    Ok(SessionState {
        session_id,
        statement_id,
        time_zone,
        is_open: true,
        retired: false,
    })
}

fn aligned(what: &'static str, left: usize, right: usize) -> Result<(), SessionError> {
    if left != right {
        return Err(SessionError::Misaligned { what, left, right });
    }
    Ok(())
}

fn build_record(
    device_id: String,
    measurements: Vec<String>,
    values: Vec<Value>,
    timestamp: i64,
) -> Result<RecordPayload, SessionError> {
    aligned("measurements and values", measurements.len(), values.len())?;
    Ok(RecordPayload {
        device_id,
        values: encode_row(&values),
        measurements,
        timestamp,
    })
}

fn build_records(
    device_ids: Vec<String>,
    measurements: Vec<Vec<String>>,
    values: Vec<Vec<Value>>,
    timestamps: Vec<i64>,
) -> Result<Vec<RecordPayload>, SessionError> {
    aligned("devices and measurement rows", device_ids.len(), measurements.len())?;
    aligned("devices and value rows", device_ids.len(), values.len())?;
    aligned("devices and timestamps", device_ids.len(), timestamps.len())?;

    let mut records = Vec::with_capacity(device_ids.len());
    for (((device_id, row_measurements), row_values), timestamp) in device_ids
        .into_iter()
        .zip(measurements)
        .zip(values)
        .zip(timestamps)
    {
        records.push(build_record(
            device_id,
            row_measurements,
            row_values,
            timestamp,
        )?);
    }
    Ok(records)
}

fn tablet_payload(tablet: &Tablet) -> TabletPayload {
    TabletPayload {
        device_id: tablet.device_id().to_string(),
        measurements: tablet.measurement_names(),
        data_types: tablet.data_types(),
        values: tablet.encode_values(),
        timestamps: tablet.encode_timestamps(),
        row_count: tablet.row_count() as i32,
    }
}
