use std::io::{Read, Write};

use super::{
    Request, Response,
    transport::{ProtocolTransport, TransportError},
};

/// Blocking request/response channel to the remote database.
///
/// One request is outstanding at a time: `dispatch` returns only once the
/// server has answered or the transport has failed. Transport-level
/// failures are distinct from an application-level non-success
/// [`Status`](super::Status); the latter arrives inside a [`Response`].
pub trait RemoteService {
    fn dispatch(&mut self, request: Request) -> Result<Response, TransportError>;
}

impl<T: Read + Write> RemoteService for ProtocolTransport<T> {
    fn dispatch(&mut self, request: Request) -> Result<Response, TransportError> {
        self.write_request(request)?;
        self.read_response()
    }
}
