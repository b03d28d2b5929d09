use std::io::{self, Read, Write};

use bincode::{
    config::{BigEndian, Configuration, Fixint, Varint},
    decode_from_std_read, encode_into_std_write,
};
use thiserror::Error;

use super::{Request, Response};

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to encode message: {0}")]
    Serialize(#[from] bincode::error::EncodeError),
    #[error("failed to decode message: {0}")]
    Deserialize(#[from] bincode::error::DecodeError),
    #[error("Transport IO Error: {0}")]
    Io(#[from] io::Error),
}

/// Wire framing flavor, chosen once when the session opens.
///
/// Both flavors are big-endian; they differ only in integer width on the
/// wire. The choice never leaks into session logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WireEncoding {
    /// Variable-width integers; smaller frames.
    Compact,
    /// Fixed-width integers.
    #[default]
    Verbose,
}

fn compact_config() -> Configuration<BigEndian, Varint> {
    bincode::config::standard().with_big_endian()
}

fn verbose_config() -> Configuration<BigEndian, Fixint> {
    bincode::config::standard()
        .with_big_endian()
        .with_fixed_int_encoding()
}

pub struct ProtocolTransport<T: Read + Write> {
    stream: T,
    encoding: WireEncoding,
}

impl<T: Read + Write> ProtocolTransport<T> {
    pub fn new(stream: T, encoding: WireEncoding) -> Self {
        Self { stream, encoding }
    }

    pub fn write_request(&mut self, req: Request) -> Result<(), TransportError> {
        match self.encoding {
            WireEncoding::Compact => {
                encode_into_std_write(req, &mut self.stream, compact_config())?;
            }
            WireEncoding::Verbose => {
                encode_into_std_write(req, &mut self.stream, verbose_config())?;
            }
        }
        Ok(())
    }

    pub fn write_response(&mut self, resp: Response) -> Result<(), TransportError> {
        match self.encoding {
            WireEncoding::Compact => {
                encode_into_std_write(resp, &mut self.stream, compact_config())?;
            }
            WireEncoding::Verbose => {
                encode_into_std_write(resp, &mut self.stream, verbose_config())?;
            }
        }
        Ok(())
    }

    pub fn read_response(&mut self) -> Result<Response, TransportError> {
        let resp: Response = match self.encoding {
            WireEncoding::Compact => decode_from_std_read(&mut self.stream, compact_config())?,
            WireEncoding::Verbose => decode_from_std_read(&mut self.stream, verbose_config())?,
        };
        Ok(resp)
    }

    pub fn read_request(&mut self) -> Result<Request, TransportError> {
        let req: Request = match self.encoding {
            WireEncoding::Compact => decode_from_std_read(&mut self.stream, compact_config())?,
            WireEncoding::Verbose => decode_from_std_read(&mut self.stream, verbose_config())?,
        };
        Ok(req)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Seek};

    use super::*;
    use crate::protocol::Status;

    #[test]
    fn read_write_request() {
        let stream = Cursor::new(Vec::new());
        let mut transport = ProtocolTransport::new(stream, WireEncoding::Verbose);

        transport
            .write_request(Request::CloseSession { session_id: 7 })
            .unwrap();
        transport.stream.seek(std::io::SeekFrom::Start(0)).unwrap();
        let req = transport.read_request().unwrap();
        assert_eq!(req, Request::CloseSession { session_id: 7 });
    }

    #[test]
    fn read_write_response() {
        let stream = Cursor::new(Vec::new());
        let mut transport = ProtocolTransport::new(stream, WireEncoding::Verbose);

        transport
            .write_response(Response::Status(Status::ok()))
            .unwrap();
        transport.stream.seek(std::io::SeekFrom::Start(0)).unwrap();
        let resp = transport.read_response().unwrap();
        assert_eq!(resp, Response::Status(Status::ok()));
    }

    #[test]
    fn compact_round_trip() {
        let stream = Cursor::new(Vec::new());
        let mut transport = ProtocolTransport::new(stream, WireEncoding::Compact);

        let req = Request::SetTimeZone {
            session_id: 11,
            time_zone: "UTC+08:00".to_string(),
        };
        transport.write_request(req.clone()).unwrap();
        transport.stream.seek(std::io::SeekFrom::Start(0)).unwrap();
        assert_eq!(transport.read_request().unwrap(), req);
    }

    #[test]
    fn compact_frames_are_smaller() {
        let req = Request::RequestStatementId { session_id: 1 };

        let mut compact = ProtocolTransport::new(Cursor::new(Vec::new()), WireEncoding::Compact);
        let mut verbose = ProtocolTransport::new(Cursor::new(Vec::new()), WireEncoding::Verbose);
        compact.write_request(req.clone()).unwrap();
        verbose.write_request(req).unwrap();

        assert!(compact.stream.get_ref().len() < verbose.stream.get_ref().len());
    }
}
