use bincode::{Decode, Encode};

/// Status code the server reports for a fully successful operation.
pub const SUCCESS_CODE: i32 = 200;

/// Outcome of one remote operation.
#[derive(Debug, Clone, Encode, Decode, PartialEq, Eq)]
pub struct Status {
    pub code: i32,
    pub message: String,
}

impl Status {
    pub fn ok() -> Self {
        Self {
            code: SUCCESS_CODE,
            message: String::new(),
        }
    }

    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == SUCCESS_CODE
    }
}

#[derive(Debug, Clone, Encode, Decode, PartialEq, Eq)]
pub enum Response {
    OpenSession {
        status: Status,
        server_protocol_version: i32,
        session_id: i64,
    },
    StatementId(i64),
    TimeZone {
        status: Status,
        time_zone: String,
    },
    Status(Status),
}

impl Response {
    /// Variant name, for diagnostics when a reply does not match the
    /// request that was dispatched.
    pub fn kind(&self) -> &'static str {
        match self {
            Response::OpenSession { .. } => "OpenSession",
            Response::StatementId(_) => "StatementId",
            Response::TimeZone { .. } => "TimeZone",
            Response::Status(_) => "Status",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_is_exactly_code_200() {
        assert!(Status::ok().is_success());
        assert!(!Status::error(500, "storage group missing").is_success());
        assert!(!Status::error(0, "").is_success());
    }
}
