//! # RPC Envelope
//!
//! Request and response frames, written with the same member framing as
//! every other payload:
//!
//! ```text
//! Request                      Response
//!   1  module   string           1  status   integer
//!   2  member   string           2  payload  bytes
//!   3  method   string
//!   4  payload  bytes
//! ```
//!
//! Unknown members are skipped, so either side can grow the envelope with
//! new tags.

use iop_codec::reader::{FrameError, WireReader};
use iop_codec::writer::WireWriter;
use iop_codec::{DecodeError, EncodeError, WireKind};

use crate::error::{RpcError, RpcErrorKind};

const REQUEST: &str = "Request";
const RESPONSE: &str = "Response";

/// Status of a response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok = 0,
    NotFound = 1,
    BadRequest = 2,
    AppError = 3,
}

impl Status {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Ok),
            1 => Some(Self::NotFound),
            2 => Some(Self::BadRequest),
            3 => Some(Self::AppError),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::NotFound => "not_found",
            Self::BadRequest => "bad_request",
            Self::AppError => "app_error",
        }
    }
}

impl From<RpcErrorKind> for Status {
    fn from(kind: RpcErrorKind) -> Self {
        match kind {
            RpcErrorKind::NotFound => Self::NotFound,
            RpcErrorKind::BadRequest => Self::BadRequest,
            RpcErrorKind::AppError => Self::AppError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub module: String,
    pub member: String,
    pub method: String,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    pub payload: Vec<u8>,
}

impl Request {
    pub fn new(
        module: impl Into<String>,
        member: impl Into<String>,
        method: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            module: module.into(),
            member: member.into(),
            method: method.into(),
            payload,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut w = WireWriter::new();
        for (tag, bytes) in [
            (1, self.module.as_bytes()),
            (2, self.member.as_bytes()),
            (3, self.method.as_bytes()),
            (4, self.payload.as_slice()),
        ] {
            w.put_bytes(tag, bytes).ok_or_else(|| too_large(REQUEST, bytes.len()))?;
        }
        Ok(w.into_bytes())
    }

    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let mut fields = Fields::read(REQUEST, frame)?;
        let module = fields.string(1, "module")?;
        let member = fields.string(2, "member")?;
        let method = fields.string(3, "method")?;
        let payload = fields.bytes(4, "payload")?;
        Ok(Self {
            module,
            member,
            method,
            payload,
        })
    }

    /// `module.member.method`, for logs.
    pub fn route(&self) -> String {
        format!("{}.{}.{}", self.module, self.member, self.method)
    }
}

impl Response {
    pub fn ok(payload: Vec<u8>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        let mut w = WireWriter::new();
        w.put_int(1, self.status as i128);
        w.put_bytes(2, &self.payload)
            .ok_or_else(|| too_large(RESPONSE, self.payload.len()))?;
        Ok(w.into_bytes())
    }

    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let mut fields = Fields::read(RESPONSE, frame)?;
        let status = fields.status(1)?;
        let payload = fields.bytes(2, "payload")?;
        Ok(Self { status, payload })
    }

    /// Back to the dispatch result this response was built from.
    pub fn into_result(self) -> Result<Vec<u8>, RpcError> {
        let kind = match self.status {
            Status::Ok => return Ok(self.payload),
            Status::NotFound => RpcErrorKind::NotFound,
            Status::BadRequest => RpcErrorKind::BadRequest,
            Status::AppError => RpcErrorKind::AppError,
        };
        Err(RpcError {
            kind,
            message: String::from_utf8_lossy(&self.payload).into_owned(),
            payload: self.payload,
        })
    }
}

impl From<Result<Vec<u8>, RpcError>> for Response {
    fn from(result: Result<Vec<u8>, RpcError>) -> Self {
        match result {
            Ok(payload) => Self::ok(payload),
            Err(err) => Self {
                status: err.kind.into(),
                payload: err.payload,
            },
        }
    }
}

fn too_large(type_name: &str, len: usize) -> EncodeError {
    EncodeError::TooLarge {
        type_name: type_name.to_string(),
        len,
    }
}

/// Members of an envelope frame, keyed by tag.
struct Fields<'a> {
    type_name: &'static str,
    members: Vec<(u16, WireKind, WireReader<'a>, usize)>,
    end: usize,
}

impl<'a> Fields<'a> {
    fn read(type_name: &'static str, frame: &'a [u8]) -> Result<Self, DecodeError> {
        let malformed = |e: FrameError| DecodeError::Malformed {
            type_name: type_name.to_string(),
            offset: e.offset,
            reason: e.reason,
        };

        let mut r = WireReader::new(frame);
        let mut members = Vec::new();
        let mut last_tag: Option<u16> = None;
        while !r.is_empty() {
            let at = r.offset();
            let header = r.read_header().map_err(malformed)?;
            if last_tag.is_some_and(|prev| header.tag <= prev) {
                return Err(DecodeError::Malformed {
                    type_name: type_name.to_string(),
                    offset: at,
                    reason: format!("tag {} out of order", header.tag),
                });
            }
            last_tag = Some(header.tag);
            // Keep a reader positioned at the payload and step over it.
            let payload_at = r.offset();
            let payload = r.clone();
            r.skip(header.kind, 0).map_err(|e| match e {
                Some(e) => malformed(e),
                None => DecodeError::Malformed {
                    type_name: type_name.to_string(),
                    offset: payload_at,
                    reason: "nested arrays are not envelope members".to_string(),
                },
            })?;
            members.push((header.tag, header.kind, payload, payload_at));
        }
        Ok(Self {
            type_name,
            members,
            end: frame.len(),
        })
    }

    fn take(
        &mut self,
        tag: u16,
        name: &str,
    ) -> Result<(WireKind, WireReader<'a>, usize), DecodeError> {
        match self.members.iter().position(|(t, ..)| *t == tag) {
            Some(i) => {
                let (_, kind, reader, at) = self.members.swap_remove(i);
                Ok((kind, reader, at))
            }
            None => Err(DecodeError::MissingRequiredField {
                type_name: self.type_name.to_string(),
                field: name.to_string(),
                tag,
                offset: self.end,
            }),
        }
    }

    fn malformed(&self, offset: usize, reason: impl Into<String>) -> DecodeError {
        DecodeError::Malformed {
            type_name: self.type_name.to_string(),
            offset,
            reason: reason.into(),
        }
    }

    fn bytes(&mut self, tag: u16, name: &str) -> Result<Vec<u8>, DecodeError> {
        let (kind, mut r, _) = self.take(tag, name)?;
        let bytes = r
            .read_bytes(kind)
            .map_err(|e| self.malformed(e.offset, e.reason))?;
        Ok(bytes.to_vec())
    }

    fn string(&mut self, tag: u16, name: &str) -> Result<String, DecodeError> {
        let (kind, mut r, at) = self.take(tag, name)?;
        let bytes = r
            .read_bytes(kind)
            .map_err(|e| self.malformed(e.offset, e.reason))?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| self.malformed(at, format!("{name}: invalid UTF-8: {e}")))
    }

    fn status(&mut self, tag: u16) -> Result<Status, DecodeError> {
        let (kind, mut r, at) = self.take(tag, "status")?;
        let code = r
            .read_int(kind)
            .map_err(|e| self.malformed(e.offset, e.reason))?;
        Status::from_code(code).ok_or_else(|| self.malformed(at, format!("unknown status {code}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_layout() {
        let req = Request::new("M", "m", "f", vec![0x81, 0x01]);
        assert_eq!(
            req.encode().unwrap(),
            vec![
                0x01, 0x02, b'M', 0x00, // module
                0x02, 0x02, b'm', 0x00, // member
                0x03, 0x02, b'f', 0x00, // method
                0x04, 0x03, 0x81, 0x01, 0x00, // payload
            ]
        );
        assert_eq!(Request::decode(&req.encode().unwrap()).unwrap(), req);
    }

    #[test]
    fn test_response_layout() {
        let res = Response {
            status: Status::NotFound,
            payload: b"x".to_vec(),
        };
        assert_eq!(res.encode().unwrap(), vec![0x81, 0x01, 0x02, 0x02, b'x', 0x00]);
        assert_eq!(Response::decode(&res.encode().unwrap()).unwrap(), res);
    }

    #[test]
    fn test_empty_payload_round_trips() {
        let res = Response::ok(Vec::new());
        assert_eq!(res.encode().unwrap(), vec![0x81, 0x00, 0x02, 0x01, 0x00]);
        assert_eq!(Response::decode(&res.encode().unwrap()).unwrap(), res);
    }

    #[test]
    fn test_missing_member_rejected() {
        let frame = [0x01, 0x02, b'M', 0x00, 0x02, 0x02, b'm', 0x00];
        let err = Request::decode(&frame).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::MissingRequiredField { tag: 3, offset: 8, .. }
        ));
    }

    #[test]
    fn test_unknown_members_skipped() {
        let mut frame = Response::ok(b"y".to_vec()).encode().unwrap();
        frame.extend_from_slice(&[0x85, 0x07]);
        assert_eq!(Response::decode(&frame).unwrap(), Response::ok(b"y".to_vec()));
    }

    #[test]
    fn test_out_of_order_members_rejected() {
        let frame = [0x02, 0x01, 0x00, 0x81, 0x00];
        assert!(matches!(
            Response::decode(&frame),
            Err(DecodeError::Malformed { offset: 3, .. })
        ));
    }

    #[test]
    fn test_unknown_status_rejected() {
        let frame = [0x81, 0x09, 0x02, 0x01, 0x00];
        assert!(matches!(
            Response::decode(&frame),
            Err(DecodeError::Malformed { offset: 1, .. })
        ));
    }

    #[test]
    fn test_response_into_result() {
        let err = Response {
            status: Status::BadRequest,
            payload: b"bad".to_vec(),
        }
        .into_result()
        .unwrap_err();
        assert_eq!(err, RpcError::bad_request("bad"));
        assert_eq!(Response::ok(vec![1]).into_result(), Ok(vec![1]));
    }
}
