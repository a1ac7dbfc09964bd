use crate::error::CodecError;
use crate::model::request::MessageId;
use crate::traits::Payload;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// One protocol frame. The enum makes the "exactly one kind" rule structural.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFrame", into = "RawFrame")]
pub enum WireMessage {
    Request(Request),
    Response(Response),
    Notification(Notification),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub id: MessageId,
    pub method: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: MessageId,
    pub method: String,
    pub data: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub id: MessageId,
    pub data: Value,
    pub error_reason: Option<String>,
}

/// Exact on-the-wire shape. Only used for (de)serialization.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFrame {
    id: MessageId,
    #[serde(default, skip_serializing_if = "is_false")]
    request: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    response: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    notification: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    method: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_reason: Option<String>,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl TryFrom<RawFrame> for WireMessage {
    type Error = CodecError;

    fn try_from(raw: RawFrame) -> Result<Self, Self::Error> {
        let markers = [raw.request, raw.response, raw.notification]
            .iter()
            .filter(|marker| **marker)
            .count();
        if markers != 1 {
            return Err(CodecError::InvalidFrame(format!(
                "expected exactly one kind marker, found {markers}"
            )));
        }

        if raw.response {
            return Ok(WireMessage::Response(Response {
                id: raw.id,
                data: raw.data,
                error_reason: raw.error_reason,
            }));
        }

        let Some(method) = raw.method else {
            return Err(CodecError::InvalidFrame("missing method".to_owned()));
        };

        if raw.request {
            Ok(WireMessage::Request(Request {
                id: raw.id,
                method,
                data: raw.data,
            }))
        } else {
            Ok(WireMessage::Notification(Notification {
                id: raw.id,
                method,
                data: raw.data,
            }))
        }
    }
}

impl From<WireMessage> for RawFrame {
    fn from(msg: WireMessage) -> Self {
        let blank = |id| RawFrame {
            id,
            request: false,
            response: false,
            notification: false,
            method: None,
            data: Value::Null,
            error_reason: None,
        };

        match msg {
            WireMessage::Request(r) => RawFrame {
                request: true,
                method: Some(r.method),
                data: r.data,
                ..blank(r.id)
            },
            WireMessage::Response(r) => RawFrame {
                response: true,
                data: r.data,
                error_reason: r.error_reason,
                ..blank(r.id)
            },
            WireMessage::Notification(n) => RawFrame {
                notification: true,
                method: Some(n.method),
                data: n.data,
                ..blank(n.id)
            },
        }
    }
}

impl WireMessage {
    pub fn request(method: impl Into<String>, data: Value) -> Self {
        WireMessage::Request(Request::new(method, data))
    }

    pub fn notification(method: impl Into<String>, data: Value) -> Self {
        WireMessage::Notification(Notification::new(method, data))
    }

    /// Decodes a frame, returning `None` for anything malformed.
    pub fn parse(raw: &str) -> Option<Self> {
        match Self::try_parse(raw) {
            Ok(msg) => Some(msg),
            Err(e) => {
                debug!("Dropping malformed frame: {}", e);
                None
            }
        }
    }

    pub fn try_parse(raw: &str) -> Result<Self, CodecError> {
        let value: Value = serde_json::from_str(raw).map_err(CodecError::InvalidJson)?;
        if !value.is_object() {
            return Err(CodecError::NotAnObject);
        }
        serde_json::from_value(value).map_err(|e| CodecError::InvalidFrame(e.to_string()))
    }

    pub fn encode(&self) -> Result<String, CodecError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn id(&self) -> &MessageId {
        match self {
            WireMessage::Request(r) => &r.id,
            WireMessage::Response(r) => &r.id,
            WireMessage::Notification(n) => &n.id,
        }
    }
}

impl Request {
    pub fn new(method: impl Into<String>, data: Value) -> Self {
        Self {
            id: MessageId::new(),
            method: method.into(),
            data,
        }
    }

    pub fn for_payload<P: Payload>(payload: &P) -> Result<Self, CodecError> {
        Ok(Self::new(P::METHOD, serde_json::to_value(payload)?))
    }

    pub fn decode<P: Payload>(&self) -> Result<P, CodecError> {
        decode_payload(&self.method, &self.data)
    }
}

impl Notification {
    pub fn new(method: impl Into<String>, data: Value) -> Self {
        Self {
            id: MessageId::new(),
            method: method.into(),
            data,
        }
    }

    pub fn for_payload<P: Payload>(payload: &P) -> Result<Self, CodecError> {
        Ok(Self::new(P::METHOD, serde_json::to_value(payload)?))
    }

    pub fn decode<P: Payload>(&self) -> Result<P, CodecError> {
        decode_payload(&self.method, &self.data)
    }
}

impl Response {
    pub fn success(origin: &Request, data: Value) -> Self {
        Self {
            id: origin.id.clone(),
            data,
            error_reason: None,
        }
    }

    pub fn error(origin: &Request, reason: impl Into<String>) -> Self {
        Self {
            id: origin.id.clone(),
            data: Value::Null,
            error_reason: Some(reason.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error_reason.is_some()
    }

    pub fn into_result(self) -> Result<Value, String> {
        match self.error_reason {
            Some(reason) => Err(reason),
            None => Ok(self.data),
        }
    }
}

fn decode_payload<P: Payload>(method: &str, data: &Value) -> Result<P, CodecError> {
    if method != P::METHOD {
        return Err(CodecError::MethodMismatch {
            expected: P::METHOD,
            actual: method.to_owned(),
        });
    }
    Ok(P::deserialize(data)?)
}

impl From<Request> for WireMessage {
    fn from(r: Request) -> Self {
        WireMessage::Request(r)
    }
}

impl From<Response> for WireMessage {
    fn from(r: Response) -> Self {
        WireMessage::Response(r)
    }
}

impl From<Notification> for WireMessage {
    fn from(n: Notification) -> Self {
        WireMessage::Notification(n)
    }
}
