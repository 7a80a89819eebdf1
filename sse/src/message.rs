use bytes::{BufMut, Bytes, BytesMut};

const SSE_DATA_PREFIX: &[u8] = b"data: ";
const SSE_TERMINATOR: &[u8] = b"\n\n";
const RAW_TERMINATOR: &[u8] = b"\n";

/// One message to broadcast. Cloning is cheap: the payload is reference counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event(Bytes);

impl Event {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self(payload.into())
    }

    pub fn payload(&self) -> &Bytes {
        &self.0
    }

    pub fn into_payload(self) -> Bytes {
        self.0
    }
}

impl From<Bytes> for Event {
    fn from(payload: Bytes) -> Self {
        Self(payload)
    }
}

impl From<Vec<u8>> for Event {
    fn from(payload: Vec<u8>) -> Self {
        Self(Bytes::from(payload))
    }
}

impl From<String> for Event {
    fn from(payload: String) -> Self {
        Self(Bytes::from(payload))
    }
}

impl From<&'static str> for Event {
    fn from(payload: &'static str) -> Self {
        Self(Bytes::from_static(payload.as_bytes()))
    }
}

/// Wire framing of a stream, picked once when the connection opens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Framing {
    /// `data: <payload>\n\n`
    #[default]
    Sse,
    /// `<payload>\n`
    Raw,
}

impl Framing {
    pub fn from_raw_flag(raw: bool) -> Self {
        if raw {
            Framing::Raw
        } else {
            Framing::Sse
        }
    }

    /// Encode one event as it should appear on the wire.
    pub fn frame(&self, event: &Event) -> Bytes {
        let payload = event.payload();
        match self {
            Framing::Sse => {
                let mut buf = BytesMut::with_capacity(
                    SSE_DATA_PREFIX.len() + payload.len() + SSE_TERMINATOR.len(),
                );
                buf.put_slice(SSE_DATA_PREFIX);
                buf.put_slice(payload);
                buf.put_slice(SSE_TERMINATOR);
                buf.freeze()
            }
            Framing::Raw => {
                let mut buf = BytesMut::with_capacity(payload.len() + RAW_TERMINATOR.len());
                buf.put_slice(payload);
                buf.put_slice(RAW_TERMINATOR);
                buf.freeze()
            }
        }
    }
}
