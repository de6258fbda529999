use bytes::{Buf, Bytes};

/// A decoded or to-be-encoded HTTP message part: either a head or a piece
/// of payload.
///
/// `T` is the head type (request head on the read side, response head on
/// the write side); `Data` is the payload chunk type.
pub enum Message<T, Data: Buf = Bytes> {
    /// The head of the message.
    Head(T),
    /// A chunk of payload data, or the end-of-payload marker.
    Payload(PayloadItem<Data>),
}

/// One item in a message's payload stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    /// A chunk of payload data.
    Chunk(Data),
    /// End of the payload stream.
    Eof,
}

/// How the payload of a message is delimited on the wire.
///
/// HTTP/1.0 gives us two real options: an exact `Content-Length`, or
/// "write until the connection closes". There is no chunked
/// transfer-encoding here.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// Payload with a known length in bytes.
    Length(u64),
    /// Close-delimited payload: bytes flow until the connection is shut.
    Unbounded,
    /// No payload at all.
    Empty,
}

impl PayloadSize {
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}

impl<T> Message<T> {
    #[inline]
    pub fn is_head(&self) -> bool {
        matches!(self, Message::Head(_))
    }

    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }

    /// Converts into the payload item, or `None` for a head message.
    pub fn into_payload_item(self) -> Option<PayloadItem> {
        match self {
            Message::Head(_) => None,
            Message::Payload(item) => Some(item),
        }
    }
}

impl<D: Buf> PayloadItem<D> {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }
}

impl PayloadItem {
    /// Reference to the chunk bytes, or `None` for the EOF marker.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }

    /// Consumes the item and returns the chunk bytes, or `None` for EOF.
    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}
