//! Codec layer: incremental request decoding and response encoding.
//!
//! The decoders implement [`tokio_util::codec::Decoder`] so that reads stay
//! incremental: each call consumes whatever bytes have arrived and either
//! yields the next protocol item or asks for more. The request side is a
//! two-phase state machine (head, then fixed-length body); the response
//! side mirrors it with a head-then-payload encoder.

mod head_decoder;
pub use head_decoder::HeadDecoder;
pub use head_decoder::MAX_HEAD_BYTES;

mod length_decoder;
pub use length_decoder::LengthDecoder;

mod request_decoder;
pub use request_decoder::RequestDecoder;

mod response_encoder;
pub use response_encoder::ResponseEncoder;
