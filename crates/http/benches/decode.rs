use bytes::{Bytes, BytesMut};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use femto_http::codec::{RequestDecoder, ResponseEncoder};
use femto_http::protocol::{Message, PayloadSize, ResponseHead};
use http::{StatusCode, Version, header::HeaderValue};
use tokio_util::codec::{Decoder, Encoder};

fn bench_request_decoder(c: &mut Criterion) {
    let request = b"GET /index.html?a=1 HTTP/1.0\r\nHost: localhost\r\nUser-Agent: bench\r\nAccept: */*\r\n\r\n";

    c.bench_function("decode_simple_request", |b| {
        b.iter(|| {
            let mut decoder = RequestDecoder::new();
            let mut bytes = BytesMut::from(&request[..]);
            black_box(decoder.decode(&mut bytes).unwrap());
        });
    });
}

fn bench_response_encoder(c: &mut Criterion) {
    let body = Bytes::from_static(b"Hello World!");

    c.bench_function("encode_simple_response", |b| {
        b.iter(|| {
            let mut encoder = ResponseEncoder::new();
            let mut bytes = BytesMut::new();

            let mut head = ResponseHead::new(());
            *head.status_mut() = StatusCode::OK;
            *head.version_mut() = Version::HTTP_10;
            head.headers_mut().insert(http::header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));

            let message = Message::<_, Bytes>::Head((head, PayloadSize::Length(body.len() as u64)));
            black_box(encoder.encode(message, &mut bytes).unwrap());
        });
    });
}

criterion_group!(benches, bench_request_decoder, bench_response_encoder);
criterion_main!(benches);
