//! Criterion benchmarks for the frame reassembly hot path.
//!
//! Measures decode throughput for payload sizes spanning small control frames
//! to typical encoded-video frames.
//!
//! Run with:
//! ```bash
//! cargo bench --package framesink-core --bench decode_bench
//! ```

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use framesink_core::{encode_frame, DecodeStep, FrameDecoder};

const FRAMES_PER_STREAM: usize = 64;
const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Builds an encoded stream of identical frames.
fn encoded_stream(frame_len: usize) -> Vec<u8> {
    let payload = vec![0xAB; frame_len];
    let mut out = Vec::with_capacity((frame_len + 4) * FRAMES_PER_STREAM);
    for _ in 0..FRAMES_PER_STREAM {
        out.extend_from_slice(&encode_frame(&payload));
    }
    out
}

fn bench_decode_stream(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("benchmark runtime");

    let mut group = c.benchmark_group("decode_stream");
    for frame_len in [256usize, 4096, 65536] {
        let bytes = encoded_stream(frame_len);
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(frame_len),
            &bytes,
            |b, bytes| {
                b.iter(|| {
                    rt.block_on(async {
                        let mut decoder =
                            FrameDecoder::new(black_box(&bytes[..]), READ_TIMEOUT);
                        let mut frames = 0usize;
                        loop {
                            match decoder.decode_step().await {
                                Ok(DecodeStep::Frame(frame)) => {
                                    black_box(frame.len());
                                    frames += 1;
                                }
                                Ok(DecodeStep::EndOfStream) => break,
                                other => panic!("unexpected decode result: {other:?}"),
                            }
                        }
                        frames
                    })
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_decode_stream);
criterion_main!(benches);
