//
// Copyright 2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Round-trip and encoding benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use frugal::protocol::{
    BinaryProtocolFactory, CompactProtocolFactory, Decode, Encode, OutputBuffer, ProtocolFactory,
};
use frugal::transport::MemoryRequestTransport;
use frugal::{Context, Invoker};
use std::sync::Arc;

#[path = "../tests/common/mod.rs"]
mod common;

use common::{store_processor, Album, StoreClient};

/// Benchmark a full buyAlbum call through the in-memory transport
fn bench_invoke_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("invoke_roundtrip");
    let rt = tokio::runtime::Runtime::new().unwrap();

    for tracks in [1usize, 32, 512] {
        let processor = store_processor(move |_ctx: Context, args| async move {
            Ok(Album::sample(&args.asin, tracks))
        });
        let protocol: Arc<dyn ProtocolFactory> = Arc::new(CompactProtocolFactory);
        let transport = MemoryRequestTransport::new(Arc::new(processor), Arc::clone(&protocol));
        let client = StoreClient::new(Invoker::new(Arc::new(transport), protocol), &[]);

        let client = &client;
        group.bench_with_input(BenchmarkId::from_parameter(tracks), &tracks, |b, _| {
            b.to_async(&rt).iter(|| async move {
                let album = client
                    .buy_album(&Context::new(), "B00BENCH", "acct")
                    .await
                    .unwrap();
                black_box(album)
            });
        });
    }

    group.finish();
}

/// Benchmark struct encoding and decoding per protocol
fn bench_album_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("album_codec");
    let album = Album::sample("B00CODEC", 128);
    let factories: [(&str, Arc<dyn ProtocolFactory>); 2] = [
        ("compact", Arc::new(CompactProtocolFactory)),
        ("binary", Arc::new(BinaryProtocolFactory)),
    ];

    for (name, factory) in factories {
        let mut buffer = OutputBuffer::new(0);
        {
            let mut w = factory.writer(&mut buffer);
            album.encode(&mut *w).unwrap();
        }
        let encoded = buffer.take_payload();
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_function(BenchmarkId::new("encode", name), |b| {
            b.iter(|| {
                let mut buffer = OutputBuffer::new(0);
                {
                    let mut w = factory.writer(&mut buffer);
                    black_box(&album).encode(&mut *w).unwrap();
                }
                black_box(buffer.take_payload())
            });
        });

        group.bench_function(BenchmarkId::new("decode", name), |b| {
            b.iter(|| {
                let mut r = factory.reader(encoded.clone());
                black_box(Album::decode(&mut *r).unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_invoke_roundtrip, bench_album_codec);
criterion_main!(benches);
