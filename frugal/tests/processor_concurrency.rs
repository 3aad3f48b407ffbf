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

//! Concurrent dispatch on one processor sharing one output stream.

mod common;

use common::{store_processor, Album, BuyAlbumArgs, BuyAlbumResult, BUY_ALBUM};
use frugal::protocol::{
    read_response_header, write_request_header, CompactProtocolFactory, Decode, Encode,
    MessageHeader, MessageType, OutputBuffer, OutputSink, ProtocolFactory,
};
use frugal::transport::TransportError;
use frugal::{Context, Processor};
use parking_lot::Mutex;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

/// An output stream shared by every in-flight request.
#[derive(Clone, Default)]
struct SharedSink {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl OutputSink for SharedSink {
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        // One write call per primitive, so unsynchronized frames would interleave.
        self.bytes.lock().extend_from_slice(bytes);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

fn request(asin: &str) -> bytes::Bytes {
    let mut buffer = OutputBuffer::new(0);
    {
        let mut w = CompactProtocolFactory.writer(&mut buffer);
        write_request_header(&mut *w, &Context::new()).unwrap();
        w.write_message_begin(&MessageHeader::new(BUY_ALBUM, MessageType::Call, 0))
            .unwrap();
        BuyAlbumArgs {
            asin: asin.to_string(),
            account: "acct".to_string(),
        }
        .encode(&mut *w)
        .unwrap();
        w.write_message_end().unwrap();
    }
    buffer.take_payload()
}

fn yielding_store(tracks: usize) -> Processor {
    store_processor(move |_ctx: Context, args| async move {
        tokio::task::yield_now().await;
        Ok(Album::sample(&args.asin, tracks))
    })
}

async fn run_concurrently(processor: Arc<Processor>, count: usize) -> Vec<u8> {
    let sink = SharedSink::default();
    let mut tasks = Vec::with_capacity(count);
    for i in 0..count {
        let processor = Arc::clone(&processor);
        let mut sink = sink.clone();
        tasks.push(tokio::spawn(async move {
            let mut input = CompactProtocolFactory.reader(request(&format!("ASIN-{i:04}")));
            let mut output = CompactProtocolFactory.writer(&mut sink);
            processor.process(&mut *input, &mut *output).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    let bytes = sink.bytes.lock().clone();
    bytes
}

fn parse_replies(stream: Vec<u8>) -> Vec<Album> {
    let mut reader = CompactProtocolFactory.reader(bytes::Bytes::from(stream));
    let mut albums = Vec::new();
    while reader.remaining() > 0 {
        read_response_header(&mut *reader, &Context::new()).unwrap();
        let header = reader.read_message_begin().unwrap();
        assert_eq!(header.name, BUY_ALBUM);
        assert_eq!(header.kind, MessageType::Reply);
        let result = BuyAlbumResult::decode(&mut *reader).unwrap();
        reader.read_message_end().unwrap();
        albums.push(result.success.expect("success"));
    }
    albums
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_responses_never_interleave() {
    let processor = Arc::new(yielding_store(16));
    let stream = run_concurrently(Arc::clone(&processor), 64).await;
    let albums = parse_replies(stream);

    assert_eq!(albums.len(), 64);
    let asins: BTreeSet<String> = albums.iter().map(|album| album.asin.clone()).collect();
    let expected: BTreeSet<String> = (0..64).map(|i| format!("ASIN-{i:04}")).collect();
    assert_eq!(asins, expected);
    assert!(albums.iter().all(|album| album.tracks.len() == 16));
    assert_eq!(processor.metrics().snapshot().requests, 64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_extended_processor_shares_the_lock() {
    let base = yielding_store(4);
    let extended = Arc::new(Processor::extend(&base));
    let base = Arc::new(base);

    let sink = SharedSink::default();
    let mut tasks = Vec::new();
    for i in 0..32 {
        let processor = if i % 2 == 0 {
            Arc::clone(&base)
        } else {
            Arc::clone(&extended)
        };
        let mut sink = sink.clone();
        tasks.push(tokio::spawn(async move {
            let mut input = CompactProtocolFactory.reader(request(&format!("X-{i}")));
            let mut output = CompactProtocolFactory.writer(&mut sink);
            processor.process(&mut *input, &mut *output).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    let stream = sink.bytes.lock().clone();
    assert_eq!(parse_replies(stream).len(), 32);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_every_reply_is_whole(count in 1usize..48, tracks in 0usize..24) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();
        let stream = runtime.block_on(run_concurrently(Arc::new(yielding_store(tracks)), count));
        let albums = parse_replies(stream);
        prop_assert_eq!(albums.len(), count);
        prop_assert!(albums.iter().all(|album| album.tracks.len() == tracks));
    }
}
