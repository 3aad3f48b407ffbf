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

//! # Music Store Example
//!
//! A store service answering `buyAlbum` over the in-memory transport, plus an
//! `AlbumWinners` scope announcing giveaway winners to a subscriber.
//!
//! The bindings in `tests/common` are what a code generator would emit.
//!
//! ## Running This Example
//!
//! ```bash
//! RUST_LOG=debug cargo run --example music_store
//! ```

#[path = "../tests/common/mod.rs"]
mod common;

use common::{store_processor, Album, PurchasingError, StoreClient};
use frugal::middleware::logging;
use frugal::protocol::CompactProtocolFactory;
use frugal::scope::TopicPrefix;
use frugal::transport::{MemoryBroker, MemoryRequestTransport};
use frugal::{Context, FrugalError, Invoker, ScopeProvider, ServiceProvider};
use std::error::Error;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let protocol = Arc::new(CompactProtocolFactory);

    // Server side
    let processor = store_processor(|ctx: Context, args| async move {
        if args.asin.is_empty() {
            return Err(FrugalError::handler(PurchasingError {
                message: "missing asin".into(),
                error_code: 400,
            }));
        }
        ctx.add_response_header("store", "downtown");
        Ok(Album::sample(&args.asin, 3))
    });
    processor.add_middleware(logging());

    // Client side
    let transport = MemoryRequestTransport::new(Arc::new(processor), protocol.clone());
    let provider =
        ServiceProvider::new(Arc::new(transport), protocol.clone()).with_middleware(logging());
    let client = StoreClient::new(Invoker::from_provider(&provider), provider.middleware());

    let ctx = Context::new().with_timeout(Duration::from_secs(2));
    let album = client.buy_album(&ctx, "ASIN-1234", "ACCT-7").await?;
    println!(
        "bought {} with {} tracks from {:?}",
        album.asin,
        album.tracks.len(),
        ctx.response_header("store")
    );

    match client.buy_album(&Context::new(), "", "ACCT-7").await {
        Err(err) => match err.downcast::<PurchasingError>() {
            Ok(declared) => println!("purchase rejected: {declared}"),
            Err(other) => return Err(other.into()),
        },
        Ok(album) => println!("unexpected album {}", album.asin),
    }

    // Pub/sub
    let broker = MemoryBroker::new();
    let scopes = ScopeProvider::new(Arc::new(broker.clone()), Arc::new(broker.clone()), protocol)
        .with_middleware(logging());
    let prefix = TopicPrefix::parse("v1.music.{region}")?;

    let (tx, mut rx) = tokio::sync::mpsc::channel(4);
    let subscription = scopes
        .subscriber("albumWinners", prefix.clone())
        .subscribe("winner", &["us-east"], move |_ctx: Context, album: Album| {
            let tx = tx.clone();
            async move {
                tx.send(album).await.ok();
                Ok(())
            }
        })
        .await?;
    println!("subscribed to {}", subscription.topic());

    let publisher = scopes.publisher("albumWinners", prefix);
    publisher.open().await?;
    publisher
        .operation::<Album>("winner")
        .publish(&Context::new(), &["us-east"], Album::sample("ASIN-WIN", 1))
        .await?;

    if let Some(winner) = rx.recv().await {
        println!("winner announced: {}", winner.asin);
    }

    subscription.unsubscribe().await?;
    publisher.close().await?;
    Ok(())
}
