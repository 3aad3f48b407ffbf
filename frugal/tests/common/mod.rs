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

//! Hand-written music store bindings shared by the integration tests.

#![allow(dead_code)]

use frugal::middleware::{Method, Middleware};
use frugal::processor::ResultEnvelope;
use frugal::protocol::{
    read_struct, write_field, write_optional_field, write_struct, Decode, Encode, ProtocolError,
    ProtocolReader, ProtocolWriter, TType,
};
use frugal::{ApplicationExceptionKind, Context, FrugalError, Invoker, Processor};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub const BUY_ALBUM: &str = "buyAlbum";
pub const ENTER_GIVEAWAY: &str = "enterAlbumGiveaway";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Album {
    pub asin: String,
    pub duration: f64,
    pub tracks: Vec<String>,
}

impl Album {
    pub fn sample(asin: &str, tracks: usize) -> Self {
        Self {
            asin: asin.to_string(),
            duration: 1200.5,
            tracks: (0..tracks).map(|i| format!("track number {i:03}")).collect(),
        }
    }
}

impl Encode for Album {
    const TTYPE: TType = TType::Struct;

    fn encode(&self, writer: &mut dyn ProtocolWriter) -> Result<(), ProtocolError> {
        write_struct(writer, "Album", |w| {
            write_field(w, 1, &self.asin)?;
            write_field(w, 2, &self.duration)?;
            write_field(w, 3, &self.tracks)
        })
    }
}

impl Decode for Album {
    fn decode(reader: &mut dyn ProtocolReader) -> Result<Self, ProtocolError> {
        let mut album = Album::default();
        read_struct(reader, |r, field| {
            match (field.id, field.ttype) {
                (1, TType::String) => album.asin = r.read_string()?,
                (2, TType::Double) => album.duration = r.read_double()?,
                (3, TType::List) => album.tracks = Vec::decode(r)?,
                (_, ttype) => r.skip(ttype)?,
            }
            Ok(())
        })?;
        Ok(album)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PurchasingError {
    pub message: String,
    pub error_code: i16,
}

impl fmt::Display for PurchasingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "purchasing error {}: {}", self.error_code, self.message)
    }
}

impl std::error::Error for PurchasingError {}

impl Encode for PurchasingError {
    const TTYPE: TType = TType::Struct;

    fn encode(&self, writer: &mut dyn ProtocolWriter) -> Result<(), ProtocolError> {
        write_struct(writer, "PurchasingError", |w| {
            write_field(w, 1, &self.message)?;
            write_field(w, 2, &self.error_code)
        })
    }
}

impl Decode for PurchasingError {
    fn decode(reader: &mut dyn ProtocolReader) -> Result<Self, ProtocolError> {
        let mut error = PurchasingError::default();
        read_struct(reader, |r, field| {
            match (field.id, field.ttype) {
                (1, TType::String) => error.message = r.read_string()?,
                (2, TType::I16) => error.error_code = r.read_i16()?,
                (_, ttype) => r.skip(ttype)?,
            }
            Ok(())
        })?;
        Ok(error)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuyAlbumArgs {
    pub asin: String,
    pub account: String,
}

impl Encode for BuyAlbumArgs {
    const TTYPE: TType = TType::Struct;

    fn encode(&self, writer: &mut dyn ProtocolWriter) -> Result<(), ProtocolError> {
        write_struct(writer, "buyAlbum_args", |w| {
            write_field(w, 1, &self.asin)?;
            write_field(w, 2, &self.account)
        })
    }
}

impl Decode for BuyAlbumArgs {
    fn decode(reader: &mut dyn ProtocolReader) -> Result<Self, ProtocolError> {
        let mut args = BuyAlbumArgs::default();
        read_struct(reader, |r, field| {
            match (field.id, field.ttype) {
                (1, TType::String) => args.asin = r.read_string()?,
                (2, TType::String) => args.account = r.read_string()?,
                (_, ttype) => r.skip(ttype)?,
            }
            Ok(())
        })?;
        Ok(args)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuyAlbumResult {
    pub success: Option<Album>,
    pub error: Option<PurchasingError>,
}

impl BuyAlbumResult {
    /// Unpacks the envelope the way a generated client does.
    pub fn into_result(self) -> Result<Album, FrugalError> {
        if let Some(album) = self.success {
            return Ok(album);
        }
        if let Some(error) = self.error {
            return Err(FrugalError::handler(error));
        }
        Err(FrugalError::application(
            ApplicationExceptionKind::MissingResult,
            "buyAlbum failed: unknown result",
        ))
    }
}

impl Encode for BuyAlbumResult {
    const TTYPE: TType = TType::Struct;

    fn encode(&self, writer: &mut dyn ProtocolWriter) -> Result<(), ProtocolError> {
        write_struct(writer, "buyAlbum_result", |w| {
            write_optional_field(w, 0, &self.success)?;
            write_optional_field(w, 1, &self.error)
        })
    }
}

impl Decode for BuyAlbumResult {
    fn decode(reader: &mut dyn ProtocolReader) -> Result<Self, ProtocolError> {
        let mut result = BuyAlbumResult::default();
        read_struct(reader, |r, field| {
            match (field.id, field.ttype) {
                (0, TType::Struct) => result.success = Some(Album::decode(r)?),
                (1, TType::Struct) => result.error = Some(PurchasingError::decode(r)?),
                (_, ttype) => r.skip(ttype)?,
            }
            Ok(())
        })?;
        Ok(result)
    }
}

impl ResultEnvelope for BuyAlbumResult {
    type Success = Album;

    fn success(value: Album) -> Self {
        Self {
            success: Some(value),
            error: None,
        }
    }

    fn declared(error: FrugalError) -> Result<Self, FrugalError> {
        let error = error.downcast::<PurchasingError>()?;
        Ok(Self {
            success: None,
            error: Some(error),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GiveawayArgs {
    pub email: String,
    pub name: String,
}

impl Encode for GiveawayArgs {
    const TTYPE: TType = TType::Struct;

    fn encode(&self, writer: &mut dyn ProtocolWriter) -> Result<(), ProtocolError> {
        write_struct(writer, "enterAlbumGiveaway_args", |w| {
            write_field(w, 1, &self.email)?;
            write_field(w, 2, &self.name)
        })
    }
}

impl Decode for GiveawayArgs {
    fn decode(reader: &mut dyn ProtocolReader) -> Result<Self, ProtocolError> {
        let mut args = GiveawayArgs::default();
        read_struct(reader, |r, field| {
            match (field.id, field.ttype) {
                (1, TType::String) => args.email = r.read_string()?,
                (2, TType::String) => args.name = r.read_string()?,
                (_, ttype) => r.skip(ttype)?,
            }
            Ok(())
        })?;
        Ok(args)
    }
}

/// Builds a store processor around a `buyAlbum` handler.
pub fn store_processor<H, Fut>(buy_album: H) -> Processor
where
    H: Fn(Context, BuyAlbumArgs) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Album, FrugalError>> + Send + 'static,
{
    let mut processor = Processor::new();
    processor.register_method::<BuyAlbumArgs, BuyAlbumResult>(Method::new(
        BUY_ALBUM,
        buy_album,
        Vec::new(),
    ));
    processor
}

/// A typed client the way generated code builds one.
pub struct StoreClient {
    buy_album: Method<BuyAlbumArgs, Album>,
    enter_giveaway: Method<GiveawayArgs, ()>,
}

impl StoreClient {
    pub fn new(invoker: Invoker, middleware: &[Middleware]) -> Self {
        let buy_invoker = invoker.clone();
        let buy_album = Method::new(
            BUY_ALBUM,
            move |ctx: Context, args: BuyAlbumArgs| {
                let invoker = buy_invoker.clone();
                async move {
                    let result: BuyAlbumResult = invoker.call(&ctx, BUY_ALBUM, &args).await?;
                    result.into_result()
                }
            },
            middleware.to_vec(),
        );
        let enter_giveaway = Method::new(
            ENTER_GIVEAWAY,
            move |ctx: Context, args: GiveawayArgs| {
                let invoker = invoker.clone();
                async move { invoker.oneway(&ctx, ENTER_GIVEAWAY, &args).await }
            },
            middleware.to_vec(),
        );
        Self {
            buy_album,
            enter_giveaway,
        }
    }

    pub async fn buy_album(
        &self,
        ctx: &Context,
        asin: &str,
        account: &str,
    ) -> Result<Album, FrugalError> {
        let args = BuyAlbumArgs {
            asin: asin.to_string(),
            account: account.to_string(),
        };
        self.buy_album.invoke(ctx.clone(), args).await
    }

    pub async fn enter_giveaway(
        &self,
        ctx: &Context,
        email: &str,
        name: &str,
    ) -> Result<(), FrugalError> {
        let args = GiveawayArgs {
            email: email.to_string(),
            name: name.to_string(),
        };
        self.enter_giveaway.invoke(ctx.clone(), args).await
    }
}

/// Shared handle for recording middleware and handler activity.
pub type Journal = Arc<parking_lot::Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(parking_lot::Mutex::new(Vec::new()))
}
