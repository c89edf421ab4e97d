//! Datagram codec for A2S.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use crate::common::error::QueryError;
use crate::query::packets::{parse_reply, A2sReply, A2sRequest};

/// Codec for A2S request/reply datagrams.
///
/// Each datagram is a complete packet, so `decode` always consumes the whole
/// buffer it is handed.
#[derive(Debug, Default)]
pub struct A2sCodec;

impl Decoder for A2sCodec {
    type Item = A2sReply;
    type Error = QueryError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let datagram = src.split();
        parse_reply(&datagram).map(Some)
    }
}

impl Encoder<A2sRequest> for A2sCodec {
    type Error = QueryError;

    fn encode(&mut self, item: A2sRequest, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode(dst);
        Ok(())
    }
}
