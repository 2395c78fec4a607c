//! MessagePack wire codec.
//!
//! Each envelope is one MessagePack map with named fields, carried in one
//! length-delimited frame. [`frame_codec`] builds the framing layer; the
//! [`Wire`] trait turns frame payloads into typed envelopes and back.

use crate::error::{ProtocolError, Result};
use crate::event::Event;
use crate::request::{is_known_service, Request, UnknownRequest};
use crate::response::Response;
use serde::{Deserialize, Serialize};
use tokio_util::codec::LengthDelimitedCodec;

/// Largest frame accepted from a peer.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Length-delimited framing shared by every TCP endpoint.
pub fn frame_codec() -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .max_frame_length(MAX_FRAME_LEN)
        .new_codec()
}

/// Envelopes that can cross the wire.
pub trait Wire: Sized {
    /// Encode into a MessagePack frame payload.
    fn encode(&self) -> Result<Vec<u8>>;

    /// Decode from a MessagePack frame payload.
    fn decode(bytes: &[u8]) -> Result<Self>;
}

/// Reads just the service name of an envelope.
#[derive(Deserialize)]
struct Probe {
    service: String,
}

#[derive(Serialize)]
struct UnknownEnvelope<'a> {
    service: &'a str,
    data: UnknownData,
}

#[derive(Serialize)]
struct UnknownData {
    timestamp: f64,
    clock: u64,
}

impl Wire for Request {
    fn encode(&self) -> Result<Vec<u8>> {
        match self {
            Request::Unknown(UnknownRequest {
                service,
                timestamp,
                clock,
            }) => Ok(rmp_serde::to_vec_named(&UnknownEnvelope {
                service,
                data: UnknownData {
                    timestamp: *timestamp,
                    clock: *clock,
                },
            })?),
            known => Ok(rmp_serde::to_vec_named(known)?),
        }
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let typed_err = match rmp_serde::from_slice::<Request>(bytes) {
            Ok(request) => return Ok(request),
            Err(e) => e,
        };

        // Not a well-formed known request: find out whether the service name
        // is one we know (then the body is broken) or a foreign one.
        let probe: Probe = rmp_serde::from_slice(bytes)?;
        if is_known_service(&probe.service) {
            return Err(ProtocolError::Malformed {
                service: probe.service,
                reason: typed_err.to_string(),
            });
        }

        let clock = rmp_serde::from_slice::<ClockProbe>(bytes)
            .map(|p| p.data.clock)
            .unwrap_or(0);
        Ok(Request::Unknown(UnknownRequest {
            service: probe.service,
            timestamp: 0.0,
            clock,
        }))
    }
}

/// Reads `data.clock` of an unrecognised request, if present.
#[derive(Deserialize)]
struct ClockProbe {
    #[serde(default)]
    data: ClockOnly,
}

#[derive(Deserialize, Default)]
struct ClockOnly {
    #[serde(default)]
    clock: u64,
}

impl Wire for Response {
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}

impl Wire for Event {
    fn encode(&self) -> Result<Vec<u8>> {
        Ok(rmp_serde::to_vec_named(self)?)
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        Ok(rmp_serde::from_slice(bytes)?)
    }
}
