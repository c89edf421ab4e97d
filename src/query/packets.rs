//! A2S packet definitions.
//!
//! Only the pieces needed for A2S_INFO are modelled: the request, the
//! challenge reply (`S2C_CHALLENGE`) and the info reply itself.

use std::time::Duration;

use bytes::{Buf, BufMut, BytesMut};

use crate::common::error::QueryError;

/// Header of a single-packet response.
pub const SINGLE_PACKET_HEADER: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

/// Header of a split (multi-packet) response.
pub const SPLIT_PACKET_HEADER: [u8; 4] = [0xFE, 0xFF, 0xFF, 0xFF];

/// A2S_INFO request type and payload.
pub const A2S_INFO: u8 = 0x54;
pub const A2S_INFO_PAYLOAD: &[u8] = b"Source Engine Query\0";

/// Reply types.
pub const S2C_CHALLENGE: u8 = 0x41;
pub const S2A_INFO: u8 = 0x49;
pub const S2A_INFO_GOLDSOURCE: u8 = 0x6D;

/// Extra data flags.
mod edf {
    pub const PORT: u8 = 0x80;
    pub const STEAM_ID: u8 = 0x10;
    pub const SOURCE_TV: u8 = 0x40;
    pub const KEYWORDS: u8 = 0x20;
    pub const GAME_ID: u8 = 0x01;
}

/// Outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum A2sRequest {
    /// A2S_INFO, optionally echoing a challenge number back to the server.
    Info { challenge: Option<[u8; 4]> },
}

impl A2sRequest {
    pub fn encode(&self, buf: &mut BytesMut) {
        match self {
            Self::Info { challenge } => {
                buf.reserve(4 + 1 + A2S_INFO_PAYLOAD.len() + 4);
                buf.put_slice(&SINGLE_PACKET_HEADER);
                buf.put_u8(A2S_INFO);
                buf.put_slice(A2S_INFO_PAYLOAD);
                if let Some(challenge) = challenge {
                    buf.put_slice(challenge);
                }
            }
        }
    }
}

/// Incoming reply.
#[derive(Debug, Clone, PartialEq)]
pub enum A2sReply {
    Challenge([u8; 4]),
    Info(ServerInfo),
}

/// Decoded A2S_INFO reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerInfo {
    pub protocol: u8,
    pub name: String,
    pub map: String,
    pub folder: String,
    pub game: String,
    pub app_id: u16,
    /// Current players (Rust `cp` tag when present, else the protocol byte).
    pub players: u32,
    /// Maximum players (Rust `mp` tag when present, else the protocol byte).
    pub max_players: u32,
    pub bots: u8,
    pub server_type: u8,
    pub environment: u8,
    pub password_protected: bool,
    pub vac_secured: bool,
    pub version: String,
    pub game_port: Option<u16>,
    pub steam_id: Option<u64>,
    pub keywords: Option<String>,
    pub game_id: Option<u64>,
    /// Server uptime. A2S_INFO has no field for it, so this is usually `None`.
    pub uptime: Option<Duration>,
}

/// Parse one datagram into a reply.
pub fn parse_reply(mut buf: &[u8]) -> Result<A2sReply, QueryError> {
    if buf.len() < 5 {
        return Err(QueryError::protocol(format!(
            "packet too short: need 5 bytes, got {}",
            buf.len()
        )));
    }

    let header = [buf[0], buf[1], buf[2], buf[3]];
    if header == SPLIT_PACKET_HEADER {
        return Err(QueryError::protocol("split responses are not supported"));
    }
    if header != SINGLE_PACKET_HEADER {
        return Err(QueryError::protocol(format!(
            "bad packet header {:02X?}",
            header
        )));
    }
    buf.advance(4);

    match buf.get_u8() {
        S2C_CHALLENGE => {
            if buf.remaining() < 4 {
                return Err(QueryError::protocol("challenge reply too short"));
            }
            let mut challenge = [0u8; 4];
            buf.copy_to_slice(&mut challenge);
            Ok(A2sReply::Challenge(challenge))
        }
        S2A_INFO => parse_info(&mut buf).map(A2sReply::Info),
        S2A_INFO_GOLDSOURCE => Err(QueryError::protocol(
            "obsolete GoldSource info reply is not supported",
        )),
        other => Err(QueryError::protocol(format!(
            "unexpected reply type 0x{:02X}",
            other
        ))),
    }
}

fn parse_info(buf: &mut &[u8]) -> Result<ServerInfo, QueryError> {
    let protocol = read_u8(buf)?;
    let name = read_cstring(buf)?;
    let map = read_cstring(buf)?;
    let folder = read_cstring(buf)?;
    let game = read_cstring(buf)?;

    need(buf, 9)?;
    let app_id = buf.get_u16_le();
    let players = buf.get_u8();
    let max_players = buf.get_u8();
    let bots = buf.get_u8();
    let server_type = buf.get_u8();
    let environment = buf.get_u8();
    let password_protected = buf.get_u8() != 0;
    let vac_secured = buf.get_u8() != 0;
    let version = read_cstring(buf)?;

    let mut info = ServerInfo {
        protocol,
        name,
        map,
        folder,
        game,
        app_id,
        players: players as u32,
        max_players: max_players as u32,
        bots,
        server_type,
        environment,
        password_protected,
        vac_secured,
        version,
        game_port: None,
        steam_id: None,
        keywords: None,
        game_id: None,
        uptime: None,
    };

    // Extra data is optional
    if !buf.has_remaining() {
        return Ok(info);
    }
    let flags = buf.get_u8();

    if flags & edf::PORT != 0 {
        need(buf, 2)?;
        info.game_port = Some(buf.get_u16_le());
    }
    if flags & edf::STEAM_ID != 0 {
        need(buf, 8)?;
        info.steam_id = Some(buf.get_u64_le());
    }
    if flags & edf::SOURCE_TV != 0 {
        need(buf, 2)?;
        let _tv_port = buf.get_u16_le();
        let _tv_name = read_cstring(buf)?;
    }
    if flags & edf::KEYWORDS != 0 {
        info.keywords = Some(read_cstring(buf)?);
    }
    if flags & edf::GAME_ID != 0 {
        need(buf, 8)?;
        info.game_id = Some(buf.get_u64_le());
    }

    if let Some(keywords) = info.keywords.as_deref() {
        if let Some(current) = keyword_number(keywords, "cp") {
            info.players = current;
        }
        if let Some(max) = keyword_number(keywords, "mp") {
            info.max_players = max;
        }
    }

    Ok(info)
}

/// Find a `<prefix><digits>` tag in a comma separated keyword list.
///
/// Rust servers publish the real player counts this way because the
/// protocol's single byte fields cap at 255.
pub fn keyword_number(keywords: &str, prefix: &str) -> Option<u32> {
    keywords
        .split(',')
        .filter_map(|tag| tag.trim().strip_prefix(prefix))
        .find(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse().ok())
}

fn need(buf: &&[u8], needed: usize) -> Result<(), QueryError> {
    if buf.remaining() < needed {
        return Err(QueryError::protocol(format!(
            "packet too short: need {} more bytes, got {}",
            needed,
            buf.remaining()
        )));
    }
    Ok(())
}

fn read_u8(buf: &mut &[u8]) -> Result<u8, QueryError> {
    need(buf, 1)?;
    Ok(buf.get_u8())
}

/// Read a null-terminated string. Invalid UTF-8 is replaced, not rejected.
fn read_cstring(buf: &mut &[u8]) -> Result<String, QueryError> {
    let end = buf
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| QueryError::protocol("unterminated string"))?;
    let value = String::from_utf8_lossy(&buf[..end]).into_owned();
    buf.advance(end + 1);
    Ok(value)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build an S2A_INFO datagram the way a Rust server answers.
    pub(crate) fn info_datagram(name: &str, players: u8, max: u8, keywords: Option<&str>) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&SINGLE_PACKET_HEADER);
        buf.push(S2A_INFO);
        buf.push(17);
        for s in [name, "Procedural Map", "rust", "Rust"] {
            buf.extend_from_slice(s.as_bytes());
            buf.push(0);
        }
        // Rust's app id does not fit the short field; the full id is in the EDF game id.
        buf.extend_from_slice(&(252490u32 as u16).to_le_bytes());
        buf.extend_from_slice(&[players, max, 0, b'd', b'l', 0, 1]);
        buf.extend_from_slice(b"2542\0");

        let mut flags = edf::PORT | edf::STEAM_ID | edf::GAME_ID;
        if keywords.is_some() {
            flags |= edf::KEYWORDS;
        }
        buf.push(flags);
        buf.extend_from_slice(&28015u16.to_le_bytes());
        buf.extend_from_slice(&90_000_000_000_000_001u64.to_le_bytes());
        if let Some(keywords) = keywords {
            buf.extend_from_slice(keywords.as_bytes());
            buf.push(0);
        }
        buf.extend_from_slice(&252490u64.to_le_bytes());
        buf
    }

    #[test]
    fn test_encode_info_request() {
        let mut buf = BytesMut::new();
        A2sRequest::Info { challenge: None }.encode(&mut buf);
        assert_eq!(&buf[..5], &[0xFF, 0xFF, 0xFF, 0xFF, 0x54]);
        assert_eq!(&buf[5..], b"Source Engine Query\0");
    }

    #[test]
    fn test_encode_info_request_with_challenge() {
        let mut buf = BytesMut::new();
        A2sRequest::Info {
            challenge: Some([1, 2, 3, 4]),
        }
        .encode(&mut buf);
        assert_eq!(buf.len(), 4 + 1 + A2S_INFO_PAYLOAD.len() + 4);
        assert_eq!(&buf[buf.len() - 4..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_parse_challenge() {
        let reply = parse_reply(&[0xFF, 0xFF, 0xFF, 0xFF, 0x41, 0xAA, 0xBB, 0xCC, 0xDD]).unwrap();
        assert_eq!(reply, A2sReply::Challenge([0xAA, 0xBB, 0xCC, 0xDD]));
    }

    #[test]
    fn test_parse_info_with_extra_data() {
        let datagram = info_datagram("[EU] Test Server", 42, 100, None);
        let A2sReply::Info(info) = parse_reply(&datagram).unwrap() else {
            panic!("expected info reply");
        };

        assert_eq!(info.name, "[EU] Test Server");
        assert_eq!(info.map, "Procedural Map");
        assert_eq!(info.app_id, 252490u32 as u16);
        assert_eq!(info.players, 42);
        assert_eq!(info.max_players, 100);
        assert!(!info.password_protected);
        assert!(info.vac_secured);
        assert_eq!(info.version, "2542");
        assert_eq!(info.game_port, Some(28015));
        assert_eq!(info.game_id, Some(252490));
        assert_eq!(info.uptime, None);
    }

    #[test]
    fn test_rust_keyword_tags_override_player_bytes() {
        let datagram = info_datagram(
            "Big Server",
            255,
            255,
            Some("mp500,cp312,pt0,qp3,v2542,h8f0a,stok,born1697040000,gmrust"),
        );
        let A2sReply::Info(info) = parse_reply(&datagram).unwrap() else {
            panic!("expected info reply");
        };

        assert_eq!(info.players, 312);
        assert_eq!(info.max_players, 500);
        assert!(info.keywords.unwrap().contains("born1697040000"));
    }

    #[test]
    fn test_keyword_number_ignores_non_numeric_tags() {
        assert_eq!(keyword_number("cpx,cp12", "cp"), Some(12));
        assert_eq!(keyword_number("mp,pt0", "mp"), None);
    }

    #[test]
    fn test_info_without_extra_data_flag() {
        let mut datagram = info_datagram("Plain", 3, 50, None);
        // Cut everything after the version string
        let version_end = datagram.windows(5).position(|w| w == b"2542\0").unwrap() + 5;
        datagram.truncate(version_end);

        let A2sReply::Info(info) = parse_reply(&datagram).unwrap() else {
            panic!("expected info reply");
        };
        assert_eq!(info.players, 3);
        assert_eq!(info.game_port, None);
    }

    #[test]
    fn test_truncated_info_is_protocol_error() {
        let datagram = info_datagram("Truncated", 1, 2, None);
        let result = parse_reply(&datagram[..20]);
        assert!(matches!(result, Err(QueryError::Protocol { .. })));
    }

    #[test]
    fn test_split_and_garbage_packets_rejected() {
        assert!(matches!(
            parse_reply(&[0xFE, 0xFF, 0xFF, 0xFF, 0x01, 0x02]),
            Err(QueryError::Protocol { .. })
        ));
        assert!(matches!(
            parse_reply(b"hello world"),
            Err(QueryError::Protocol { .. })
        ));
        assert!(matches!(
            parse_reply(&[0xFF, 0xFF, 0xFF, 0xFF, 0x6D]),
            Err(QueryError::Protocol { .. })
        ));
    }
}
