//! Stream framing for the game server connection.

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{Decoder, Encoder, Framed};
use tracing::{debug, trace};

use crate::common::error::ProtocolError;
use crate::protocol::packets::{FrameKind, Packet};

/// Codec for C1/C2/C3/C4 framed packets.
///
/// Bytes that do not start a known header are discarded one at a time until
/// the stream resynchronises.
#[derive(Debug, Default)]
pub struct MuPacketCodec {
    skipped: usize,
}

impl MuPacketCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total junk bytes discarded so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl Decoder for MuPacketCodec {
    type Item = Packet;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if src.len() < 2 {
                return Ok(None);
            }

            let kind = match FrameKind::from_byte(src[0]) {
                Some(kind) => kind,
                None => {
                    trace!("Skipping junk byte 0x{:02X}", src[0]);
                    src.advance(1);
                    self.skipped += 1;
                    continue;
                }
            };

            let size = if kind.is_wide() {
                if src.len() < 3 {
                    return Ok(None);
                }
                ((src[1] as usize) << 8) | (src[2] as usize)
            } else {
                src[1] as usize
            };

            if size <= kind.length_prefix() {
                return Err(ProtocolError::InvalidPacket {
                    message: format!(
                        "{:?} frame declares size {} (header alone is {})",
                        kind,
                        size,
                        kind.length_prefix()
                    ),
                });
            }

            if src.len() < size {
                src.reserve(size - src.len());
                return Ok(None);
            }

            let raw = src.split_to(size).freeze();
            let opcode = raw[kind.opcode_offset()];
            debug!("Received {:?} frame 0x{:02X} ({} bytes)", kind, opcode, size);
            return Ok(Some(Packet { kind, opcode, raw }));
        }
    }
}

impl Encoder<Packet> for MuPacketCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Packet, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let declared = if item.kind.is_wide() {
            item.raw
                .get(1..3)
                .map(|b| ((b[0] as usize) << 8) | b[1] as usize)
        } else {
            item.raw.get(1).map(|&b| b as usize)
        };

        if declared != Some(item.raw.len()) {
            return Err(ProtocolError::InvalidPacket {
                message: format!(
                    "outbound 0x{:02X} header size {:?} does not match {} bytes",
                    item.opcode,
                    declared,
                    item.raw.len()
                ),
            });
        }

        dst.extend_from_slice(&item.raw);
        Ok(())
    }
}

/// A framed game server connection.
pub type GameConnection<S> = Framed<S, MuPacketCodec>;

/// Create a new game connection from a stream.
pub fn new_game_connection<S: AsyncRead + AsyncWrite>(stream: S) -> GameConnection<S> {
    Framed::new(stream, MuPacketCodec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    fn decode_all(codec: &mut MuPacketCodec, buf: &mut BytesMut) -> Vec<Packet> {
        let mut out = Vec::new();
        while let Some(packet) = codec.decode(buf).unwrap() {
            out.push(packet);
        }
        out
    }

    #[test]
    fn test_decodes_c1_and_c2_back_to_back() {
        let mut codec = MuPacketCodec::new();
        let mut buf = BytesMut::from(&hex!("C1 05 2E 07 00 C2 00 06 41 01 11")[..]);

        let packets = decode_all(&mut codec, &mut buf);
        assert_eq!(packets.len(), 2);
        assert_eq!(packets[0].kind, FrameKind::C1);
        assert_eq!(packets[0].opcode, 0x2E);
        assert_eq!(packets[1].kind, FrameKind::C2);
        assert_eq!(packets[1].opcode, 0x41);
        assert_eq!(&packets[1].raw[..], &hex!("C2 00 06 41 01 11"));
        assert!(buf.is_empty());
    }

    #[test]
    fn test_waits_for_partial_frame() {
        let mut codec = MuPacketCodec::new();
        let mut buf = BytesMut::from(&hex!("C1 06 2D 01")[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(&hex!("00 01"));
        let packet = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(packet.opcode, 0x2D);
        assert_eq!(packet.len(), 6);
    }

    #[test]
    fn test_waits_for_c2_length() {
        let mut codec = MuPacketCodec::new();
        let mut buf = BytesMut::from(&hex!("C2 00")[..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 2);
    }

    #[test]
    fn test_skips_junk_bytes() {
        let mut codec = MuPacketCodec::new();
        let mut buf = BytesMut::from(&hex!("00 FF 12 C1 03 30")[..]);

        let packet = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(packet.opcode, 0x30);
        assert_eq!(codec.skipped(), 3);
    }

    #[test]
    fn test_c3_c4_are_framed_like_c1_c2() {
        let mut codec = MuPacketCodec::new();
        let mut buf = BytesMut::from(&hex!("C3 04 2A 00 C4 00 05 13 00")[..]);

        let packets = decode_all(&mut codec, &mut buf);
        assert_eq!(packets[0].kind, FrameKind::C3);
        assert_eq!(packets[0].opcode, 0x2A);
        assert_eq!(packets[1].kind, FrameKind::C4);
        assert_eq!(packets[1].opcode, 0x13);
    }

    #[test]
    fn test_undersized_header_is_error() {
        let mut codec = MuPacketCodec::new();
        let mut buf = BytesMut::from(&hex!("C1 01 00")[..]);
        assert!(codec.decode(&mut buf).is_err());
    }

    #[test]
    fn test_encode_checks_size() {
        let mut codec = MuPacketCodec::new();
        let mut dst = BytesMut::new();

        codec.encode(Packet::c1(0x28, &[0x01, 0x00]), &mut dst).unwrap();
        assert_eq!(&dst[..], &hex!("C1 05 28 01 00"));

        let bogus = Packet::from_frame(hex!("C1 09 28 01 00").to_vec()).unwrap();
        assert!(codec.encode(bogus, &mut dst).is_err());
    }
}
