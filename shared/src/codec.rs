//! Length-prefixed packet framing over a duplex byte stream.
//!
//! Each packet is bincode-serialized and preceded by a 4-byte little-endian
//! length. A clean EOF between frames maps to `ConnectionClosed` so callers
//! can tell an orderly disconnect from a transport failure.

use crate::{Packet, MAX_PACKET_SIZE};
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

#[derive(Debug)]
pub enum CodecError {
    /// The peer closed the stream.
    ConnectionClosed,
    /// Frame length prefix exceeded `MAX_PACKET_SIZE`.
    FrameTooLarge(usize),
    /// The payload was not a valid packet.
    Malformed(bincode::Error),
    Io(io::Error),
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecError::ConnectionClosed => write!(f, "connection closed"),
            CodecError::FrameTooLarge(len) => {
                write!(f, "frame too large: {} bytes (max {})", len, MAX_PACKET_SIZE)
            }
            CodecError::Malformed(e) => write!(f, "malformed packet: {}", e),
            CodecError::Io(e) => write!(f, "io error: {}", e),
        }
    }
}

impl std::error::Error for CodecError {}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            CodecError::ConnectionClosed
        } else {
            CodecError::Io(e)
        }
    }
}

/// Reads one framed packet from the stream.
pub async fn read_packet<R: AsyncRead + Unpin>(stream: &mut R) -> Result<Packet, CodecError> {
    let mut len_buf = [0u8; 4];
    stream.read_exact(&mut len_buf).await?;

    let len = u32::from_le_bytes(len_buf) as usize;
    if len == 0 || len > MAX_PACKET_SIZE {
        return Err(CodecError::FrameTooLarge(len));
    }

    let mut payload = vec![0u8; len];
    stream.read_exact(&mut payload).await?;

    bincode::deserialize(&payload).map_err(CodecError::Malformed)
}

/// Writes one framed packet to the stream and flushes it.
pub async fn write_packet<W: AsyncWrite + Unpin>(
    stream: &mut W,
    packet: &Packet,
) -> Result<(), CodecError> {
    let payload = bincode::serialize(packet).map_err(CodecError::Malformed)?;
    if payload.len() > MAX_PACKET_SIZE {
        return Err(CodecError::FrameTooLarge(payload.len()));
    }

    stream.write_all(&(payload.len() as u32).to_le_bytes()).await?;
    stream.write_all(&payload).await?;
    stream.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PlayerState, Vec3};

    #[tokio::test]
    async fn test_framed_roundtrip() {
        let (mut a, mut b) = tokio::io::duplex(1024);

        let packet = Packet::PlayerMoved {
            player: PlayerState {
                id: 3,
                position: Vec3::new(1.0, 5.0, -2.0),
                rotation: Vec3::new(0.0, 0.7, 0.0),
                velocity: 4.5,
                is_jumping: false,
            },
        };

        write_packet(&mut a, &packet).await.unwrap();

        match read_packet(&mut b).await.unwrap() {
            Packet::PlayerMoved { player } => {
                assert_eq!(player.id, 3);
                assert_eq!(player.position, Vec3::new(1.0, 5.0, -2.0));
            }
            _ => panic!("Wrong packet type after framed roundtrip"),
        }
    }

    #[tokio::test]
    async fn test_sequential_frames_stay_ordered() {
        let (mut a, mut b) = tokio::io::duplex(4096);

        for id in 1..=5u32 {
            write_packet(&mut a, &Packet::PlayerLeft { player_id: id })
                .await
                .unwrap();
        }

        for expected in 1..=5u32 {
            match read_packet(&mut b).await.unwrap() {
                Packet::PlayerLeft { player_id } => assert_eq!(player_id, expected),
                _ => panic!("Wrong packet type"),
            }
        }
    }

    #[tokio::test]
    async fn test_eof_maps_to_connection_closed() {
        let (a, mut b) = tokio::io::duplex(64);
        drop(a);

        match read_packet(&mut b).await {
            Err(CodecError::ConnectionClosed) => {}
            other => panic!("Expected ConnectionClosed, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_oversized_frame_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);

        let bogus_len = (MAX_PACKET_SIZE as u32 + 1).to_le_bytes();
        tokio::io::AsyncWriteExt::write_all(&mut a, &bogus_len)
            .await
            .unwrap();

        match read_packet(&mut b).await {
            Err(CodecError::FrameTooLarge(len)) => assert_eq!(len, MAX_PACKET_SIZE + 1),
            other => panic!("Expected FrameTooLarge, got {:?}", other.map(|_| ())),
        }
    }
}
