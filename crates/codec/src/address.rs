use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::{BufMut, BytesMut};

use crate::{error::Error, primitive::Reader};

/// Opaque 128-bit peer identity, minted by a peer and stable across
/// reconnects if the peer chooses to reuse it.
///
/// Wire form: a one-byte type tag (only `1`, a raw 128-bit value, is
/// defined) followed by the 16-byte payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LogicalAddress([u8; 16]);

const LOGICAL_ADDRESS_RAW: u8 = 1;

impl LogicalAddress {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    pub fn write(&self, out: &mut BytesMut) {
        out.put_u8(LOGICAL_ADDRESS_RAW);
        out.extend_from_slice(&self.0);
    }

    pub fn read(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let tag = reader.read_u8()?;
        if tag != LOGICAL_ADDRESS_RAW {
            return Err(Error::InvalidAddressFamily(tag));
        }

        let raw = reader.read_bytes(16)?;
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(raw);
        Ok(Self(bytes))
    }
}

impl std::fmt::Display for LogicalAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }

        Ok(())
    }
}

const FAMILY_V4: u8 = 4;
const FAMILY_V6: u8 = 6;

/// Transport endpoint usable to establish a peer-to-peer connection.
/// The server never interprets this beyond storing and relaying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalAddress(pub SocketAddr);

impl PhysicalAddress {
    pub fn write(value: Option<&Self>, out: &mut BytesMut) {
        match value {
            None => out.put_u8(0),
            Some(Self(addr)) => {
                out.put_u8(1);
                match addr.ip() {
                    IpAddr::V4(ip) => {
                        out.put_u8(FAMILY_V4);
                        out.extend_from_slice(&ip.octets());
                    }
                    IpAddr::V6(ip) => {
                        out.put_u8(FAMILY_V6);
                        out.extend_from_slice(&ip.octets());
                    }
                }
                out.put_u16(addr.port());
            }
        }
    }

    pub fn read(reader: &mut Reader<'_>) -> Result<Option<Self>, Error> {
        if reader.read_u8()? == 0 {
            return Ok(None);
        }

        let family = reader.read_u8()?;
        let ip = match family {
            FAMILY_V4 => {
                let raw = reader.read_bytes(4)?;
                IpAddr::V4(Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3]))
            }
            FAMILY_V6 => {
                let raw = reader.read_bytes(16)?;
                let mut octets = [0u8; 16];
                octets.copy_from_slice(raw);
                IpAddr::V6(Ipv6Addr::from(octets))
            }
            other => return Err(Error::InvalidAddressFamily(other)),
        };

        let port = reader.read_u16()?;
        Ok(Some(Self(SocketAddr::new(ip, port))))
    }
}
