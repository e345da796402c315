//! Directory-query reply payload.
//!
//! Unlike [`crate::record::GossipRecord`], a `GOSSIP_GET` reply is not
//! itself a record: it is a bare 16-bit big-endian count followed by
//! that many `PingData` entries, one per member of the queried group.

use bytes::{BufMut, BytesMut};

use crate::{
    address::{LogicalAddress, PhysicalAddress},
    error::Error,
    primitive::{self, Reader},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingData {
    pub logical_addr: LogicalAddress,
    pub is_server: bool,
    pub logical_name: Option<String>,
    pub physical_addr: Option<PhysicalAddress>,
}

impl PingData {
    pub fn encode(&self, out: &mut BytesMut) {
        self.logical_addr.write(out);
        out.put_u8(self.is_server as u8);
        primitive::write_ascii_string(out, self.logical_name.as_deref());
        PhysicalAddress::write(self.physical_addr.as_ref(), out);
    }

    pub fn decode(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let logical_addr = LogicalAddress::read(reader)?;
        let is_server = reader.read_u8()? != 0;
        let logical_name = reader.read_ascii_string()?;
        let physical_addr = PhysicalAddress::read(reader)?;

        Ok(Self {
            logical_addr,
            is_server,
            logical_name,
            physical_addr,
        })
    }
}

/// Writes a `GOSSIP_GET` reply: the member count followed by each
/// member's `PingData`.
pub fn encode_reply(out: &mut BytesMut, members: &[PingData]) {
    out.put_u16(members.len() as u16);
    for member in members {
        member.encode(out);
    }
}

/// Attempts to decode a `GOSSIP_GET` reply from the start of `buf`.
/// Follows the same incomplete/malformed/success contract as
/// [`crate::record::GossipRecord::decode`].
pub fn decode_reply(buf: &[u8]) -> Result<Option<(Vec<PingData>, usize)>, Error> {
    let mut reader = Reader::new(buf);

    let count = match reader.read_u16() {
        Ok(count) => count,
        Err(Error::Incomplete) => return Ok(None),
        Err(e) => return Err(e),
    };

    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        match PingData::decode(&mut reader) {
            Ok(member) => members.push(member),
            Err(Error::Incomplete) => return Ok(None),
            Err(e) => return Err(e),
        }
    }

    Ok(Some((members, reader.position())))
}
