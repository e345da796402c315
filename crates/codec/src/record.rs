use bytes::{BufMut, Bytes, BytesMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    address::{LogicalAddress, PhysicalAddress},
    error::Error,
    primitive::Reader,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Command {
    Connect = 1,
    Disconnect = 2,
    GossipGet = 4,
    Message = 10,
    Suspect = 11,
    Ping = 12,
    Close = 13,
    ConnectOk = 14,
    OpFail = 15,
    DisconnectOk = 16,
}

/// The single on-the-wire message envelope.
///
/// Read order is exactly: command, then each optional field gated by
/// its own presence flag, then the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GossipRecord {
    pub command: Command,
    pub group: Option<String>,
    pub addr: Option<LogicalAddress>,
    pub logical_name: Option<String>,
    pub physical: Option<PhysicalAddress>,
    pub payload: Option<Bytes>,
}

impl GossipRecord {
    pub fn new(command: Command) -> Self {
        Self {
            command,
            group: None,
            addr: None,
            logical_name: None,
            physical: None,
            payload: None,
        }
    }

    pub fn encode(&self, out: &mut BytesMut) {
        out.put_u8(self.command.into());
        crate::primitive::write_ascii_string(out, self.group.as_deref());

        match &self.addr {
            None => out.put_u8(0),
            Some(addr) => {
                out.put_u8(1);
                addr.write(out);
            }
        }

        crate::primitive::write_ascii_string(out, self.logical_name.as_deref());
        PhysicalAddress::write(self.physical.as_ref(), out);
        crate::primitive::write_byte_block(out, self.payload.as_deref());
    }

    /// Attempts to decode one record from the start of `buf`.
    ///
    /// Returns `Ok(None)` when the buffered bytes do not yet contain a
    /// complete record (the caller should read more from the socket
    /// and retry), `Ok(Some((record, consumed)))` on success, or an
    /// `Err` on a malformed record (the session should be torn down).
    pub fn decode(buf: &[u8]) -> Result<Option<(Self, usize)>, Error> {
        let mut reader = Reader::new(buf);

        match Self::decode_from(&mut reader) {
            Ok(record) => Ok(Some((record, reader.position()))),
            Err(Error::Incomplete) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn decode_from(reader: &mut Reader<'_>) -> Result<Self, Error> {
        let command_byte = reader.read_u8()?;
        let command = Command::try_from(command_byte).map_err(|_| Error::InvalidCommand(command_byte))?;

        let group = reader.read_ascii_string()?;

        let addr = if reader.read_u8()? == 0 {
            None
        } else {
            Some(LogicalAddress::read(reader)?)
        };

        let logical_name = reader.read_ascii_string()?;
        let physical = PhysicalAddress::read(reader)?;
        let payload = reader.read_byte_block()?;

        Ok(Self {
            command,
            group,
            addr,
            logical_name,
            physical,
            payload,
        })
    }
}
