//! Socket ABI scalars and the 19-byte wire address.
//!
//! The wire address is `family: u8`, `port: u16` (big-endian) and sixteen
//! address bytes. IPv4 addresses occupy the first four address bytes and the
//! remaining twelve are zero.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use byteorder::{BigEndian, ByteOrder};
use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::Errno;

pub const WIRE_ADDR_SIZE: usize = 19;

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AddressFamily {
    Inet4 = 2,
    Inet6 = 10,
}

impl AddressFamily {
    pub fn of(addr: &SocketAddr) -> Self {
        match addr {
            SocketAddr::V4(_) => AddressFamily::Inet4,
            SocketAddr::V6(_) => AddressFamily::Inet6,
        }
    }
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SockType {
    Stream = 1,
    Dgram = 2,
}

pub fn write_wire_addr(addr: &SocketAddr) -> [u8; WIRE_ADDR_SIZE] {
    let mut out = [0u8; WIRE_ADDR_SIZE];
    out[0] = AddressFamily::of(addr).into();
    BigEndian::write_u16(&mut out[1..3], addr.port());
    match addr.ip() {
        IpAddr::V4(ip) => out[3..7].copy_from_slice(&ip.octets()),
        IpAddr::V6(ip) => out[3..19].copy_from_slice(&ip.octets()),
    }
    out
}

/// Decodes a wire address.
///
/// Fails with `Inval` when fewer than [`WIRE_ADDR_SIZE`] bytes are supplied
/// and with `Afnosupport` for an unknown family byte.
pub fn read_wire_addr(bytes: &[u8]) -> Result<SocketAddr, Errno> {
    if bytes.len() < WIRE_ADDR_SIZE {
        return Err(Errno::Inval);
    }
    let family = AddressFamily::try_from(bytes[0]).map_err(|_| Errno::Afnosupport)?;
    let port = BigEndian::read_u16(&bytes[1..3]);
    let ip = match family {
        AddressFamily::Inet4 => IpAddr::V4(Ipv4Addr::new(bytes[3], bytes[4], bytes[5], bytes[6])),
        AddressFamily::Inet6 => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&bytes[3..19]);
            IpAddr::V6(Ipv6Addr::from(octets))
        }
    };
    Ok(SocketAddr::new(ip, port))
}
