use std::fmt;
use std::str::FromStr;

const SYNCHRONIZATION_STREAM: [u8; 6] = [0xff; 6];
const REPETITIONS: usize = 16;
const HEX_DIGITS: usize = 12;

pub const MAGIC_PACKET_LEN: usize = SYNCHRONIZATION_STREAM.len() + 6 * REPETITIONS;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("Incorrect hardware address format: {0:?}")]
    InvalidFormat(String),
}

/// A 6-octet link-layer address.
///
/// Parses from 12 hex digits, optionally split into pairs (`01:23:45:67:89:ab`,
/// `01-23-45-67-89-ab`) or quads (`0123.4567.89ab`) by a single repeated
/// separator character.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct HardwareAddress([u8; 6]);

impl HardwareAddress {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl From<[u8; 6]> for HardwareAddress {
    fn from(octets: [u8; 6]) -> Self {
        Self(octets)
    }
}

impl FromStr for HardwareAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let chars: Vec<char> = s.chars().collect();
        // The separator sits after the first pair or the first quad.
        let separator = match chars.len() {
            17 => Some(chars[2]),
            14 => Some(chars[4]),
            _ => None,
        };
        let digits: String = match separator {
            Some(sep) => chars.iter().filter(|&&c| c != sep).collect(),
            None => s.to_string(),
        };
        if digits.len() != HEX_DIGITS || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::InvalidFormat(s.to_string()));
        }

        let mut octets = [0u8; 6];
        for (i, octet) in octets.iter_mut().enumerate() {
            *octet = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16)
                .map_err(|_| Error::InvalidFormat(s.to_string()))?;
        }
        Ok(Self(octets))
    }
}

impl fmt::Display for HardwareAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

/// The Wake-on-LAN payload: six `0xff` bytes, then the target address sixteen times.
#[derive(Clone, PartialEq, Eq)]
pub struct MagicPacket([u8; MAGIC_PACKET_LEN]);

impl MagicPacket {
    pub fn new(addr: &HardwareAddress) -> Self {
        let mut data = [0u8; MAGIC_PACKET_LEN];
        data[..SYNCHRONIZATION_STREAM.len()].copy_from_slice(&SYNCHRONIZATION_STREAM);
        for chunk in data[SYNCHRONIZATION_STREAM.len()..].chunks_exact_mut(6) {
            chunk.copy_from_slice(&addr.0);
        }
        Self(data)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for MagicPacket {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for MagicPacket {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let addr = HardwareAddress::from([
            self.0[6], self.0[7], self.0[8], self.0[9], self.0[10], self.0[11],
        ]);
        write!(f, "MagicPacket({})", addr)
    }
}

pub fn create_magic_packet(hardware_address: &str) -> Result<MagicPacket, Error> {
    let addr: HardwareAddress = hardware_address.parse()?;
    Ok(MagicPacket::new(&addr))
}
