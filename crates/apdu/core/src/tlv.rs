//! BER-TLV decoding for SELECT response validation
//!
//! Only the structure is decoded: tags are accumulated as raw bytes into a
//! `u64`, lengths may use the short or the long form, and values are returned
//! as borrowed slices. Constructed values are walked by extracting again from
//! the value.

use crate::error::{Error, Result};

/// Largest tag this decoder accumulates, in octets
const MAX_TAG_LEN: usize = size_of::<u64>();

/// Largest number of subsequent length octets accepted in the long form
const MAX_LENGTH_OCTETS: usize = size_of::<usize>();

/// A single decoded tag/length/value triplet borrowing from its input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tlv<'a> {
    /// Tag octets, big-endian (e.g. `0x6F`, `0x9F38`)
    pub tag: u64,
    /// Value length as encoded
    pub length: usize,
    /// Value octets
    pub value: &'a [u8],
}

impl<'a> Tlv<'a> {
    /// Decode one TLV from the front of `data`, returning it and the remainder
    pub fn parse(data: &'a [u8]) -> Result<(Self, &'a [u8])> {
        let (tag, rest) = parse_tag(data)?;
        let (length, rest) = parse_length(rest)?;

        if rest.len() < length {
            return Err(Error::MalformedTlv("value shorter than encoded length"));
        }
        let (value, remainder) = rest.split_at(length);

        Ok((Self { tag, length, value }, remainder))
    }

    /// Check whether bit 6 of the first tag octet marks a constructed object
    pub const fn is_constructed(&self) -> bool {
        let mut first = self.tag;
        while first > 0xFF {
            first >>= 8;
        }
        first & 0x20 != 0
    }
}

/// Extract the value of the first TLV in `data` and whatever follows it
pub fn extract_value(data: &[u8]) -> Result<(&[u8], &[u8])> {
    Tlv::parse(data).map(|(tlv, remainder)| (tlv.value, remainder))
}

/// Hex boundary variant of [`extract_value`]
pub fn extract_value_hex(data: &str) -> Result<(String, String)> {
    let bytes = hex::decode(data)?;
    let (value, remainder) = extract_value(&bytes)?;
    Ok((hex::encode_upper(value), hex::encode_upper(remainder)))
}

/// Decode every TLV in `data` in order
pub fn parse_all(mut data: &[u8]) -> Result<Vec<Tlv<'_>>> {
    let mut tlvs = Vec::new();
    while !data.is_empty() {
        let (tlv, remainder) = Tlv::parse(data)?;
        tlvs.push(tlv);
        data = remainder;
    }
    Ok(tlvs)
}

/// Validate a File Control Information response
///
/// The first TLV is the FCI template; its value is walked object by object
/// until exhausted. Values are discarded, only well-formedness is checked.
/// Returns the number of objects found inside the template.
pub fn validate_fci(response: &[u8]) -> Result<usize> {
    let (template, _) = extract_value(response)?;
    Ok(parse_all(template)?.len())
}

fn parse_tag(data: &[u8]) -> Result<(u64, &[u8])> {
    let (&first, mut rest) = data
        .split_first()
        .ok_or(Error::MalformedTlv("missing tag"))?;
    let mut tag = u64::from(first);

    // Bits 1-5 all set: tag number follows, bit 8 flags further octets
    if first & 0x1F == 0x1F {
        let mut octets = 1;
        loop {
            let (&next, tail) = rest
                .split_first()
                .ok_or(Error::MalformedTlv("truncated multi-byte tag"))?;
            octets += 1;
            if octets > MAX_TAG_LEN {
                return Err(Error::MalformedTlv("tag too long"));
            }
            tag = (tag << 8) | u64::from(next);
            rest = tail;
            if next & 0x80 == 0 {
                break;
            }
        }
    }

    Ok((tag, rest))
}

fn parse_length(data: &[u8]) -> Result<(usize, &[u8])> {
    let (&first, rest) = data
        .split_first()
        .ok_or(Error::MalformedTlv("missing length"))?;

    if first <= 0x7F {
        return Ok((usize::from(first), rest));
    }

    // Long form: low 7 bits count the length octets that follow
    let count = usize::from(first & 0x7F);
    if count > MAX_LENGTH_OCTETS {
        return Err(Error::MalformedTlv("length field too long"));
    }
    if rest.len() < count {
        return Err(Error::MalformedTlv("truncated length field"));
    }

    let (octets, rest) = rest.split_at(count);
    let length = octets
        .iter()
        .fold(0usize, |acc, &b| (acc << 8) | usize::from(b));

    Ok((length, rest))
}
