//! Two-byte register words.

/// Byte order of a register word on the wire. The MAX17055 is little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

#[inline]
pub fn decode_unsigned(bytes: [u8; 2], order: ByteOrder) -> u16 {
    match order {
        ByteOrder::Little => u16::from_le_bytes(bytes),
        ByteOrder::Big => u16::from_be_bytes(bytes),
    }
}

/// Two's-complement decode.
#[inline]
pub fn decode_signed(bytes: [u8; 2], order: ByteOrder) -> i16 {
    match order {
        ByteOrder::Little => i16::from_le_bytes(bytes),
        ByteOrder::Big => i16::from_be_bytes(bytes),
    }
}

#[inline]
pub fn encode(value: u16, order: ByteOrder) -> [u8; 2] {
    match order {
        ByteOrder::Little => value.to_le_bytes(),
        ByteOrder::Big => value.to_be_bytes(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case([0x00, 0x32], ByteOrder::Little, 0x3200, 12800)]
    #[case([0xff, 0xff], ByteOrder::Little, 0xffff, -1)]
    #[case([0x00, 0x80], ByteOrder::Little, 0x8000, i16::MIN)]
    #[case([0x80, 0x00], ByteOrder::Big, 0x8000, i16::MIN)]
    #[case([0x01, 0x00], ByteOrder::Big, 0x0100, 256)]
    fn decodes_known_words(
        #[case] bytes: [u8; 2],
        #[case] order: ByteOrder,
        #[case] unsigned: u16,
        #[case] signed: i16,
    ) {
        assert_eq!(decode_unsigned(bytes, order), unsigned);
        assert_eq!(decode_signed(bytes, order), signed);
    }

    proptest! {
        #[test]
        fn signed_and_unsigned_share_bits(b0 in any::<u8>(), b1 in any::<u8>()) {
            let bytes = [b0, b1];
            for order in [ByteOrder::Little, ByteOrder::Big] {
                let u = decode_unsigned(bytes, order);
                let s = decode_signed(bytes, order);
                prop_assert_eq!(s as u16, u);
                prop_assert_eq!(encode(u, order), bytes);
            }
        }
    }
}
