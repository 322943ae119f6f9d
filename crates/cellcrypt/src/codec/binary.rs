//! `binary`/`varbinary`: raw bytes, bounded by the declared size.

use common::{Error, Result, Value};

use super::mismatch;

/// Largest declared size for binary types.
pub const MAX_BINARY_SIZE: u32 = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinaryCodec {
    fixed: bool,
    /// `None` is `max` for `varbinary`.
    size: Option<u32>,
}

impl BinaryCodec {
    /// `binary` defaults to one byte when no size is given.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLength`] for a zero size or one above 8000.
    pub fn new(fixed: bool, size: Option<u32>) -> Result<Self> {
        let size = if fixed { Some(size.unwrap_or(1)) } else { size };
        if let Some(n) = size {
            if n == 0 || n > MAX_BINARY_SIZE {
                return Err(Error::InvalidLength(format!(
                    "binary size {n} is outside 1..={MAX_BINARY_SIZE}"
                )));
            }
        }
        Ok(Self { fixed, size })
    }

    pub fn type_id(&self) -> &'static str {
        if self.fixed {
            "binary"
        } else {
            "varbinary"
        }
    }

    pub fn size(&self) -> Option<u32> {
        self.size
    }

    fn check_len(&self, len: usize) -> Result<()> {
        match self.size {
            Some(n) if len > n as usize => Err(Error::InvalidLength(format!(
                "{len} bytes exceed {}({n})",
                self.type_id()
            ))),
            _ => Ok(()),
        }
    }

    pub(crate) fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        let Value::Bytes(bytes) = value else {
            return Err(mismatch(self.type_id(), value));
        };
        self.check_len(bytes.len())?;
        Ok(bytes.clone())
    }

    /// Fixed `binary` is zero-padded up to its size.
    pub(crate) fn deserialize(&self, bytes: &[u8]) -> Result<Value> {
        self.check_len(bytes.len())?;
        let mut out = bytes.to_vec();
        if let (true, Some(n)) = (self.fixed, self.size) {
            out.resize(n as usize, 0);
        }
        Ok(Value::Bytes(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn varbinary_passes_bytes_through() {
        let codec = BinaryCodec::new(false, None).unwrap();
        let v = Value::Bytes(vec![1, 2, 3]);
        let bytes = codec.serialize(&v).unwrap();
        assert_eq!(bytes, vec![1, 2, 3]);
        assert_eq!(codec.deserialize(&bytes).unwrap(), v);
    }

    #[test]
    fn binary_pads_with_zeros_on_decode() {
        let codec = BinaryCodec::new(true, Some(4)).unwrap();
        let bytes = codec.serialize(&Value::Bytes(vec![0xAB])).unwrap();
        assert_eq!(bytes, vec![0xAB]);
        assert_eq!(codec.deserialize(&bytes).unwrap(), Value::Bytes(vec![0xAB, 0, 0, 0]));
    }

    #[test]
    fn over_length_is_rejected() {
        let codec = BinaryCodec::new(false, Some(2)).unwrap();
        assert_eq!(codec.serialize(&Value::Bytes(vec![0; 3])).unwrap_err().kind(), "invalid_length");
        assert_eq!(codec.deserialize(&[0; 3]).unwrap_err().kind(), "invalid_length");
    }

    #[test]
    fn sizes_are_validated() {
        assert!(BinaryCodec::new(true, Some(0)).is_err());
        assert!(BinaryCodec::new(false, Some(8001)).is_err());
        assert_eq!(BinaryCodec::new(true, None).unwrap().size(), Some(1));
    }

    #[test]
    fn strings_are_not_bytes() {
        let codec = BinaryCodec::new(false, None).unwrap();
        assert!(codec.serialize(&Value::String("ab".into())).is_err());
    }

    proptest! {
        #[test]
        fn varbinary_round_trip(data in proptest::collection::vec(any::<u8>(), 0..=64)) {
            let codec = BinaryCodec::new(false, Some(64)).unwrap();
            let v = Value::Bytes(data);
            let bytes = codec.serialize(&v).unwrap();
            prop_assert_eq!(codec.deserialize(&bytes).unwrap(), v);
        }

        #[test]
        fn binary_round_trip_is_zero_padded(data in proptest::collection::vec(any::<u8>(), 0..=16)) {
            let codec = BinaryCodec::new(true, Some(16)).unwrap();
            let bytes = codec.serialize(&Value::Bytes(data.clone())).unwrap();
            let mut expected = data;
            expected.resize(16, 0);
            prop_assert_eq!(codec.deserialize(&bytes).unwrap(), Value::Bytes(expected));
        }
    }
}
