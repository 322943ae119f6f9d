//! Character codecs: `char`/`varchar` through a code page, `nchar`/`nvarchar`
//! as UTF-16LE.
//!
//! Declared sizes count bytes for the code-page types and UTF-16 code units for
//! the national types. Fixed-width types are padded with spaces.

use std::borrow::Cow;

use common::{Error, Result, Value};
use encoding_rs::Encoding;

use super::mismatch;

/// Code page used by `char`/`varchar` when none is given.
pub const DEFAULT_CODEPAGE: u32 = 1252;

/// Largest declared size for code-page types, in bytes.
pub const MAX_CHAR_SIZE: u32 = 8000;

/// Largest declared size for national types, in UTF-16 units.
pub const MAX_NCHAR_SIZE: u32 = 4000;

const UTF16_CODEPAGE: u32 = 1200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CharKind {
    Char,
    VarChar,
    NChar,
    NVarChar,
}

impl CharKind {
    pub fn type_id(&self) -> &'static str {
        match self {
            CharKind::Char => "char",
            CharKind::VarChar => "varchar",
            CharKind::NChar => "nchar",
            CharKind::NVarChar => "nvarchar",
        }
    }

    pub fn is_fixed(&self) -> bool {
        matches!(self, CharKind::Char | CharKind::NChar)
    }

    pub fn is_national(&self) -> bool {
        matches!(self, CharKind::NChar | CharKind::NVarChar)
    }

    fn max_size(&self) -> u32 {
        if self.is_national() {
            MAX_NCHAR_SIZE
        } else {
            MAX_CHAR_SIZE
        }
    }
}

/// How characters become bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Utf16Le,
    CodePage {
        codepage: u32,
        encoding: &'static Encoding,
    },
}

impl TextEncoding {
    /// Resolve a Windows code page number.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EncodingUnsupported`] for code pages without a mapping.
    pub fn for_codepage(codepage: u32) -> Result<Self> {
        if codepage == UTF16_CODEPAGE {
            return Ok(TextEncoding::Utf16Le);
        }
        let encoding = match codepage {
            866 => encoding_rs::IBM866,
            874 => encoding_rs::WINDOWS_874,
            932 => encoding_rs::SHIFT_JIS,
            936 => encoding_rs::GBK,
            949 => encoding_rs::EUC_KR,
            950 => encoding_rs::BIG5,
            1250 => encoding_rs::WINDOWS_1250,
            1251 => encoding_rs::WINDOWS_1251,
            1252 => encoding_rs::WINDOWS_1252,
            1253 => encoding_rs::WINDOWS_1253,
            1254 => encoding_rs::WINDOWS_1254,
            1255 => encoding_rs::WINDOWS_1255,
            1256 => encoding_rs::WINDOWS_1256,
            1257 => encoding_rs::WINDOWS_1257,
            1258 => encoding_rs::WINDOWS_1258,
            20866 => encoding_rs::KOI8_R,
            21866 => encoding_rs::KOI8_U,
            28592 => encoding_rs::ISO_8859_2,
            28593 => encoding_rs::ISO_8859_3,
            28594 => encoding_rs::ISO_8859_4,
            28595 => encoding_rs::ISO_8859_5,
            28596 => encoding_rs::ISO_8859_6,
            28597 => encoding_rs::ISO_8859_7,
            28598 => encoding_rs::ISO_8859_8,
            28603 => encoding_rs::ISO_8859_13,
            28605 => encoding_rs::ISO_8859_15,
            54936 => encoding_rs::GB18030,
            65001 => encoding_rs::UTF_8,
            other => {
                return Err(Error::EncodingUnsupported(format!(
                    "code page {other} is not supported"
                )))
            }
        };
        Ok(TextEncoding::CodePage { codepage, encoding })
    }

    pub fn codepage(&self) -> u32 {
        match self {
            TextEncoding::Utf16Le => UTF16_CODEPAGE,
            TextEncoding::CodePage { codepage, .. } => *codepage,
        }
    }

    fn encode(&self, text: &str) -> Result<Vec<u8>> {
        match self {
            // encoding_rs only decodes UTF-16; its encoder emits UTF-8.
            TextEncoding::Utf16Le => Ok(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
            TextEncoding::CodePage { codepage, encoding } => {
                let (bytes, _, had_errors) = encoding.encode(text);
                if had_errors {
                    return Err(Error::EncodingUnsupported(format!(
                        "text contains characters code page {codepage} cannot represent"
                    )));
                }
                Ok(bytes.into_owned())
            }
        }
    }

    fn decode<'a>(&self, bytes: &'a [u8]) -> Result<Cow<'a, str>> {
        let encoding = match self {
            TextEncoding::Utf16Le => {
                if bytes.len() % 2 != 0 {
                    return Err(Error::InvalidLength(format!(
                        "UTF-16 data has odd length {}",
                        bytes.len()
                    )));
                }
                encoding_rs::UTF_16LE
            }
            TextEncoding::CodePage { encoding, .. } => *encoding,
        };
        encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .ok_or_else(|| {
                Error::EncodingUnsupported(format!(
                    "bytes are not valid in code page {}",
                    self.codepage()
                ))
            })
    }

    /// The space character in this encoding. Every supported code page is
    /// ASCII-compatible.
    fn space(&self) -> &'static [u8] {
        match self {
            TextEncoding::Utf16Le => &[0x20, 0x00],
            TextEncoding::CodePage { .. } => b" ",
        }
    }
}

/// A configured character column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CharCodec {
    kind: CharKind,
    /// `None` is `max` for the variable types.
    size: Option<u32>,
    encoding: TextEncoding,
}

impl CharCodec {
    /// # Errors
    ///
    /// - [`Error::InvalidLength`] for a zero size or one above the type limit.
    /// - [`Error::EncodingUnsupported`] for an unknown code page.
    pub fn new(kind: CharKind, size: Option<u32>, codepage: Option<u32>) -> Result<Self> {
        let size = match (size, kind.is_fixed()) {
            (None, true) => Some(1),
            (other, _) => other,
        };
        if let Some(n) = size {
            if n == 0 || n > kind.max_size() {
                return Err(Error::InvalidLength(format!(
                    "{}({n}) must have a size in 1..={}",
                    kind.type_id(),
                    kind.max_size()
                )));
            }
        }
        let encoding = if kind.is_national() {
            TextEncoding::Utf16Le
        } else {
            TextEncoding::for_codepage(codepage.unwrap_or(DEFAULT_CODEPAGE))?
        };
        Ok(Self {
            kind,
            size,
            encoding,
        })
    }

    pub fn kind(&self) -> CharKind {
        self.kind
    }

    pub fn size(&self) -> Option<u32> {
        self.size
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }

    /// Size limit in bytes, if bounded. National sizes count UTF-16 units;
    /// code-page sizes count bytes whatever the code page.
    fn max_bytes(&self) -> Option<usize> {
        let unit = if self.kind.is_national() { 2 } else { 1 };
        self.size.map(|n| n as usize * unit)
    }

    pub(crate) fn serialize(&self, value: &Value) -> Result<Vec<u8>> {
        let Value::String(text) = value else {
            return Err(mismatch(self.kind.type_id(), value));
        };
        let mut bytes = self.encoding.encode(text)?;
        if let Some(max) = self.max_bytes() {
            if bytes.len() > max {
                return Err(Error::InvalidLength(format!(
                    "{} bytes of text exceed {}({})",
                    bytes.len(),
                    self.kind.type_id(),
                    self.size.unwrap_or_default()
                )));
            }
            if self.kind.is_fixed() {
                self.pad(&mut bytes, max);
            }
        }
        Ok(bytes)
    }

    pub(crate) fn deserialize(&self, bytes: &[u8]) -> Result<Value> {
        if let Some(max) = self.max_bytes() {
            if bytes.len() > max {
                return Err(Error::InvalidLength(format!(
                    "{} bytes exceed {}({})",
                    bytes.len(),
                    self.kind.type_id(),
                    self.size.unwrap_or_default()
                )));
            }
            if self.kind.is_fixed() && bytes.len() < max {
                let mut padded = bytes.to_vec();
                self.pad(&mut padded, max);
                return Ok(Value::String(self.encoding.decode(&padded)?.into_owned()));
            }
        }
        Ok(Value::String(self.encoding.decode(bytes)?.into_owned()))
    }

    fn pad(&self, bytes: &mut Vec<u8>, max: usize) {
        let space = self.encoding.space();
        while bytes.len() + space.len() <= max {
            bytes.extend_from_slice(space);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn s(text: &str) -> Value {
        Value::String(text.into())
    }

    #[test]
    fn varchar_uses_windows_1252_by_default() {
        let codec = CharCodec::new(CharKind::VarChar, Some(10), None).unwrap();
        assert_eq!(codec.encoding().codepage(), 1252);
        assert_eq!(codec.serialize(&s("café")).unwrap(), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(codec.deserialize(&[b'c', b'a', b'f', 0xE9]).unwrap(), s("café"));
    }

    #[test]
    fn nvarchar_is_utf16le() {
        let codec = CharCodec::new(CharKind::NVarChar, None, None).unwrap();
        assert_eq!(codec.serialize(&s("hé")).unwrap(), vec![b'h', 0, 0xE9, 0]);
        assert_eq!(codec.deserialize(&[b'h', 0, 0xE9, 0]).unwrap(), s("hé"));
    }

    #[test]
    fn surrogate_pairs_count_as_two_units() {
        let codec = CharCodec::new(CharKind::NVarChar, Some(1), None).unwrap();
        assert_eq!(codec.serialize(&s("😀")).unwrap_err().kind(), "invalid_length");
        let codec = CharCodec::new(CharKind::NVarChar, Some(2), None).unwrap();
        let bytes = codec.serialize(&s("😀")).unwrap();
        assert_eq!(codec.deserialize(&bytes).unwrap(), s("😀"));
    }

    #[test]
    fn over_length_is_rejected() {
        let codec = CharCodec::new(CharKind::VarChar, Some(3), None).unwrap();
        assert_eq!(codec.serialize(&s("abcd")).unwrap_err().kind(), "invalid_length");
        assert_eq!(codec.deserialize(b"abcd").unwrap_err().kind(), "invalid_length");
    }

    #[test]
    fn fixed_types_pad_with_spaces() {
        let codec = CharCodec::new(CharKind::Char, Some(5), None).unwrap();
        assert_eq!(codec.serialize(&s("ab")).unwrap(), b"ab   ".to_vec());
        assert_eq!(codec.deserialize(b"ab").unwrap(), s("ab   "));

        let codec = CharCodec::new(CharKind::NChar, Some(3), None).unwrap();
        assert_eq!(codec.serialize(&s("a")).unwrap(), vec![b'a', 0, b' ', 0, b' ', 0]);
        assert_eq!(codec.deserialize(&[b'a', 0]).unwrap(), s("a  "));
    }

    #[test]
    fn fixed_types_default_to_one_character() {
        let codec = CharCodec::new(CharKind::Char, None, None).unwrap();
        assert_eq!(codec.size(), Some(1));
        assert!(codec.serialize(&s("ab")).is_err());
    }

    #[test]
    fn invalid_sizes_are_rejected() {
        assert!(CharCodec::new(CharKind::VarChar, Some(0), None).is_err());
        assert!(CharCodec::new(CharKind::VarChar, Some(8001), None).is_err());
        assert!(CharCodec::new(CharKind::NVarChar, Some(4001), None).is_err());
        assert!(CharCodec::new(CharKind::NVarChar, Some(4000), None).is_ok());
    }

    #[test]
    fn code_pages() {
        assert_eq!(
            CharCodec::new(CharKind::VarChar, None, Some(437)).unwrap_err().kind(),
            "encoding_unsupported"
        );
        let cyrillic = CharCodec::new(CharKind::VarChar, None, Some(1251)).unwrap();
        assert_eq!(cyrillic.serialize(&s("Ж")).unwrap(), vec![0xC6]);
        let utf8 = CharCodec::new(CharKind::VarChar, Some(4), Some(65001)).unwrap();
        assert_eq!(utf8.serialize(&s("日")).unwrap(), "日".as_bytes().to_vec());
        let utf16 = CharCodec::new(CharKind::VarChar, Some(4), Some(1200)).unwrap();
        // Size counts bytes here, not characters.
        assert_eq!(utf16.serialize(&s("ab")).unwrap(), vec![b'a', 0, b'b', 0]);
        assert!(utf16.serialize(&s("abc")).is_err());
    }

    #[test]
    fn utf16_code_page_sizes_count_bytes() {
        let varchar = CharCodec::new(CharKind::VarChar, Some(4), Some(1200)).unwrap();
        assert_eq!(varchar.serialize(&s("abc")).unwrap_err().kind(), "invalid_length");
        let err = varchar.deserialize(&[b'a', 0, b'b', 0, b'c', 0]).unwrap_err();
        assert_eq!(err.kind(), "invalid_length");

        // Padding stops before a space that would cross the byte limit.
        let fixed = CharCodec::new(CharKind::Char, Some(5), Some(1200)).unwrap();
        assert_eq!(fixed.serialize(&s("a")).unwrap(), vec![b'a', 0, b' ', 0]);
        assert!(fixed.serialize(&s("abc")).is_err());
    }

    #[test]
    fn unmappable_characters_are_rejected() {
        let codec = CharCodec::new(CharKind::VarChar, None, None).unwrap();
        assert_eq!(codec.serialize(&s("日本")).unwrap_err().kind(), "encoding_unsupported");
    }

    #[test]
    fn invalid_bytes_are_rejected() {
        let utf8 = CharCodec::new(CharKind::VarChar, None, Some(65001)).unwrap();
        assert_eq!(utf8.deserialize(&[0xFF, 0xFE]).unwrap_err().kind(), "encoding_unsupported");
        let n = CharCodec::new(CharKind::NVarChar, None, None).unwrap();
        assert_eq!(n.deserialize(&[0x41]).unwrap_err().kind(), "invalid_length");
    }

    #[test]
    fn only_strings_are_accepted() {
        let codec = CharCodec::new(CharKind::NVarChar, None, None).unwrap();
        assert_eq!(
            codec.serialize(&Value::I32(1)).unwrap_err().kind(),
            "unsupported_type_conversion"
        );
    }

    proptest! {
        #[test]
        fn nvarchar_max_round_trip(text in any::<String>()) {
            let codec = CharCodec::new(CharKind::NVarChar, None, None).unwrap();
            let bytes = codec.serialize(&s(&text)).unwrap();
            prop_assert_eq!(bytes.len(), text.encode_utf16().count() * 2);
            prop_assert_eq!(codec.deserialize(&bytes).unwrap(), s(&text));
        }

        #[test]
        fn varchar_round_trip(text in "[ -~]{0,40}") {
            let codec = CharCodec::new(CharKind::VarChar, Some(40), None).unwrap();
            let bytes = codec.serialize(&s(&text)).unwrap();
            prop_assert_eq!(codec.deserialize(&bytes).unwrap(), s(&text));
        }

        #[test]
        fn char_round_trip_is_space_padded(text in "[a-z0-9]{0,12}") {
            let codec = CharCodec::new(CharKind::Char, Some(12), None).unwrap();
            let bytes = codec.serialize(&s(&text)).unwrap();
            prop_assert_eq!(bytes.len(), 12);
            prop_assert_eq!(codec.deserialize(&bytes).unwrap(), s(&format!("{text:<12}")));
        }

        #[test]
        fn nchar_round_trip_is_space_padded(text in "[a-zé]{0,8}") {
            let codec = CharCodec::new(CharKind::NChar, Some(8), None).unwrap();
            let bytes = codec.serialize(&s(&text)).unwrap();
            prop_assert_eq!(bytes.len(), 16);
            prop_assert_eq!(codec.deserialize(&bytes).unwrap(), s(&format!("{text:<8}")));
        }
    }
}
