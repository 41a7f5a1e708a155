//! CFF DICT decoding
//!
//! A DICT is a sequence of `operand* operator` entries. Operands are kept
//! raw and interpreted on request through [`DictValue`], which checks the
//! shape the operator is expected to carry.

use crate::{FontError, Result};

/// Maximum operands before an operator (CFF limit)
const MAX_OPERANDS: usize = 48;

/// Escape byte introducing two-byte operators
const ESCAPE: u8 = 12;

/// DICT operand
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operand {
    Integer(i32),
    Real(f64),
}

impl Operand {
    pub fn to_f64(self) -> f64 {
        match self {
            Operand::Integer(v) => v as f64,
            Operand::Real(v) => v,
        }
    }

    /// Integer value; reals are accepted only when integral
    pub fn to_i32(self) -> Option<i32> {
        match self {
            Operand::Integer(v) => Some(v),
            Operand::Real(v) if v.fract() == 0.0 && v.abs() <= i32::MAX as f64 => Some(v as i32),
            Operand::Real(_) => None,
        }
    }
}

macro_rules! dict_operators {
    ($($(#[$doc:meta])* $name:ident = $code:expr,)*) => {
        /// Known Top, Font and Private DICT operators
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum DictOperator {
            $($(#[$doc])* $name,)*
            /// Operator with no name in this table
            Unknown(u16),
        }

        impl DictOperator {
            /// Map a raw code (`(12 << 8) | b1` for escaped operators)
            pub fn from_code(code: u16) -> Self {
                match code {
                    $(c if c == $code => Self::$name,)*
                    other => Self::Unknown(other),
                }
            }

            pub fn code(self) -> u16 {
                match self {
                    $(Self::$name => $code,)*
                    Self::Unknown(code) => code,
                }
            }
        }
    };
}

const fn esc(b: u16) -> u16 {
    (12 << 8) | b
}

dict_operators! {
    // Top DICT
    Version = 0,
    Notice = 1,
    Copyright = esc(0),
    FullName = 2,
    FamilyName = 3,
    Weight = 4,
    IsFixedPitch = esc(1),
    ItalicAngle = esc(2),
    UnderlinePosition = esc(3),
    UnderlineThickness = esc(4),
    PaintType = esc(5),
    CharstringType = esc(6),
    FontMatrix = esc(7),
    UniqueId = 13,
    FontBBox = 5,
    StrokeWidth = esc(8),
    Xuid = 14,
    Charset = 15,
    Encoding = 16,
    CharStrings = 17,
    /// Private DICT size and offset
    Private = 18,
    SyntheticBase = esc(20),
    PostScript = esc(21),
    BaseFontName = esc(22),
    BaseFontBlend = esc(23),
    /// Registry, Ordering, Supplement
    Ros = esc(30),
    CidFontVersion = esc(31),
    CidFontRevision = esc(32),
    CidFontType = esc(33),
    CidCount = esc(34),
    UidBase = esc(35),
    FdArray = esc(36),
    FdSelect = esc(37),
    FontName = esc(38),

    // Private DICT
    BlueValues = 6,
    OtherBlues = 7,
    FamilyBlues = 8,
    FamilyOtherBlues = 9,
    BlueScale = esc(9),
    BlueShift = esc(10),
    BlueFuzz = esc(11),
    StdHw = 10,
    StdVw = 11,
    StemSnapH = esc(12),
    StemSnapV = esc(13),
    ForceBold = esc(14),
    LanguageGroup = esc(17),
    ExpansionFactor = esc(18),
    InitialRandomSeed = esc(19),
    Subrs = 19,
    DefaultWidthX = 20,
    NominalWidthX = 21,
}

/// One decoded `operands operator` entry
#[derive(Debug, Clone, PartialEq)]
pub struct DictEntry {
    pub operator: DictOperator,
    pub operands: Vec<Operand>,
}

/// Decoded DICT in source order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict {
    entries: Vec<DictEntry>,
}

impl Dict {
    /// Decode DICT data
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut entries = Vec::new();
        let mut operands = Vec::new();
        let mut pos = 0;

        while pos < data.len() {
            let b0 = data[pos];
            match b0 {
                0..=21 => {
                    let code = if b0 == ESCAPE {
                        let b1 = *data.get(pos + 1).ok_or_else(|| {
                            FontError::malformed("DICT escape at end of data")
                        })?;
                        pos += 2;
                        esc(b1 as u16)
                    } else {
                        pos += 1;
                        b0 as u16
                    };
                    entries.push(DictEntry {
                        operator: DictOperator::from_code(code),
                        operands: std::mem::take(&mut operands),
                    });
                }
                22..=27 | 31 | 255 => {
                    return Err(FontError::malformed(format!("reserved DICT byte {}", b0)));
                }
                _ => {
                    if operands.len() >= MAX_OPERANDS {
                        return Err(FontError::malformed("too many DICT operands"));
                    }
                    let (operand, len) = parse_operand(&data[pos..])?;
                    operands.push(operand);
                    pos += len;
                }
            }
        }

        if !operands.is_empty() {
            return Err(FontError::malformed("DICT ends with operands but no operator"));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[DictEntry] {
        &self.entries
    }

    pub fn contains(&self, op: DictOperator) -> bool {
        self.entries.iter().any(|e| e.operator == op)
    }

    /// Operands of an operator; the last occurrence wins
    pub fn get(&self, op: DictOperator) -> Option<DictValue<'_>> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.operator == op)
            .map(|e| DictValue { operator: op, operands: &e.operands })
    }

    /// Integer value or `default` when absent
    pub fn int_or(&self, op: DictOperator, default: i32) -> Result<i32> {
        self.get(op).map_or(Ok(default), |v| v.as_int())
    }

    /// Number value or `default` when absent
    pub fn number_or(&self, op: DictOperator, default: f64) -> Result<f64> {
        self.get(op).map_or(Ok(default), |v| v.as_f64())
    }
}

/// Operands of one operator with typed accessors
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DictValue<'a> {
    operator: DictOperator,
    operands: &'a [Operand],
}

impl<'a> DictValue<'a> {
    pub fn operands(&self) -> &'a [Operand] {
        self.operands
    }

    fn mismatch(&self, expected: &str) -> FontError {
        FontError::malformed(format!(
            "operand shape mismatch for {:?}: expected {}, found {} operand(s)",
            self.operator,
            expected,
            self.operands.len()
        ))
    }

    fn single(&self, expected: &str) -> Result<Operand> {
        match self.operands {
            [op] => Ok(*op),
            _ => Err(self.mismatch(expected)),
        }
    }

    pub fn as_int(&self) -> Result<i32> {
        self.single("integer")?.to_i32().ok_or_else(|| self.mismatch("integer"))
    }

    pub fn as_f64(&self) -> Result<f64> {
        Ok(self.single("number")?.to_f64())
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self.single("boolean")?.to_i32() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(self.mismatch("boolean")),
        }
    }

    pub fn as_sid(&self) -> Result<u16> {
        let v = self.as_int()?;
        u16::try_from(v).map_err(|_| self.mismatch("SID"))
    }

    /// Array of numbers
    pub fn as_list(&self) -> Vec<f64> {
        self.operands.iter().map(|o| o.to_f64()).collect()
    }

    /// Fixed-size array of numbers
    pub fn as_array<const N: usize>(&self) -> Result<[f64; N]> {
        let list = self.as_list();
        list.try_into().map_err(|_| self.mismatch(&format!("{} numbers", N)))
    }

    /// Delta-encoded array; each value is relative to the previous one
    pub fn as_delta(&self) -> Vec<f64> {
        let mut acc = 0.0;
        self.operands
            .iter()
            .map(|o| {
                acc += o.to_f64();
                acc
            })
            .collect()
    }

    /// Two integers (e.g. Private size and offset)
    pub fn as_number_pair(&self) -> Result<(i32, i32)> {
        match self.operands {
            [a, b] => match (a.to_i32(), b.to_i32()) {
                (Some(a), Some(b)) => Ok((a, b)),
                _ => Err(self.mismatch("two integers")),
            },
            _ => Err(self.mismatch("two integers")),
        }
    }

    /// SID, SID, number (ROS)
    pub fn as_sid_sid_number(&self) -> Result<(u16, u16, f64)> {
        let [a, b, c] = self.operands else {
            return Err(self.mismatch("SID SID number"));
        };
        let sid = |op: &Operand| op.to_i32().and_then(|v| u16::try_from(v).ok());
        match (sid(a), sid(b)) {
            (Some(registry), Some(ordering)) => Ok((registry, ordering, c.to_f64())),
            _ => Err(self.mismatch("SID SID number")),
        }
    }
}

/// Decode one operand, returning it and its encoded length
fn parse_operand(data: &[u8]) -> Result<(Operand, usize)> {
    let truncated = || FontError::malformed("truncated DICT operand");
    let b0 = data[0];
    match b0 {
        28 => {
            let b = data.get(1..3).ok_or_else(truncated)?;
            Ok((Operand::Integer(i16::from_be_bytes([b[0], b[1]]) as i32), 3))
        }
        29 => {
            let b = data.get(1..5).ok_or_else(truncated)?;
            Ok((Operand::Integer(i32::from_be_bytes([b[0], b[1], b[2], b[3]])), 5))
        }
        30 => parse_real(&data[1..]).map(|(v, len)| (Operand::Real(v), len + 1)),
        32..=246 => Ok((Operand::Integer(b0 as i32 - 139), 1)),
        247..=250 => {
            let b1 = *data.get(1).ok_or_else(truncated)? as i32;
            Ok((Operand::Integer((b0 as i32 - 247) * 256 + b1 + 108), 2))
        }
        251..=254 => {
            let b1 = *data.get(1).ok_or_else(truncated)? as i32;
            Ok((Operand::Integer(-(b0 as i32 - 251) * 256 - b1 - 108), 2))
        }
        _ => Err(FontError::malformed(format!("invalid DICT operand byte {}", b0))),
    }
}

/// Decode a nibble-coded real; returns the value and bytes consumed
fn parse_real(data: &[u8]) -> Result<(f64, usize)> {
    let mut text = String::new();
    for (i, &byte) in data.iter().enumerate() {
        for nibble in [byte >> 4, byte & 0x0F] {
            match nibble {
                0..=9 => text.push((b'0' + nibble) as char),
                0xA => text.push('.'),
                0xB => text.push('E'),
                0xC => text.push_str("E-"),
                0xE => text.push('-'),
                0xF => {
                    let value = text.parse::<f64>().map_err(|_| {
                        FontError::malformed(format!("invalid real number {:?}", text))
                    })?;
                    return Ok((value, i + 1));
                }
                _ => return Err(FontError::malformed("reserved nibble in real number")),
            }
        }
    }
    Err(FontError::malformed("unterminated real number"))
}
