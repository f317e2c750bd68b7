//! Position → record id mapping loaded from a NumPy `.npy` array.
//!
//! Supported arrays are one-dimensional (or `(n, 1)`) with dtype `U` (UTF-32
//! text), `S` (byte strings) or a 4/8-byte integer. Integer ids are rendered
//! as decimal strings.

use std::path::Path;

use thiserror::Error;

const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";

#[derive(Error, Debug)]
pub enum IdFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a .npy file")]
    NotNpy,

    #[error("Unsupported .npy format version {0}")]
    UnsupportedVersion(u8),

    #[error("Invalid .npy header: {0}")]
    InvalidHeader(String),

    #[error("Unsupported id dtype {0:?}")]
    UnsupportedDtype(String),

    #[error("Unsupported id array shape {0:?}")]
    UnsupportedShape(Vec<usize>),

    #[error("Id array truncated: expected {expected} data bytes, found {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Id at position {0} is not valid text")]
    InvalidText(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dtype {
    Unicode { chars: usize, big_endian: bool },
    Bytes { len: usize },
    Int { size: usize, signed: bool, big_endian: bool },
}

impl Dtype {
    fn parse(descr: &str) -> Result<Self, IdFileError> {
        let unsupported = || IdFileError::UnsupportedDtype(descr.to_string());

        let (big_endian, rest) = match descr.chars().next() {
            Some('>') => (true, &descr[1..]),
            Some('<' | '|' | '=') => (false, &descr[1..]),
            _ => (false, descr),
        };
        let mut chars = rest.chars();
        let kind = chars.next().ok_or_else(unsupported)?;
        let width: usize = chars.as_str().parse().map_err(|_| unsupported())?;

        match (kind, width) {
            ('U', n) if n > 0 => Ok(Dtype::Unicode {
                chars: n,
                big_endian,
            }),
            ('S', n) if n > 0 => Ok(Dtype::Bytes { len: n }),
            ('i', 4 | 8) => Ok(Dtype::Int {
                size: width,
                signed: true,
                big_endian,
            }),
            ('u', 4 | 8) => Ok(Dtype::Int {
                size: width,
                signed: false,
                big_endian,
            }),
            _ => Err(unsupported()),
        }
    }

    fn item_size(self) -> Option<usize> {
        match self {
            Dtype::Unicode { chars, .. } => chars.checked_mul(4),
            Dtype::Bytes { len } => Some(len),
            Dtype::Int { size, .. } => Some(size),
        }
    }

    fn decode(self, position: usize, item: &[u8]) -> Result<String, IdFileError> {
        match self {
            Dtype::Unicode { big_endian, .. } => {
                let mut out = String::with_capacity(item.len() / 4);
                for unit in item.chunks_exact(4) {
                    let raw = [unit[0], unit[1], unit[2], unit[3]];
                    let code = if big_endian {
                        u32::from_be_bytes(raw)
                    } else {
                        u32::from_le_bytes(raw)
                    };
                    if code == 0 {
                        break;
                    }
                    out.push(char::from_u32(code).ok_or(IdFileError::InvalidText(position))?);
                }
                Ok(out)
            }
            Dtype::Bytes { .. } => {
                let end = item.iter().position(|&b| b == 0).unwrap_or(item.len());
                String::from_utf8(item[..end].to_vec())
                    .map_err(|_| IdFileError::InvalidText(position))
            }
            Dtype::Int {
                size,
                signed,
                big_endian,
            } => {
                let mut buf = [0u8; 8];
                if big_endian {
                    buf[8 - size..].copy_from_slice(item);
                    buf.reverse();
                } else {
                    buf[..size].copy_from_slice(item);
                }
                let value = u64::from_le_bytes(buf);
                Ok(match (signed, size) {
                    (true, 4) => (value as u32 as i32).to_string(),
                    (true, _) => (value as i64).to_string(),
                    (false, _) => value.to_string(),
                })
            }
        }
    }
}

/// Immutable array translating index positions into record ids.
#[derive(Debug, Clone, Default)]
pub struct IdMap {
    ids: Vec<String>,
}

impl IdMap {
    pub fn new(ids: Vec<String>) -> Self {
        Self { ids }
    }

    pub fn open(path: &Path) -> Result<Self, IdFileError> {
        let bytes = std::fs::read(path)?;
        Self::from_npy_bytes(&bytes)
    }

    pub fn from_npy_bytes(bytes: &[u8]) -> Result<Self, IdFileError> {
        if bytes.len() < 10 || &bytes[..6] != NPY_MAGIC {
            return Err(IdFileError::NotNpy);
        }
        let major = bytes[6];
        let (header_len, header_start) = match major {
            1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
            2 | 3 => {
                if bytes.len() < 12 {
                    return Err(IdFileError::NotNpy);
                }
                let len = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
                (len as usize, 12)
            }
            other => return Err(IdFileError::UnsupportedVersion(other)),
        };

        let data_start = header_start + header_len;
        let header = bytes
            .get(header_start..data_start)
            .ok_or_else(|| IdFileError::InvalidHeader("header runs past end of file".into()))?;
        let header = std::str::from_utf8(header)
            .map_err(|_| IdFileError::InvalidHeader("header is not UTF-8".into()))?;

        let descr = header_value(header, "descr")
            .ok_or_else(|| IdFileError::InvalidHeader("missing descr".into()))?;
        let dtype = Dtype::parse(descr.trim_matches(|c| c == '\'' || c == '"'))?;

        let shape = header_value(header, "shape")
            .ok_or_else(|| IdFileError::InvalidHeader("missing shape".into()))
            .and_then(parse_shape)?;
        let count = match shape.as_slice() {
            [n] | [n, 1] => Some(*n),
            _ => None,
        };
        let count = count.ok_or_else(|| IdFileError::UnsupportedShape(shape))?;

        let data = &bytes[data_start..];
        let (item_size, expected) = dtype
            .item_size()
            .and_then(|size| Some((size, count.checked_mul(size)?)))
            .ok_or_else(|| {
                IdFileError::InvalidHeader(format!("array of {count} items is too large"))
            })?;
        if data.len() < expected {
            return Err(IdFileError::Truncated {
                expected,
                actual: data.len(),
            });
        }

        let ids = data[..expected]
            .chunks_exact(item_size)
            .enumerate()
            .map(|(i, item)| dtype.decode(i, item))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { ids })
    }

    /// Encode as a version 1.0 `.npy` array of `<U{n}` strings.
    pub fn to_npy_bytes(&self) -> Vec<u8> {
        let width = self
            .ids
            .iter()
            .map(|id| id.chars().count())
            .max()
            .unwrap_or(0)
            .max(1);

        let mut header = format!(
            "{{'descr': '<U{width}', 'fortran_order': False, 'shape': ({},), }}",
            self.ids.len()
        );
        // Pad so the data section starts on a 64-byte boundary
        let unpadded = 10 + header.len() + 1;
        header.push_str(&" ".repeat((64 - unpadded % 64) % 64));
        header.push('\n');

        let mut out = Vec::with_capacity(10 + header.len() + self.ids.len() * width * 4);
        out.extend_from_slice(NPY_MAGIC);
        out.extend_from_slice(&[1, 0]);
        out.extend_from_slice(&(header.len() as u16).to_le_bytes());
        out.extend_from_slice(header.as_bytes());
        for id in &self.ids {
            let mut written = 0;
            for c in id.chars() {
                out.extend_from_slice(&(c as u32).to_le_bytes());
                written += 1;
            }
            for _ in written..width {
                out.extend_from_slice(&0u32.to_le_bytes());
            }
        }
        out
    }

    /// Id stored at `position`, or `None` when the position is negative or
    /// past the end of the array.
    pub fn get(&self, position: i64) -> Option<&str> {
        usize::try_from(position)
            .ok()
            .and_then(|i| self.ids.get(i))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Extract the raw value for `key` from a NumPy header dict literal.
fn header_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let needle_single = format!("'{key}'");
    let needle_double = format!("\"{key}\"");
    let at = header
        .find(&needle_single)
        .map(|i| i + needle_single.len())
        .or_else(|| header.find(&needle_double).map(|i| i + needle_double.len()))?;
    let rest = header[at..].trim_start().strip_prefix(':')?.trim_start();

    let end = match rest.chars().next()? {
        '(' => rest.find(')')? + 1,
        q @ ('\'' | '"') => rest[1..].find(q)? + 2,
        _ => rest.find([',', '}']).unwrap_or(rest.len()),
    };
    Some(rest[..end].trim())
}

fn parse_shape(raw: &str) -> Result<Vec<usize>, IdFileError> {
    let inner = raw
        .strip_prefix('(')
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| IdFileError::InvalidHeader(format!("bad shape {raw}")))?;
    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse()
                .map_err(|_| IdFileError::InvalidHeader(format!("bad shape {raw}")))
        })
        .collect()
}
