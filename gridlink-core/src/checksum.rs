//! Checksum types understood by the replica catalog

use serde::{Deserialize, Serialize};

/// Longest checksum value a catalog entry can hold (hex characters)
pub const MAX_CHECKSUM_LEN: usize = 32;

/// Checksum algorithms, in the order they are tried when collecting
/// replica information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChecksumType {
    Adler32,
    Md5,
    /// Catch-all tag for any other algorithm the storage reports
    Generic,
}

impl ChecksumType {
    /// Priority list used by the replica info collector
    pub const PRIORITY: [ChecksumType; 3] =
        [ChecksumType::Adler32, ChecksumType::Md5, ChecksumType::Generic];

    /// Two-letter tag stored in catalog entries
    pub fn catalog_tag(&self) -> &'static str {
        match self {
            Self::Adler32 => "AD",
            Self::Md5 => "MD",
            Self::Generic => "CS",
        }
    }

    /// Algorithm name passed to the checksum service
    pub fn algorithm(&self) -> &'static str {
        match self {
            Self::Adler32 => "ADLER32",
            Self::Md5 => "MD5",
            Self::Generic => "CS",
        }
    }

    /// Parse a catalog tag
    pub fn from_catalog_tag(tag: &str) -> Option<Self> {
        match tag {
            "AD" => Some(Self::Adler32),
            "MD" => Some(Self::Md5),
            "CS" => Some(Self::Generic),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChecksumType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.algorithm())
    }
}

/// A checksum value tagged with its algorithm
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum {
    pub kind: ChecksumType,
    pub value: String,
}

impl Checksum {
    pub fn new(kind: ChecksumType, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn adler32(value: impl Into<String>) -> Self {
        Self::new(ChecksumType::Adler32, value)
    }

    pub fn md5(value: impl Into<String>) -> Self {
        Self::new(ChecksumType::Md5, value)
    }

    /// Whether the value fits in a catalog entry
    pub fn fits_catalog(&self) -> bool {
        !self.value.is_empty() && self.value.len() <= MAX_CHECKSUM_LEN
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.catalog_tag(), self.value)
    }
}
