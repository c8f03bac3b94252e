//! Shared enumeration describing compression algorithms supported by the workspace.

use ::core::str::FromStr;

use thiserror::Error;

/// Compression algorithms recognised by the workspace.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CompressionAlgorithm {
    /// Classic zlib/deflate compression.
    Zlib,
    /// LZ4 frame compression (`--compress-choice=lz4`).
    #[cfg(feature = "lz4")]
    Lz4,
    /// Zstandard compression (`--compress-choice=zstd`).
    #[cfg(feature = "zstd")]
    Zstd,
}

impl CompressionAlgorithm {
    /// Returns the canonical display name used for version output and diagnostics.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            CompressionAlgorithm::Zlib => "zlib",
            #[cfg(feature = "lz4")]
            CompressionAlgorithm::Lz4 => "lz4",
            #[cfg(feature = "zstd")]
            CompressionAlgorithm::Zstd => "zstd",
        }
    }

    /// Returns the default compression algorithm used when callers enable `--compress`.
    #[must_use]
    pub const fn default_algorithm() -> Self {
        CompressionAlgorithm::Zlib
    }

    /// Returns the set of algorithms available in the current build.
    #[must_use]
    pub fn available() -> &'static [CompressionAlgorithm] {
        #[cfg(all(feature = "zstd", feature = "lz4"))]
        {
            const ALGORITHMS: &[CompressionAlgorithm] = &[
                CompressionAlgorithm::Zlib,
                CompressionAlgorithm::Lz4,
                CompressionAlgorithm::Zstd,
            ];
            ALGORITHMS
        }

        #[cfg(all(feature = "zstd", not(feature = "lz4")))]
        {
            const ALGORITHMS: &[CompressionAlgorithm] =
                &[CompressionAlgorithm::Zlib, CompressionAlgorithm::Zstd];
            ALGORITHMS
        }

        #[cfg(all(feature = "lz4", not(feature = "zstd")))]
        {
            const ALGORITHMS: &[CompressionAlgorithm] =
                &[CompressionAlgorithm::Zlib, CompressionAlgorithm::Lz4];
            ALGORITHMS
        }

        #[cfg(all(not(feature = "zstd"), not(feature = "lz4")))]
        {
            const ALGORITHMS: &[CompressionAlgorithm] = &[CompressionAlgorithm::Zlib];
            ALGORITHMS
        }
    }
}

impl Default for CompressionAlgorithm {
    fn default() -> Self {
        Self::default_algorithm()
    }
}


/// Error returned when attempting to parse an unsupported compression algorithm.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("unsupported compression algorithm: {input}")]
pub struct CompressionAlgorithmParseError {
    input: String,
}

impl CompressionAlgorithmParseError {
    /// Creates a parse error capturing the original input.
    #[must_use]
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }

    /// Returns the invalid input.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }
}

impl FromStr for CompressionAlgorithm {
    type Err = CompressionAlgorithmParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zlib" | "zlibx" => Ok(CompressionAlgorithm::Zlib),
            #[cfg(feature = "lz4")]
            "lz4" => Ok(CompressionAlgorithm::Lz4),
            #[cfg(feature = "zstd")]
            "zstd" => Ok(CompressionAlgorithm::Zstd),
            other => Err(CompressionAlgorithmParseError::new(other.to_string())),
        }
    }
}
