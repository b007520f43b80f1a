//! Error types for per-host certificate checks.
//!
//! Every failure mode is scoped to a single host: the caller reports it on
//! stderr and moves on to the next host. The `Display` implementations are
//! the exact lines written to stderr, so they carry the `https://` URL of
//! the host that failed.

use std::fmt;
use std::io;

/// Failure of a single host's certificate check.
#[derive(Debug)]
pub enum CheckError {
    /// The hostname could not be turned into a valid `https://` URL
    MalformedUrl {
        /// The URL that failed to parse
        url: String,
    },

    /// Connecting, handshaking or reading timed out
    Timeout {
        /// URL of the host that timed out
        url: String,
    },

    /// DNS resolution, TCP connect or TLS handshake failed
    Io {
        /// URL of the host that failed
        url: String,
        /// The underlying I/O error
        source: io::Error,
    },

    /// The handshake produced no peer certificate chain
    PeerUnverified {
        /// URL of the unverified peer
        url: String,
    },

    /// A certificate's subject name could not be parsed
    InvalidDistinguishedName {
        /// URL of the host that presented the certificate
        url: String,
    },
}

impl CheckError {
    pub(crate) fn malformed_url(url: &str) -> Self {
        Self::MalformedUrl {
            url: url.to_string(),
        }
    }

    pub(crate) fn timed_out(url: &str) -> Self {
        Self::Timeout {
            url: url.to_string(),
        }
    }

    pub(crate) fn io(url: &str, source: io::Error) -> Self {
        Self::Io {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn peer_unverified(url: &str) -> Self {
        Self::PeerUnverified {
            url: url.to_string(),
        }
    }

    pub(crate) fn invalid_distinguished_name(url: &str) -> Self {
        Self::InvalidDistinguishedName {
            url: url.to_string(),
        }
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedUrl { url } => {
                write!(f, "Malformed URL '{}'.", url)
            }
            Self::Timeout { url } => {
                write!(f, "Connection to '{}' timed out.", url)
            }
            Self::Io { url, .. } => {
                write!(f, "IO error on '{}'.", url)
            }
            Self::PeerUnverified { url } => {
                write!(f, "Peer is not verified on '{}'.", url)
            }
            Self::InvalidDistinguishedName { url } => {
                write!(f, "Invalid distinguished name on '{}'.", url)
            }
        }
    }
}

impl std::error::Error for CheckError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}
