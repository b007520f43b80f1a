//! Checks the TLS certificate chains of remote hosts for upcoming expiry.
//!
//! The checker connects to each host on the HTTPS port, reads the
//! certificate chain the server presents and reports every certificate
//! that expires before a configurable warning cutoff. Hosts are checked
//! strictly one after another and a failing host never affects the rest
//! of the batch.

use chrono::{DateTime, Duration, Months, Utc};
use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::error::ErrorStack;
use openssl::ssl::{HandshakeError, Ssl, SslContext, SslMethod, SslVerifyMode};
use openssl::x509::{X509Ref, X509};
use std::fmt;
use std::io;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration as StdDuration;
use url::Url;

pub mod config;
pub mod error;

pub use error::CheckError;

/// Connect/read timeout applied when no other value is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const HTTPS_PORT: u16 = 443;

/// Warning window added to the current instant to form the expiry cutoff.
///
/// Any certificate whose `notAfter` falls before `now + threshold` is
/// reported; everything expiring later is silently skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WarningThreshold {
    pub years: u32,
    pub months: u32,
    pub days: u32,
}

impl Default for WarningThreshold {
    fn default() -> Self {
        WarningThreshold {
            years: 0,
            months: 0,
            days: 30,
        }
    }
}

impl WarningThreshold {
    /// Computes the cutoff instant for the given point in time.
    ///
    /// Years and months are added as calendar months, clamping to the end
    /// of the month the way calendar arithmetic does (Jan 31 + 1 month is
    /// Feb 28), then the days are added. Saturates at the maximum
    /// representable instant instead of overflowing.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let months = Months::new(self.years.saturating_mul(12).saturating_add(self.months));
        now.checked_add_months(months)
            .and_then(|t| t.checked_add_signed(Duration::days(i64::from(self.days))))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// How soon a reported certificate expires, relative to "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryStatus {
    /// `notAfter` is in the past
    AlreadyExpired,
    /// Less than 24 hours of validity left
    ExpiringWithinDay { hours: i64 },
    /// At least a day of validity left, but less than the warning window
    ExpiringLater { days: i64 },
}

/// A certificate from the chain that expires within the warning window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateReport {
    /// Subject common name, empty when the subject has no CN attribute
    pub common_name: String,
    /// `notAfter` of the certificate, in UTC
    pub expires_at: DateTime<Utc>,
    pub status: ExpiryStatus,
}

impl fmt::Display for CertificateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            ExpiryStatus::AlreadyExpired => {
                write!(f, "{} is already expired!", self.common_name)
            }
            ExpiryStatus::ExpiringWithinDay { hours } => {
                write!(f, "{} expires in {} hours!", self.common_name, hours)
            }
            ExpiryStatus::ExpiringLater { days } => {
                write!(f, "{} expires in roughly {} day(s).", self.common_name, days)
            }
        }
    }
}

/// Outcome of checking a single host.
///
/// When `error` is set the check stopped early. A connection-phase failure
/// leaves `certificates` empty; an unparsable subject name mid-chain keeps
/// the reports produced before the failure.
#[derive(Debug)]
pub struct HostReport {
    /// The `https://` URL the host was checked as
    pub url: String,
    pub certificates: Vec<CertificateReport>,
    pub error: Option<CheckError>,
}

/// Sequential expiry checker for a list of hosts.
pub struct HostExpiryChecker {
    threshold: WarningThreshold,
    timeout: StdDuration,
}

impl HostExpiryChecker {
    pub fn new(threshold: WarningThreshold, timeout: StdDuration) -> Self {
        HostExpiryChecker { threshold, timeout }
    }

    /// Checks one host and returns its report.
    ///
    /// Never panics and never fails the batch: every failure mode ends up
    /// in the report's `error` field. The TLS connection is closed before
    /// this function returns, on every path.
    pub fn check_host(&self, host: &str) -> HostReport {
        let url = format!("https://{}", host);
        let mut report = HostReport {
            url: url.clone(),
            certificates: Vec::new(),
            error: None,
        };

        match Url::parse(&url) {
            Ok(parsed) if parsed.host_str().is_some() => {}
            _ => {
                report.error = Some(CheckError::malformed_url(&url));
                return report;
            }
        }

        let chain = match self.fetch_chain(host, &url) {
            Ok(chain) => chain,
            Err(err) => {
                report.error = Some(err);
                return report;
            }
        };

        let now = Utc::now();
        let cutoff = self.threshold.cutoff(now);
        for cert in &chain {
            match evaluate_certificate(cert, &url, now, cutoff) {
                Ok(Some(cert_report)) => report.certificates.push(cert_report),
                Ok(None) => {}
                Err(err) => {
                    report.error = Some(err);
                    break;
                }
            }
        }
        report
    }

    /// Connects, handshakes and copies out the chain the peer presented.
    ///
    /// Peer verification is deliberately left off: the point is to inspect
    /// whatever the server sends, and an already-expired certificate must
    /// still be reported rather than failing the handshake.
    fn fetch_chain(&self, host: &str, url: &str) -> Result<Vec<X509>, CheckError> {
        let mut context = SslContext::builder(SslMethod::tls())
            .map_err(|e| CheckError::io(url, stack_io(e)))?;
        context.set_verify(SslVerifyMode::empty());
        let context = context.build();

        let mut ssl = Ssl::new(&context).map_err(|e| CheckError::io(url, stack_io(e)))?;
        ssl.set_hostname(host)
            .map_err(|e| CheckError::io(url, stack_io(e)))?;

        let mut addresses = (host, HTTPS_PORT)
            .to_socket_addrs()
            .map_err(|e| CheckError::io(url, e))?;
        let address = addresses.next().ok_or_else(|| {
            CheckError::io(
                url,
                io::Error::new(io::ErrorKind::Other, "no addresses resolved"),
            )
        })?;

        let tcp_stream = TcpStream::connect_timeout(&address, self.timeout)
            .map_err(|e| connect_error(url, e))?;
        tcp_stream
            .set_read_timeout(Some(self.timeout))
            .map_err(|e| CheckError::io(url, e))?;
        tcp_stream
            .set_write_timeout(Some(self.timeout))
            .map_err(|e| CheckError::io(url, e))?;

        let stream = ssl
            .connect(tcp_stream)
            .map_err(|e| handshake_error(url, e))?;

        let chain = stream
            .ssl()
            .peer_cert_chain()
            .ok_or_else(|| CheckError::peer_unverified(url))?;

        // Copy the chain out so the connection can be dropped here.
        Ok(chain.iter().map(X509Ref::to_owned).collect())
    }
}

fn connect_error(url: &str, err: io::Error) -> CheckError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => CheckError::timed_out(url),
        _ => CheckError::io(url, err),
    }
}

fn handshake_error(url: &str, err: HandshakeError<TcpStream>) -> CheckError {
    // A read timeout during the handshake surfaces as an I/O error inside
    // the handshake failure.
    if let HandshakeError::Failure(mid) = &err {
        if let Some(io_err) = mid.error().io_error() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
            ) {
                return CheckError::timed_out(url);
            }
        }
    }
    CheckError::io(
        url,
        io::Error::new(io::ErrorKind::Other, err.to_string()),
    )
}

fn stack_io(err: ErrorStack) -> io::Error {
    io::Error::new(io::ErrorKind::Other, err)
}

/// Evaluates one certificate against the warning cutoff.
///
/// Returns `Ok(None)` for certificates that are still valid at the cutoff.
/// The subject name is only parsed for certificates that get reported,
/// matching the cost profile of the check (most chains produce no output).
fn evaluate_certificate(
    cert: &X509Ref,
    url: &str,
    now: DateTime<Utc>,
    cutoff: DateTime<Utc>,
) -> Result<Option<CertificateReport>, CheckError> {
    let expires_at =
        asn1_to_utc(cert.not_after()).map_err(|e| CheckError::io(url, stack_io(e)))?;

    let status = match classify(expires_at, now, cutoff) {
        Some(status) => status,
        None => return Ok(None),
    };

    let entries = subject_entries(cert)
        .map_err(|_| CheckError::invalid_distinguished_name(url))?;

    Ok(Some(CertificateReport {
        common_name: common_name(&entries),
        expires_at,
        status,
    }))
}

/// Classifies a certificate's expiry relative to `now` and `cutoff`.
///
/// Certificates expiring at or after the cutoff are not reported at all.
/// The already-expired check comes before any division so a non-positive
/// remainder never reaches the hour/day arithmetic.
fn classify(
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
    cutoff: DateTime<Utc>,
) -> Option<ExpiryStatus> {
    if expires_at >= cutoff {
        return None;
    }

    let remaining = expires_at - now;
    if remaining <= Duration::zero() {
        Some(ExpiryStatus::AlreadyExpired)
    } else if remaining < Duration::days(1) {
        Some(ExpiryStatus::ExpiringWithinDay {
            hours: remaining.num_hours(),
        })
    } else {
        Some(ExpiryStatus::ExpiringLater {
            days: remaining.num_days(),
        })
    }
}

/// Walks a certificate's subject name into ordered (type, value) pairs.
fn subject_entries(cert: &X509Ref) -> Result<Vec<(String, String)>, ErrorStack> {
    let mut entries = Vec::new();
    for entry in cert.subject_name().entries() {
        let key = entry.object().nid().short_name()?.to_string();
        let value = entry.data().as_utf8()?.to_string();
        entries.push((key, value));
    }
    Ok(entries)
}

/// First value whose type is `CN`, case-insensitively; empty when absent.
fn common_name(entries: &[(String, String)]) -> String {
    entries
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case("CN"))
        .map(|(_, value)| value.clone())
        .unwrap_or_default()
}

fn asn1_to_utc(time: &Asn1TimeRef) -> Result<DateTime<Utc>, ErrorStack> {
    let epoch = Asn1Time::from_unix(0)?;
    let diff = epoch.diff(time)?;
    let secs = i64::from(diff.days) * 86_400 + i64::from(diff.secs);
    Ok(DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::MAX_UTC))
}
