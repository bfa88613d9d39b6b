use etl_changelog::error::EtlError;
use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt;

/// Returns whether terminal output should include backtraces.
fn should_render_backtrace() -> bool {
    matches!(
        std::env::var("RUST_BACKTRACE").as_deref(),
        Ok("1") | Ok("full")
    )
}

/// Result type for normalizer operations.
pub type NormalizerResult<T> = Result<T, NormalizerError>;

/// Captured backtrace of an error variant that does not carry one itself.
pub struct CapturedBacktrace(Backtrace);

impl CapturedBacktrace {
    fn capture() -> Self {
        Self(Backtrace::capture())
    }
}

impl fmt::Debug for CapturedBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error type for the normalizer binary.
///
/// Wraps [`EtlError`] for changelog errors and adds variants for configuration and I/O.
#[derive(Debug)]
pub enum NormalizerError {
    /// Decoding or normalization error.
    Etl(EtlError),
    /// Configuration error.
    Config(Box<dyn Error + Send + Sync>, CapturedBacktrace),
    /// I/O error.
    Io(std::io::Error, CapturedBacktrace),
}

impl NormalizerError {
    /// Returns a short category label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            NormalizerError::Etl(_) => "changelog error",
            NormalizerError::Config(_, _) => "configuration error",
            NormalizerError::Io(_, _) => "i/o error",
        }
    }

    /// Returns the backtrace for this error.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            NormalizerError::Etl(err) => err.backtrace(),
            NormalizerError::Config(_, cb) => Some(&cb.0),
            NormalizerError::Io(_, cb) => Some(&cb.0),
        }
    }

    /// Creates a configuration error from any source.
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        NormalizerError::Config(Box::new(err), CapturedBacktrace::capture())
    }

    /// Returns a user-oriented report for terminal output.
    pub fn render_report(&self) -> String {
        let mut out = String::new();
        out.push_str("normalizer failed\n");
        out.push_str(&format!("category: {}\n", self.category()));
        out.push_str(&format!("error: {}\n", self));

        // Aggregated changelog errors already list every cause in their message.
        if !matches!(self, NormalizerError::Etl(err) if err.kinds().len() > 1) {
            let mut source = Error::source(self);
            let mut idx = 1usize;
            while let Some(err) = source {
                out.push_str(&format!("cause {idx}: {err}\n"));
                source = err.source();
                idx += 1;
            }
        }

        if should_render_backtrace()
            && let Some(backtrace) = self.backtrace()
        {
            out.push_str("backtrace:\n");
            out.push_str(&backtrace.to_string());
            if !out.ends_with('\n') {
                out.push('\n');
            }
        }

        out
    }
}

impl fmt::Display for NormalizerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizerError::Etl(err) => write!(f, "{err}"),
            NormalizerError::Config(source, _) => write!(f, "configuration error: {source}"),
            NormalizerError::Io(source, _) => write!(f, "i/o error: {source}"),
        }
    }
}

impl Error for NormalizerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NormalizerError::Etl(err) => err.source(),
            NormalizerError::Config(source, _) => Some(source.as_ref()),
            NormalizerError::Io(source, _) => Some(source),
        }
    }
}

impl From<std::io::Error> for NormalizerError {
    fn from(err: std::io::Error) -> Self {
        NormalizerError::Io(err, CapturedBacktrace::capture())
    }
}

impl From<EtlError> for NormalizerError {
    fn from(err: EtlError) -> Self {
        NormalizerError::Etl(err)
    }
}
