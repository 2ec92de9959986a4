use crate::OdxError;

/// Strict or lenient handling of errors, plus the warnings collected in lenient mode
///
/// Every build, resolve and encode operation receives its own `ErrorLog`. In strict
/// mode `error_or_log` hands the error back so that it can be propagated with `?`.
/// In lenient mode the error is recorded and the operation continues with a
/// best-effort result.
#[derive(Debug, Default)]
pub struct ErrorLog {
    strict: bool,
    log_msgs: Vec<OdxError>,
}

impl ErrorLog {
    pub fn new(strict: bool) -> Self {
        Self {
            strict,
            log_msgs: Vec::new(),
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn log_warning(&mut self, err: OdxError) {
        tracing::warn!("{err}");
        self.log_msgs.push(err);
    }

    pub fn error_or_log(&mut self, err: OdxError) -> Result<(), OdxError> {
        if self.strict {
            Err(err)
        } else {
            self.log_warning(err);
            Ok(())
        }
    }

    /// the warnings collected so far
    pub fn messages(&self) -> &[OdxError] {
        &self.log_msgs
    }

    pub fn into_messages(self) -> Vec<OdxError> {
        self.log_msgs
    }
}
