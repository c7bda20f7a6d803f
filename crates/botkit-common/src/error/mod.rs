//! Error types shared with user callbacks

/// Result returned by every user callback (event, command, component, timeout)
///
/// Errors are logged at the dispatch boundary and never reach the read loop.
pub type HandlerResult = anyhow::Result<()>;

/// Render an error with its full cause chain on one line
pub fn error_chain(err: &anyhow::Error) -> String {
    err.chain()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(": ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_error_chain() {
        let err = Err::<(), _>(anyhow::anyhow!("socket closed"))
            .context("sending reply")
            .unwrap_err();
        assert_eq!(error_chain(&err), "sending reply: socket closed");
    }
}
