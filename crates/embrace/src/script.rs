//! Embedded-script capability.
//!
//! The `script` directive hands its inner content to an injected
//! [`ScriptRunner`] and splices whatever text comes back. The engine never
//! interprets the fragment itself; the runner is trusted input.

use crate::error::Error;

/// Executes an opaque script fragment and returns its rendered text.
///
/// A blanket implementation exists for closures:
///
/// ```rust
/// use embrace::{Error, ScriptRunner};
///
/// let runner = |source: &str| -> Result<String, Error> {
///     Ok(source.to_uppercase())
/// };
/// assert_eq!(runner.run("abc").unwrap(), "ABC");
/// ```
pub trait ScriptRunner {
    /// Runs the fragment, returning the text to splice into the output.
    fn run(&self, source: &str) -> Result<String, Error>;
}

impl<F> ScriptRunner for F
where
    F: Fn(&str) -> Result<String, Error>,
{
    fn run(&self, source: &str) -> Result<String, Error> {
        (self)(source)
    }
}

/// Default runner: fails every `script` directive.
///
/// Engines that never see script tags can keep this; anything else must
/// inject a real runner.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScriptRunner;

impl ScriptRunner for NoScriptRunner {
    fn run(&self, _source: &str) -> Result<String, Error> {
        Err(Error::Script("no script runner configured".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_runner() {
        let runner = |source: &str| Ok(format!("<{}>", source));
        assert_eq!(runner.run("x").unwrap(), "<x>");
    }

    #[test]
    fn no_runner_fails() {
        let err = NoScriptRunner.run("anything").unwrap_err();
        assert!(matches!(err, Error::Script(_)));
    }
}
