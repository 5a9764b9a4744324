//! Tool domain traits
//!
//! Contains pure domain logic for validating invocations before dispatch.
//! The async executor port is defined in the application layer.

use super::entities::ToolInvocation;

/// Validator for tool invocations
///
/// This is a pure domain trait that validates invocations against the
/// requirements of their tool kind without any I/O.
pub trait ToolValidator {
    fn validate(&self, invocation: &ToolInvocation) -> Result<(), String>;
}

/// Default implementation: every required argument must be present and,
/// for path arguments, non-empty.
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl ToolValidator for DefaultToolValidator {
    fn validate(&self, invocation: &ToolInvocation) -> Result<(), String> {
        for name in invocation.kind.required_args() {
            match invocation.args.get(*name) {
                None => {
                    return Err(format!(
                        "Missing required parameter '{}' for tool '{}'",
                        name, invocation.kind
                    ));
                }
                Some(value) if *name == "path" && value.as_str().is_none_or(str::is_empty) => {
                    return Err(format!(
                        "Parameter 'path' for tool '{}' must be a non-empty string",
                        invocation.kind
                    ));
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::entities::ToolKind;

    #[test]
    fn test_validator_missing_required() {
        let call = ToolInvocation::new(ToolKind::WriteFile).with_arg("path", "a.py");
        let err = DefaultToolValidator.validate(&call).unwrap_err();
        assert!(err.contains("content"));
    }

    #[test]
    fn test_validator_rejects_empty_path() {
        let call = ToolInvocation::new(ToolKind::ReadFile).with_arg("path", "");
        assert!(DefaultToolValidator.validate(&call).is_err());
    }

    #[test]
    fn test_validator_accepts_complete_call() {
        let call = ToolInvocation::new(ToolKind::RunCommand).with_arg("command", "ls");
        assert!(DefaultToolValidator.validate(&call).is_ok());
        let custom = ToolInvocation::new(ToolKind::Custom("anything".into()));
        assert!(DefaultToolValidator.validate(&custom).is_ok());
    }
}
