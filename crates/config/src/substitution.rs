//! Environment-variable substitution in config files

use std::env;

use anyhow::Result;
use regex::Regex;
use tracing::{debug, warn};

/// Substitute environment variables in the format ${VAR_NAME} or $VAR_NAME
///
/// Unset variables keep their placeholder; validation rejects unresolved
/// placeholders in fields where they would be harmful.
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{(\w+)\}|\$(\w+)").expect("static pattern");
    let mut result = content.to_string();

    for caps in re.captures_iter(content) {
        let var_name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let placeholder = caps.get(0).map(|m| m.as_str()).unwrap_or_default();

        match env::var(var_name) {
            Ok(value) => {
                debug!(var = var_name, "Substituting environment variable");
                result = result.replace(placeholder, &value);
            }
            Err(_) => {
                warn!(var = var_name, "Environment variable not set");
            }
        }
    }

    Ok(result)
}

/// Check if a string contains unresolved environment variable placeholders
pub fn has_unresolved_env_vars(content: &str) -> bool {
    let re = Regex::new(r"\$\{(\w+)\}|\$(\w+)").expect("static pattern");
    re.is_match(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_braced_var() {
        env::set_var("BACKOFFICE_SUBST_TEST", "value-1");
        let result = substitute_env_vars("key: ${BACKOFFICE_SUBST_TEST}").unwrap();
        assert_eq!(result, "key: value-1");
    }

    #[test]
    fn test_unset_var_keeps_placeholder() {
        env::remove_var("BACKOFFICE_SUBST_MISSING");
        let result = substitute_env_vars("key: ${BACKOFFICE_SUBST_MISSING}").unwrap();
        assert_eq!(result, "key: ${BACKOFFICE_SUBST_MISSING}");
        assert!(has_unresolved_env_vars(&result));
    }

    #[test]
    fn test_plain_content_untouched() {
        let content = "key: plain value";
        assert_eq!(substitute_env_vars(content).unwrap(), content);
        assert!(!has_unresolved_env_vars(content));
    }
}
