//! Resolve the float's WMO code from the positional argument.
//!
//! The argument is either the code itself or a small Python settings file
//! that assigns it, e.g.
//!
//! ```text
//! FLOAT_ID = 3902585
//! ARGO_CODES = [3902585, 6903002]   # first element used
//! ```

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Names looked up in a settings file, in priority order.
const SETTINGS_KEYS: &[&str] = &["FLOAT_ID", "ARGO_CODE", "ARGO_CODES"];

pub fn resolve_float_code(arg: &str) -> Result<u64> {
    if let Ok(code) = arg.trim().parse::<u64>() {
        log::info!("Code read from the command line: {code}");
        return Ok(code);
    }

    let path = Path::new(arg);
    if arg.ends_with(".py") && path.is_file() {
        log::info!("Reading code from settings file: {arg}");
        let text = std::fs::read_to_string(path).with_context(|| format!("reading {arg}"))?;
        let assignments = top_level_assignments(&text);

        for key in SETTINGS_KEYS {
            let Some(rhs) = assignments.get(key) else {
                continue;
            };
            let code = if *key == "ARGO_CODES" {
                first_list_element(rhs).and_then(parse_code)
            } else {
                parse_code(rhs)
            };
            if let Some(code) = code {
                log::info!("Using {key} from {arg}: {code}");
                return Ok(code);
            }
        }
        bail!("{arg} does not define a usable FLOAT_ID, ARGO_CODE or ARGO_CODES");
    }

    bail!("Invalid argument: {arg}. Expected an integer WMO code or an existing .py file")
}

/// `NAME = value` lines at column zero, comments stripped. Later
/// assignments replace earlier ones.
fn top_level_assignments(text: &str) -> HashMap<String, String> {
    text.lines()
        .filter(|line| !line.starts_with(char::is_whitespace))
        .filter_map(|line| {
            let line = line.split('#').next().unwrap_or_default();
            let (name, value) = line.split_once('=')?;
            let name = name.trim();
            let value = value.trim();
            if name.is_empty()
                || value.is_empty()
                || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
            {
                return None;
            }
            Some((name.to_string(), value.to_string()))
        })
        .collect()
}

/// A bare or quoted integer literal.
fn parse_code(value: &str) -> Option<u64> {
    value
        .trim()
        .trim_matches(|c| c == '"' || c == '\'')
        .parse()
        .ok()
}

fn first_list_element(value: &str) -> Option<&str> {
    let inner = value
        .trim()
        .strip_prefix(['[', '('])?
        .trim_end()
        .strip_suffix([']', ')'])?;
    inner.split(',').map(str::trim).find(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn settings(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".py").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn resolve(file: &tempfile::NamedTempFile) -> Result<u64> {
        resolve_float_code(file.path().to_str().unwrap())
    }

    #[test]
    fn test_plain_integer() {
        assert_eq!(resolve_float_code("3902585").unwrap(), 3902585);
        assert_eq!(resolve_float_code(" 6903002 ").unwrap(), 6903002);
    }

    #[test]
    fn test_float_id_has_priority() {
        let f = settings("ARGO_CODES = [1, 2]\nARGO_CODE = 3\nFLOAT_ID = 3902585\n");
        assert_eq!(resolve(&f).unwrap(), 3902585);
    }

    #[test]
    fn test_argo_code() {
        let f = settings("# float off Callao\nARGO_CODE = 6903002  # main float\n");
        assert_eq!(resolve(&f).unwrap(), 6903002);
    }

    #[test]
    fn test_first_of_argo_codes() {
        let f = settings("ARGO_CODES = [3902585, 6903002]\n");
        assert_eq!(resolve(&f).unwrap(), 3902585);
        let f = settings("ARGO_CODES = ('6903002',)\n");
        assert_eq!(resolve(&f).unwrap(), 6903002);
    }

    #[test]
    fn test_empty_list_is_unusable() {
        let f = settings("ARGO_CODES = []\n");
        let err = resolve(&f).unwrap_err();
        assert!(err.to_string().contains("does not define"), "got: {err}");
    }

    #[test]
    fn test_indented_assignment_ignored() {
        let f = settings("def f():\n    FLOAT_ID = 1\n");
        assert!(resolve(&f).is_err());
    }

    #[test]
    fn test_not_a_code_nor_a_file() {
        let err = resolve_float_code("callao").unwrap_err();
        assert!(err.to_string().starts_with("Invalid argument: callao"), "got: {err}");
        assert!(resolve_float_code("missing_settings.py").is_err());
    }
}
