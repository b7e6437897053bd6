//! Script-defined and externally executed functions.

use super::{ConfiguredObject, ObjectType, TableObject, TypeSpec};
use crate::error::{Result, ScriptError};
use crate::interpreter::text;
use crate::property::{PropertyDef, PropertyTable};

static FUNCTION_TABLE: PropertyTable = PropertyTable {
    type_name: "Function",
    parent: None,
    properties: &[PropertyDef::filename("FunctionPath", "")],
    aliases: &[],
};

/// Function whose body is a mission script.
pub static GMAT_FUNCTION: TypeSpec = TypeSpec {
    validate: Some(validate_path),
    ..TypeSpec::plain(ObjectType::GmatFunction, &FUNCTION_TABLE)
};

/// Function executed by an external engine.
pub static MATLAB_FUNCTION: TypeSpec = TypeSpec::plain(ObjectType::MatlabFunction, &FUNCTION_TABLE);

fn validate_path(function: &TableObject) -> Vec<String> {
    let path = function.text_of("FunctionPath");
    if path.is_empty() || path.ends_with(".gmf") || path.ends_with(".m") || path.ends_with('/') {
        Vec::new()
    } else {
        vec![format!(
            "The function path \"{}\" of \"{}\" is not a function file or directory",
            path,
            function.name()
        )]
    }
}

/// The `function [out1, out2] = name(in1, in2)` line that opens a
/// function file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FunctionHeader {
    /// Function name.
    pub name: String,
    /// Input argument names.
    pub inputs: Vec<String>,
    /// Output argument names.
    pub outputs: Vec<String>,
}

impl FunctionHeader {
    /// Parse a header line.
    ///
    /// # Examples
    ///
    /// ```
    /// use missionscript::object::FunctionHeader;
    ///
    /// let header = FunctionHeader::parse("function [dv, t] = Transfer(sat, r)").unwrap();
    /// assert_eq!(header.name, "Transfer");
    /// assert_eq!(header.inputs, vec!["sat", "r"]);
    /// assert_eq!(header.outputs, vec!["dv", "t"]);
    /// ```
    pub fn parse(line: &str) -> Result<Self> {
        let (keyword, rest) = text::split_first_word(line);
        if keyword != "function" {
            return Err(ScriptError::Function(format!(
                "A function file must start with \"function\", found \"{}\"",
                line.trim()
            )));
        }
        text::check_brackets(rest).map_err(ScriptError::Syntax)?;
        let (outputs, call) = match text::split_assignment(rest) {
            Some((lhs, rhs)) => (argument_list(lhs)?, rhs),
            None => (Vec::new(), rest),
        };
        let (name, inputs) = match text::split_call(call) {
            Some((name, args)) => (name, argument_list(args)?),
            None => (call.trim(), Vec::new()),
        };
        if !text::is_valid_name(name) {
            return Err(ScriptError::Function(format!(
                "\"{}\" is not a valid function name",
                name
            )));
        }
        Ok(Self {
            name: name.to_string(),
            inputs,
            outputs,
        })
    }
}

fn argument_list(raw: &str) -> Result<Vec<String>> {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .unwrap_or(trimmed);
    let names = text::split_list(inner);
    if let Some(bad) = names.iter().find(|n| !text::is_valid_name(n)) {
        return Err(ScriptError::Function(format!(
            "\"{}\" is not a valid argument name",
            bad
        )));
    }
    for (i, name) in names.iter().enumerate() {
        if names[..i].contains(name) {
            return Err(ScriptError::Function(format!(
                "The argument \"{}\" appears more than once",
                name
            )));
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_without_outputs() {
        let header = FunctionHeader::parse("function Report(sat)").expect("header");
        assert_eq!(header.name, "Report");
        assert!(header.outputs.is_empty());
    }

    #[test]
    fn test_header_single_output() {
        let header = FunctionHeader::parse("function r = Radius(sat)").expect("header");
        assert_eq!(header.outputs, vec!["r"]);
    }

    #[test]
    fn test_header_errors() {
        assert!(FunctionHeader::parse("Create Spacecraft Sat1").is_err());
        assert!(FunctionHeader::parse("function [a, a] = F(x)").is_err());
        assert!(FunctionHeader::parse("function [a = F(x)").is_err());
    }

    #[test]
    fn test_function_path_extension() {
        let mut f = GMAT_FUNCTION.instantiate("F");
        let id = f.parameter_id("FunctionPath").expect("field").id;
        f.set_text(id, "'lib/F.gmf'").expect("path");
        assert!(f.validate().is_empty());
        f.set_text(id, "'lib/F.txt'").expect("path");
        assert_eq!(f.validate().len(), 1);
    }
}
