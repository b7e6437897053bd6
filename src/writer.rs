//! Script text generation.
//!
//! The text written here reads back into an equivalent workspace: objects
//! first, grouped by category, then `BeginMissionSequence` and the command
//! tree.

use std::fmt::Write as _;

use tracing::debug;

use crate::command::Command;
use crate::interpreter::text;
use crate::config::ConfigManager;
use crate::object::{
    default_coordinate_systems, Array, ConfiguredObject, FunctionHeader, StringVar,
    SystemParameter, Variable,
};
use crate::property::PropertyValue;
use crate::solar_system::SolarSystem;
use crate::workspace::{FunctionDefinition, Workspace};

const INDENT: &str = "   ";

/// Script text that recreates one object.
///
/// Writes `Create Type name;` followed by one assignment per writable
/// field. Variables, arrays and strings are written as plain assignments;
/// system parameters are created on use and produce no text.
///
/// ```
/// use missionscript::object::{ConfiguredObject, Variable};
///
/// let mut x = Variable::new("x");
/// x.set_real(2.5);
/// assert_eq!(x.generating_string(), "Create Variable x;\nx = 2.5;\n");
/// ```
pub fn object_text<T: ConfiguredObject + ?Sized>(object: &T) -> String {
    let any = object.as_any();
    if any.is::<SystemParameter>() {
        return String::new();
    }
    let name = object.name();
    if let Some(var) = any.downcast_ref::<Variable>() {
        let mut out = format!("Create Variable {};\n", name);
        if var.expression() != "0" {
            let _ = writeln!(out, "{} = {};", name, var.expression());
        }
        return out;
    }
    if let Some(array) = any.downcast_ref::<Array>() {
        let mut out = format!("Create Array {}[{},{}];\n", name, array.rows(), array.cols());
        if array.is_initialized() {
            let _ = writeln!(out, "{} = {};", name, array.matrix());
        }
        return out;
    }
    if let Some(string) = any.downcast_ref::<StringVar>() {
        let mut out = format!("Create String {};\n", name);
        if !string.value().is_empty() {
            let _ = writeln!(out, "{} = {};", name, text::quote(string.value()));
        }
        return out;
    }
    let mut out = format!("Create {} {};\n", object.type_name(), name);
    out.push_str(&field_text(object, None));
    out
}

/// `name.Field = value;` for every writable field, or only for the fields
/// that differ from `baseline`.
fn field_text<T: ConfiguredObject + ?Sized>(object: &T, baseline: Option<&dyn ConfiguredObject>) -> String {
    let mut out = String::new();
    for (id, def) in object.table().iter() {
        if def.read_only || def.deprecated || object.is_parameter_read_only(id) {
            continue;
        }
        let Some(value) = object.raw_value(id) else {
            continue;
        };
        let blank = match value {
            PropertyValue::Object(s) | PropertyValue::Enumeration(s) => s.is_empty(),
            PropertyValue::StringArray(items) | PropertyValue::ObjectArray(items) => items.is_empty(),
            _ => false,
        };
        if blank {
            continue;
        }
        let text = value.to_script_string();
        if let Some(base) = baseline {
            if base.raw_value(id).map(|v| v.to_script_string()).as_deref() == Some(text.as_str()) {
                continue;
            }
        }
        let _ = writeln!(out, "{}.{} = {};", object.name(), def.label, text);
    }
    out
}

/// Full script text of a workspace.
///
/// Default coordinate systems are written only when a script changed
/// them, and solar-system bodies only for the fields that differ from
/// their standard values.
pub fn script_text(workspace: &Workspace) -> String {
    let mut out = String::new();
    out.push_str(&objects_text(workspace.config(), true));
    out.push_str(&solar_system_text(workspace.solar_system()));
    let globals: Vec<&str> = workspace
        .config()
        .items()
        .filter(|o| o.is_global() && !workspace.is_default_object(o.name()))
        .map(|o| o.name())
        .collect();
    if !globals.is_empty() {
        let _ = writeln!(out, "Global {};", globals.join(" "));
    }
    out.push_str("\nBeginMissionSequence;\n");
    commands_text(&mut out, workspace.sequence().commands(), 0);
    debug!(bytes = out.len(), "script written");
    out
}

/// Script text of a function file: header, local objects, then commands.
pub fn function_text(definition: &FunctionDefinition) -> String {
    let mut out = header_text(&definition.header);
    out.push('\n');
    out.push_str(&objects_text(&definition.objects, false));
    commands_text(&mut out, definition.sequence.commands(), 0);
    out
}

fn header_text(header: &FunctionHeader) -> String {
    let inputs = header.inputs.join(", ");
    match header.outputs.len() {
        0 => format!("function {}({})", header.name, inputs),
        _ => format!(
            "function [{}] = {}({})",
            header.outputs.join(", "),
            header.name,
            inputs
        ),
    }
}

fn objects_text(store: &ConfigManager, skip_defaults: bool) -> String {
    let defaults = default_coordinate_systems();
    let mut objects: Vec<&dyn ConfiguredObject> = store
        .items()
        .filter(|o| {
            !skip_defaults
                || defaults
                    .iter()
                    .find(|d| d.name() == o.name())
                    .is_none_or(|d| d.generating_string() != o.generating_string())
        })
        .collect();
    objects.sort_by_key(|o| o.object_type().category());
    let mut out = String::new();
    let mut last = None;
    for object in objects {
        let text = object.generating_string();
        if text.is_empty() {
            continue;
        }
        let category = object.object_type().category();
        if last.is_some_and(|c| c != category) {
            out.push('\n');
        }
        last = Some(category);
        out.push_str(&text);
    }
    out
}

fn solar_system_text(solar_system: &SolarSystem) -> String {
    if !solar_system.has_changed() {
        return String::new();
    }
    let standard = SolarSystem::new();
    let mut out = String::new();
    for name in solar_system.body_names() {
        let (Some(body), Some(base)) = (solar_system.body(&name), standard.body(&name)) else {
            continue;
        };
        out.push_str(&field_text(body, Some(base as &dyn ConfiguredObject)));
    }
    if !out.is_empty() {
        out.insert(0, '\n');
    }
    out
}

fn commands_text(out: &mut String, commands: &[Command], depth: usize) {
    for command in commands {
        let indent = INDENT.repeat(depth);
        let _ = writeln!(out, "{}{}", indent, command.generating_string());
        let kind = command.kind();
        if !kind.is_container() {
            continue;
        }
        commands_text(out, command.children(), depth + 1);
        if let Some(else_children) = command.else_children() {
            let _ = writeln!(out, "{}Else;", indent);
            commands_text(out, else_children, depth + 1);
        }
        let _ = writeln!(out, "{}{};", indent, kind.end_keyword().unwrap_or("End"));
    }
}
