//! Report files.

use super::{ConfiguredObject, ObjectType, TableObject, TypeSpec};
use crate::property::{Bound, PropertyDef, PropertyTable, PropertyValue};

static REPORT_FILE_TABLE: PropertyTable = PropertyTable {
    type_name: "ReportFile",
    parent: None,
    properties: &[
        PropertyDef::filename("Filename", "ReportFile1.txt"),
        PropertyDef::integer("Precision", 16).bounded(Bound::Positive),
        PropertyDef::string_array("Add", &[]),
        PropertyDef::boolean("WriteHeaders", true),
        PropertyDef::on_off("LeftJustify", true),
        PropertyDef::on_off("ZeroFill", false),
        PropertyDef::integer("ColumnWidth", 23).bounded(Bound::Positive),
        PropertyDef::boolean("WriteReport", true),
        PropertyDef::enumeration("SolverIterations", "Current", &["All", "Current", "None"]),
    ],
    aliases: &[],
};

/// Report file.
pub static REPORT_FILE: TypeSpec = TypeSpec {
    validate: Some(validate_report),
    ..TypeSpec::plain(ObjectType::ReportFile, &REPORT_FILE_TABLE)
};

fn validate_report(report: &TableObject) -> Vec<String> {
    let mut problems = Vec::new();
    if report.text_of("Filename").trim().is_empty() {
        problems.push(format!("Report \"{}\" has no file name", report.name()));
    }
    if let Some(PropertyValue::StringArray(items)) = report.value_of("Add") {
        for (i, item) in items.iter().enumerate() {
            if items[..i].contains(item) {
                problems.push(format!(
                    "\"{}\" is added more than once to report \"{}\"",
                    item,
                    report.name()
                ));
            }
        }
    }
    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_list_keeps_parameter_chains() {
        let mut report = REPORT_FILE.instantiate("RF");
        let id = report.parameter_id("Add").expect("field").id;
        report
            .set_text(id, "{Sat1.X, Sat1.Earth.ECC}")
            .expect("list");
        assert_eq!(
            report.value_of("Add"),
            Some(&PropertyValue::StringArray(vec![
                "Sat1.X".to_string(),
                "Sat1.Earth.ECC".to_string()
            ]))
        );
        assert!(report.rename_reference("Sat1", "Sat9"));
        assert_eq!(report.value_of("Add").map(|v| v.to_script_string()).as_deref(), Some("{'Sat9.X', 'Sat9.Earth.ECC'}"));
    }

    #[test]
    fn test_duplicate_columns() {
        let mut report = REPORT_FILE.instantiate("RF");
        let id = report.parameter_id("Add").expect("field").id;
        report.set_text(id, "{Sat1.X, Sat1.X}").expect("list");
        assert_eq!(report.validate().len(), 1);
    }
}
