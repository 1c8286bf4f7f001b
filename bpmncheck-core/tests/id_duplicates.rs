mod common;

use bpmncheck_core::checks::IdDuplicatesChecker;
use bpmncheck_core::result::ValidationResult;
use tempfile::tempdir;

const BPMN_TYPE: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";

fn head_importing(first: &str, second: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n\
<bpmn:definitions xmlns:bpmn=\"http://www.omg.org/spec/BPMN/20100524/MODEL\" targetNamespace=\"urn:head\">\n\
  <bpmn:import importType=\"{BPMN_TYPE}\" location=\"{first}\" namespace=\"urn:proc\"/>\n\
  <bpmn:import importType=\"{BPMN_TYPE}\" location=\"{second}\" namespace=\"urn:proc\"/>\n\
  <bpmn:process id=\"Process_Head\"/>\n\
</bpmn:definitions>\n"
    )
}

fn process_file(namespace: &str, defs_id: &str, body: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n\
<bpmn:definitions xmlns:bpmn=\"http://www.omg.org/spec/BPMN/20100524/MODEL\" id=\"{defs_id}\" targetNamespace=\"{namespace}\">\n\
{body}\
</bpmn:definitions>\n"
    )
}

#[test]
fn shared_ids_in_one_namespace_are_reported_in_both_files() {
    let folder = tempdir().expect("tempdir");
    common::write_file(
        folder.path(),
        "a.bpmn",
        &process_file(
            "urn:proc",
            "Defs_A",
            "  <bpmn:process id=\"Process_A\">\n    <bpmn:task id=\"Task_1\"/>\n  </bpmn:process>\n",
        ),
    );
    common::write_file(
        folder.path(),
        "b.bpmn",
        &process_file(
            "urn:proc",
            "Defs_B",
            "  <bpmn:process id=\"Process_B\">\n    <bpmn:startEvent id=\"Start_B\"/>\n    <bpmn:task id=\"Task_1\"/>\n  </bpmn:process>\n",
        ),
    );
    let head = common::write_file(
        folder.path(),
        "head.bpmn",
        &head_importing("a.bpmn", "b.bpmn"),
    );

    let mut result = ValidationResult::new();
    IdDuplicatesChecker::new().check(&head, folder.path(), &mut result);

    assert_eq!(result.violations.len(), 2);
    let first = &result.violations[0];
    let second = &result.violations[1];
    assert_eq!(first.constraint, "EXT.002");
    assert_eq!(second.constraint, "EXT.002");
    assert_eq!(first.file_name, "a.bpmn");
    assert_eq!(first.line, 4);
    assert_eq!(second.file_name, "b.bpmn");
    assert_eq!(second.line, 5);
    assert_eq!(first.location, "//bpmn:*[@id = 'Task_1'][0]");
    assert_eq!(first.message, "Files have id duplicates");
    assert_eq!(second.message, "Files have id duplicates");
}

#[test]
fn the_import_closure_is_recorded_as_checked() {
    let folder = tempdir().expect("tempdir");
    common::write_file(
        folder.path(),
        "a.bpmn",
        &process_file("urn:proc", "Defs_A", "  <bpmn:process id=\"Process_A\"/>\n"),
    );
    common::write_file(
        folder.path(),
        "b.bpmn",
        &process_file("urn:other", "Defs_B", "  <bpmn:process id=\"Process_B\"/>\n"),
    );
    let head = common::write_file(
        folder.path(),
        "head.bpmn",
        &head_importing("a.bpmn", "b.bpmn"),
    );

    let mut result = ValidationResult::new();
    IdDuplicatesChecker::new().check(&head, folder.path(), &mut result);

    assert!(result.violations.is_empty());
    assert_eq!(result.checked_files.len(), 2);
    assert!(result.checked_files[0].ends_with("a.bpmn"));
    assert!(result.checked_files[1].ends_with("b.bpmn"));
}

#[test]
fn files_without_a_target_namespace_never_collide() {
    let folder = tempdir().expect("tempdir");
    common::write_file(
        folder.path(),
        "a.bpmn",
        &process_file("", "Defs_A", "  <bpmn:process id=\"Process_Same\"/>\n"),
    );
    common::write_file(
        folder.path(),
        "b.bpmn",
        &process_file("", "Defs_B", "  <bpmn:process id=\"Process_Same\"/>\n"),
    );
    let head = common::write_file(
        folder.path(),
        "head.bpmn",
        &head_importing("a.bpmn", "b.bpmn"),
    );

    let mut result = ValidationResult::new();
    IdDuplicatesChecker::new().check(&head, folder.path(), &mut result);

    assert!(result.violations.is_empty());
}

#[test]
fn diagram_interchange_ids_are_ignored() {
    let folder = tempdir().expect("tempdir");
    let diagram_body = "  <bpmn:process id=\"Process_A\"/>\n\
  <bpmndi:BPMNDiagram xmlns:bpmndi=\"http://www.omg.org/spec/BPMN/20100524/DI\" id=\"Diagram_Same\"/>\n";
    common::write_file(
        folder.path(),
        "a.bpmn",
        &process_file("urn:proc", "Defs_A", diagram_body),
    );
    let second_body = "  <bpmn:process id=\"Process_B\"/>\n\
  <bpmndi:BPMNDiagram xmlns:bpmndi=\"http://www.omg.org/spec/BPMN/20100524/DI\" id=\"Diagram_Same\"/>\n";
    common::write_file(
        folder.path(),
        "b.bpmn",
        &process_file("urn:proc", "Defs_B", second_body),
    );
    let head = common::write_file(
        folder.path(),
        "head.bpmn",
        &head_importing("a.bpmn", "b.bpmn"),
    );

    let mut result = ValidationResult::new();
    IdDuplicatesChecker::new().check(&head, folder.path(), &mut result);

    assert!(result.violations.is_empty());
}

#[test]
fn cyclic_closures_terminate() {
    let folder = tempdir().expect("tempdir");
    let cycle = |other: &str| {
        format!(
            "<?xml version=\"1.0\"?>\n\
<bpmn:definitions xmlns:bpmn=\"http://www.omg.org/spec/BPMN/20100524/MODEL\" targetNamespace=\"urn:cycle\">\n\
  <bpmn:import importType=\"{BPMN_TYPE}\" location=\"{other}\" namespace=\"urn:cycle\"/>\n\
  <bpmn:process id=\"Process_{other}\"/>\n\
</bpmn:definitions>\n"
        )
    };
    common::write_file(folder.path(), "a.bpmn", &cycle("b.bpmn"));
    common::write_file(folder.path(), "b.bpmn", &cycle("a.bpmn"));

    let mut result = ValidationResult::new();
    IdDuplicatesChecker::new().check(&folder.path().join("a.bpmn"), folder.path(), &mut result);

    // terminates; a and b share a namespace but have distinct ids
    assert!(result.violations.is_empty());
}
