mod common;

use bpmncheck_core::locate::XmlLocator;
use bpmncheck_core::merge::{
    resolve_synthetic, LocalizationError, NamespaceTable, PreProcessor,
};
use tempfile::tempdir;

const BPMN_TYPE: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";

#[test]
fn imported_content_is_spliced_into_the_head_scope() {
    let folder = tempdir().expect("tempdir");
    common::write_file(
        folder.path(),
        "a.bpmn",
        "<?xml version=\"1.0\"?>\n\
<bpmn:definitions xmlns:bpmn=\"http://www.omg.org/spec/BPMN/20100524/MODEL\" id=\"Defs_A\" targetNamespace=\"urn:a\">\n\
  <bpmn:process id=\"Process_A\">\n\
    <bpmn:task id=\"Task_A\"/>\n\
  </bpmn:process>\n\
</bpmn:definitions>\n",
    );
    let head = common::write_file(
        folder.path(),
        "head.bpmn",
        &format!(
            "<?xml version=\"1.0\"?>\n\
<bpmn:definitions xmlns:bpmn=\"http://www.omg.org/spec/BPMN/20100524/MODEL\" xmlns:imp=\"urn:a\" targetNamespace=\"urn:head\">\n\
  <bpmn:import importType=\"{BPMN_TYPE}\" location=\"a.bpmn\" namespace=\"urn:a\"/>\n\
  <bpmn:process id=\"Process_Head\">\n\
    <bpmn:callActivity id=\"Call_1\" calledElement=\"imp:Task_A\"/>\n\
  </bpmn:process>\n\
</bpmn:definitions>\n"
        ),
    );

    let preprocessed = PreProcessor::new()
        .preprocess(&head, folder.path())
        .expect("preprocess");

    assert_eq!(preprocessed.namespace_table.token_for("urn:a"), Some("ns0"));
    assert_eq!(
        preprocessed.namespace_table.namespace_for("ns0"),
        Some("urn:a")
    );

    let merged = &preprocessed.merged_xml;
    // imported ids moved into the synthetic id space
    assert!(merged.contains("id=\"ns0_Process_A\""));
    assert!(merged.contains("id=\"ns0_Task_A\""));
    // the head's qualified reference follows them
    assert!(merged.contains("calledElement=\"ns0_Task_A\""));
    // head content keeps its own ids
    assert!(merged.contains("id=\"Process_Head\""));
}

#[test]
fn transitive_imports_get_their_own_tokens() {
    let folder = tempdir().expect("tempdir");
    common::write_file(
        folder.path(),
        "b.bpmn",
        "<?xml version=\"1.0\"?>\n\
<bpmn:definitions xmlns:bpmn=\"http://www.omg.org/spec/BPMN/20100524/MODEL\" targetNamespace=\"urn:b\">\n\
  <bpmn:process id=\"Process_B\"/>\n\
</bpmn:definitions>\n",
    );
    common::write_file(
        folder.path(),
        "a.bpmn",
        &format!(
            "<?xml version=\"1.0\"?>\n\
<bpmn:definitions xmlns:bpmn=\"http://www.omg.org/spec/BPMN/20100524/MODEL\" targetNamespace=\"urn:a\">\n\
  <bpmn:import importType=\"{BPMN_TYPE}\" location=\"b.bpmn\" namespace=\"urn:b\"/>\n\
  <bpmn:process id=\"Process_A\"/>\n\
</bpmn:definitions>\n"
        ),
    );
    let head = common::write_file(
        folder.path(),
        "head.bpmn",
        &format!(
            "<?xml version=\"1.0\"?>\n\
<bpmn:definitions xmlns:bpmn=\"http://www.omg.org/spec/BPMN/20100524/MODEL\" targetNamespace=\"urn:head\">\n\
  <bpmn:import importType=\"{BPMN_TYPE}\" location=\"a.bpmn\" namespace=\"urn:a\"/>\n\
  <bpmn:process id=\"Process_Head\"/>\n\
</bpmn:definitions>\n"
        ),
    );

    let preprocessed = PreProcessor::new()
        .preprocess(&head, folder.path())
        .expect("preprocess");

    assert_eq!(preprocessed.namespace_table.len(), 2);
    assert_eq!(preprocessed.namespace_table.token_for("urn:a"), Some("ns0"));
    assert_eq!(preprocessed.namespace_table.token_for("urn:b"), Some("ns1"));
    assert!(preprocessed.merged_xml.contains("id=\"ns0_Process_A\""));
    assert!(preprocessed.merged_xml.contains("id=\"ns1_Process_B\""));
}

#[test]
fn synthetic_ids_reverse_map_to_file_and_line() {
    let folder = tempdir().expect("tempdir");
    let file = common::write_file(
        folder.path(),
        "x.bpmn",
        "<?xml version=\"1.0\"?>\n\
<bpmn:definitions xmlns:bpmn=\"http://www.omg.org/spec/BPMN/20100524/MODEL\"\n\
    id=\"Defs_X\"\n\
    targetNamespace=\"http://ns/x\">\n\
  <bpmn:process id=\"Process_X\">\n\
    <bpmn:startEvent id=\"Start_X\"/>\n\
    <bpmn:sequenceFlow id=\"Flow_1\" sourceRef=\"Start_X\" targetRef=\"Task_P\"/>\n\
    <bpmn:task id=\"Task_P\"/>\n\
    <bpmn:sequenceFlow id=\"Flow_2\" sourceRef=\"Task_P\" targetRef=\"Gate_X\"/>\n\
    <bpmn:exclusiveGateway id=\"Gate_X\"/>\n\
    <bpmn:sequenceFlow id=\"Flow_3\" sourceRef=\"Gate_X\" targetRef=\"Task_Q\"/>\n\
    <bpmn:task id=\"Task_Q\"/>\n\
    <bpmn:sequenceFlow id=\"Flow_4\" sourceRef=\"Task_Q\" targetRef=\"A1\"/>\n\
    <bpmn:task id=\"Task_R\"/>\n\
    <bpmn:sequenceFlow id=\"Flow_5\" sourceRef=\"Task_R\" targetRef=\"End_X\"/>\n\
    <bpmn:task id=\"A1\"/>\n\
    <bpmn:endEvent id=\"End_X\"/>\n\
  </bpmn:process>\n\
</bpmn:definitions>\n",
    );

    let mut table = NamespaceTable::new();
    assert!(table.insert("http://ns/x", "P7"));
    let checked_files = vec![file.to_string_lossy().into_owned()];

    let resolved = resolve_synthetic(&XmlLocator::new(), "P7_A1", &checked_files, &table)
        .expect("resolve synthetic id");

    assert_eq!(resolved.file_name, "x.bpmn");
    assert_eq!(resolved.line, 16);
    assert_eq!(resolved.expression, "//bpmn:*[@id = 'A1'][0]");
}

#[test]
fn localization_failures_are_typed() {
    let folder = tempdir().expect("tempdir");
    let file = common::write_file(
        folder.path(),
        "x.bpmn",
        "<?xml version=\"1.0\"?>\n\
<bpmn:definitions xmlns:bpmn=\"http://www.omg.org/spec/BPMN/20100524/MODEL\" targetNamespace=\"urn:x\">\n\
  <bpmn:process id=\"Process_X\"/>\n\
</bpmn:definitions>\n",
    );
    let checked_files = vec![file.to_string_lossy().into_owned()];
    let mut table = NamespaceTable::new();
    table.insert("urn:x", "ns0");
    let locator = XmlLocator::new();

    assert_eq!(
        resolve_synthetic(&locator, "plainid", &checked_files, &table),
        Err(LocalizationError::MissingSeparator)
    );
    assert_eq!(
        resolve_synthetic(&locator, "zz_Process_X", &checked_files, &table),
        Err(LocalizationError::UnknownToken)
    );
    assert_eq!(
        resolve_synthetic(&locator, "ns0_NoSuchId", &checked_files, &table),
        Err(LocalizationError::ElementNotFound)
    );
}
