//! End-to-end lineage collection over a YAML job repository

use std::fs;
use std::path::Path;

use job_lineage::commands::search::render_json;
use job_lineage::graph::LineageGraph;
use job_lineage::repository::{JobRepository, YamlJobRepository};
use job_lineage::validators::validate_jobs_directory;
use job_lineage::{ExtractionPolicy, LineageCollector};
use pretty_assertions::assert_eq;
use tempfile::{tempdir, TempDir};

const LOAD_ORDERS_V1: &str = r#"
context:
  - name: schema
    value: SALES
components:
  - componentName: tDBInput
    parameters:
      - name: UNIQUE_NAME
        field: TEXT
        value: tDBInput_1
      - name: QUERY
        field: MEMO_SQL
        value: SELECT * FROM old_orders
"#;

const LOAD_ORDERS_V2: &str = r#"
context:
  - name: schema
    value: SALES
components:
  - componentName: tDBInput
    parameters:
      - name: UNIQUE_NAME
        field: TEXT
        value: tDBInput_1
      - name: QUERY
        field: MEMO_SQL
        value: '"SELECT o.id, dwh.fn_rate(o.amount) FROM " + context.schema + ".orders o JOIN customers c ON o.cid = c.id"'
  - componentName: tMysqlOutput
    parameters:
      - name: UNIQUE_NAME
        field: TEXT
        value: tMysqlOutput_1
      - name: TABLE
        field: DBTABLE
        value: '"FACT_ORDERS"'
      - name: SCHEMA_DB
        field: TEXT
        value: context.schema
  - componentName: tLogRow
    parameters:
      - name: UNIQUE_NAME
        field: TEXT
        value: tLogRow_1
"#;

const BROKEN_SQL: &str = r#"
components:
  - componentName: tDBRow
    parameters:
      - name: UNIQUE_NAME
        field: TEXT
        value: tDBRow_1
      - name: QUERY
        field: MEMO_SQL
        value: "SELECT * FROM legacy_t t WHERE t.id = (("
"#;

const UNRESOLVED: &str = r#"
components:
  - componentName: tDBInput
    parameters:
      - name: UNIQUE_NAME
        field: TEXT
        value: tDBInput_1
      - name: QUERY
        field: MEMO_SQL
        value: SELECT * FROM stage_customers
  - componentName: tDBInput
    parameters:
      - name: UNIQUE_NAME
        field: TEXT
        value: tDBInput_2
      - name: QUERY
        field: MEMO_SQL
        value: '"SELECT * FROM " + context.missing'
"#;

fn write_job(dir: &Path, file_name: &str, content: &str) {
    fs::write(dir.join(file_name), content).unwrap();
}

fn sample_repository() -> TempDir {
    let temp_dir = tempdir().unwrap();
    let process = temp_dir.path().join("process");
    fs::create_dir_all(&process).unwrap();

    write_job(&process, "load_orders_0.1.item.yaml", LOAD_ORDERS_V1);
    write_job(&process, "load_orders_0.2.item.yaml", LOAD_ORDERS_V2);
    write_job(&process, "legacy_1.0.item.yaml", BROKEN_SQL);
    write_job(&process, "stage_1.0.item.yaml", UNRESOLVED);
    write_job(&process, "notes.txt", "not a job");
    temp_dir
}

fn strings<'a>(items: impl IntoIterator<Item = &'a String>) -> Vec<&'a str> {
    items.into_iter().map(String::as_str).collect()
}

#[test]
fn test_search_latest_versions() {
    let temp_dir = sample_repository();
    let mut collector = LineageCollector::new(YamlJobRepository::new(temp_dir.path()));

    let stats = collector.search(".*", true).unwrap();
    assert_eq!(stats.jobs_found, 3);
    assert_eq!(stats.jobs_failed, 1);

    let result = collector.result();
    let names: Vec<String> = result.jobs().iter().map(|job| job.to_string()).collect();
    assert_eq!(names, vec!["legacy_1.0", "load_orders_0.2", "stage_1.0"]);

    let load_orders = result
        .jobs()
        .into_iter()
        .find(|job| job.name == "load_orders")
        .unwrap()
        .clone();
    assert_eq!(
        strings(&result.input_tables()[&load_orders]),
        vec!["SALES.orders", "customers"]
    );
    assert_eq!(
        strings(&result.output_tables()[&load_orders]),
        vec!["SALES.FACT_ORDERS"]
    );
    assert_eq!(
        strings(&result.functions()[&load_orders]),
        vec!["dwh.fn_rate(1)"]
    );
}

#[test]
fn test_pattern_fallback_and_partial_job() {
    let temp_dir = sample_repository();
    let mut collector = LineageCollector::new(YamlJobRepository::new(temp_dir.path()));
    collector.search("legacy|stage", true).unwrap();

    let per_component = collector.input_tables_per_component();
    assert_eq!(strings(&per_component["legacy"]["tDBRow_1"]), vec!["legacy_t"]);
    assert_eq!(
        strings(&per_component["stage"]["tDBInput_1"]),
        vec!["stage_customers"]
    );
    assert!(!per_component["stage"].contains_key("tDBInput_2"));
}

#[test]
fn test_grammar_only_drops_unparsable_sql() {
    let temp_dir = sample_repository();
    let mut collector = LineageCollector::new(YamlJobRepository::new(temp_dir.path()))
        .with_policy(ExtractionPolicy::GrammarOnly);
    let stats = collector.search("legacy", true).unwrap();

    assert_eq!(stats.jobs_failed, 0);
    assert!(collector.input_tables().is_empty());
}

#[test]
fn test_all_versions_are_listed() {
    let temp_dir = sample_repository();
    let repository = YamlJobRepository::new(temp_dir.path());

    let versions: Vec<String> = repository
        .list_jobs("load_orders", false)
        .unwrap()
        .iter()
        .map(|job| job.version.clone())
        .collect();
    assert_eq!(versions, vec!["0.1", "0.2"]);
}

#[test]
fn test_graph_and_json_report() {
    let temp_dir = sample_repository();
    let mut collector = LineageCollector::new(YamlJobRepository::new(temp_dir.path()));
    let stats = collector.search("load_orders", true).unwrap();
    let result = collector.into_result();

    let graph = LineageGraph::from_result(&result);
    assert_eq!(graph.readers_of("customers"), vec!["load_orders_0.2"]);
    assert_eq!(graph.writers_of("SALES.FACT_ORDERS"), vec!["load_orders_0.2"]);
    assert!(graph.to_dot().starts_with("digraph lineage {"));

    let json = render_json(&result, &stats, chrono::Utc::now()).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["jobs_found"], 1);
    assert_eq!(value["jobs"][0]["version"], "0.2");
    assert_eq!(value["jobs"][0]["functions"][0], "dwh.fn_rate(1)");
}

#[test]
fn test_validate_repository() {
    let temp_dir = sample_repository();
    write_job(
        &temp_dir.path().join("process"),
        "broken_1.0.item.yaml",
        "components:\n  - componentName: tDBInput\n    parameters: []\n",
    );

    let results = validate_jobs_directory(temp_dir.path());
    assert_eq!(results.len(), 5);

    let invalid: Vec<_> = results.iter().filter(|r| !r.is_valid).collect();
    assert_eq!(invalid.len(), 1);
    assert!(invalid[0].path.ends_with("broken_1.0.item.yaml"));
}
