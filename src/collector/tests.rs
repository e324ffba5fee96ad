use super::*;
use crate::job::{ComponentNode, ContextParameter, ElementParameter, JobDocument};
use crate::repository::InMemoryJobRepository;
use pretty_assertions::assert_eq;

fn param(name: &str, field: &str, value: &str) -> ElementParameter {
    ElementParameter {
        name: name.to_string(),
        field: field.to_string(),
        value: value.to_string(),
    }
}

fn query_component(component_name: &str, id: &str, sql: &str) -> ComponentNode {
    ComponentNode {
        component_name: component_name.to_string(),
        parameters: vec![
            param("UNIQUE_NAME", "TEXT", id),
            param("QUERY", "MEMO_SQL", sql),
        ],
    }
}

fn input(id: &str, sql: &str) -> ComponentNode {
    query_component("tDBInput", id, sql)
}

fn output(id: &str, table: &str, schema: Option<&str>) -> ComponentNode {
    let mut parameters = vec![
        param("UNIQUE_NAME", "TEXT", id),
        param("TABLE", "DBTABLE", table),
    ];
    if let Some(schema) = schema {
        parameters.push(param("SCHEMA_DB", "TEXT", schema));
    }
    ComponentNode {
        component_name: "tMysqlOutput".to_string(),
        parameters,
    }
}

fn document(context: &[(&str, &str)], components: Vec<ComponentNode>) -> JobDocument {
    JobDocument {
        context: context
            .iter()
            .map(|(name, value)| ContextParameter {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect(),
        components,
    }
}

fn tables(list: &UniqueList<String>) -> Vec<&str> {
    list.iter().map(String::as_str).collect()
}

fn collect(repository: InMemoryJobRepository) -> (LineageCollector<InMemoryJobRepository>, SearchStats) {
    let mut collector = LineageCollector::new(repository);
    let stats = collector.search(".*", true).unwrap();
    (collector, stats)
}

#[test]
fn test_input_tables_attributed_to_component() {
    let mut repository = InMemoryJobRepository::new();
    let job = repository.add_job(
        "load_orders",
        "0.1",
        document(
            &[],
            vec![input(
                "tDBInput_1",
                "SELECT * FROM Orders o JOIN Customers c ON o.cid=c.id",
            )],
        ),
    );

    let (collector, stats) = collect(repository);

    assert_eq!(stats, SearchStats { jobs_found: 1, jobs_failed: 0 });
    assert_eq!(tables(&collector.input_tables()[&job]), vec!["Orders", "Customers"]);
    assert_eq!(
        tables(&collector.input_tables_per_component()["load_orders"]["tDBInput_1"]),
        vec!["Orders", "Customers"]
    );
    assert!(collector.output_tables().is_empty());
}

#[test]
fn test_output_table_with_resolved_schema() {
    let mut repository = InMemoryJobRepository::new();
    let job = repository.add_job(
        "load_customers",
        "1.0",
        document(
            &[("schema", "SALES")],
            vec![output("tMysqlOutput_1", "CUSTOMERS", Some("context.schema"))],
        ),
    );

    let (collector, _) = collect(repository);

    assert_eq!(tables(&collector.output_tables()[&job]), vec!["SALES.CUSTOMERS"]);
    assert!(collector.input_tables().is_empty());
}

#[test]
fn test_output_table_without_schema() {
    let mut repository = InMemoryJobRepository::new();
    let job = repository.add_job(
        "load_dates",
        "1.0",
        document(
            &[],
            vec![
                output("tMysqlOutput_1", "\"DIM_DATE\"", None),
                output("tMysqlOutput_2", "CUSTOMERS", None),
            ],
        ),
    );

    let (collector, _) = collect(repository);

    assert_eq!(
        tables(&collector.output_tables()[&job]),
        vec!["DIM_DATE", "CUSTOMERS"]
    );
}

#[test]
fn test_java_expression_with_context_and_global_map() {
    let sql = r#""SELECT o.id, dwh.fn_rate(o.amount) FROM " + context.schema + ".orders o WHERE o.id > " + ((Integer)globalMap.get("max_id"))"#;
    let mut repository = InMemoryJobRepository::new();
    let job = repository.add_job(
        "load_rates",
        "1.0",
        document(&[("schema", "SALES")], vec![input("tDBInput_1", sql)]),
    );

    let (collector, _) = collect(repository);

    assert_eq!(tables(&collector.input_tables()[&job]), vec!["SALES.orders"]);
    assert_eq!(tables(&collector.functions()[&job]), vec!["dwh.fn_rate(1)"]);
}

#[test]
fn test_parse_failure_falls_back_to_patterns() {
    let mut repository = InMemoryJobRepository::new();
    let job = repository.add_job(
        "legacy",
        "1.0",
        document(&[], vec![input("tDBInput_1", "SELECT * FROM legacy_t t WHERE t.id = ((")]),
    );

    let (collector, stats) = collect(repository);

    assert_eq!(stats.jobs_failed, 0);
    assert_eq!(tables(&collector.input_tables()[&job]), vec!["legacy_t"]);
    assert!(collector.functions().is_empty());
}

#[test]
fn test_grammar_only_drops_unparsable_sql() {
    let mut repository = InMemoryJobRepository::new();
    repository.add_job(
        "legacy",
        "1.0",
        document(&[], vec![input("tDBInput_1", "SELECT * FROM legacy_t t WHERE t.id = ((")]),
    );

    let mut collector =
        LineageCollector::new(repository).with_policy(ExtractionPolicy::GrammarOnly);
    let stats = collector.search(".*", true).unwrap();

    assert_eq!(stats.jobs_failed, 0);
    assert!(collector.result().is_empty());
}

#[test]
fn test_pattern_only_registers_write_targets_as_outputs() {
    let mut repository = InMemoryJobRepository::new();
    let job = repository.add_job(
        "load_facts",
        "1.0",
        document(
            &[],
            vec![query_component(
                "tDBRow",
                "tDBRow_1",
                "INSERT INTO dwh.fact SELECT * FROM stage.orders;\nUPDATE dwh.dim SET x = 1",
            )],
        ),
    );

    let mut collector =
        LineageCollector::new(repository).with_policy(ExtractionPolicy::PatternOnly);
    collector.search(".*", true).unwrap();

    assert_eq!(tables(&collector.input_tables()[&job]), vec!["stage.orders"]);
    assert_eq!(
        tables(&collector.output_tables()[&job]),
        vec!["dwh.fact", "dwh.dim"]
    );
}

#[test]
fn test_unresolved_variable_abandons_rest_of_job_only() {
    let mut repository = InMemoryJobRepository::new();
    let broken = repository.add_job(
        "broken",
        "1.0",
        document(
            &[],
            vec![
                input("tDBInput_1", "SELECT * FROM a"),
                input("tDBInput_2", r#""SELECT * FROM " + context.missing"#),
                input("tDBInput_3", "SELECT * FROM c"),
            ],
        ),
    );
    let fine = repository.add_job(
        "fine",
        "1.0",
        document(&[], vec![input("tDBInput_1", "SELECT * FROM z")]),
    );

    let (collector, stats) = collect(repository);

    assert_eq!(stats, SearchStats { jobs_found: 2, jobs_failed: 1 });
    assert_eq!(tables(&collector.input_tables()[&broken]), vec!["a"]);
    assert_eq!(collector.input_tables_per_component()["broken"].len(), 1);
    assert_eq!(tables(&collector.input_tables()[&fine]), vec!["z"]);
}

#[test]
fn test_unresolved_variable_error() {
    let mut repository = InMemoryJobRepository::new();
    let job = repository.add_job(
        "broken",
        "1.0",
        document(&[], vec![input("tDBInput_2", r#""SELECT * FROM " + context.missing"#)]),
    );

    let mut collector = LineageCollector::new(repository);
    match collector.find_tables(&job) {
        Err(LineageError::VariableResolution { component, variable }) => {
            assert_eq!(component, "tDBInput_2");
            assert_eq!(variable, "missing");
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[test]
fn test_unreadable_document_does_not_stop_search() {
    let mut repository = InMemoryJobRepository::new();
    let ghost = repository.add_unreadable_job("ghost", "1.0");
    let fine = repository.add_job(
        "fine",
        "1.0",
        document(&[], vec![input("tDBInput_1", "SELECT * FROM z")]),
    );

    let (collector, stats) = collect(repository);

    assert_eq!(stats, SearchStats { jobs_found: 2, jobs_failed: 1 });
    assert!(!collector.input_tables().contains_key(&ghost));
    assert!(collector.input_tables().contains_key(&fine));
}

#[test]
fn test_components_without_lineage_contribute_nothing() {
    let mut repository = InMemoryJobRepository::new();
    let nameless = ComponentNode {
        component_name: "tDBInput".to_string(),
        parameters: vec![param("QUERY", "MEMO_SQL", "SELECT * FROM skipped")],
    };
    let tableless = ComponentNode {
        component_name: "tMysqlOutput".to_string(),
        parameters: vec![param("UNIQUE_NAME", "TEXT", "tMysqlOutput_1")],
    };
    let mapper = query_component("tMap", "tMap_1", "SELECT * FROM not_sql_bearing");
    let job = repository.add_job(
        "mixed",
        "1.0",
        document(
            &[],
            vec![
                nameless,
                input("tDBInput_2", "   "),
                tableless,
                mapper,
                input("tDBInput_3", "SELECT * FROM kept"),
            ],
        ),
    );

    let (collector, stats) = collect(repository);

    assert_eq!(stats.jobs_failed, 0);
    assert_eq!(tables(&collector.input_tables()[&job]), vec!["kept"]);
    assert!(collector.output_tables().is_empty());
}

#[test]
fn test_component_tables_are_subset_of_job_inputs() {
    let mut repository = InMemoryJobRepository::new();
    let job = repository.add_job(
        "overlap",
        "1.0",
        document(
            &[],
            vec![
                input("tDBInput_1", "SELECT * FROM a JOIN b ON a.id = b.id"),
                input("tDBInput_2", "SELECT * FROM b UNION SELECT * FROM c"),
            ],
        ),
    );

    let (collector, _) = collect(repository);

    let job_inputs = &collector.input_tables()[&job];
    assert_eq!(tables(job_inputs), vec!["a", "b", "c"]);

    let per_component = &collector.input_tables_per_component()["overlap"];
    assert_eq!(tables(&per_component["tDBInput_1"]), vec!["a", "b"]);
    assert_eq!(tables(&per_component["tDBInput_2"]), vec!["b", "c"]);
    for list in per_component.values() {
        assert!(list.iter().all(|table| job_inputs.contains(table)));
    }
}

#[test]
fn test_call_in_row_component_is_a_function() {
    let mut repository = InMemoryJobRepository::new();
    let job = repository.add_job(
        "refresh",
        "1.0",
        document(
            &[],
            vec![query_component("tDBRow", "tDBRow_1", "CALL refresh_totals(2024)")],
        ),
    );

    let (collector, _) = collect(repository);

    assert_eq!(tables(&collector.functions()[&job]), vec!["refresh_totals(1)"]);
    assert!(collector.input_tables().is_empty());
}

#[test]
fn test_exec_in_row_component_is_a_function() {
    let mut repository = InMemoryJobRepository::new();
    let job = repository.add_job(
        "refresh_eu",
        "1.0",
        document(
            &[("region", "eu")],
            vec![query_component(
                "tMSSqlRow",
                "tMSSqlRow_1",
                r#""EXEC dbo.refresh_totals 2024, '" + context.region + "'""#,
            )],
        ),
    );

    let (collector, stats) = collect(repository);

    assert_eq!(stats.jobs_failed, 0);
    assert_eq!(
        tables(&collector.functions()[&job]),
        vec!["dbo.refresh_totals(2)"]
    );
    assert!(collector.input_tables().is_empty());
}

#[test]
fn test_only_latest_version_is_searched() {
    let mut repository = InMemoryJobRepository::new();
    let old = repository.add_job(
        "load",
        "0.1",
        document(&[], vec![input("tDBInput_1", "SELECT * FROM old_source")]),
    );
    let new = repository.add_job(
        "load",
        "0.2",
        document(&[], vec![input("tDBInput_1", "SELECT * FROM new_source")]),
    );

    let (collector, stats) = collect(repository);

    assert_eq!(stats.jobs_found, 1);
    assert!(!collector.input_tables().contains_key(&old));
    assert_eq!(tables(&collector.input_tables()[&new]), vec!["new_source"]);
}

#[test]
fn test_invalid_job_name_pattern_fails_search() {
    let mut collector = LineageCollector::new(InMemoryJobRepository::new());
    assert!(matches!(
        collector.search("load_(", true),
        Err(LineageError::InvalidPattern(_))
    ));
}

#[test]
fn test_policy_flags() {
    assert_eq!(
        ExtractionPolicy::from_flags(true, true),
        ExtractionPolicy::GrammarWithPatternFallback
    );
    assert_eq!(ExtractionPolicy::from_flags(true, false), ExtractionPolicy::GrammarOnly);
    assert_eq!(ExtractionPolicy::from_flags(false, true), ExtractionPolicy::PatternOnly);
    assert_eq!(ExtractionPolicy::from_flags(false, false), ExtractionPolicy::PatternOnly);

    let mut collector = LineageCollector::new(InMemoryJobRepository::new());
    collector.set_prefer_pattern_parser(false);
    assert_eq!(collector.policy(), ExtractionPolicy::GrammarOnly);
    collector.set_prefer_pattern_parser(true);
    collector.set_prefer_grammar_parser(false);
    assert_eq!(collector.policy(), ExtractionPolicy::PatternOnly);
    collector.set_prefer_grammar_parser(true);
    assert_eq!(collector.policy(), ExtractionPolicy::GrammarWithPatternFallback);
}
