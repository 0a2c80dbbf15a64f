//! Join scenario against stand-in `hadoop` and `hive` clients.

#![cfg(unix)]

mod common;

use std::fs;

use hadoop_cli_e2e::environment::Workspace;
use hadoop_cli_e2e::scenario::Harness;
use hadoop_cli_e2e::types::{load_scenarios, TestResult};

use common::Cluster;

const MISCOUNTED: &str = r#"
tests:
  miscounted_join:
    kind: join
    checks:
      - query: "select * from table_a order by id_a limit 10"
        expected: |
          0 0
          1 2
          2 4
          3 6
          4 8
          5 10
          6 12
          7 14
          8 16
          9 18
      - query: "select count(id_b) from table_b"
        expected: "2001\n"
      - query: "select count(b.id_b) from table_a a inner join table_b b on a.id_b = b.id_b"
        expected: "1000\n"
"#;

#[test]
fn test_join_scenarios_against_stand_in_clients() {
    // Shipped join checks all pass.
    let cluster = Cluster::new().with_hive();
    let scenarios = load_scenarios(include_str!("../scenarios/command_line.yaml")).unwrap();
    let workspace = Workspace::prepare(&cluster.config).unwrap();

    let result = Harness::new(&cluster.config, &workspace).run(&scenarios[1]);
    assert!(result.is_pass(), "{result:?}");

    let queries = cluster.queries();
    assert_eq!(queries.len(), 2 + 2 * 4, "{queries:#?}");
    assert!(queries[0].starts_with("create table table_a (id_a int, id_b int) "));
    assert!(queries[0].ends_with("location '/table-a'"));
    assert!(queries[1].starts_with("create table table_b (id_b int, rndv int) "));
    for pair in queries[2..].chunks(2) {
        assert_eq!(pair[0], "drop table if exists result");
        assert!(pair[1].starts_with("create table result "), "{}", pair[1]);
        assert!(pair[1].contains("location '/result' as select "), "{}", pair[1]);
    }

    let uploaded = fs::read(cluster.fs_root().join("table-b/data-b")).unwrap();
    assert_eq!(uploaded, fs::read(workspace.path().join("data-b")).unwrap());
    assert_eq!(
        fs::read_to_string(cluster.fs_root().join("result/000000_0")).unwrap(),
        "1000\n"
    );
    workspace.close().unwrap();

    // A wrong literal fails the scenario at its check and stops there.
    let cluster = Cluster::new().with_hive();
    let scenarios = load_scenarios(MISCOUNTED).unwrap();
    let workspace = Workspace::prepare(&cluster.config).unwrap();

    match Harness::new(&cluster.config, &workspace).run(&scenarios[0]) {
        TestResult::Fail { ref name, ref reason } => {
            assert_eq!(name, "miscounted_join");
            assert!(reason.contains("select count(id_b) from table_b"), "{reason}");
            assert!(reason.contains(r#"expected "2001\n""#), "{reason}");
            assert!(reason.contains(r#"actual "2000\n""#), "{reason}");
        }
        ref other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(cluster.queries().len(), 2 + 2 * 2);
    workspace.close().unwrap();
}
