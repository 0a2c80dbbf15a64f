//! Stand-in `hadoop` and `hive` clients over a local directory.
//!
//! The "distributed" filesystem lives under a temp dir. The hadoop stand-in
//! implements just enough of `fs`, `jar wordcount` and the counter writer's
//! statistics file; the hive stand-in keeps table locations in a state dir
//! and answers the shipped join queries from the uploaded table files.

#![allow(dead_code)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use hadoop_cli_e2e::config::HarnessConfig;
use tempfile::TempDir;

pub const USER: &str = "tester";

const FAKE_HADOOP: &str = r#"#!/bin/sh
ROOT='@ROOT@'
USER_NAME='@USER@'

[ -f "$HADOOP_CONF_DIR/mapred-site.xml" ] || { echo "mapred-site.xml missing" >&2; exit 7; }
[ -n "$HADOOP_CLASSPATH" ] || { echo "HADOOP_CLASSPATH missing" >&2; exit 8; }
echo "14/10/14 13:20:01 WARN util.NativeCodeLoader: Unable to load native-hadoop library" >&2

case "$1" in
  version)
    echo "Hadoop 2.4.1"
    ;;
  fs)
    op="$2"
    shift 2
    case "$op" in
      -ls)
        dir="$ROOT${1%/}"
        [ -d "$dir" ] || { echo "ls: $1: No such file or directory" >&2; exit 1; }
        for f in "$dir"/*; do
          [ -e "$f" ] || continue
          echo "drwxr-xr-x   - $USER_NAME supergroup          0 2014-10-14 13:20 ${f#"$ROOT"}"
        done
        ;;
      -mkdir)
        mkdir -p "$ROOT$1"
        ;;
      -put)
        dst="$ROOT$2"
        if [ -d "$dst" ]; then cp "$1" "$dst/"; else cp "$1" "$dst"; fi
        ;;
      -get)
        [ -e "$2" ] && { echo "get: $2: File exists" >&2; exit 1; }
        cp "$ROOT$1" "$2"
        ;;
      -test)
        [ -e "$ROOT$2" ]
        ;;
      *)
        echo "unsupported fs op $op" >&2
        exit 2
        ;;
    esac
    ;;
  jar)
    [ "$3" = wordcount ] || exit 3
    in="$ROOT$4"
    out="$ROOT$5"
    [ -e "$out" ] && { echo "Output directory $5 already exists" >&2; exit 4; }
    mkdir -p "$out"
    cat "$in"/* | tr ' ' '\n' | grep -v '^$' | sort | uniq -c | awk '{ print $2 "\t" $1 }' > "$out/part-r-00000"
    stats="$ROOT/user/$USER_NAME/job_1"
    mkdir -p "$stats"
    {
      echo "JOB submit:1000"
      echo "JOB prepare:1001"
      echo "JOB start:1002"
      for task in "SETUP 0" "MAP 0" "MAP 1" "COMBINE 0" "SHUFFLE 0" "REDUCE 0"; do
        for phase in submit start finish; do
          echo "$task $phase 6f1e2b3c-node:1010"
        done
      done
      echo "JOB finish:1100"
    } > "$stats/performance"
    ;;
  *)
    exit 2
    ;;
esac
"#;

const FAKE_HIVE: &str = r#"#!/bin/sh
ROOT='@ROOT@'
STATE='@STATE@'

[ "$1" = --hiveconf ] && [ "$2" = hive.rpc.query.plan=true ] || { echo "plan override missing" >&2; exit 9; }
case "$3 $4" in
  "--hiveconf javax.jdo.option.ConnectionURL=jdbc:derby:"*) ;;
  *) echo "metastore override missing" >&2; exit 9 ;;
esac
[ "$5" = -e ] || exit 9
q="$6"
printf '%s\n' "$q" >> "$STATE/queries.log"
echo "Logging initialized using configuration in jar:file:/opt/hive/lib/hive-common.jar!/hive-log4j.properties" >&2

table() {
  loc=$(cat "$STATE/$1") || exit 12
  echo "$ROOT$loc"
}

case "$q" in
  "drop table if exists "*)
    t="${q#drop table if exists }"
    if [ -f "$STATE/$t" ]; then
      rm -rf "$ROOT$(cat "$STATE/$t")"
      rm -f "$STATE/$t"
    fi
    ;;
  "create table "*)
    t=$(printf '%s\n' "$q" | awk '{ print $3 }')
    loc=$(printf '%s\n' "$q" | sed -n "s/.*location '\([^']*\)'.*/\1/p")
    [ -f "$STATE/$t" ] && { echo "Table $t already exists" >&2; exit 10; }
    echo "$loc" > "$STATE/$t"
    mkdir -p "$ROOT$loc"
    case "$q" in
      *"' as "*)
        out="$ROOT$loc/000000_0"
        sel=${q#*"' as "}
        case "$sel" in
          "select * from table_a order by id_a limit 10")
            sort -n -k1,1 "$(table table_a)"/* | head -n 10 | awk -F'\t' '{ print $1 " " $2 }' > "$out"
            ;;
          "select count(id_b) from table_b")
            awk 'END { print NR }' "$(table table_b)"/* > "$out"
            ;;
          *"where b.rndv > 2000"*)
            awk -F'\t' 'NR == FNR { a[$2] = $1; next } ($1 in a) && $2 > 2000 { print a[$1] " " $1 " " $2 }' \
              "$(table table_a)"/* "$(table table_b)"/* | sort -n -k1,1 | head -n 10 > "$out"
            ;;
          "select count(b.id_b) from table_a a inner join table_b b on a.id_b = b.id_b")
            awk -F'\t' 'NR == FNR { a[$2] = 1; next } ($1 in a) { n++ } END { print n + 0 }' \
              "$(table table_a)"/* "$(table table_b)"/* > "$out"
            ;;
          *)
            echo "unsupported query" >&2
            exit 11
            ;;
        esac
        ;;
    esac
    ;;
  *)
    echo "unsupported statement" >&2
    exit 11
    ;;
esac
"#;

const TEMPLATE: &str = "<?xml version=\"1.0\"?>\n<configuration>\n</configuration>\n";

fn touch(path: &Path) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, b"").unwrap();
}

fn write_script(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

/// Hadoop and GridGain installations over a local filesystem root.
pub struct Cluster {
    installs: TempDir,
    fs_root: TempDir,
    state: TempDir,
    pub config: HarnessConfig,
}

impl Cluster {
    pub fn new() -> Self {
        let installs = tempfile::tempdir().unwrap();
        let fs_root = tempfile::tempdir().unwrap();
        let state = tempfile::tempdir().unwrap();
        let hadoop = installs.path().join("hadoop");
        let gridgain = installs.path().join("gridgain");

        let script = FAKE_HADOOP
            .replace("@ROOT@", &fs_root.path().display().to_string())
            .replace("@USER@", USER);
        write_script(&hadoop.join("bin/hadoop"), &script);
        touch(&hadoop.join("share/hadoop/mapreduce/hadoop-mapreduce-examples-2.4.1.jar"));

        fs::create_dir_all(gridgain.join("docs")).unwrap();
        fs::write(gridgain.join("docs/core-site.gridgain.xml"), TEMPLATE).unwrap();
        fs::write(gridgain.join("docs/mapred-site.gridgain.xml"), TEMPLATE).unwrap();
        for lib in [
            "gridgain-core-6.5.0.jar",
            "gridgain-hadoop-6.5.0.jar",
            "gridgain-jdk8-backport-6.5.0.jar",
        ] {
            touch(&gridgain.join("libs").join(lib));
        }

        let mut config = HarnessConfig::new(&hadoop, &gridgain);
        config.user = USER.to_string();
        config.seed = Some(7);

        Self {
            installs,
            fs_root,
            state,
            config,
        }
    }

    /// Adds a hive installation and points the config at it.
    #[must_use]
    pub fn with_hive(mut self) -> Self {
        let hive = self.installs.path().join("hive");
        let script = FAKE_HIVE
            .replace("@ROOT@", &self.fs_root.path().display().to_string())
            .replace("@STATE@", &self.state.path().display().to_string());
        write_script(&hive.join("bin/hive"), &script);
        self.config.hive_home = Some(hive);
        self
    }

    /// Local directory holding the remote filesystem.
    pub fn fs_root(&self) -> &Path {
        self.fs_root.path()
    }

    /// Every statement the hive stand-in received, in order.
    pub fn queries(&self) -> Vec<String> {
        fs::read_to_string(self.state.path().join("queries.log"))
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}
