// Build-time validation of the HAProxy line grammar
use regex::Regex;
use std::fs::File;
use std::io::Write;

/// HAProxy HTTP log format (`option httplog`), anchored to the full line.
/// Capture names are the schema field names.
const HAPROXY_HTTP: &str = r#"^(?P<proctag>\S+) (?P<ip>\S+):(?P<port>[0-9]+) \[(?P<time>[^\]]+)\] (?P<frontend>\S+) (?P<backend>[^\s/]+)/(?P<server>\S+) (?P<tq>\+?[0-9]+)/(?P<tw>\+?[0-9]+)/(?P<tc>\+?[0-9]+)/(?P<tr>\+?[0-9]+)/(?P<tt>\+?[0-9]+) (?P<statuscode>[0-9]*) (?P<bytesread>\+?[0-9]*) (?P<requestcookie>\S+) (?P<responsecookie>\S+) (?P<terminationstate>\S+) (?P<actconn>[0-9]+)/(?P<feconn>[0-9]+)/(?P<beconn>[0-9]+)/(?P<srvconn>[0-9]+)/(?P<retries>\+?[0-9]+) (?P<srvqueue>[0-9]+)/(?P<backendqueue>[0-9]+) \{(?P<requestheaders>.*)\} \{(?P<responseheaders>.*)\} "(?P<method>\S+) (?P<uri>\S+)(?:\s+(?P<protocol>[^\s"]+))?"$"#;

/// Every capture the record mapping reads.
const REQUIRED_CAPTURES: &[&str] = &[
    "ip",
    "time",
    "frontend",
    "backend",
    "server",
    "tq",
    "tw",
    "tc",
    "tr",
    "tt",
    "statuscode",
    "bytesread",
    "requestcookie",
    "responsecookie",
    "terminationstate",
    "actconn",
    "feconn",
    "beconn",
    "srvconn",
    "retries",
    "srvqueue",
    "backendqueue",
    "requestheaders",
    "responseheaders",
    "method",
    "uri",
    "protocol",
];

/// Lines the grammar must accept (`true`) or reject (`false`).
const SAMPLES: &[(&str, bool)] = &[
    (
        r#"haproxy[18439]: 70.208.71.125:1545 [24/Nov/2014:13:59:25.582] http nginx/blink182 17/0/1/4/24 200 44332 cc=clienttime-1378732583324.version-35.essential.f - ---- 2422/2288/2/1/0 0/0 {www.telegraaf.nl|Mozilla/5.0} {text/html} "GET /telesport/ HTTP/1.1""#,
        true,
    ),
    (
        r#"haproxy[18439]: 70.208.71.125:1545 [24/Nov/2014:13:59:25.582] http nginx/blink182 17/0/1/4/24 200 44332 - - ---- 2422/2288/2/1/0 0/0 {} {} "GET /telesport/""#,
        true,
    ),
    (
        r#"haproxy[18439]: 70.208.71.125:1545 [24/Nov/2014:13:59:25.582] http nginx/blink182 17/0/1/4/24 200 44332 - - ---- 2422/2288/2/1/0 0/0 {} {} "GET /telesport/"#,
        false,
    ),
];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let regex = match Regex::new(HAPROXY_HTTP) {
        Ok(regex) => regex,
        Err(e) => panic!("Invalid HAProxy grammar: {e}"),
    };

    let names: Vec<&str> = regex.capture_names().flatten().collect();
    let missing: Vec<&&str> = REQUIRED_CAPTURES
        .iter()
        .filter(|capture| !names.contains(capture))
        .collect();
    if !missing.is_empty() {
        panic!("HAProxy grammar is missing captures: {missing:?}");
    }

    for (line, expected) in SAMPLES {
        if regex.is_match(line) != *expected {
            panic!("HAProxy grammar expected match={expected} for sample: {line}");
        }
    }

    if let Err(e) = generate_grammar_module() {
        panic!("Failed to generate grammar module: {e}");
    }
}

fn generate_grammar_module() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = std::env::var("OUT_DIR")?;
    let dest_path = std::path::Path::new(&out_dir).join("haproxy_grammar.rs");
    let mut file = File::create(dest_path)?;

    writeln!(file, "// Auto-generated grammar (validated by build.rs)")?;
    writeln!(file, "use crate::parser::grammar::Grammar;")?;
    writeln!(file)?;
    writeln!(file, "/// HAProxy HTTP log line grammar")?;
    writeln!(
        file,
        "pub static HAPROXY_HTTP: Grammar = Grammar::new(r#\"{HAPROXY_HTTP}\"#, \"haproxy_http\");"
    )?;

    Ok(())
}
