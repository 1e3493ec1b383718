// Include the build-time validated HAProxy grammar
include!(concat!(env!("OUT_DIR"), "/haproxy_grammar.rs"));
