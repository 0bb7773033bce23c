//! Typed reads, placeholders and bulk views over a bootstrapped client.

use rstest::{fixture, rstest};

use crate::accessor::AccessError;
use crate::client::ConfigClient;

use crate::tests::support::{Harness, PushChannel, record_events, wait_until};

const SNAPSHOT: &str = "version = 12
host = db.internal
port = 5432
db.url = jdbc:postgresql://${host}:${port}/billing
db.user = billing
db.pool = 0x10
cache.enabled = yes
cache.ratio = 0.75
limits.small = 127
limits.big = 9000000000
name = not a number
loop.a = ${loop.b}
loop.b = ${loop.a}
literal = $${host}
";

struct Loaded {
    client: ConfigClient,
    _authority: PushChannel,
    _harness: Harness,
}

#[fixture]
fn loaded() -> Loaded {
    let harness = Harness::new();
    let authority = harness.connector.accept_with(SNAPSHOT);
    let client = harness.connect().expect("bootstrap succeeds");
    Loaded {
        client,
        _authority: authority,
        _harness: harness,
    }
}

#[rstest]
fn strings_resolve_placeholders(loaded: Loaded) {
    assert_eq!(
        loaded.client.get_string("db.url").expect("db.url present"),
        "jdbc:postgresql://db.internal:5432/billing"
    );
    assert_eq!(
        loaded.client.get_string("literal").expect("literal present"),
        "${host}"
    );
}

#[rstest]
fn numbers_convert_with_their_own_ranges(loaded: Loaded) {
    let client = &loaded.client;
    assert_eq!(client.get_int("port").expect("int"), 5432);
    assert_eq!(client.get_int("db.pool").expect("hex int"), 16);
    assert_eq!(client.get_long("limits.big").expect("long"), 9_000_000_000);
    assert_eq!(client.get_byte("limits.small").expect("byte"), 127);
    assert_eq!(client.get_short("port").expect("short"), 5432);
    assert!((client.get_double("cache.ratio").expect("double") - 0.75).abs() < f64::EPSILON);
    assert!((client.get_float("cache.ratio").expect("float") - 0.75).abs() < f32::EPSILON);
    assert!(client.get_boolean("cache.enabled").expect("boolean"));
}

#[rstest]
fn missing_and_unconvertible_values_are_distinct(loaded: Loaded) {
    let missing = loaded.client.get_int("absent").expect_err("absent key");
    assert_eq!(
        missing,
        AccessError::MissingKey {
            key: "absent".to_owned()
        }
    );

    let conversion = loaded.client.get_int("name").expect_err("not a number");
    assert!(conversion.is_conversion());
    assert_eq!(
        conversion,
        AccessError::Conversion {
            key: "name".to_owned(),
            target: "int",
            value: "not a number".to_owned(),
        }
    );

    assert!(loaded.client.get_int("limits.big").expect_err("too big").is_conversion());
}

#[rstest]
fn defaults_apply_only_to_missing_keys(loaded: Loaded) {
    let client = &loaded.client;
    assert_eq!(client.get_int_or("absent", 3).expect("default"), 3);
    assert_eq!(client.get_int_or("port", 3).expect("present"), 5432);
    assert!(client.get_int_or("name", 3).expect_err("bad value").is_conversion());
    assert!(!client.get_boolean_or("absent", false).expect("default"));
    assert_eq!(
        client
            .get_string_or("absent", "http://${host}/")
            .expect("default resolves"),
        "http://db.internal/"
    );
}

#[rstest]
fn cyclic_placeholders_are_reported(loaded: Loaded) {
    let error = loaded.client.get_string("loop.a").expect_err("cycle");
    assert!(matches!(error, AccessError::CyclicReference { ref key, .. } if key == "loop.a"));
    assert!(loaded.client.properties().is_err());
}

#[rstest]
fn module_lists_and_raw_views(loaded: Loaded) {
    let mut db = loaded.client.get_list_by_module("db").expect("db module");
    db.sort();
    assert_eq!(
        db,
        vec![
            "0x10".to_owned(),
            "billing".to_owned(),
            "jdbc:postgresql://${host}:${port}/billing".to_owned(),
        ]
    );
    assert_eq!(loaded.client.get_list_by_module("nothing"), Some(Vec::new()));

    let raw = loaded.client.raw_properties();
    assert_eq!(raw.get("literal").map(String::as_str), Some("$${host}"));
    assert!(loaded.client.contains_key("host"));
    assert!(!loaded.client.contains_key("version"));
}

#[rstest]
fn load_str_replaces_values_without_events(loaded: Loaded) {
    let events = record_events(&loaded.client);

    loaded
        .client
        .load_str("version = local\nhost = replica.internal\n")
        .expect("valid blob");

    assert_eq!(loaded.client.version().as_deref(), Some("local"));
    assert_eq!(
        loaded.client.get_string("db.url").expect("db.url present"),
        "jdbc:postgresql://replica.internal:5432/billing"
    );
    assert!(events.try_recv().is_err());
    assert!(loaded.client.load_str("host = x\n").is_err());
}

#[rstest]
fn properties_are_sorted_and_resolved() {
    let harness = Harness::new();
    let _authority = harness
        .connector
        .accept_with("version = 1\nz = ${a}!\na = 1\n");
    let client = harness.connect().expect("bootstrap succeeds");

    let properties = client.properties().expect("no cycles");

    let keys: Vec<_> = properties.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["a", "z"]);
    assert_eq!(properties.get("z").map(String::as_str), Some("1!"));
}

#[rstest]
fn module_list_is_absent_only_for_an_empty_store() {
    let harness = Harness::new();
    let authority = harness.connector.accept_with("version = 1\n");
    let client = harness.connect().expect("bootstrap succeeds");

    assert_eq!(client.get_list_by_module("db"), None);

    authority.push("version = 2\ncache.ttl = 60\n");
    assert!(wait_until(|| client.contains_key("cache.ttl")));
    assert_eq!(client.get_list_by_module("db"), Some(Vec::new()));
    assert_eq!(
        client.get_list_by_module("cache"),
        Some(vec!["60".to_owned()])
    );
}
