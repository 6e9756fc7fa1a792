#![cfg(test)]

use std::sync::Arc;

use yang_json_codec::*;
use yang_json_schema::*;

const SYS: &str = "urn:example:system";
const IF: &str = "urn:ietf:params:xml:ns:yang:ietf-interfaces";

fn network() -> Arc<SchemaContext> {
    SchemaContext::from_json(include_str!("data/network.json")).expect("loading network schema failed")
}

fn inner() -> Arc<SchemaContext> {
    SchemaDocument::new(vec![Module::new("example-inner", "urn:example:inner", "in")])
        .node(
            NodeDef::container("settings")
                .in_module("example-inner")
                .child(NodeDef::leaf("name", TypeDefinition::string())),
        )
        .build()
        .expect("building inner schema failed")
}

fn sys(local: &str) -> QName {
    QName::new(SYS, local)
}

fn decode(context: &Arc<SchemaContext>, text: &str) -> Result<NormalizationResult, CodecError> {
    let codecs = JsonCodecFactory::lazy(context.clone(), IidDialect::Rfc7951);
    JsonDecoder::new(&codecs).normalize(text)
}

fn encode(context: &Arc<SchemaContext>, result: &NormalizationResult) -> String {
    let codecs = JsonCodecFactory::lazy(context.clone(), IidDialect::Rfc7951);
    let mut out = JsonWriter::new(Vec::new());
    let mut encoder = JsonEncoder::exclusive(&mut out, &codecs);
    NormalizedNodeWriter::new(&mut encoder).write_result(result).expect("write_result failed");
    encoder.finish().expect("finish failed");
    String::from_utf8(out.into_inner()).expect("output is not utf-8")
}

fn round_trip(text: &str) {
    let context = network();
    let result = decode(&context, text).expect("decode failed");
    assert_eq!(encode(&context, &result), text);
}

fn system_leaf<'a>(result: &'a NormalizationResult, local: &str) -> Option<&'a Value> {
    result.node(&sys("system"))?.child_named(&sys(local))?.value()
}

#[test]
fn interfaces_round_trip() {
    round_trip(concat!(
        r#"{"ietf-interfaces:interfaces":{"interface":["#,
        r#"{"name":"eth0","type":"iana-if-type:ethernetCsmacd","enabled":true,"in-octets":"18446744073709551615","#,
        r#""ietf-ip:ipv4":{"mtu":1500,"address":[{"ip":"192.0.2.1","prefix-length":24}]}},"#,
        r#"{"name":"lo","type":"iana-if-type:softwareLoopback"}"#,
        r#"]}}"#,
    ));
}

#[test]
fn scalar_quoting() {
    let text = r#"{"example-system:system":{"counter":4294967295,"uptime":"9223372036854775807","maintenance":[null]}}"#;
    let context = network();
    let result = decode(&context, text).expect("decode failed");

    // Check the decoded values
    assert_eq!(system_leaf(&result, "counter"), Some(&Value::Uint32(u32::MAX)));
    assert_eq!(system_leaf(&result, "uptime"), Some(&Value::Int64(i64::MAX)));
    assert_eq!(system_leaf(&result, "maintenance"), Some(&Value::Empty));

    // Check the re-encoding
    assert_eq!(encode(&context, &result), text);
}

#[test]
fn decimal_bits_and_enums() {
    let context = network();
    let result = decode(
        &context,
        r#"{"example-system:system":{"load":1.5,"features":"netconf ssh","logging":{"level":"info"}}}"#,
    )
    .expect("decode failed");

    assert_eq!(system_leaf(&result, "load"), Some(&Value::Decimal64(Decimal64::new(150, 2))));
    assert_eq!(system_leaf(&result, "features"), Some(&Value::Bits(vec!["ssh".into(), "netconf".into()])));
    assert_eq!(
        encode(&context, &result),
        r#"{"example-system:system":{"load":"1.5","features":"ssh netconf","logging":{"level":"info"}}}"#
    );
}

#[test]
fn unquoted_decimals_keep_every_digit() {
    let context = network();
    let result = decode(
        &context,
        r#"{"example-system:system":{"drift":1.234567890123456789,"energy":123456789012345.678}}"#,
    )
    .expect("decode failed");

    // Check that no digit went through a binary float on the way in
    assert_eq!(system_leaf(&result, "drift"), Some(&Value::Decimal64(Decimal64::new(1234567890123456789, 18))));
    assert_eq!(system_leaf(&result, "energy"), Some(&Value::Decimal64(Decimal64::new(123456789012345678, 3))));
    assert_eq!(
        encode(&context, &result),
        r#"{"example-system:system":{"drift":"1.234567890123456789","energy":"123456789012345.678"}}"#
    );
}

#[test]
fn references_round_trip() {
    round_trip(concat!(
        r#"{"example-system:system":{"primary":"eth0","#,
        r#""watched":"/ietf-interfaces:interfaces/interface[name='eth0']/enabled"}}"#,
    ));
}

#[test]
fn invalid_values_are_rejected() {
    let context = network();
    let cases = [
        r#"{"example-system:system":{"counter":4294967296}}"#,
        r#"{"example-system:system":{"logging":{"level":"trace"}}}"#,
        r#"{"example-system:system":{"features":"ssh ssh"}}"#,
        r#"{"ietf-interfaces:interfaces":{"interface":[{"name":""}]}}"#,
        r#"{"ietf-interfaces:interfaces":{"interface":[{"name":"e","type":"nope"}]}}"#,
    ];
    for text in cases {
        match decode(&context, text) {
            Err(CodecError::Value { .. }) => {}
            other => panic!("{}: expected a value error, got {:?}", text, other),
        }
    }
}

#[test]
fn namespace_qualifies_only_on_change() {
    let context = network();
    let tree = NormalizedNode::container(sys("system"), vec![
        NormalizedNode::leaf(sys("hostname"), Value::from("r1")),
        NormalizedNode::leaf(QName::new("urn:example:vendor-a", "tag"), Value::from("blue")),
    ]);
    assert_eq!(
        encode(&context, &NormalizationResult::from_data(vec![tree])),
        r#"{"example-system:system":{"hostname":"r1","example-vendor-a:tag":"blue"}}"#
    );
}

#[test]
fn empty_containers_are_elided_unless_present() {
    let context = network();

    // Check a non-presence container with nothing inside
    let empty = NormalizedNode::container(sys("system"), vec![NormalizedNode::container(sys("logging"), vec![])]);
    assert_eq!(encode(&context, &NormalizationResult::from_data(vec![empty])), "{}");

    // Check that a presence container keeps its ancestors alive
    let present = NormalizedNode::container(sys("system"), vec![
        NormalizedNode::container(sys("logging"), vec![]),
        NormalizedNode::container(sys("ssh"), vec![]),
    ]);
    assert_eq!(
        encode(&context, &NormalizationResult::from_data(vec![present])),
        r#"{"example-system:system":{"ssh":{}}}"#
    );
}

#[test]
fn union_takes_first_matching_member() {
    let context = network();

    let number = decode(&context, r#"{"example-system:system":{"mode":42}}"#).expect("decode failed");
    assert_eq!(system_leaf(&number, "mode"), Some(&Value::Int32(42)));

    let quoted = decode(&context, r#"{"example-system:system":{"mode":"42"}}"#).expect("decode failed");
    assert_eq!(system_leaf(&quoted, "mode"), Some(&Value::Int32(42)));

    let word = decode(&context, r#"{"example-system:system":{"mode":"auto"}}"#).expect("decode failed");
    assert_eq!(system_leaf(&word, "mode"), Some(&Value::from("auto")));
    assert_eq!(encode(&context, &word), r#"{"example-system:system":{"mode":"auto"}}"#);
    assert_eq!(encode(&context, &number), r#"{"example-system:system":{"mode":42}}"#);
}

#[test]
fn duplicate_members_are_rejected() {
    let context = network();
    let cases = [
        r#"{"example-system:system":{},"example-system:system":{}}"#,
        r#"{"example-system:system":{"hostname":"a","hostname":"b"}}"#,
        r#"{"example-system:system":{"hostname":"a","example-system:hostname":"b"}}"#,
        r#"{"example-system:system":{"servers":["a","a"]}}"#,
        r#"{"ietf-interfaces:interfaces":{"interface":[{"name":"e"},{"name":"e"}]}}"#,
    ];
    for text in cases {
        match decode(&context, text) {
            Err(CodecError::Duplicate { .. }) => {}
            other => panic!("{}: expected a duplicate error, got {:?}", text, other),
        }
    }
}

#[test]
fn ambiguous_member_names() {
    let context = network();
    let codecs = JsonCodecFactory::lazy(context.clone(), IidDialect::Rfc7951);
    let text = r#"{"example-system:system":{"tag":"x","hostname":"h"}}"#;

    // Check that strict mode refuses to guess
    match JsonDecoder::new(&codecs).normalize(text) {
        Err(CodecError::SchemaMismatch { .. }) => {}
        other => panic!("expected a schema mismatch, got {:?}", other),
    }

    // Check that lenient mode drops the member
    let result = JsonDecoder::new(&codecs).lenient(true).normalize(text).expect("lenient decode failed");
    assert_eq!(encode(&context, &result), r#"{"example-system:system":{"hostname":"h"}}"#);

    // Check that a qualified name resolves it
    let qualified = decode(&context, r#"{"example-system:system":{"example-vendor-b:tag":"x"}}"#).expect("decode failed");
    let system = qualified.node(&sys("system")).expect("system missing");
    assert!(system.child_named(&QName::new("urn:example:vendor-b", "tag")).is_some());
}

#[test]
fn unknown_members() {
    let context = network();
    let codecs = JsonCodecFactory::lazy(context.clone(), IidDialect::Rfc7951);
    let text = r#"{"nope:thing":1,"example-system:system":{"bogus":true,"hostname":"h"}}"#;

    assert!(matches!(JsonDecoder::new(&codecs).normalize(text), Err(CodecError::SchemaMismatch { .. })));

    let result = JsonDecoder::new(&codecs).lenient(true).normalize(text).expect("lenient decode failed");
    assert_eq!(encode(&context, &result), r#"{"example-system:system":{"hostname":"h"}}"#);
}

#[test]
fn single_list_entry_without_array() {
    let context = network();
    let bare = decode(&context, r#"{"ietf-interfaces:interfaces":{"interface":{"name":"eth0"}}}"#).expect("decode failed");
    let wrapped =
        decode(&context, r#"{"ietf-interfaces:interfaces":{"interface":[{"name":"eth0"}]}}"#).expect("decode failed");
    assert_eq!(bare, wrapped);

    let interfaces = bare.node(&QName::new(IF, "interfaces")).expect("interfaces missing");
    let list = interfaces.child_named(&QName::new(IF, "interface")).expect("interface list missing");
    assert_eq!(list.children()[0].identifier(), PathArgument::Entry {
        name: QName::new(IF, "interface"),
        keys: vec![(QName::new(IF, "name"), Value::from("eth0"))],
    });
}

#[test]
fn missing_list_key() {
    let context = network();
    let result = decode(&context, r#"{"ietf-interfaces:interfaces":{"interface":[{"enabled":true}]}}"#);
    assert!(matches!(result, Err(CodecError::SchemaMismatch { .. })));
}

#[test]
fn keyless_lists_and_ordered_leaf_lists() {
    round_trip(concat!(
        r#"{"example-system:system":{"servers":["b","a","c"],"#,
        r#""log-entry":[{"message":"up"},{"message":"up"}]}}"#,
    ));
}

#[test]
fn choice_is_transparent() {
    let context = network();
    let result = decode(&context, r#"{"example-system:system":{"port":22}}"#).expect("decode failed");
    let system = result.node(&sys("system")).expect("system missing");
    let choice = system.child_named(&sys("transport")).expect("choice missing");
    assert_eq!(choice.child_named(&sys("port")).and_then(|n| n.value()), Some(&Value::Uint16(22)));
    assert_eq!(encode(&context, &result), r#"{"example-system:system":{"port":22}}"#);

    // Check that two cases of one choice conflict
    let conflict = decode(&context, r#"{"example-system:system":{"port":22,"local-socket":"/run/s"}}"#);
    assert!(matches!(conflict, Err(CodecError::SchemaMismatch { .. })));
}

#[test]
fn anydata_is_opaque() {
    round_trip(r#"{"example-system:system":{"extra":{"anything":[1,{"x":null}],"deep":{"y":"z"}}}}"#);
}

#[test]
fn anydata_normalizes_against_its_own_schema() {
    let context = network();
    let codecs = JsonCodecFactory::lazy(context.clone(), IidDialect::Rfc7951);
    let decoder = JsonDecoder::new(&codecs);
    let result = decoder
        .normalize(r#"{"example-system:system":{"extra":{"example-system:system":{"hostname":"inner"}}}}"#)
        .expect("decode failed");
    let payload = match result.node(&sys("system")).and_then(|n| n.child_named(&sys("extra"))) {
        Some(NormalizedNode::Anydata { value, .. }) => value.clone(),
        other => panic!("expected anydata, got {:?}", other),
    };

    let normalized = decoder.normalize_anydata(&payload, context.clone()).expect("normalize_anydata failed");
    assert_eq!(normalized.data, vec![NormalizedNode::container(sys("system"), vec![
        NormalizedNode::leaf(sys("hostname"), Value::from("inner")),
    ])]);

    // Check that the nested content inherits the enclosing namespace
    let tree = NormalizedNode::container(sys("system"), vec![NormalizedNode::Anydata {
        name:  sys("extra"),
        value: AnydataValue::Normalized(normalized),
    }]);
    assert_eq!(
        encode(&context, &NormalizationResult::from_data(vec![tree])),
        r#"{"example-system:system":{"extra":{"system":{"hostname":"inner"}}}}"#
    );
}

#[test]
fn anyxml_translation() {
    let context = network();
    let result = decode(&context, r#"{"example-system:system":{"raw":{"a":[1,2],"b":"x"}}}"#).expect("decode failed");
    let raw = match result.node(&sys("system")).and_then(|n| n.child_named(&sys("raw"))) {
        Some(NormalizedNode::Anyxml { value, .. }) => value.clone(),
        other => panic!("expected anyxml, got {:?}", other),
    };
    assert_eq!(raw.name, "raw");
    assert_eq!(raw.namespace, Some(Namespace::new(SYS)));

    // Check that array items come back wrapped in their element
    assert_eq!(
        encode(&context, &result),
        r#"{"example-system:system":{"raw":{"a":{"array-element":[1,2]},"b":"x"}}}"#
    );
}

#[test]
fn mount_points_round_trip() {
    let context = network();
    let codecs = JsonCodecFactory::lazy(context.clone(), IidDialect::Rfc7951);
    let text = r#"{"example-system:virtual":{"example-inner:settings":{"name":"x"}}}"#;

    let result = JsonDecoder::new(&codecs)
        .with_mount_point("schema-mount", inner())
        .normalize(text)
        .expect("decode failed");

    // Check the side tree
    let mounts = result.mount_points.as_ref().expect("mount points missing");
    let mount = mounts
        .child(&PathArgument::Node(sys("virtual")))
        .and_then(|m| m.mount_point.as_ref())
        .expect("mount point missing");
    assert_eq!(mount.label, "schema-mount");
    assert_eq!(mount.data.len(), 1);
    assert_eq!(result.node(&sys("virtual")).map(|n| n.children().len()), Some(0));

    assert_eq!(encode(&context, &result), text);

    // Check that an unregistered mount point has no content
    assert!(matches!(decode(&context, text), Err(CodecError::SchemaMismatch { .. })));
}

#[test]
fn pretty_output() {
    let context = network();
    let result = decode(&context, r#"{"example-system:system":{"hostname":"r1","servers":["a"]}}"#).expect("decode failed");
    let codecs = JsonCodecFactory::lazy(context.clone(), IidDialect::Rfc7951);
    let mut out = JsonWriter::pretty(Vec::new());
    let mut encoder = JsonEncoder::exclusive(&mut out, &codecs);
    NormalizedNodeWriter::new(&mut encoder).write_result(&result).expect("write_result failed");
    encoder.finish().expect("finish failed");

    let expected = "{\n  \"example-system:system\": {\n    \"hostname\": \"r1\",\n    \"servers\": [\n      \"a\"\n    ]\n  }\n}";
    assert_eq!(String::from_utf8(out.into_inner()).expect("output is not utf-8"), expected);
}

#[test]
fn malformed_documents() {
    let context = network();
    assert!(matches!(decode(&context, "{"), Err(CodecError::Syntax { .. })));
    assert!(matches!(decode(&context, "[1]"), Err(CodecError::SchemaMismatch { .. })));
    assert!(matches!(decode(&context, r#"{"example-system:system":[]}"#), Err(CodecError::SchemaMismatch { .. })));
    assert!(matches!(decode(&context, r#"{"example-system:system":{"maintenance":null}}"#), Err(CodecError::SchemaMismatch { .. })));
    assert_eq!(decode(&context, "  ").expect("blank decode failed"), NormalizationResult::default());
}

#[test]
fn deep_nesting_is_bounded() {
    let context = network();
    let depth = 1000;
    let text = format!(
        r#"{{"example-system:system":{{"extra":{}{}}}}}"#,
        "[".repeat(depth),
        "]".repeat(depth)
    );
    assert!(matches!(decode(&context, &text), Err(CodecError::ResourceExhaustion(_))));
}

#[test]
fn encoder_rejects_protocol_misuse() {
    let context = network();
    let codecs = JsonCodecFactory::lazy(context, IidDialect::Rfc7951);
    let mut out = JsonWriter::new(Vec::new());
    let mut encoder = JsonEncoder::exclusive(&mut out, &codecs);

    encoder
        .enter(NodeKind::Container, PathArgument::Node(sys("system")), None)
        .expect("enter failed");
    let result = encoder.enter(NodeKind::ListEntry, PathArgument::Node(sys("hostname")), None);
    assert!(matches!(result, Err(CodecError::ProtocolViolation(_))));
}

#[test]
fn encoder_rejects_values_of_the_wrong_kind() {
    let context = network();
    let tree = NormalizedNode::container(sys("system"), vec![NormalizedNode::leaf(sys("counter"), Value::from("many"))]);
    let codecs = JsonCodecFactory::lazy(context, IidDialect::Rfc7951);
    let mut out = JsonWriter::new(Vec::new());
    let mut encoder = JsonEncoder::exclusive(&mut out, &codecs);
    let result = NormalizedNodeWriter::new(&mut encoder).write_node(&tree);
    assert!(matches!(result, Err(CodecError::Value { .. })));
}

#[test]
fn interned_values_are_shared() {
    let context = network();
    let codecs = JsonCodecFactory::lazy(context, IidDialect::Rfc7951);
    let result = JsonDecoder::new(&codecs)
        .intern_values(true)
        .normalize(concat!(
            r#"{"ietf-interfaces:interfaces":{"interface":["#,
            r#"{"name":"a","enabled":true},{"name":"b","enabled":true}]}}"#,
        ))
        .expect("decode failed");

    let interfaces = result.node(&QName::new(IF, "interfaces")).expect("interfaces missing");
    let list = interfaces.child_named(&QName::new(IF, "interface")).expect("list missing");
    let enabled: Vec<&Arc<Value>> = list
        .children()
        .iter()
        .filter_map(|entry| match entry.child_named(&QName::new(IF, "enabled")) {
            Some(NormalizedNode::Leaf { value, .. }) => Some(value),
            _ => None,
        })
        .collect();
    assert_eq!(enabled.len(), 2);
    assert!(Arc::ptr_eq(enabled[0], enabled[1]));
}
