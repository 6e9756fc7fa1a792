#![cfg(test)]

use std::collections::BTreeSet;
use std::sync::Arc;

use proptest::prelude::*;
use yang_json_codec::*;
use yang_json_schema::*;

fn network() -> Arc<SchemaContext> {
    SchemaContext::from_json(include_str!("data/network.json")).expect("loading network schema failed")
}

fn sys(local: &str) -> QName {
    QName::new("urn:example:system", local)
}

fn system_tree(hostname: &str, counter: u32, uptime: i64, load: i64, servers: &BTreeSet<String>) -> NormalizedNode {
    let entries = servers
        .iter()
        .map(|s| NormalizedNode::LeafListEntry { name: sys("servers"), value: Arc::new(Value::from(s.as_str())) })
        .collect();
    NormalizedNode::container(sys("system"), vec![
        NormalizedNode::leaf(sys("hostname"), Value::from(hostname)),
        NormalizedNode::leaf(sys("counter"), Value::from(counter)),
        NormalizedNode::leaf(sys("uptime"), Value::Int64(uptime)),
        NormalizedNode::leaf(sys("load"), Value::Decimal64(Decimal64::new(load, 2))),
        NormalizedNode::LeafList { name: sys("servers"), entries },
    ])
}

fn system_codec(context: &Arc<SchemaContext>, local: &str) -> JsonCodec {
    let system = context.find_data_child(None, &sys("system")).expect("no system container")[0];
    let leaf = context.child(Some(system), &sys(local)).expect("no such leaf");
    JsonCodec::build(context, IidDialect::Rfc7951, leaf).expect("building codec failed")
}

fn identities() -> (Arc<SchemaContext>, JsonCodec) {
    let context = SchemaDocument::new(vec![Module::new("ifs", "urn:ifs", "if"), Module::new("eth", "urn:eth", "eth")])
        .identity(IdentityDef::new("ifs", "iftype", &[]))
        .identity(IdentityDef::new("ifs", "loopback", &["iftype"]))
        .identity(IdentityDef::new("ifs", "tunnel", &["iftype"]))
        .identity(IdentityDef::new("eth", "ethernet", &["ifs:iftype"]))
        .identity(IdentityDef::new("eth", "fast-ethernet", &["ethernet"]))
        .node(NodeDef::leaf("type", TypeDefinition::identityref(&["iftype"])).in_module("ifs"))
        .build()
        .expect("building identity schema failed");
    let leaf = context.roots()[0];
    let codec = JsonCodec::build(&context, IidDialect::Rfc7951, leaf).expect("building codec failed");
    (context, codec)
}

const IFS: &str = "urn:ietf:params:xml:ns:yang:ietf-interfaces";

fn interface_path(name: &str) -> Value {
    let ifs = |local: &str| QName::new(IFS, local);
    Value::InstanceIdentifier(InstanceIdentifier(vec![
        PathArgument::Node(ifs("interfaces")),
        PathArgument::Node(ifs("interface")),
        PathArgument::Entry { name: ifs("interface"), keys: vec![(ifs("name"), Value::from(name))] },
        PathArgument::Node(ifs("enabled")),
    ]))
}

fn encode(codecs: &JsonCodecFactory, result: &NormalizationResult) -> String {
    let mut out = JsonWriter::new(Vec::new());
    let mut encoder = JsonEncoder::exclusive(&mut out, codecs);
    NormalizedNodeWriter::new(&mut encoder).write_result(result).expect("write_result failed");
    encoder.finish().expect("finish failed");
    String::from_utf8(out.into_inner()).expect("output is not utf-8")
}

proptest! {
    #[test]
    fn encode_then_decode_is_identity(
        hostname in "\\PC*",
        counter in any::<u32>(),
        uptime in any::<i64>(),
        load in -1_000_000i64..1_000_000,
        servers in prop::collection::btree_set("[a-z0-9.-]{1,12}", 1..6),
    ) {
        let codecs = JsonCodecFactory::lazy(network(), IidDialect::Rfc7951);
        let original = NormalizationResult::from_data(vec![system_tree(&hostname, counter, uptime, load, &servers)]);

        let text = encode(&codecs, &original);
        let decoded = JsonDecoder::new(&codecs).normalize(&text).expect("decode failed");
        prop_assert_eq!(&decoded, &original);

        // Encoding is deterministic
        prop_assert_eq!(encode(&codecs, &decoded), text);
    }

    #[test]
    fn decoding_arbitrary_text_never_panics(text in "\\PC{0,64}") {
        let codecs = JsonCodecFactory::lazy(network(), IidDialect::Rfc7951);
        let _ = JsonDecoder::new(&codecs).lenient(true).normalize(&text);
    }

    #[test]
    fn integer_codec_agrees_with_std(number in any::<i64>()) {
        let codec = codecs::IntegerCodec::new(&IntegerType { kind: IntegerKind::Int64, range: vec![] });
        let scalar = codec.write(&Value::Int64(number)).expect("write failed");
        prop_assert_eq!(scalar.text(), number.to_string());
        prop_assert_eq!(codec.parse(scalar.text()).expect("parse failed"), Value::Int64(number));
    }

    #[test]
    fn binary_is_base64(bytes in prop::collection::vec(any::<u8>(), 0..96)) {
        let codec = codecs::BinaryCodec::new(&BinaryType::default());
        let scalar = codec.write(&Value::Binary(bytes.clone())).expect("write failed");
        prop_assert!(scalar.text().len() % 4 == 0);
        prop_assert_eq!(codec.parse(scalar.text()).expect("parse failed"), Value::Binary(bytes));
    }

    #[test]
    fn bits_are_reordered_by_position(
        names in prop::sample::subsequence(vec!["ssh", "telnet", "netconf"], 0..=3).prop_shuffle(),
    ) {
        let codec = system_codec(&network(), "features");
        let parsed = codec.parse(&names.join(" ")).expect("parse failed");

        // Check that set bits come back in position order, whatever the input order
        let canonical: Vec<String> = ["ssh", "telnet", "netconf"]
            .iter()
            .filter(|name| names.contains(*name))
            .map(|name| name.to_string())
            .collect();
        prop_assert_eq!(&parsed, &Value::Bits(canonical.clone()));
        let written = codec.write(&parsed).expect("write failed");
        prop_assert_eq!(written.text(), canonical.join(" "));
    }

    #[test]
    fn enumeration_names(known in prop::sample::select(vec!["debug", "info", "error"]), other in "[a-z]{1,8}") {
        let context = network();
        let system = context.find_data_child(None, &sys("system")).expect("no system container")[0];
        let logging = context.child(Some(system), &sys("logging")).expect("no logging container");
        let level = context.child(Some(logging), &sys("level")).expect("no level leaf");
        let codec = JsonCodec::build(&context, IidDialect::Rfc7951, level).expect("building codec failed");

        let value = codec.parse(known).expect("parse failed");
        prop_assert_eq!(&value, &Value::Enumeration(known.to_owned()));
        prop_assert_eq!(codec.write(&value).expect("write failed"), JsonScalar::String(known.to_owned()));
        if !["debug", "info", "error"].contains(&other.as_str()) {
            prop_assert!(codec.parse(&other).is_err());
        }
    }

    #[test]
    fn identityref_prefix_follows_module(
        (module, local) in prop::sample::select(vec![
            ("ifs", "loopback"),
            ("ifs", "tunnel"),
            ("eth", "ethernet"),
            ("eth", "fast-ethernet"),
        ]),
    ) {
        let (context, codec) = identities();
        let namespace = context.module_by_name(module).expect("unknown module").namespace.clone();
        let value = Value::Identityref(QName::new(namespace, local));

        let written = codec.write(&value).expect("write failed");
        if module == "ifs" {
            prop_assert_eq!(written.text(), local);
        } else {
            prop_assert_eq!(written.text(), format!("{}:{}", module, local));
        }
        prop_assert_eq!(codec.parse(written.text()).expect("parse failed"), value.clone());
        prop_assert_eq!(codec.parse(&format!("{}:{}", module, local)).expect("parse failed"), value);
    }

    #[test]
    fn instance_identifier_keys_survive_quoting(
        name in prop_oneof![
            "[a-z0-9 \\[\\]/=:.'-]{1,12}",
            "[a-z0-9 \\[\\]/=:.\"-]{1,12}",
        ],
    ) {
        let codec = codecs::InstanceIdentifierCodec::new(&network(), IidDialect::Rfc7951);
        let value = interface_path(&name);
        let written = codec.write(&value).expect("write failed");

        let quoted = if name.contains('\'') { format!("\"{}\"", name) } else { format!("'{}'", name) };
        prop_assert_eq!(
            written.text(),
            format!("/ietf-interfaces:interfaces/interface[name={}]/enabled", quoted)
        );
        prop_assert_eq!(codec.parse(written.text()).expect("parse failed"), value);
    }

    #[test]
    fn boolean_tokens(flag in any::<bool>()) {
        let codec = JsonCodec::Boolean;
        let scalar = codec.write(&Value::Boolean(flag)).expect("write failed");
        prop_assert_eq!(&scalar, &JsonScalar::Boolean(flag));
        prop_assert_eq!(codec.parse(scalar.text()).expect("parse failed"), Value::Boolean(flag));
        prop_assert!(codec.parse(&scalar.text().to_uppercase()).is_err());
    }

    #[test]
    fn union_takes_the_first_member_that_parses(number in any::<i32>(), word in "[a-z]{1,10}") {
        // int32 before string: numbers stay numbers
        let mode = system_codec(&network(), "mode");
        prop_assert_eq!(mode.parse(&number.to_string()).expect("parse failed"), Value::Int32(number));
        prop_assert_eq!(mode.parse(&word).expect("parse failed"), Value::from(word.as_str()));

        // string before int32: every input is a string
        let string = codecs::StringCodec::new(&StringType::default()).expect("building string codec failed");
        let int32 = codecs::IntegerCodec::new(&IntegerType { kind: IntegerKind::Int32, range: vec![] });
        let reversed = codecs::UnionCodec::new(vec![JsonCodec::String(string), JsonCodec::Integer(int32)]);
        prop_assert_eq!(reversed.parse(&number.to_string()).expect("parse failed"), Value::String(number.to_string()));
    }
}
