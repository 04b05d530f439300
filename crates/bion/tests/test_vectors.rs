//! Byte-level wire vectors pinned in `vectors.json`.
//!
//! Every vector is checked both ways: encoding the node must produce the
//! exact bytes, and decoding the bytes must rebuild the exact node.

use serde::Deserialize;

use bion::node::Node;
use bion::varint;
use bion::wire::{self, Document};

fn hex_to_bytes(hex: &str) -> Vec<u8> {
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).unwrap())
        .collect()
}

#[derive(Deserialize)]
struct TestVectors {
    null: Vec<BytesOnly>,
    bool: Vec<ScalarTest<bool>>,
    i32: Vec<ScalarTest<i32>>,
    u32: Vec<ScalarTest<u32>>,
    i64: Vec<ScalarTest<i64>>,
    u64: Vec<ScalarTest<u64>>,
    f32: Vec<ScalarTest<f32>>,
    f64: Vec<ScalarTest<f64>>,
    str: Vec<ScalarTest<String>>,
    arr_i32: Vec<ArrayTest<i32>>,
    arr_bool: Vec<ArrayTest<bool>>,
    arr_str: Vec<ArrayTest<String>>,
    arr_f64: Vec<ArrayTest<f64>>,
    trees: Vec<NamedTest>,
    documents: Vec<NamedTest>,
    varint: Vec<VarintTest>,
}

#[derive(Deserialize)]
struct BytesOnly {
    bytes: String,
}

#[derive(Deserialize)]
struct ScalarTest<T> {
    bytes: String,
    value: T,
}

#[derive(Deserialize)]
struct ArrayTest<T> {
    bytes: String,
    values: Vec<T>,
}

#[derive(Deserialize)]
struct NamedTest {
    name: String,
    bytes: String,
}

#[derive(Deserialize)]
struct VarintTest {
    value: u32,
    bytes: String,
}

fn load_test_vectors() -> TestVectors {
    let json = include_str!("vectors.json");
    serde_json::from_str(json).expect("failed to parse test vectors")
}

fn assert_both_ways(node: &Node, hex: &str) {
    let bytes = hex_to_bytes(hex);
    assert_eq!(
        wire::to_bytes(node).unwrap(),
        bytes,
        "wrong encoding for {node}"
    );
    assert_eq!(
        wire::from_bytes(&bytes).unwrap(),
        *node,
        "wrong decoding for bytes: {hex}"
    );
}

#[test]
fn null_vectors() {
    for test in &load_test_vectors().null {
        assert_both_ways(&Node::Null, &test.bytes);
    }
}

macro_rules! scalar_vector_test {
    ($test_name:ident, $category:ident) => {
        #[test]
        fn $test_name() {
            for test in &load_test_vectors().$category {
                let node = Node::from(test.value.clone());
                assert_both_ways(&node, &test.bytes);
            }
        }
    };
}

scalar_vector_test!(bool_vectors, bool);
scalar_vector_test!(i32_vectors, i32);
scalar_vector_test!(u32_vectors, u32);
scalar_vector_test!(i64_vectors, i64);
scalar_vector_test!(u64_vectors, u64);
scalar_vector_test!(f32_vectors, f32);
scalar_vector_test!(f64_vectors, f64);
scalar_vector_test!(str_vectors, str);

macro_rules! array_vector_test {
    ($test_name:ident, $category:ident) => {
        #[test]
        fn $test_name() {
            for test in &load_test_vectors().$category {
                let node: Node = test.values.iter().cloned().collect::<Node>();
                assert_both_ways(&node, &test.bytes);
            }
        }
    };
}

array_vector_test!(arr_i32_vectors, arr_i32);
array_vector_test!(arr_bool_vectors, arr_bool);
array_vector_test!(arr_str_vectors, arr_str);
array_vector_test!(arr_f64_vectors, arr_f64);

fn tree_for(name: &str) -> Node {
    match name {
        "empty_list" => Node::list(),
        "mixed_list" => {
            let mut list = Node::list();
            list.add_child(1i32).unwrap();
            list.add_child("a").unwrap();
            list
        }
        "object_int" => {
            let mut object = Node::parent();
            object.add_named("n", 7i32).unwrap();
            object
        }
        "nested_object" => {
            let mut object = Node::parent();
            object
                .add_named("xs", [1u32].into_iter().collect::<Node>())
                .unwrap();
            object
        }
        other => panic!("unknown tree vector: {other}"),
    }
}

#[test]
fn tree_vectors() {
    for test in &load_test_vectors().trees {
        assert_both_ways(&tree_for(&test.name), &test.bytes);
    }
}

#[test]
fn document_vectors() {
    for test in &load_test_vectors().documents {
        let doc = match test.name.as_str() {
            "null_root" => Document::new(Node::Null),
            other => panic!("unknown document vector: {other}"),
        };
        let bytes = hex_to_bytes(&test.bytes);
        assert_eq!(doc.to_bytes().unwrap(), bytes);
        assert_eq!(Document::from_bytes(&bytes).unwrap(), doc);
    }
}

#[test]
fn varint_vectors() {
    for test in &load_test_vectors().varint {
        let bytes = hex_to_bytes(&test.bytes);
        let mut encoded = Vec::new();
        let written = varint::write_u32(test.value, &mut encoded);
        assert_eq!(encoded, bytes, "wrong encoding for {}", test.value);
        assert_eq!(written, bytes.len());
        assert_eq!(varint::read_u32(&bytes).unwrap(), (test.value, bytes.len()));
    }
}
