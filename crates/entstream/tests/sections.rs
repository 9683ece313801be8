// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2026 entstream contributors
//
// Randomized recursive section hierarchies: nested sections, section arrays
// with index layers, optional subtrees, plus structural failure modes
// (LIFO violations, truncation, corrupted lengths).

#![allow(clippy::missing_panics_doc)]

use entstream::{
    types::FMat4, EntityReader, EntityWriter, Error, Result,
};

#[derive(Debug, Clone, PartialEq)]
struct Node {
    name: Option<String>,
    transform: FMat4,
    sub: Option<Box<Node>>,
    children: Vec<Node>,
    sparse: Option<(Vec<Node>, Vec<i32>)>,
}

impl Node {
    fn write(&self, w: &mut EntityWriter) -> Result<()> {
        w.write_value_opt("Name", self.name.as_ref())?;
        w.write_value("Transform", &self.transform)?;
        match &self.sub {
            Some(sub) => {
                let section = w.begin_section("Sub")?;
                sub.write(w)?;
                w.end_section(section)?;
            }
            None => w.write_null_section("Sub")?,
        }
        let arr = w.begin_section_array("Children", self.children.len(), None)?;
        for (idx, child) in self.children.iter().enumerate() {
            w.begin_array_element(arr, idx)?;
            child.write(w)?;
            w.end_array_element(arr, idx)?;
        }
        w.end_section_array(arr)?;
        match &self.sparse {
            Some((nodes, index)) => {
                let arr = w.begin_section_array("Sparse", nodes.len(), Some(index))?;
                for (idx, node) in nodes.iter().enumerate() {
                    w.begin_array_element(arr, idx)?;
                    node.write(w)?;
                    w.end_array_element(arr, idx)?;
                }
                w.end_section_array(arr)
            }
            None => w.write_null_section_array("Sparse"),
        }
    }

    fn read(r: &mut EntityReader<'_>) -> Result<Self> {
        let name = r.read_value_opt("Name")?;
        let transform = r.read_value("Transform")?;
        let sub = match r.begin_section("Sub", false)? {
            Some(section) => {
                let node = Node::read(r)?;
                r.end_section(section)?;
                Some(Box::new(node))
            }
            None => None,
        };
        let (arr, info) = match r.begin_section_array("Children", true)? {
            Some(open) => open,
            None => unreachable!("required array"),
        };
        let mut children = Vec::with_capacity(info.len);
        for idx in 0..info.len {
            r.begin_array_element(arr, idx)?;
            children.push(Node::read(r)?);
            r.end_array_element(arr, idx)?;
        }
        r.end_section_array(arr)?;
        let sparse = match r.begin_section_array("Sparse", false)? {
            Some((arr, info)) => {
                let mut nodes = Vec::with_capacity(info.len);
                for idx in 0..info.len {
                    r.begin_array_element(arr, idx)?;
                    nodes.push(Node::read(r)?);
                    r.end_array_element(arr, idx)?;
                }
                r.end_section_array(arr)?;
                Some((nodes, info.index))
            }
            None => None,
        };
        Ok(Self {
            name,
            transform,
            sub,
            children,
            sparse,
        })
    }
}

fn random_name() -> Option<String> {
    if fastrand::bool() {
        Some((0..fastrand::usize(0..12)).map(|_| fastrand::alphanumeric()).collect())
    } else {
        None
    }
}

fn random_transform() -> FMat4 {
    let mut lanes = [0.0f32; 16];
    for lane in &mut lanes {
        *lane = fastrand::i16(..) as f32;
    }
    FMat4::from(lanes)
}

fn random_node(depth: usize) -> Node {
    let fanout = if depth == 0 { 0 } else { fastrand::usize(0..3) };
    let children: Vec<Node> = (0..fanout).map(|_| random_node(depth - 1)).collect();
    let sub = (depth > 0 && fastrand::bool()).then(|| Box::new(random_node(depth - 1)));
    let sparse = (depth > 0 && fastrand::bool()).then(|| {
        let nodes: Vec<Node> = (0..fastrand::usize(0..3))
            .map(|_| random_node(depth - 1))
            .collect();
        // index is empty (dense) or names one logical slot per element
        let index: Vec<i32> = if fastrand::bool() {
            (0..nodes.len()).map(|_| fastrand::i32(0..100)).collect()
        } else {
            Vec::new()
        };
        (nodes, index)
    });
    Node {
        name: random_name(),
        transform: random_transform(),
        sub,
        children,
        sparse,
    }
}

fn encode(node: &Node) -> Vec<u8> {
    let mut w = EntityWriter::new();
    node.write(&mut w).expect("write");
    w.finish().expect("finish")
}

#[test]
fn test_random_hierarchy_roundtrips() {
    for _ in 0..20 {
        let original = random_node(4);
        let bytes = encode(&original);
        let mut r = EntityReader::new(&bytes);
        let restored = Node::read(&mut r).expect("read");
        r.finish().expect("exhausted");
        assert_eq!(original, restored);
    }
}

#[test]
fn test_deeply_nested_sections_roundtrip() {
    let mut w = EntityWriter::new();
    let tokens: Vec<_> = (0..64)
        .map(|_| w.begin_section("N").expect("begin"))
        .collect();
    w.write_value("Leaf", &7u8).expect("write");
    for token in tokens.into_iter().rev() {
        w.end_section(token).expect("end");
    }
    let bytes = w.finish().expect("finish");

    let mut r = EntityReader::new(&bytes);
    let tokens: Vec<_> = (0..64)
        .map(|_| {
            r.begin_section("N", true)
                .expect("begin")
                .expect("present")
        })
        .collect();
    assert_eq!(r.read_value::<u8>("Leaf").expect("leaf"), 7);
    for token in tokens.into_iter().rev() {
        r.end_section(token).expect("end");
    }
    r.finish().expect("exhausted");
}

#[test]
fn test_reader_lifo_violation_is_rejected() {
    let mut w = EntityWriter::new();
    let outer = w.begin_section("A").expect("outer");
    let inner = w.begin_section("B").expect("inner");
    w.end_section(inner).expect("end inner");
    w.end_section(outer).expect("end outer");
    let bytes = w.finish().expect("finish");

    let mut r = EntityReader::new(&bytes);
    let outer = r.begin_section("A", true).expect("outer").expect("present");
    let _inner = r.begin_section("B", true).expect("inner").expect("present");
    assert_eq!(r.end_section(outer), Err(Error::SectionMismatch));
}

#[test]
fn test_truncated_hierarchy_fails_with_truncated() {
    let original = random_node(3);
    let bytes = encode(&original);
    for cut in [1, bytes.len() / 2, bytes.len() - 1] {
        let mut r = EntityReader::new(&bytes[..cut]);
        let err = Node::read(&mut r).unwrap_err();
        assert!(
            matches!(
                err,
                Error::Truncated { .. }
                    | Error::KeyMismatch { .. }
                    | Error::MarkerMismatch { .. }
                    | Error::SectionLengthMismatch { .. }
            ),
            "cut at {cut}: {err}"
        );
    }
}

#[test]
fn test_corrupted_section_length_is_detected() {
    let mut w = EntityWriter::new();
    let s = w.begin_section("S").expect("begin");
    w.write_value("A", &1u64).expect("write");
    w.end_section(s).expect("end");
    let mut bytes = w.finish().expect("finish");

    // Length slot sits after marker + key_len + 1 key byte + presence.
    bytes[4..12].copy_from_slice(&3u64.to_le_bytes());
    let mut r = EntityReader::new(&bytes);
    let err = (|| -> Result<()> {
        let s = match r.begin_section("S", true)? {
            Some(s) => s,
            None => return Ok(()),
        };
        r.read_value::<u64>("A")?;
        r.end_section(s)
    })()
    .unwrap_err();
    assert!(matches!(
        err,
        Error::Truncated { .. } | Error::SectionLengthMismatch { .. }
    ));
}

#[test]
fn test_writer_abandoned_array_cannot_finish() {
    let mut w = EntityWriter::new();
    let arr = w.begin_section_array("Items", 2, None).expect("begin");
    w.begin_array_element(arr, 0).expect("elem");
    w.end_array_element(arr, 0).expect("end elem");
    assert_eq!(w.finish(), Err(Error::UnbalancedSections(1)));
}
