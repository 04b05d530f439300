//! Build a tree, layer a sorted map onto part of it, and round-trip the
//! whole thing through the wire format.
//!
//! cargo run --package bion --example map_roundtrip

use bion::{Document, Node, OrderedMap};

fn main() -> Result<(), bion::Error> {
    let mut prices = OrderedMap::<u32, f64>::new();
    prices.insert(250, 1.25)?;
    prices.insert(100, 0.40)?;
    prices.insert(500, 2.10)?;

    let mut root = Node::parent();
    root.add_named("store", "corner shop")?;
    root.add_named("prices", prices.into_node())?;

    let bytes = Document::new(root).to_bytes()?;
    println!("encoded {} bytes", bytes.len());

    let doc = Document::from_bytes(&bytes)?;
    let prices = OrderedMap::<u32, f64>::from_node(
        doc.root().named("prices").cloned().unwrap_or_default(),
    )?;

    prices.for_each(|grams, price| println!("{grams} g -> {price:.2}"))?;
    Ok(())
}
