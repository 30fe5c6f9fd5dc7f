//! Gathers a [`Node`] tree into a namespaced symbol table, lays it out with
//! per-node alignment, writes it, then back-patches every deferred link.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::link_graph::link::Relation;
use crate::link_graph::node::Node;
use crate::stream::Writer;

/// An entry in the flattened traversal order, used for namespaced symbol
/// *name* resolution (mapping a [`crate::link_graph::link::Hook`] id to the
/// fully-qualified symbol string).
struct LayoutEntry<'a> {
    id: &'a str,
    namespace: String,
    alignment: u32,
}

impl LayoutEntry<'_> {
    fn full_id(&self) -> String {
        if self.namespace.is_empty() {
            self.id.to_string()
        } else {
            format!("{}::{}", self.namespace, self.id)
        }
    }
}

/// Begin/end byte position recorded once a symbol has actually been
/// written.
struct WrittenSymbol {
    begin: u32,
    end: u32,
}

/// Builds and resolves a link graph.
#[derive(Default)]
pub struct Linker {
    entries: Vec<(String, String, u32)>, // (id, namespace, alignment) owned
    written: HashMap<String, WrittenSymbol>,
}

enum GatherItem<'a> {
    Real(&'a Node),
    /// Implicit marker following a non-leaf node's children; carries the
    /// owning node's full symbol namespace + id so `write` can record its
    /// position under `<owner>::EndOfChildren`.
    EndOfChildren { owner_namespace: String, owner_id: String },
}

impl Linker {
    pub fn new() -> Self {
        Self::default()
    }

    fn gather_into<'a>(root: &'a Node, namespace: &str, out: &mut Vec<(GatherItem<'a>, String)>) {
        out.push((GatherItem::Real(root), namespace.to_string()));
        let child_namespace = if namespace.is_empty() {
            root.id().to_string()
        } else {
            format!("{namespace}::{}", root.id())
        };
        for child in root.children() {
            Self::gather_into(child, &child_namespace, out);
        }
        if !root.is_leaf() {
            out.push((
                GatherItem::EndOfChildren {
                    owner_namespace: namespace.to_string(),
                    owner_id: root.id().to_string(),
                },
                child_namespace,
            ));
        }
    }

    /// Lay out and write `root`'s subtree into `writer`, then resolve every
    /// link placeholder the callbacks recorded.
    pub fn write(&mut self, root: &Node, writer: &mut Writer) -> Result<()> {
        let mut gathered = Vec::new();
        Self::gather_into(root, "", &mut gathered);

        for (item, namespace) in &gathered {
            if let GatherItem::Real(node) = item {
                self.entries.push((node.id().to_string(), namespace.clone(), node.alignment()));
            }
        }

        for (item, namespace) in &gathered {
            match item {
                GatherItem::Real(node) => {
                    if node.alignment() > 0 {
                        writer.align_to(node.alignment());
                    }
                    let begin = writer.tell();
                    writer.namespace = namespace.clone();
                    writer.block_name = node.id().to_string();
                    node.write_self(writer)?;
                    let mut end = writer.tell();
                    if node.pads_end() && node.alignment() > 0 {
                        writer.align_to(node.alignment());
                        end = writer.tell();
                    }
                    let full_id = if namespace.is_empty() {
                        node.id().to_string()
                    } else {
                        format!("{namespace}::{}", node.id())
                    };
                    self.written.insert(full_id, WrittenSymbol { begin, end });
                }
                GatherItem::EndOfChildren {
                    owner_namespace,
                    owner_id,
                } => {
                    let owner_full = if owner_namespace.is_empty() {
                        owner_id.clone()
                    } else {
                        format!("{owner_namespace}::{owner_id}")
                    };
                    let marker_symbol = format!("{owner_full}::EndOfChildren");
                    let begin = writer.tell();
                    self.written.insert(
                        marker_symbol,
                        WrittenSymbol { begin, end: begin },
                    );
                }
            }
        }

        self.resolve(writer)
    }

    fn find_symbol(&self, symbol: &str, namespace: &str, block_name: &str) -> Result<(String, u32)> {
        let lookup = |full: &str| -> Option<(String, u32)> {
            self.entries
                .iter()
                .find(|(id, ns, _)| {
                    let full_id = if ns.is_empty() { id.clone() } else { format!("{ns}::{id}") };
                    full_id == full
                })
                .map(|(id, ns, align)| {
                    let full_id = if ns.is_empty() { id.clone() } else { format!("{ns}::{id}") };
                    (full_id, *align)
                })
        };

        let same_level = if namespace.is_empty() {
            symbol.to_string()
        } else {
            format!("{namespace}::{symbol}")
        };
        if let Some(found) = lookup(&same_level) {
            return Ok(found);
        }

        let prefix = if namespace.is_empty() {
            String::new()
        } else {
            format!("{namespace}::")
        };
        let children = if block_name.is_empty() {
            format!("{prefix}{symbol}")
        } else {
            format!("{prefix}{block_name}::{symbol}")
        };
        if let Some(found) = lookup(&children) {
            return Ok(found);
        }

        if let Some((id, ns, align)) = self.entries.iter().find(|(id, _, _)| id == symbol) {
            let full_id = if ns.is_empty() { id.clone() } else { format!("{ns}::{id}") };
            return Ok((full_id, *align));
        }

        Err(Error::LinkerUnresolved {
            symbol: symbol.to_string(),
            referenced_from: namespace.to_string(),
        })
    }

    fn resolve_hook(
        &self,
        hook: &crate::link_graph::link::Hook,
        namespace: &str,
        block_name: &str,
    ) -> Result<i64> {
        let (full_symbol, alignment) = self.find_symbol(&hook.id, namespace, block_name)?;
        let align = alignment.max(1);
        let pos = match hook.relation {
            Relation::Begin => {
                let sym = self.written.get(&full_symbol).ok_or_else(|| Error::LinkerUnresolved {
                    symbol: full_symbol.clone(),
                    referenced_from: namespace.to_string(),
                })?;
                sym.begin.div_ceil(align) * align
            }
            Relation::End => {
                let sym = self.written.get(&full_symbol).ok_or_else(|| Error::LinkerUnresolved {
                    symbol: full_symbol.clone(),
                    referenced_from: namespace.to_string(),
                })?;
                sym.end
            }
            Relation::EndOfChildren => {
                let marker_symbol = format!("{full_symbol}::EndOfChildren");
                let sym = self.written.get(&marker_symbol).ok_or_else(|| Error::LinkerUnresolved {
                    symbol: marker_symbol.clone(),
                    referenced_from: namespace.to_string(),
                })?;
                sym.begin.div_ceil(align) * align
            }
        };
        Ok(pos as i64 + hook.offset as i64)
    }

    fn resolve(&mut self, writer: &mut Writer) -> Result<()> {
        let reservations = std::mem::take(&mut writer.reservations);
        for reservation in &reservations {
            let link = &reservation.link;
            let from = self.resolve_hook(&link.from, &reservation.namespace, &reservation.block_name)?;
            let to = self.resolve_hook(&link.to, &reservation.namespace, &reservation.block_name)?;
            let delta = to - from;
            let stride = link.stride.max(1) as i64;
            if delta % stride != 0 {
                return Err(Error::LinkerOverflow {
                    symbol: link.to.id.clone(),
                    delta,
                    width: reservation.width,
                });
            }
            let value = delta / stride;
            write_sized(writer, reservation.addr, reservation.width, value)?;
        }
        Ok(())
    }
}

fn write_sized(writer: &mut Writer, addr: u32, width: u8, value: i64) -> Result<()> {
    use crate::endian::Endian;
    match width {
        1 => {
            let v: i8 = value.try_into().map_err(|_| Error::LinkerOverflow {
                symbol: String::new(),
                delta: value,
                width,
            })?;
            writer.write_at::<i8>(v, addr, Endian::Current);
        }
        2 => {
            let v: i16 = value.try_into().map_err(|_| Error::LinkerOverflow {
                symbol: String::new(),
                delta: value,
                width,
            })?;
            writer.write_at::<i16>(v, addr, Endian::Current);
        }
        4 => {
            let v: i32 = value.try_into().map_err(|_| Error::LinkerOverflow {
                symbol: String::new(),
                delta: value,
                width,
            })?;
            writer.write_at::<i32>(v, addr, Endian::Current);
        }
        8 => {
            writer.write_at::<i64>(value, addr, Endian::Current);
        }
        _ => unreachable!("unsupported link width {width}"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link_graph::link::{Hook, Link};

    #[test]
    fn resolves_simple_forward_reference() {
        // Node A (begin=0, size=4, write a u32 link to "B") and node B
        // aligned to 32 (begin=32). Written u32 at offset 0 equals 32.
        let b = Node::new("B", |_| Ok(())).with_alignment(32).leaf();
        let a = Node::new("A", |w| {
            w.write_link::<u32>(Link::new(Hook::begin("A"), Hook::begin("B")));
            Ok(())
        })
        .leaf()
        .with_children(vec![b]);

        let mut writer = Writer::new();
        let mut linker = Linker::new();
        linker.write(&a, &mut writer).unwrap();

        let bytes = writer.take_bytes();
        let val = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
        assert_eq!(val, 32);
    }

    #[test]
    fn end_of_children_resolves_to_marker_position() {
        let leaf_child = Node::new("child", |w| {
            w.write_bytes(&[1, 2, 3, 4]);
            Ok(())
        })
        .leaf();

        let parent = Node::new("parent", |w| {
            w.write_link::<u32>(Link::new(
                Hook::begin("parent"),
                Hook::end_of_children("parent"),
            ));
            Ok(())
        })
        .with_children(vec![leaf_child]);

        let mut writer = Writer::new();
        let mut linker = Linker::new();
        linker.write(&parent, &mut writer).unwrap();
        let bytes = writer.take_bytes();
        let val = u32::from_be_bytes(bytes[0..4].try_into().unwrap());
        // parent begin=0, write_link occupies [0,4), then child writes [4,8)
        assert_eq!(val, 8);
    }

    #[test]
    fn unresolved_symbol_is_an_error() {
        let a = Node::new("A", |w| {
            w.write_link::<u32>(Link::new(Hook::begin("A"), Hook::begin("missing")));
            Ok(())
        })
        .leaf();
        let mut writer = Writer::new();
        let mut linker = Linker::new();
        assert!(linker.write(&a, &mut writer).is_err());
    }
}
