//! Item snapshots
//!
//! `TypedItem` is an owned mirror of `Item`: no shared handles, no interior
//! mutability. Snapshots are meant for persisting data items (state files,
//! test fixtures, exchange between processes).
//!
//! On the wire a snapshot is a flat, pre-order list of nodes encoded with
//! bincode; a container node carries its child count and is followed by its
//! children. Decoding rebuilds the tree with an explicit stack, so nesting
//! in untrusted input is bounded by `MAX_SNAPSHOT_DEPTH` instead of by the
//! thread's stack.
//!
//! Only data survives a snapshot. Blocks and objects carry code or class
//! identity that belongs to a live symbol table, and pointers are host
//! addresses, so all three are rejected. A by-reference cell is stored as
//! the value it currently views.
//!
//! Hashes keep their flags and their entries in the current iteration
//! order, so a restored hash iterates exactly like the original.

use crate::array::Array;
use crate::date::Date;
use crate::hash::{Hash, HashFlags};
use crate::item::Item;
use crate::string::ItemString;
use serde::{Deserialize, Serialize};

/// Containers nested deeper than this are rejected (covers cyclic arrays)
pub const MAX_SNAPSHOT_DEPTH: usize = 128;

#[derive(Debug)]
pub enum SnapshotError {
    BlockNotSerializable,
    ObjectNotSerializable,
    PointerNotSerializable,
    DanglingReference,
    NonFiniteFloat(f64),
    TooDeep(usize),
    /// Bincode encoding/decoding error
    BincodeError(Box<bincode::Error>),
    InvalidData(String),
}

impl std::fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnapshotError::BlockNotSerializable => {
                write!(f, "blocks cannot be serialized - code is not data")
            }
            SnapshotError::ObjectNotSerializable => {
                write!(f, "objects cannot be serialized - class identity is runtime state")
            }
            SnapshotError::PointerNotSerializable => {
                write!(f, "pointers cannot be serialized - host addresses")
            }
            SnapshotError::DanglingReference => write!(f, "reference to a released slot"),
            SnapshotError::NonFiniteFloat(v) => {
                write!(f, "cannot serialize non-finite double: {}", v)
            }
            SnapshotError::TooDeep(depth) => {
                write!(f, "containers nested deeper than {}", depth)
            }
            SnapshotError::BincodeError(e) => write!(f, "bincode error: {}", e),
            SnapshotError::InvalidData(msg) => write!(f, "invalid data: {}", msg),
        }
    }
}

impl std::error::Error for SnapshotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SnapshotError::BincodeError(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl From<bincode::Error> for SnapshotError {
    fn from(e: bincode::Error) -> Self {
        SnapshotError::BincodeError(Box::new(e))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedItem {
    Nil,
    Logical(bool),
    Integer(i32),
    Long(i64),
    Double(f64),
    /// Julian day number
    Date(i64),
    String(Vec<u8>),
    Array(Vec<TypedItem>),
    Hash {
        flags: u32,
        entries: Vec<(TypedItem, TypedItem)>,
    },
}

impl TypedItem {
    pub fn from_item(item: &Item) -> Result<Self, SnapshotError> {
        Self::from_item_at(item, 0)
    }

    fn from_item_at(item: &Item, depth: usize) -> Result<Self, SnapshotError> {
        if depth > MAX_SNAPSHOT_DEPTH {
            return Err(SnapshotError::TooDeep(MAX_SNAPSHOT_DEPTH));
        }
        match item {
            Item::Nil => Ok(TypedItem::Nil),
            Item::Logical(b) => Ok(TypedItem::Logical(*b)),
            Item::Integer(n) => Ok(TypedItem::Integer(*n)),
            Item::Long(n) => Ok(TypedItem::Long(*n)),
            Item::Double(d) => {
                if !d.is_finite() {
                    return Err(SnapshotError::NonFiniteFloat(*d));
                }
                Ok(TypedItem::Double(*d))
            }
            Item::Date(d) => Ok(TypedItem::Date(d.julian())),
            Item::String(s) => Ok(TypedItem::String(s.as_bytes().to_vec())),
            Item::Array(a) => {
                let a = a.borrow();
                let mut elements = Vec::with_capacity(a.len());
                for element in a.iter() {
                    elements.push(Self::from_item_at(element, depth + 1)?);
                }
                Ok(TypedItem::Array(elements))
            }
            Item::Hash(h) => {
                let h = h.borrow();
                let mut entries = Vec::with_capacity(h.len());
                for (key, value) in h.iter() {
                    entries.push((
                        Self::from_item_at(key, depth + 1)?,
                        Self::from_item_at(value, depth + 1)?,
                    ));
                }
                Ok(TypedItem::Hash {
                    flags: h.flags().bits(),
                    entries,
                })
            }
            Item::Object(_) => Err(SnapshotError::ObjectNotSerializable),
            Item::Block(_) => Err(SnapshotError::BlockNotSerializable),
            Item::Pointer(_) => Err(SnapshotError::PointerNotSerializable),
            Item::ByRef(r) => match r.get() {
                Some(value) => Self::from_item_at(&value, depth),
                None => Err(SnapshotError::DanglingReference),
            },
        }
    }

    /// Rebuild a live item (fresh containers, nothing shared)
    pub fn to_item(&self) -> Result<Item, SnapshotError> {
        match self {
            TypedItem::Nil => Ok(Item::Nil),
            TypedItem::Logical(b) => Ok(Item::Logical(*b)),
            TypedItem::Integer(n) => Ok(Item::Integer(*n)),
            TypedItem::Long(n) => Ok(Item::Long(*n)),
            TypedItem::Double(d) => Ok(Item::Double(*d)),
            TypedItem::Date(jd) => Ok(Item::Date(Date::from_julian(*jd))),
            TypedItem::String(bytes) => Ok(Item::String(ItemString::from_bytes(bytes.clone()))),
            TypedItem::Array(elements) => {
                let mut array = Array::with_capacity(elements.len());
                for element in elements {
                    array.append(element.to_item()?);
                }
                Ok(Item::array(array))
            }
            TypedItem::Hash { flags, entries } => {
                // Insert in insertion-order mode so the stored order is
                // reproduced, then switch to the recorded flags.
                let flags = HashFlags::from_bits_truncate(*flags);
                let mut hash = Hash::new((flags | HashFlags::KEEPORDER) - HashFlags::IGNORECASE);
                hash.preallocate(entries.len());
                for (key, value) in entries {
                    hash.add(key.to_item()?, value.to_item()?)
                        .map_err(|e| SnapshotError::InvalidData(e.to_string()))?;
                }
                if flags.contains(HashFlags::IGNORECASE) {
                    hash.set_flags(HashFlags::IGNORECASE);
                }
                if !flags.contains(HashFlags::KEEPORDER) {
                    hash.clear_flags(HashFlags::KEEPORDER);
                }
                Ok(Item::hash(hash))
            }
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(&self.to_nodes()).map_err(SnapshotError::from)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        let nodes: Vec<Node> = bincode::deserialize(bytes)?;
        Self::from_nodes(nodes)
    }

    fn to_nodes(&self) -> Vec<Node> {
        let mut nodes = Vec::new();
        let mut pending = vec![self];
        while let Some(item) = pending.pop() {
            let node = match item {
                TypedItem::Nil => Node::Nil,
                TypedItem::Logical(b) => Node::Logical(*b),
                TypedItem::Integer(n) => Node::Integer(*n),
                TypedItem::Long(n) => Node::Long(*n),
                TypedItem::Double(d) => Node::Double(*d),
                TypedItem::Date(jd) => Node::Date(*jd),
                TypedItem::String(bytes) => Node::String(bytes.clone()),
                TypedItem::Array(elements) => {
                    pending.extend(elements.iter().rev());
                    Node::Array(elements.len() as u64)
                }
                TypedItem::Hash { flags, entries } => {
                    for (key, value) in entries.iter().rev() {
                        pending.push(value);
                        pending.push(key);
                    }
                    Node::Hash {
                        flags: *flags,
                        len: entries.len() as u64,
                    }
                }
            };
            nodes.push(node);
        }
        nodes
    }

    fn from_nodes(nodes: Vec<Node>) -> Result<Self, SnapshotError> {
        let mut open: Vec<Open> = Vec::new();
        let mut root = None;
        let mut nodes = nodes.into_iter();

        while let Some(node) = nodes.next() {
            if root.is_some() {
                return Err(SnapshotError::InvalidData("trailing nodes".to_string()));
            }
            if open.len() > MAX_SNAPSHOT_DEPTH {
                return Err(SnapshotError::TooDeep(MAX_SNAPSHOT_DEPTH));
            }
            let remaining = nodes.len();
            let mut done = match node {
                Node::Nil => Some(TypedItem::Nil),
                Node::Logical(b) => Some(TypedItem::Logical(b)),
                Node::Integer(n) => Some(TypedItem::Integer(n)),
                Node::Long(n) => Some(TypedItem::Long(n)),
                Node::Double(d) => Some(TypedItem::Double(d)),
                Node::Date(jd) => Some(TypedItem::Date(jd)),
                Node::String(bytes) => Some(TypedItem::String(bytes)),
                Node::Array(len) => {
                    open.push(Open::new(None, len, 1, remaining)?);
                    None
                }
                Node::Hash { flags, len } => {
                    open.push(Open::new(Some(flags), len, 2, remaining)?);
                    None
                }
            };

            // hand finished items to their parent, closing full containers
            loop {
                if let Some(item) = done.take() {
                    match open.last_mut() {
                        Some(parent) => parent.children.push(item),
                        None => root = Some(item),
                    }
                }
                match open.last() {
                    Some(top) if top.is_full() => done = open.pop().map(Open::close),
                    _ => break,
                }
            }
        }

        if !open.is_empty() {
            return Err(SnapshotError::InvalidData("truncated snapshot".to_string()));
        }
        root.ok_or_else(|| SnapshotError::InvalidData("empty snapshot".to_string()))
    }
}

/// Wire form: one node per item, containers followed by their children
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
enum Node {
    Nil,
    Logical(bool),
    Integer(i32),
    Long(i64),
    Double(f64),
    Date(i64),
    String(Vec<u8>),
    Array(u64),
    Hash { flags: u32, len: u64 },
}

/// A container still collecting its children while decoding
struct Open {
    /// `Some(flags)` for hashes, whose children alternate key and value
    hash_flags: Option<u32>,
    wanted: usize,
    children: Vec<TypedItem>,
}

impl Open {
    fn new(
        hash_flags: Option<u32>,
        len: u64,
        per_entry: usize,
        remaining: usize,
    ) -> Result<Self, SnapshotError> {
        // every child takes at least one node
        let wanted = usize::try_from(len)
            .ok()
            .and_then(|n| n.checked_mul(per_entry))
            .filter(|&n| n <= remaining)
            .ok_or_else(|| {
                SnapshotError::InvalidData(format!(
                    "container of {} entries with {} nodes left",
                    len, remaining
                ))
            })?;
        Ok(Open {
            hash_flags,
            wanted,
            children: Vec::with_capacity(wanted),
        })
    }

    fn is_full(&self) -> bool {
        self.children.len() == self.wanted
    }

    fn close(self) -> TypedItem {
        match self.hash_flags {
            None => TypedItem::Array(self.children),
            Some(flags) => {
                let mut children = self.children.into_iter();
                let mut entries = Vec::with_capacity(self.wanted / 2);
                while let (Some(key), Some(value)) = (children.next(), children.next()) {
                    entries.push((key, value));
                }
                TypedItem::Hash { flags, entries }
            }
        }
    }
}

/// Snapshot an item straight to bytes
pub fn to_bytes(item: &Item) -> Result<Vec<u8>, SnapshotError> {
    TypedItem::from_item(item)?.to_bytes()
}

/// Restore an item from snapshot bytes
pub fn from_bytes(bytes: &[u8]) -> Result<Item, SnapshotError> {
    TypedItem::from_bytes(bytes)?.to_item()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Block, Object, Slot};
    use crate::symbol::Symbol;

    #[test]
    fn test_nested_containers_restore() {
        let mut h = Hash::new(HashFlags::IGNORECASE | HashFlags::KEEPORDER);
        h.add("Nombre", "Ana").unwrap();
        h.add(2, Item::Date(Date::from_ymd(2021, 5, 17))).unwrap();
        let arr = Item::array(Array::from(vec![
            Item::Long(95_415_545_541),
            Item::hash(h),
            Item::from("x\0y"),
        ]));

        let back = from_bytes(&to_bytes(&arr).unwrap()).unwrap();
        assert_eq!(back, arr);

        // restored hash still matches case-insensitively
        let restored = back.as_array().unwrap().borrow().get(2).unwrap().clone();
        let restored = restored.as_hash().unwrap().borrow();
        assert_eq!(restored.get(&Item::from("NOMBRE")), Some(&Item::from("Ana")));
    }

    #[test]
    fn test_sorted_hash_restores_sorted() {
        let mut h = Hash::new(HashFlags::BINARY);
        h.add("b", 1).unwrap();
        h.add("a", 2).unwrap();
        let item = Item::hash(h);
        let back = from_bytes(&to_bytes(&item).unwrap()).unwrap();
        assert_eq!(back, item);
        assert_eq!(
            back.as_hash().unwrap().borrow().flags(),
            HashFlags::BINARY
        );
    }

    #[test]
    fn test_code_and_host_values_rejected() {
        let block = Item::block(Block::new(Symbol::from_index(1), vec![]));
        assert!(matches!(
            TypedItem::from_item(&block),
            Err(SnapshotError::BlockNotSerializable)
        ));
        let obj = Item::object(Object::new("persona", 1));
        assert!(matches!(
            TypedItem::from_item(&obj),
            Err(SnapshotError::ObjectNotSerializable)
        ));
        assert!(matches!(
            TypedItem::from_item(&Item::Pointer(1)),
            Err(SnapshotError::PointerNotSerializable)
        ));
        assert!(matches!(
            TypedItem::from_item(&Item::Double(f64::NAN)),
            Err(SnapshotError::NonFiniteFloat(_))
        ));
    }

    #[test]
    fn test_references_store_their_value() {
        let slot = Slot::new("valor");
        let typed = TypedItem::from_item(&slot.by_ref()).unwrap();
        assert_eq!(typed, TypedItem::String(b"valor".to_vec()));

        let dead = slot.by_ref();
        drop(slot);
        assert!(matches!(
            TypedItem::from_item(&dead),
            Err(SnapshotError::DanglingReference)
        ));
    }

    #[test]
    fn test_cyclic_array_is_too_deep() {
        let arr = Item::new_array(1);
        arr.as_array()
            .unwrap()
            .borrow_mut()
            .set(1, arr.clone())
            .unwrap();
        assert!(matches!(
            TypedItem::from_item(&arr),
            Err(SnapshotError::TooDeep(_))
        ));
        // break the cycle so the test does not leak
        arr.as_array().unwrap().borrow_mut().set(1, Item::Nil).unwrap();
    }

    fn nested_arrays(levels: usize) -> Item {
        let mut item = Item::Nil;
        for _ in 0..levels {
            item = Item::array(Array::from(vec![item]));
        }
        item
    }

    #[test]
    fn test_nesting_at_the_limit_restores() {
        let item = nested_arrays(MAX_SNAPSHOT_DEPTH);
        let back = from_bytes(&to_bytes(&item).unwrap()).unwrap();
        assert_eq!(back, item);

        assert!(matches!(
            to_bytes(&nested_arrays(MAX_SNAPSHOT_DEPTH + 1)),
            Err(SnapshotError::TooDeep(_))
        ));
    }

    #[test]
    fn test_deeply_nested_input_is_rejected() {
        let mut nodes = vec![Node::Array(1); 5000];
        nodes.push(Node::Nil);
        let bytes = bincode::serialize(&nodes).unwrap();
        assert!(matches!(
            from_bytes(&bytes),
            Err(SnapshotError::TooDeep(MAX_SNAPSHOT_DEPTH))
        ));

        let mut hashes = vec![Node::Hash { flags: 0, len: 1 }; 5000];
        hashes.push(Node::Nil);
        hashes.extend(vec![Node::Nil; 5000]);
        let bytes = bincode::serialize(&hashes).unwrap();
        assert!(matches!(
            from_bytes(&bytes),
            Err(SnapshotError::TooDeep(MAX_SNAPSHOT_DEPTH))
        ));
    }

    #[test]
    fn test_tagged_nesting_bytes_fail_cleanly() {
        // 5000 x (array tag, length 1) then a nil tag
        let mut bytes = Vec::new();
        for _ in 0..5000 {
            bytes.extend_from_slice(&7u32.to_le_bytes());
            bytes.extend_from_slice(&1u64.to_le_bytes());
        }
        bytes.extend_from_slice(&0u32.to_le_bytes());
        assert!(from_bytes(&bytes).is_err());
    }

    #[test]
    fn test_malformed_node_lists() {
        let decode = |nodes: Vec<Node>| from_bytes(&bincode::serialize(&nodes).unwrap());

        assert!(matches!(
            decode(vec![Node::Array(2), Node::Nil]),
            Err(SnapshotError::InvalidData(_))
        ));
        assert!(matches!(
            decode(vec![Node::Hash { flags: 0, len: 1 }, Node::Nil]),
            Err(SnapshotError::InvalidData(_))
        ));
        assert!(matches!(
            decode(vec![Node::Nil, Node::Integer(1)]),
            Err(SnapshotError::InvalidData(_))
        ));
        assert!(matches!(decode(vec![]), Err(SnapshotError::InvalidData(_))));
        assert!(matches!(
            decode(vec![Node::Array(u64::MAX)]),
            Err(SnapshotError::InvalidData(_))
        ));
    }

    #[test]
    fn test_empty_containers_close_immediately() {
        let item = Item::array(Array::from(vec![
            Item::new_array(0),
            Item::hash(Hash::new(HashFlags::KEEPORDER)),
            Item::Integer(3),
        ]));
        let back = from_bytes(&to_bytes(&item).unwrap()).unwrap();
        assert_eq!(back, item);
    }
}
