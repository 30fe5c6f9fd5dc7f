//! Placeholder descriptions: [`Hook`], [`Relation`] and [`Link`].
//!
//! These are pure data — the linker (in [`super::linker`]) is what walks
//! the symbol table and turns a [`Link`] into a byte offset.

/// Which edge of a symbol's written range a [`Hook`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// The first byte the symbol wrote.
    Begin,
    /// One past the last byte the symbol wrote.
    End,
    /// The position of the implicit `EndOfChildren` marker appended after
    /// the symbol's children (meaningless for leaf symbols).
    EndOfChildren,
}

/// One end of a [`Link`]: either a concrete node id (resolved during
/// `gather`) or a symbolic name looked up at resolve time.
#[derive(Debug, Clone)]
pub struct Hook {
    /// Symbol id. For namespaced lookups this is resolved in three passes:
    /// same-namespace, then `namespace::block::id`, then global.
    pub id: String,
    pub relation: Relation,
    /// Literal byte offset added after resolution.
    pub offset: i32,
}

impl Hook {
    pub fn begin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            relation: Relation::Begin,
            offset: 0,
        }
    }

    pub fn end(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            relation: Relation::End,
            offset: 0,
        }
    }

    pub fn end_of_children(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            relation: Relation::EndOfChildren,
            offset: 0,
        }
    }

    pub fn with_offset(mut self, offset: i32) -> Self {
        self.offset = offset;
        self
    }
}

/// A write-time placeholder: the final written value is
/// `(to - from) / stride`, widened or narrowed to the reservation's
/// integer width.
#[derive(Debug, Clone)]
pub struct Link {
    pub from: Hook,
    pub to: Hook,
    pub stride: i32,
}

impl Link {
    pub fn new(from: Hook, to: Hook) -> Self {
        Self { from, to, stride: 1 }
    }

    pub fn with_stride(mut self, stride: i32) -> Self {
        self.stride = stride;
        self
    }
}
