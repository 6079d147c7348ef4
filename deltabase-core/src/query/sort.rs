//! Sort builder traits and the [`Reverse`] wrapper.
//!
//! Every sort primitive takes an `ascending` flag; `combine` concatenates
//! sort instructions in priority order. [`Reverse`] wraps any sort builder
//! and inverts every ascending flag passed through it, so
//! `Reverse(Reverse(b))` is observationally identical to `b`.

/// Combinators shared by every sort builder dimension.
pub trait SortCombinators {
    /// The backend's compiled sort type.
    type Sort;

    /// Concatenate sort instructions in priority order.
    fn combine(&self, sorts: Vec<Self::Sort>) -> Self::Sort;
}

/// Sort instructions over committed sources.
pub trait SourceSortBuilder: SortCombinators {
    fn source_id(&self, ascending: bool) -> Self::Sort;

    fn timestamp(&self, ascending: bool) -> Self::Sort;
}

/// Sort instructions over committed messages.
pub trait MessageSortBuilder: SortCombinators {
    fn entity_id(&self, ascending: bool) -> Self::Sort;

    fn entity_version(&self, ascending: bool) -> Self::Sort;

    fn timestamp(&self, ascending: bool) -> Self::Sort;
}

/// Sort instructions over held leases.
pub trait LeaseSortBuilder: SortCombinators {
    fn entity_id(&self, ascending: bool) -> Self::Sort;

    fn scope(&self, ascending: bool) -> Self::Sort;

    fn label(&self, ascending: bool) -> Self::Sort;

    fn value(&self, ascending: bool) -> Self::Sort;
}

/// Sort instructions over attached tags.
pub trait TagSortBuilder: SortCombinators {
    fn entity_id(&self, ascending: bool) -> Self::Sort;

    fn label(&self, ascending: bool) -> Self::Sort;

    fn value(&self, ascending: bool) -> Self::Sort;
}

/// Inverts every ascending flag passed through the wrapped builder.
///
/// Combining is unaffected; priority order is preserved. Wrapping twice
/// restores the original builder's behaviour.
#[derive(Clone, Copy, Debug)]
pub struct Reverse<'a, B>(pub &'a B);

impl<B: SortCombinators> SortCombinators for Reverse<'_, B> {
    type Sort = B::Sort;

    fn combine(&self, sorts: Vec<Self::Sort>) -> Self::Sort {
        self.0.combine(sorts)
    }
}

impl<B: SourceSortBuilder> SourceSortBuilder for Reverse<'_, B> {
    fn source_id(&self, ascending: bool) -> Self::Sort {
        self.0.source_id(!ascending)
    }

    fn timestamp(&self, ascending: bool) -> Self::Sort {
        self.0.timestamp(!ascending)
    }
}

impl<B: MessageSortBuilder> MessageSortBuilder for Reverse<'_, B> {
    fn entity_id(&self, ascending: bool) -> Self::Sort {
        self.0.entity_id(!ascending)
    }

    fn entity_version(&self, ascending: bool) -> Self::Sort {
        self.0.entity_version(!ascending)
    }

    fn timestamp(&self, ascending: bool) -> Self::Sort {
        self.0.timestamp(!ascending)
    }
}

impl<B: LeaseSortBuilder> LeaseSortBuilder for Reverse<'_, B> {
    fn entity_id(&self, ascending: bool) -> Self::Sort {
        self.0.entity_id(!ascending)
    }

    fn scope(&self, ascending: bool) -> Self::Sort {
        self.0.scope(!ascending)
    }

    fn label(&self, ascending: bool) -> Self::Sort {
        self.0.label(!ascending)
    }

    fn value(&self, ascending: bool) -> Self::Sort {
        self.0.value(!ascending)
    }
}

impl<B: TagSortBuilder> TagSortBuilder for Reverse<'_, B> {
    fn entity_id(&self, ascending: bool) -> Self::Sort {
        self.0.entity_id(!ascending)
    }

    fn label(&self, ascending: bool) -> Self::Sort {
        self.0.label(!ascending)
    }

    fn value(&self, ascending: bool) -> Self::Sort {
        self.0.value(!ascending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records each instruction as `(field, ascending)`.
    struct Recording;

    impl SortCombinators for Recording {
        type Sort = Vec<(&'static str, bool)>;

        fn combine(&self, sorts: Vec<Self::Sort>) -> Self::Sort {
            sorts.into_iter().flatten().collect()
        }
    }

    impl MessageSortBuilder for Recording {
        fn entity_id(&self, ascending: bool) -> Self::Sort {
            vec![("entity_id", ascending)]
        }

        fn entity_version(&self, ascending: bool) -> Self::Sort {
            vec![("entity_version", ascending)]
        }

        fn timestamp(&self, ascending: bool) -> Self::Sort {
            vec![("timestamp", ascending)]
        }
    }

    fn program<B: MessageSortBuilder>(builder: &B) -> B::Sort {
        builder.combine(vec![builder.entity_id(true), builder.entity_version(false)])
    }

    #[test]
    fn reverse_inverts_every_ascending_flag() {
        let builder = Recording;
        let reversed = Reverse(&builder);
        assert_eq!(
            program(&reversed),
            vec![("entity_id", false), ("entity_version", true)]
        );
    }

    #[test]
    fn double_reverse_is_identity() {
        let builder = Recording;
        let reversed = Reverse(&builder);
        let restored = Reverse(&reversed);
        assert_eq!(program(&restored), program(&builder));
    }
}
