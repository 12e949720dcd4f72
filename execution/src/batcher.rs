//! Greedy packing of operations into size-bounded batches.

use serde::Serialize;
use tracing::warn;

/// Estimated encoded size of an operation inside a batch.
pub trait SerializedSize {
    fn serialized_size(&self) -> usize;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Batch<T> {
    pub operations: Vec<T>,
    pub size: usize,
    /// Holds a single operation larger than the ceiling.
    pub oversized: bool,
}

impl<T> Batch<T> {
    fn empty() -> Self {
        Self {
            operations: Vec::new(),
            size: 0,
            oversized: false,
        }
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Packs `operations` in order, closing a batch whenever the next operation
/// would push it past `ceiling` bytes.
///
/// An operation that alone exceeds the ceiling is emitted in a batch of its
/// own with `oversized` set. Flattening the result yields the input.
pub fn pack<T: SerializedSize>(operations: Vec<T>, ceiling: usize) -> Vec<Batch<T>> {
    let mut batches = Vec::new();
    let mut current = Batch::empty();
    for operation in operations {
        let size = operation.serialized_size();
        if size > ceiling {
            warn!(size, ceiling, "operation exceeds batch ceiling, sending alone");
            if !current.is_empty() {
                batches.push(std::mem::replace(&mut current, Batch::empty()));
            }
            batches.push(Batch {
                operations: vec![operation],
                size,
                oversized: true,
            });
            continue;
        }
        if current.size + size > ceiling {
            batches.push(std::mem::replace(&mut current, Batch::empty()));
        }
        current.size += size;
        current.operations.push(operation);
    }
    if !current.is_empty() {
        batches.push(current);
    }
    batches
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq)]
    struct Op(usize, usize);

    impl SerializedSize for Op {
        fn serialized_size(&self) -> usize {
            self.1
        }
    }

    fn ops(sizes: &[usize]) -> Vec<Op> {
        sizes.iter().enumerate().map(|(i, s)| Op(i, *s)).collect()
    }

    #[test]
    fn test_seven_transfers_pack_six_and_one() {
        let batches = pack(ops(&[150; 7]), 900);
        let lens: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(lens, vec![6, 1]);
        assert_eq!(batches[0].size, 900);
        assert_eq!(batches[1].size, 150);
    }

    #[test]
    fn test_empty_input_has_no_batches() {
        assert!(pack(Vec::<Op>::new(), 900).is_empty());
    }

    #[test]
    fn test_oversized_operation_sent_alone() {
        let batches = pack(ops(&[100, 1_000, 100]), 900);
        assert_eq!(batches.len(), 3);
        assert!(!batches[0].oversized);
        assert!(batches[1].oversized);
        assert_eq!(batches[1].operations, vec![Op(1, 1_000)]);
        assert!(!batches[2].oversized);
    }

    #[test]
    fn test_exact_fit_stays_in_batch() {
        let batches = pack(ops(&[450, 450, 1]), 900);
        let lens: Vec<usize> = batches.iter().map(Batch::len).collect();
        assert_eq!(lens, vec![2, 1]);
    }

    proptest! {
        #[test]
        fn prop_batches_preserve_order_and_bound(
            sizes in prop::collection::vec(1usize..1_200, 0..60),
            ceiling in 100usize..1_000,
        ) {
            let input = ops(&sizes);
            let batches = pack(input.clone(), ceiling);
            let flattened: Vec<Op> = batches
                .iter()
                .flat_map(|b| b.operations.iter().cloned())
                .collect();
            prop_assert_eq!(flattened, input);
            for batch in &batches {
                prop_assert!(!batch.is_empty());
                prop_assert_eq!(
                    batch.size,
                    batch.operations.iter().map(|o| o.1).sum::<usize>()
                );
                if batch.oversized {
                    prop_assert_eq!(batch.len(), 1);
                } else {
                    prop_assert!(batch.size <= ceiling);
                }
            }
        }
    }
}
