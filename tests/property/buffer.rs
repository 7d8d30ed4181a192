use proptest::prelude::*;
use slotrunner::slot::OutputBuffer;

proptest! {
    // The buffer never exceeds its bound and always holds the newest chunks.
    #[test]
    fn keeps_newest_chunks_within_capacity(
        capacity in 1usize..50,
        chunks in proptest::collection::vec("[a-z0-9\n]{0,8}", 0..200),
    ) {
        let mut buf = OutputBuffer::new(capacity);
        for chunk in &chunks {
            buf.push(chunk.clone());
            prop_assert!(buf.len() <= capacity);
        }

        let keep = chunks.len().min(capacity);
        let expected: String = chunks[chunks.len() - keep..].concat();
        prop_assert_eq!(buf.evicted() as usize, chunks.len() - keep);
        prop_assert_eq!(buf.drain(), expected);
        prop_assert!(buf.is_empty());
    }

    // Interleaved drains never lose or duplicate chunks that fit.
    #[test]
    fn interleaved_drains_preserve_order(
        ops in proptest::collection::vec(prop_oneof![Just(None), "[a-z]{1,4}".prop_map(Some)], 0..100),
    ) {
        let mut buf = OutputBuffer::new(1000);
        let mut seen = String::new();
        let mut pushed = String::new();

        for op in ops {
            match op {
                Some(chunk) => {
                    pushed.push_str(&chunk);
                    buf.push(chunk);
                }
                None => seen.push_str(&buf.drain()),
            }
        }
        seen.push_str(&buf.drain());

        prop_assert_eq!(seen, pushed);
    }
}
