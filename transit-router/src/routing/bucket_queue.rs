//! Dial bucket queue.
//!
//! Items are filed under a small integer priority. `pop` returns an item of
//! the lowest non-empty bucket; within a bucket the most recently pushed
//! item comes first. Priorities above the maximum share the last bucket.

#[derive(Debug, Clone)]
pub struct BucketQueue<T> {
    buckets: Vec<Vec<T>>,
    current: usize,
    len: usize,
}

impl<T> BucketQueue<T> {
    /// Create a queue accepting priorities `0..=max_bucket`.
    pub fn new(max_bucket: usize) -> Self {
        let mut buckets = Vec::with_capacity(max_bucket + 1);
        buckets.resize_with(max_bucket + 1, Vec::new);
        Self {
            buckets,
            current: 0,
            len: 0,
        }
    }

    pub fn push(&mut self, bucket: usize, item: T) {
        let bucket = bucket.min(self.buckets.len() - 1);
        self.buckets[bucket].push(item);
        if bucket < self.current || self.len == 0 {
            self.current = bucket;
        }
        self.len += 1;
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.len == 0 {
            return None;
        }
        while self.current < self.buckets.len() {
            if let Some(item) = self.buckets[self.current].pop() {
                self.len -= 1;
                return Some(item);
            }
            self.current += 1;
        }
        None
    }

    /// Priority of the bucket the next `pop` reads from.
    pub fn min_bucket(&self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        (self.current..self.buckets.len()).find(|b| !self.buckets[*b].is_empty())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.current = 0;
        self.len = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_lowest_bucket_first() {
        let mut q = BucketQueue::new(10);
        q.push(5, "five");
        q.push(2, "two");
        q.push(7, "seven");

        assert_eq!(q.len(), 3);
        assert_eq!(q.min_bucket(), Some(2));
        assert_eq!(q.pop(), Some("two"));
        assert_eq!(q.pop(), Some("five"));
        assert_eq!(q.pop(), Some("seven"));
        assert_eq!(q.pop(), None);
        assert!(q.is_empty());
    }

    #[test]
    fn same_bucket_is_lifo() {
        let mut q = BucketQueue::new(3);
        q.push(1, 'a');
        q.push(1, 'b');
        assert_eq!(q.pop(), Some('b'));
        assert_eq!(q.pop(), Some('a'));
    }

    #[test]
    fn push_below_current_bucket() {
        let mut q = BucketQueue::new(10);
        q.push(6, 6);
        q.push(8, 8);
        assert_eq!(q.pop(), Some(6));
        q.push(1, 1);
        assert_eq!(q.pop(), Some(1));
        assert_eq!(q.pop(), Some(8));
    }

    #[test]
    fn large_priorities_are_clamped() {
        let mut q = BucketQueue::new(4);
        q.push(1000, "far");
        q.push(4, "edge");
        assert_eq!(q.min_bucket(), Some(4));
        assert_eq!(q.pop(), Some("edge"));
        assert_eq!(q.pop(), Some("far"));
    }

    #[test]
    fn clear_resets() {
        let mut q = BucketQueue::new(4);
        q.push(3, 1);
        q.push(2, 2);
        q.clear();
        assert!(q.is_empty());
        q.push(4, 9);
        assert_eq!(q.pop(), Some(9));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            // ========== Ordering properties ==========

            #[test]
            fn pops_in_nondecreasing_bucket_order(
                items in prop::collection::vec(0usize..50, 0..100),
            ) {
                let mut q = BucketQueue::new(40);
                for item in &items {
                    q.push(*item, (*item).min(40));
                }
                let mut last = 0;
                let mut popped = 0;
                while let Some(bucket) = q.pop() {
                    prop_assert!(bucket >= last);
                    last = bucket;
                    popped += 1;
                }
                prop_assert_eq!(popped, items.len());
            }
        }
    }
}
