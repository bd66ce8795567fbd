use std::collections::VecDeque;

/// Bounded feed of the latest items; the newest `display` of them are shown.
#[derive(Debug, Clone)]
pub struct RecentSamples<T> {
    items: VecDeque<T>,
    capacity: usize,
    display: usize,
}

impl<T> RecentSamples<T> {
    pub fn new(capacity: usize, display: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
            display: display.min(capacity),
        }
    }

    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) {
        for item in items {
            self.push(item);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The newest `display` items, oldest first.
    pub fn displayed(&self) -> impl Iterator<Item = &T> {
        let skip = self.items.len().saturating_sub(self.display);
        self.items.iter().skip(skip)
    }
}

#[cfg(test)]
mod tests {
    use super::RecentSamples;

    #[test]
    fn keeps_only_the_latest_capacity_items() {
        let mut recent = RecentSamples::new(20, 10);
        recent.extend(0..35);
        assert_eq!(recent.len(), 20);
        let shown: Vec<i32> = recent.displayed().copied().collect();
        assert_eq!(shown, (25..35).collect::<Vec<_>>());
    }

    #[test]
    fn displays_everything_while_filling() {
        let mut recent = RecentSamples::new(20, 10);
        recent.extend(["a", "b", "c"]);
        assert_eq!(recent.displayed().count(), 3);
        assert!(!recent.is_empty());
    }
}
