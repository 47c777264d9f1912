use std::collections::BTreeMap;

/// Counters for one interpretation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PassMetrics {
    pub containers: usize,
    pub shapes: usize,
    /// Shapes dropped because no `<svg>` encloses them.
    pub orphaned_shapes: usize,
    pub unrecognized: usize,
    pub moves: usize,
    pub draws: usize,
    /// Points the visibility tracker dropped as outside the view box.
    pub suppressed: usize,
    pub interpret_ms: f64,
    /// Elements seen, keyed by element name (`unrecognized` for the rest).
    pub by_element: BTreeMap<&'static str, usize>,
}

impl PassMetrics {
    pub fn elements(&self) -> usize {
        self.containers + self.shapes + self.orphaned_shapes + self.unrecognized
    }

    pub fn merge(&mut self, other: &PassMetrics) {
        self.containers += other.containers;
        self.shapes += other.shapes;
        self.orphaned_shapes += other.orphaned_shapes;
        self.unrecognized += other.unrecognized;
        self.moves += other.moves;
        self.draws += other.draws;
        self.suppressed += other.suppressed;
        self.interpret_ms += other.interpret_ms;
        for (name, count) in &other.by_element {
            *self.by_element.entry(*name).or_default() += count;
        }
    }

    /// Flat `(name, count)` list for the debug summary; per-element counts
    /// are prefixed with `element.`.
    pub(crate) fn counts(&self) -> Vec<(String, u64)> {
        let totals = [
            ("containers", self.containers),
            ("shapes", self.shapes),
            ("orphaned_shapes", self.orphaned_shapes),
            ("unrecognized", self.unrecognized),
            ("moves", self.moves),
            ("draws", self.draws),
            ("suppressed", self.suppressed),
        ];
        let per_element = self
            .by_element
            .iter()
            .map(|(name, count)| (format!("element.{name}"), *count));
        totals
            .into_iter()
            .map(|(name, count)| (name.to_string(), count))
            .chain(per_element)
            .map(|(name, count)| (name, count as u64))
            .collect()
    }
}

/// Metrics for a batch of independent passes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchMetrics {
    pub passes: Vec<PassMetrics>,
    pub total: PassMetrics,
}

impl FromIterator<PassMetrics> for BatchMetrics {
    fn from_iter<I: IntoIterator<Item = PassMetrics>>(iter: I) -> Self {
        let mut batch = BatchMetrics::default();
        for pass in iter {
            batch.total.merge(&pass);
            batch.passes.push(pass);
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_totals_add_up() {
        let mut a = PassMetrics {
            shapes: 2,
            draws: 10,
            ..PassMetrics::default()
        };
        let mut b = PassMetrics {
            shapes: 1,
            unrecognized: 3,
            moves: 4,
            ..PassMetrics::default()
        };
        a.by_element.insert("rect", 2);
        b.by_element.insert("rect", 1);
        let batch: BatchMetrics = [a, b].into_iter().collect();
        assert_eq!(batch.passes.len(), 2);
        assert_eq!(batch.total.shapes, 3);
        assert_eq!(batch.total.elements(), 6);
        assert_eq!((batch.total.moves, batch.total.draws), (4, 10));
        assert_eq!(batch.total.by_element.get("rect"), Some(&3));
        assert!(batch.total.counts().contains(&("element.rect".to_string(), 3)));
    }
}
