//! Grid line clustering.

/// Ordered grid lines along one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct GridLines {
    positions: Vec<f32>,
}

impl GridLines {
    /// Cluster raw edge positions into lines.
    ///
    /// Edges are sorted and swept once; an edge joins the current cluster
    /// while it lies within `tolerance` of the cluster mean. Each cluster
    /// becomes one line at its mean position. Non-finite edges are ignored.
    pub fn cluster(edges: impl IntoIterator<Item = f32>, tolerance: f32) -> Self {
        let mut edges: Vec<f32> = edges.into_iter().filter(|e| e.is_finite()).collect();
        edges.sort_by(|a, b| a.total_cmp(b));

        let mut positions = Vec::new();
        let mut sum = 0.0f32;
        let mut count = 0usize;

        for edge in edges {
            if count > 0 && edge - sum / count as f32 > tolerance {
                positions.push(sum / count as f32);
                sum = 0.0;
                count = 0;
            }
            sum += edge;
            count += 1;
        }
        if count > 0 {
            positions.push(sum / count as f32);
        }

        Self { positions }
    }

    /// Line positions, ascending.
    pub fn positions(&self) -> &[f32] {
        &self.positions
    }

    /// Number of bands between the lines.
    pub fn band_count(&self) -> usize {
        self.positions.len().saturating_sub(1)
    }

    /// Index of the line closest to `value`.
    ///
    /// Returns `None` only when there are no lines.
    pub fn nearest(&self, value: f32) -> Option<usize> {
        if self.positions.is_empty() {
            return None;
        }
        let i = self.positions.partition_point(|p| *p < value);
        if i == 0 {
            return Some(0);
        }
        if i == self.positions.len() {
            return Some(i - 1);
        }
        if value - self.positions[i - 1] <= self.positions[i] - value {
            Some(i - 1)
        } else {
            Some(i)
        }
    }

    /// Width of every band.
    pub fn band_sizes(&self) -> Vec<f32> {
        self.positions.windows(2).map(|w| w[1] - w[0]).collect()
    }

    /// Start and end of a run of bands.
    pub fn span(&self, start: usize, end: usize) -> Option<(f32, f32)> {
        Some((*self.positions.get(start)?, *self.positions.get(end)?))
    }
}
