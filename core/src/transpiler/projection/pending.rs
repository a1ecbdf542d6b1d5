use crate::ast::Projection;

/// Projections requested before the target column is known.
///
/// Each deferred batch is pushed to the front. When a column arrives the
/// queue is prepended to that column's own projections, so the earliest
/// deferred projection ends up outermost.
#[derive(Debug, Clone, Default)]
pub struct PendingProjections {
    pending: Vec<Projection>,
}

impl PendingProjections {
    pub fn defer(&mut self, projections: &[Projection]) {
        for projection in projections {
            self.pending.insert(0, *projection);
        }
    }

    /// Drain the queue in front of `projections`.
    pub fn resolve(&mut self, projections: &[Projection]) -> Vec<Projection> {
        let mut resolved = projections.to_vec();
        for projection in self.pending.drain(..) {
            resolved.insert(0, projection);
        }
        resolved
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Wrap `core` with each projection, innermost last.
pub fn wrap_all(projections: &[Projection], core: &str) -> String {
    projections
        .iter()
        .rev()
        .fold(core.to_string(), |inner, projection| projection.wrap(&inner))
}
