//! Structure-instance context injection
//!
//! Thread-local storage for the `(type, head)` instance currently being
//! validated or mutated, so that every log line emitted inside the scope can
//! be attributed to it. A run id ties together all contexts opened during one
//! simulation run.

use std::cell::RefCell;

use mirrorsim_core::{NodeId, StructureType};
use uuid::Uuid;

/// Context data stored in thread-local storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructureContextData {
    /// Type of the instance in scope
    pub structure_type: StructureType,
    /// Head of the instance in scope
    pub head: NodeId,
    /// Simulation run this context belongs to
    pub run_id: Uuid,
}

thread_local! {
    static STRUCTURE_CONTEXT: RefCell<Option<StructureContextData>> = const { RefCell::new(None) };
}

/// RAII guard for structure context
///
/// Creating the guard sets the context for the current thread; dropping it
/// restores whatever context was active before.
///
/// # Example
///
/// ```
/// use mirrorsim_core::{NodeId, StructureType};
/// use mirrorsim_logging::StructureContextGuard;
///
/// let _guard = StructureContextGuard::new(StructureType::Ring, NodeId(1));
/// tracing::debug!("validating ring");
/// ```
pub struct StructureContextGuard {
    previous: Option<StructureContextData>,
}

impl StructureContextGuard {
    /// Enter the `(ty, head)` context, keeping the surrounding run id if any
    pub fn new(ty: StructureType, head: NodeId) -> Self {
        let run_id = Self::current_run_id().unwrap_or_else(Uuid::new_v4);
        Self::with_run_id(ty, head, run_id)
    }

    /// Enter the `(ty, head)` context under an explicit run id
    pub fn with_run_id(ty: StructureType, head: NodeId, run_id: Uuid) -> Self {
        let previous = Self::current();
        let new_ctx = StructureContextData {
            structure_type: ty,
            head,
            run_id,
        };
        STRUCTURE_CONTEXT.with(|ctx| *ctx.borrow_mut() = Some(new_ctx));
        Self { previous }
    }

    /// Get the current context (if any)
    pub fn current() -> Option<StructureContextData> {
        STRUCTURE_CONTEXT.with(|ctx| ctx.borrow().clone())
    }

    /// The `(type, head)` pair in scope
    pub fn current_structure() -> Option<(StructureType, NodeId)> {
        Self::current().map(|ctx| (ctx.structure_type, ctx.head))
    }

    pub fn current_run_id() -> Option<Uuid> {
        Self::current().map(|ctx| ctx.run_id)
    }
}

impl Drop for StructureContextGuard {
    fn drop(&mut self) {
        STRUCTURE_CONTEXT.with(|ctx| *ctx.borrow_mut() = self.previous.take());
    }
}

/// Run a block inside a structure context scope
///
/// # Example
///
/// ```ignore
/// with_structure_context!(StructureType::Tree, head, {
///     tracing::info!("tree grew");
/// });
/// ```
#[macro_export]
macro_rules! with_structure_context {
    ($ty:expr, $head:expr, $body:block) => {{
        let _guard = $crate::context::StructureContextGuard::new($ty, $head);
        $body
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structure_context_guard() {
        assert!(StructureContextGuard::current().is_none());
        {
            let _guard = StructureContextGuard::new(StructureType::Tree, NodeId(1));
            assert_eq!(
                StructureContextGuard::current_structure(),
                Some((StructureType::Tree, NodeId(1)))
            );
        }
        assert!(StructureContextGuard::current().is_none());
    }

    #[test]
    fn test_nested_contexts_share_run_id() {
        let run_id = Uuid::new_v4();
        {
            let _outer = StructureContextGuard::with_run_id(StructureType::Star, NodeId(1), run_id);
            {
                let _inner = StructureContextGuard::new(StructureType::Ring, NodeId(1));
                assert_eq!(
                    StructureContextGuard::current_structure(),
                    Some((StructureType::Ring, NodeId(1)))
                );
                assert_eq!(StructureContextGuard::current_run_id(), Some(run_id));
            }
            // Restored to the star after the ring's guard drops
            assert_eq!(
                StructureContextGuard::current_structure(),
                Some((StructureType::Star, NodeId(1)))
            );
        }
        assert!(StructureContextGuard::current_run_id().is_none());
    }

    #[test]
    fn test_macro_scopes_context() {
        let seen = crate::with_structure_context!(StructureType::Line, NodeId(4), {
            StructureContextGuard::current_structure()
        });
        assert_eq!(seen, Some((StructureType::Line, NodeId(4))));
        assert!(StructureContextGuard::current().is_none());
    }
}
