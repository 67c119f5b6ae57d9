/// Errors raised by hierarchy mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    #[error("node does not exist in the hierarchy")]
    MissingNode,

    #[error("a node cannot be its own parent")]
    SelfParent,

    #[error("reparenting would create a cycle")]
    Cycle,
}
