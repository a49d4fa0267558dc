use crate::query::{Query, TreeWalker};

/// An independent copy of `query`, carrying its parameters, hints and tree walkers.
pub fn clone_query<C: Clone>(query: &Query<C>) -> Query<C> {
    query.clone()
}

/// Appends `walker` after any walker already registered on `query`.
pub fn add_custom_tree_walker<C, W: TreeWalker + 'static>(query: &mut Query<C>, walker: W) {
    query.push_tree_walker(Box::new(walker));
}
