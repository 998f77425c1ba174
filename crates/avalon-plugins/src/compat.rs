//! Loader compatibility filters.
//!
//! These are pure filters; callers order the result, usually with
//! [`sort_by_order`].

use std::sync::Arc;

use avalon_store::RepresentationContext;
use avalon_types::{Representation, SUBSET_SCHEMA};

use crate::traits::{Loader, Plugin};

/// Wildcard accepted in `families` and `representations`.
pub const WILDCARD: &str = "*";

fn accepts(list: &[String], value: &str) -> bool {
    list.iter().any(|item| item == WILDCARD || item == value)
}

/// Families of the publish in `context`.
///
/// Subsets written with the current subset schema carry their families;
/// older publishes record them on the version.
pub fn context_families(context: &RepresentationContext) -> Vec<String> {
    if context.subset.schema == SUBSET_SCHEMA {
        context.subset.families()
    } else {
        context.version.data.families.clone()
    }
}

/// Whether `loader` accepts the family and representation of `context`.
pub fn is_compatible_loader<L>(loader: &L, context: &RepresentationContext) -> bool
where
    L: Loader + ?Sized,
{
    let families = loader.families();
    let has_family = families.iter().any(|f| f == WILDCARD)
        || context_families(context)
            .iter()
            .any(|family| families.contains(family));
    has_family && accepts(loader.representations(), &context.representation.name)
}

/// Loaders whose `representations` accept `representation`'s name.
pub fn loaders_by_representation(
    loaders: &[Arc<dyn Loader>],
    representation: &Representation,
) -> Vec<Arc<dyn Loader>> {
    loaders
        .iter()
        .filter(|loader| accepts(loader.representations(), &representation.name))
        .cloned()
        .collect()
}

/// Loaders compatible with `context`.
pub fn loaders_from_context(
    loaders: &[Arc<dyn Loader>],
    context: &RepresentationContext,
) -> Vec<Arc<dyn Loader>> {
    loaders
        .iter()
        .filter(|loader| is_compatible_loader::<dyn Loader>(loader.as_ref(), context))
        .cloned()
        .collect()
}

/// Sort by declared order, then name.
pub fn sort_by_order<P>(plugins: &mut [Arc<P>])
where
    P: Plugin + ?Sized,
{
    plugins.sort_by(|a, b| {
        a.order()
            .cmp(&b.order())
            .then_with(|| a.name().cmp(b.name()))
    });
}
