//! Lazy query builder over one entity type.

use crate::error::StorageResult;
use crate::filter::Filter;
use crate::store::DocumentStore;
use docstore_types::Entity;

/// A query over `T`, executed when a terminal method is called.
///
/// Filters are combined with `and`. Rows are ordered by id before `skip` and
/// `take` apply.
#[derive(Debug)]
pub struct Query<'a, T: Entity> {
    store: &'a DocumentStore,
    filter: Option<Filter<T>>,
    skip: usize,
    take: Option<usize>,
}

impl<'a, T: Entity> Query<'a, T> {
    pub(crate) fn new(store: &'a DocumentStore) -> Self {
        Self {
            store,
            filter: None,
            skip: 0,
            take: None,
        }
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter<T>) -> Self {
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(filter),
            None => filter,
        });
        self
    }

    #[must_use]
    pub fn skip(mut self, n: usize) -> Self {
        self.skip = n;
        self
    }

    #[must_use]
    pub fn take(mut self, n: usize) -> Self {
        self.take = Some(n);
        self
    }

    pub fn to_vec(self) -> StorageResult<Vec<T>> {
        let filter = self.filter.unwrap_or_else(Filter::all);
        let rows = self.store.get_list(&filter)?.into_iter().skip(self.skip);
        Ok(match self.take {
            Some(n) => rows.take(n).collect(),
            None => rows.collect(),
        })
    }

    pub fn first(self) -> StorageResult<Option<T>> {
        Ok(self.take(1).to_vec()?.into_iter().next())
    }

    pub fn count(self) -> StorageResult<u64> {
        Ok(self.to_vec()?.len() as u64)
    }
}
