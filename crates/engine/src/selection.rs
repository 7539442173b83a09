use crate::prefs::Prefs;
use crate::types::{SelectionRef, TokenAggregate};
use tracing::debug;

/// Keeps the single "selected token" consistent across user choice,
/// refreshes and restarts.
///
/// The resolved pointer is a key into the current aggregate collection,
/// never a handle to an aggregate: aggregates are replaced wholesale on
/// every pass and are looked up again through [`SelectionStore::selected`].
pub struct SelectionStore {
    prefs: Prefs,
    resolved: Option<SelectionRef>,
}

impl SelectionStore {
    pub fn new(prefs: Prefs) -> Self {
        Self {
            prefs,
            resolved: None,
        }
    }

    pub fn select(&mut self, aggregate: &TokenAggregate) {
        let selection = SelectionRef::for_aggregate(aggregate);
        self.prefs.set_selection_ref(&selection);
        self.resolved = Some(selection);
        debug!(token = %aggregate.token_address, "token selected");
    }

    pub fn clear(&mut self) {
        self.resolved = None;
        self.prefs.clear_selection_ref();
    }

    /// Re-derive the pointer against a fresh collection. Precedence:
    /// persisted id, persisted mint, the in-session pointer's id/mint,
    /// the first (largest) aggregate, otherwise nothing.
    pub fn resolve<'a>(&mut self, aggregates: &'a [TokenAggregate]) -> Option<&'a TokenAggregate> {
        let found = self
            .prefs
            .selection_ref()
            .and_then(|persisted| persisted.find_in(aggregates))
            .or_else(|| self.resolved.as_ref().and_then(|prev| prev.find_in(aggregates)))
            .or_else(|| aggregates.first());

        match found {
            Some(agg) => {
                self.resolved = Some(SelectionRef::for_aggregate(agg));
                Some(agg)
            }
            None => {
                self.clear();
                None
            }
        }
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.resolved.as_ref().and_then(|r| r.id.as_deref())
    }

    pub fn selected<'a>(&self, aggregates: &'a [TokenAggregate]) -> Option<&'a TokenAggregate> {
        let id = self.selected_id()?;
        aggregates.iter().find(|a| a.id == id)
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selected_id() == Some(id)
    }
}
