use super::DashboardEngine;
use crate::transport::{resolve_pool_with_retry, Transport};
use crate::types::TokenAggregate;
use tracing::{debug, info};

/// How to read the address of the page the user is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSite {
    /// The address is the token mint.
    Direct,
    /// The address may be a pool; unknown addresses go through pool lookup.
    Pool,
}

fn find_by_mint<'a>(aggregates: &'a [TokenAggregate], mint: &str) -> Option<&'a TokenAggregate> {
    let mint = mint.to_lowercase();
    aggregates.iter().find(|a| a.mint_lowercased() == mint)
}

impl<T: Transport> DashboardEngine<T> {
    /// Record the active page's address and select the matching token if
    /// the user holds it. Returns the page token, which buys target even
    /// when no position exists yet.
    pub async fn set_page_address(&mut self, address: &str, site: PageSite) -> Option<String> {
        let address = address.trim();
        if address.is_empty() {
            self.clear_page();
            return None;
        }

        if let Some(agg) = find_by_mint(&self.aggregates, address) {
            self.selection.select(agg);
            self.page_token = Some(agg.token_address.clone());
            self.apply_auto_if_enabled();
            debug!(token = %address, "page token matched a position");
            return self.page_token.clone();
        }

        let mint = match site {
            PageSite::Direct => Some(address.to_string()),
            PageSite::Pool => {
                resolve_pool_with_retry(self.transport.as_ref(), &self.options.retry, address).await
            }
        };

        match mint {
            Some(mint) => {
                if let Some(agg) = find_by_mint(&self.aggregates, &mint) {
                    self.selection.select(agg);
                    self.apply_auto_if_enabled();
                } else {
                    debug!(token = %mint, "no position for page token");
                }
                self.page_token = Some(mint);
            }
            None => {
                info!(pool = %address, "could not resolve pool to a token");
                self.page_token = None;
            }
        }
        self.page_token.clone()
    }

    pub fn clear_page(&mut self) {
        self.page_token = None;
    }
}
