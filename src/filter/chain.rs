//! Ordered execution of a route's filters.

use std::sync::Arc;

use axum::response::{IntoResponse, Response};

use crate::filter::{Exchange, Filter, FilterOutcome, PendingResponseHeader};

/// How a chain run ended.
#[derive(Debug)]
pub enum ChainOutcome {
    /// Every filter continued; forward this exchange upstream.
    Forward(Exchange),
    /// A filter short-circuited or failed. `pending` holds the headers
    /// registered by the filters that ran before it.
    Respond {
        response: Response,
        pending: Vec<PendingResponseHeader>,
    },
}

/// The filters of one route, in declared order.
#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn Filter>>,
}

impl FilterChain {
    pub fn new(filters: Vec<Arc<dyn Filter>>) -> Self {
        Self { filters }
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// True when some filter needs the buffered request body.
    pub fn reads_body(&self) -> bool {
        self.filters.iter().any(|f| f.reads_body())
    }

    /// Run filters one after another until one stops the chain.
    pub async fn execute(&self, mut exchange: Exchange) -> ChainOutcome {
        for filter in &self.filters {
            let pending = exchange.pending().to_vec();

            match filter.apply(exchange).await {
                Ok(FilterOutcome::Continue(next)) => exchange = next,
                Ok(FilterOutcome::Terminal(response)) => {
                    tracing::debug!(filter = filter.name(), "Chain short-circuited");
                    return ChainOutcome::Respond { response, pending };
                }
                Err(e) => {
                    tracing::warn!(filter = filter.name(), error = %e, "Filter failed");
                    return ChainOutcome::Respond {
                        response: e.into_response(),
                        pending,
                    };
                }
            }
        }

        ChainOutcome::Forward(exchange)
    }
}
