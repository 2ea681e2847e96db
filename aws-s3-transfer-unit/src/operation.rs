/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tower::{service_fn, ServiceBuilder, ServiceExt};

use crate::error;
use crate::metrics::aggregators::ClientMetrics;
use crate::transport::SharedTransport;

/// Single request upload work unit
pub mod single_put;

mod handle;
pub use handle::TransferHandle;

/// A pull-driven piece of a transfer job.
///
/// A scheduler polls [`is_ready`](WorkUnit::is_ready) and calls [`step`](WorkUnit::step)
/// until [`is_terminal`](WorkUnit::is_terminal) returns true. Work units never block: every
/// wait for a remote store happens inside `step`.
#[async_trait::async_trait]
pub trait WorkUnit: Send + fmt::Debug {
    /// Whether a call to [`step`](WorkUnit::step) would make progress
    fn is_ready(&self) -> bool;

    /// Whether the unit has finished, successfully or not
    fn is_terminal(&self) -> bool;

    /// Mark the unit as having work to do. A new unit is not ready until scheduled.
    fn schedule(&mut self);

    /// Advance the unit by one state.
    ///
    /// An error moves the unit to its terminal error state.
    async fn step(&mut self) -> Result<(), error::Error>;

    /// Token that cancels the unit's in-flight and future requests
    fn cancellation_token(&self) -> CancellationToken;
}

/// Container for maintaining context required to carry out a single operation/transfer.
///
/// `State` is whatever additional operation specific state is required for the operation.
#[derive(Debug)]
pub(crate) struct TransferContext<State> {
    handle: Arc<crate::client::Handle>,
    state: Arc<State>,
}

impl<State> TransferContext<State> {
    pub(crate) fn new(handle: Arc<crate::client::Handle>, state: Arc<State>) -> Self {
        Self { handle, state }
    }

    pub(crate) fn state(&self) -> &State {
        &self.state
    }

    pub(crate) fn config(&self) -> &crate::Config {
        &self.handle.config
    }

    pub(crate) fn metrics(&self) -> &ClientMetrics {
        &self.handle.metrics
    }

    /// The transport to send requests with
    pub(crate) fn transport(&self) -> &SharedTransport {
        self.handle.config.transport()
    }

    /// Send `request` with `handler` once the client's request limit allows it
    pub(crate) async fn send<Req, Res, E, F, Fut>(&self, request: Req, handler: F) -> Result<Res, E>
    where
        F: FnMut(Req) -> Fut,
        Fut: Future<Output = Result<Res, E>>,
    {
        ServiceBuilder::new()
            .layer(self.handle.request_limit.clone())
            .service(service_fn(handler))
            .oneshot(request)
            .await
    }
}

impl<State> Clone for TransferContext<State> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            state: self.state.clone(),
        }
    }
}
