// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::lnd::LightningNode;
use crate::relay::RelayEngine;

#[derive(Clone)]
pub struct AppState {
    pub node: Arc<dyn LightningNode>,
    pub relay: Arc<RelayEngine>,
}

impl AppState {
    pub fn new(node: Arc<dyn LightningNode>, relay: RelayEngine) -> Self {
        Self {
            node,
            relay: Arc::new(relay),
        }
    }
}
