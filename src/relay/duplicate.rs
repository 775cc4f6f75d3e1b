// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Duplicate payment hash guard.

use tracing::{debug, warn};

use crate::lnd::{LightningNode, PaymentHash};

use super::error::RelayError;

/// Ensure the node has no invoice for `id` yet.
///
/// The lookup is expected to fail: a not-found answer is the success path.
/// Any other lookup failure aborts the attempt, since it says nothing about
/// whether the hash is free.
pub async fn ensure_unused(node: &dyn LightningNode, id: &PaymentHash) -> Result<(), RelayError> {
    match node.get_invoice(id).await {
        Ok(existing) => {
            warn!(payment_hash = %id, state = ?existing.state, "Invoice already exists for payment hash");
            Err(RelayError::DuplicateInvoice(*id))
        }
        Err(e) if e.is_not_found() => {
            debug!(payment_hash = %id, "Payment hash is unused");
            Ok(())
        }
        Err(e) => Err(RelayError::Node(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lnd::mock::{fixture_hash, held_invoice, MockNode};
    use crate::lnd::{HodlInvoiceParams, InvoiceState, NodeError};
    use chrono::Utc;

    #[tokio::test]
    async fn unknown_hash_passes() {
        let node = MockNode::new();
        assert!(ensure_unused(&node, &fixture_hash()).await.is_ok());
    }

    #[tokio::test]
    async fn existing_invoice_conflicts() {
        let mut invoice = held_invoice(fixture_hash(), 1_000);
        invoice.state = InvoiceState::Settled;
        let node = MockNode::new().with_existing_invoice(invoice);

        let result = ensure_unused(&node, &fixture_hash()).await;
        assert!(matches!(result, Err(RelayError::DuplicateInvoice(id)) if id == fixture_hash()));
    }

    #[tokio::test]
    async fn second_check_conflicts_once_an_invoice_exists() {
        let node = MockNode::new();
        ensure_unused(&node, &fixture_hash()).await.unwrap();

        node.create_hodl_invoice(&HodlInvoiceParams {
            id: fixture_hash(),
            mtokens: 1_000,
            cltv_delta: 40,
            expires_at: Utc::now() + chrono::Duration::hours(1),
            description: None,
            description_hash: None,
        })
        .await
        .unwrap();

        let result = ensure_unused(&node, &fixture_hash()).await;
        assert!(matches!(result, Err(RelayError::DuplicateInvoice(_))));
    }

    #[tokio::test]
    async fn transport_failure_aborts() {
        let node = MockNode::new().with_lookup_error(NodeError::Transport("timeout".into()));
        let result = ensure_unused(&node, &fixture_hash()).await;
        assert!(matches!(result, Err(RelayError::Node(NodeError::Transport(_)))));
    }
}
