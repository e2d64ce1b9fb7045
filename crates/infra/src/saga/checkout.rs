//! Point-of-sale checkout: stock decrements plus the receipt.
//!
//! ```text
//! for each line: SellStock (retry on concurrent modification)
//!   ↓ any failure → RestoreStock for lines already taken
//! RecordSale
//!   ↓ failure → RestoreStock for every line
//! ```

use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use tracing::{error, info};

use invenhub_core::AggregateId;
use invenhub_events::{EventBus, EventEnvelope};
use invenhub_inventory::{RestoreStock, SellStock, StockCommand, StockItem};
use invenhub_products::ProductId;
use invenhub_sales::{RecordSale, Sale, SaleCommand, SaleId, SaleLine, VoidSale, validate_lines};

use crate::command_dispatcher::{CommandDispatcher, DEFAULT_RETRY_ATTEMPTS, DispatchError};
use crate::event_store::{EventStore, StoredEvent};
use crate::streams;

/// Retry bound for compensating commands, which must not be dropped under contention.
pub(crate) const COMPENSATION_RETRY_ATTEMPTS: usize = 50;

fn stock(id: AggregateId) -> StockItem {
    StockItem::empty(ProductId::new(id))
}

fn sale(id: AggregateId) -> Sale {
    Sale::empty(SaleId::new(id))
}

fn restore<S, B>(
    dispatcher: &CommandDispatcher<S, B>,
    sale_id: SaleId,
    lines: &[SaleLine],
    occurred_at: DateTime<Utc>,
) -> Result<(), DispatchError>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    let mut first_error = None;
    for line in lines.iter().rev() {
        let cmd = StockCommand::Restore(RestoreStock {
            product_id: line.product_id,
            quantity: line.quantity,
            sale_id: sale_id.0,
            occurred_at,
        });
        if let Err(e) = dispatcher.dispatch_with_retry(
            COMPENSATION_RETRY_ATTEMPTS,
            line.product_id.0,
            streams::STOCK,
            &cmd,
            stock,
        ) {
            error!(%sale_id, product_id = %line.product_id, error = %e, "failed to restore stock");
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}

/// Take stock for every line, then record the sale.
///
/// On failure stock is left as it was before the call.
pub fn record_sale<S, B>(dispatcher: &CommandDispatcher<S, B>, cmd: RecordSale) -> Result<Vec<StoredEvent>, DispatchError>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    validate_lines(&cmd.lines)?;

    let mut taken: Vec<SaleLine> = Vec::with_capacity(cmd.lines.len());
    for line in &cmd.lines {
        let sell = StockCommand::Sell(SellStock {
            product_id: line.product_id,
            quantity: line.quantity,
            sale_id: cmd.sale_id.0,
            occurred_at: cmd.occurred_at,
        });
        match dispatcher.dispatch_with_retry(DEFAULT_RETRY_ATTEMPTS, line.product_id.0, streams::STOCK, &sell, stock) {
            Ok(_) => taken.push(line.clone()),
            Err(e) => {
                info!(sale_id = %cmd.sale_id, product_id = %line.product_id, error = %e, "sale rejected, compensating");
                // Compensation errors are logged; the caller sees the original failure.
                let _ = restore(dispatcher, cmd.sale_id, &taken, cmd.occurred_at);
                return Err(e);
            }
        }
    }

    let sale_id = cmd.sale_id;
    let occurred_at = cmd.occurred_at;
    match dispatcher.dispatch(sale_id.0, streams::SALE, &SaleCommand::Record(cmd), sale) {
        Ok(committed) => Ok(committed),
        Err(e) => {
            info!(%sale_id, error = %e, "sale append failed, compensating");
            let _ = restore(dispatcher, sale_id, &taken, occurred_at);
            Err(e)
        }
    }
}

/// Void a completed sale and put its stock back.
pub fn void_sale<S, B>(dispatcher: &CommandDispatcher<S, B>, cmd: VoidSale) -> Result<Vec<StoredEvent>, DispatchError>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    let sale_id = cmd.sale_id;
    let occurred_at = cmd.occurred_at;
    let committed = dispatcher.dispatch_with_retry(
        DEFAULT_RETRY_ATTEMPTS,
        sale_id.0,
        streams::SALE,
        &SaleCommand::Void(cmd),
        sale,
    )?;

    let voided = dispatcher.load(sale_id.0, streams::SALE, sale)?;
    restore(dispatcher, sale_id, voided.lines(), occurred_at)?;
    Ok(committed)
}
