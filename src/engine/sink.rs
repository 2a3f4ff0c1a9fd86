//! Contains the result sink for the engine.
//! This module drains produced items and hands each one to the caller's callback.

use crate::stats::StatCollector;
use kanal::AsyncReceiver;
use log::{debug, info, trace};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The caller-supplied consumer invoked once per delivered item.
pub type Callback<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Spawns the single consumer of the item channel.
///
/// Each item is passed to `callback` before the next one is pulled. Every turn
/// of the loop races the next item against cancellation, so a cancelled run
/// stops delivering even while items are still queued.
pub fn spawn_result_sink<T>(
    item_rx: AsyncReceiver<T>,
    callback: Callback<T>,
    token: CancellationToken,
    stats: Arc<StatCollector>,
) -> tokio::task::JoinHandle<()>
where
    T: Send + 'static,
{
    tokio::spawn(async move {
        trace!("Result sink started");
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    info!(
                        "Cancellation requested, result sink stopping with {} item(s) queued",
                        item_rx.len()
                    );
                    break;
                }
                received = item_rx.recv() => match received {
                    Ok(item) => {
                        trace!("Delivering item to callback");
                        callback(item);
                        stats.increment_items_delivered();
                    }
                    Err(_) => {
                        debug!("Item channel closed, result sink draining complete");
                        break;
                    }
                },
            }
        }
        trace!("Result sink finished");
    })
}
