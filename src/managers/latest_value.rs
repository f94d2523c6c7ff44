// LatestValueChannel: most-recent-value publication for visualization
//
// Readers only ever care about the newest value, so the channel holds one
// slot. Publishing never blocks and never fails, even with no readers.

use futures::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tokio_stream::StreamExt;

/// Single-slot broadcast of the newest value
///
/// Cloning shares the slot; every clone publishes into and reads from the
/// same channel.
#[derive(Debug)]
pub struct LatestValueChannel<T> {
    tx: watch::Sender<Option<T>>,
}

impl<T> Clone for LatestValueChannel<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> LatestValueChannel<T> {
    /// Create an empty channel
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// Replace the current value
    pub fn publish(&self, value: T) {
        self.tx.send_replace(Some(value));
    }

    /// Forget the current value
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Clone of the current value
    pub fn latest(&self) -> Option<T> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.tx.subscribe()
    }

    /// Stream of published values
    ///
    /// Yields the current value first when one exists. Intermediate values
    /// published faster than the reader polls are skipped.
    pub fn stream(&self) -> impl Stream<Item = T> + Unpin + Send + 'static {
        WatchStream::new(self.tx.subscribe()).filter_map(|value| value)
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for LatestValueChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_publish_without_readers() {
        let channel = LatestValueChannel::new();
        assert_eq!(channel.latest(), None);
        channel.publish(1u32);
        channel.publish(2u32);
        assert_eq!(channel.latest(), Some(2));
        channel.clear();
        assert_eq!(channel.latest(), None);
    }

    #[test]
    fn test_clones_share_the_slot() {
        let channel = LatestValueChannel::new();
        let writer = channel.clone();
        writer.publish("row");
        assert_eq!(channel.latest(), Some("row"));
    }

    #[tokio::test]
    async fn test_stream_yields_newest_value() {
        let channel = LatestValueChannel::new();
        channel.publish(1u32);
        channel.publish(7u32);

        let mut stream = channel.stream();
        let first = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap();
        assert_eq!(first, Some(7));

        channel.publish(8u32);
        let second = tokio::time::timeout(Duration::from_secs(1), stream.next())
            .await
            .unwrap();
        assert_eq!(second, Some(8));
    }
}
