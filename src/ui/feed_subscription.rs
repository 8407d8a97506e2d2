use async_channel::Receiver as AsyncReceiver;
use iced::Subscription;
use iced::advanced::subscription::{EventStream, Hasher, Recipe, from_recipe};
use iced::futures::{self, StreamExt};
use std::fmt;
use std::hash::Hasher as _;
use std::sync::Arc;

/// Subscription yielding every value received on `receiver` until it closes.
pub fn feed_subscription<T>(receiver: Arc<AsyncReceiver<T>>) -> Subscription<T>
where
    T: Send + 'static,
{
    from_recipe(FeedRecipe { receiver })
}

struct FeedRecipe<T> {
    receiver: Arc<AsyncReceiver<T>>,
}

impl<T> Recipe for FeedRecipe<T>
where
    T: Send + 'static,
{
    type Output = T;

    fn hash(&self, state: &mut Hasher) {
        // One subscription per channel.
        state.write_usize(Arc::as_ptr(&self.receiver) as usize);
    }

    fn stream(self: Box<Self>, _input: EventStream) -> futures::stream::BoxStream<'static, T> {
        futures::stream::unfold(self.receiver, |receiver| async move {
            let value = receiver.recv().await.ok()?;
            Some((value, receiver))
        })
        .boxed()
    }
}

impl<T> fmt::Debug for FeedRecipe<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedRecipe")
            .field("pending", &self.receiver.len())
            .finish_non_exhaustive()
    }
}
