use std::pin::Pin;
use std::task::{Context, Poll, ready};

/// Map the output of a future.
#[inline]
pub fn map<F, M>(future: F, mapper: M) -> Map<F, M> {
    Map {
        future,
        mapper: Some(mapper),
    }
}

/// Future returned by [`map`].
#[derive(Debug)]
pub struct Map<F, M> {
    future: F,
    mapper: Option<M>,
}

impl<F, M, T> Future for Map<F, M>
where
    F: Future,
    M: FnOnce(F::Output) -> T,
{
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // SAFETY: `future` is pinned structurally, `mapper` is never pinned
        let (future, mapper) = unsafe {
            let me = self.get_unchecked_mut();
            (Pin::new_unchecked(&mut me.future), &mut me.mapper)
        };
        let output = ready!(future.poll(cx));
        match mapper.take() {
            Some(mapper) => Poll::Ready(mapper(output)),
            None => panic!("`Map` polled after completion"),
        }
    }
}
