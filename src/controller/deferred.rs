//! Response body that submits a refresh once it has been written out.

use std::{
    convert::Infallible,
    pin::Pin,
    task::{Context, Poll},
};

use actix_web::{
    body::{BodySize, MessageBody},
    web::Bytes,
};

use crate::handler::{refresh::RefreshJob, refresh_queue::RefreshQueue};

/// Single-chunk body carrying an optional refresh job. The job is queued when
/// the body is dropped, which actix does after the last chunk was written or
/// the connection went away.
pub struct DeferredRefresh {
    body: Option<Bytes>,
    job: Option<RefreshJob>,
    queue: RefreshQueue,
}

impl DeferredRefresh {
    pub fn new(body: Bytes, job: RefreshJob, queue: RefreshQueue) -> Self {
        DeferredRefresh {
            body: Some(body),
            job: Some(job),
            queue,
        }
    }
}

impl MessageBody for DeferredRefresh {
    type Error = Infallible;

    fn size(&self) -> BodySize {
        match &self.body {
            Some(body) => BodySize::Sized(body.len() as u64),
            None => BodySize::Sized(0),
        }
    }

    fn poll_next(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        Poll::Ready(self.get_mut().body.take().map(Ok))
    }
}

impl Drop for DeferredRefresh {
    fn drop(&mut self) {
        if let Some(job) = self.job.take() {
            self.queue.submit(job);
        }
    }
}
