use std::pin::Pin;

use descale_fast_types::{Frame, FrameResult, SharedSource};
use futures_core::Stream;
use futures_util::stream::unfold;
use tokio::sync::mpsc::{self, Sender};

pub type OutputStream = Pin<Box<dyn Stream<Item = FrameResult<Frame>> + Send>>;

/// Runs `task` on the blocking pool and exposes what it sends as a stream.
pub fn spawn_stream_from_channel(
    capacity: usize,
    task: impl FnOnce(Sender<FrameResult<Frame>>) + Send + 'static,
) -> OutputStream {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    tokio::task::spawn_blocking(move || task(tx));
    let stream = unfold(rx, |mut receiver| async {
        receiver.recv().await.map(|item| (item, receiver))
    });
    Box::pin(stream)
}

/// Pulls frames `0..n` of `source` in order. Dropping the stream stops
/// further requests once the frame in flight is done; the first error ends
/// the stream.
pub fn into_stream(source: SharedSource, capacity: usize) -> OutputStream {
    spawn_stream_from_channel(capacity, move |tx| {
        let total = source.num_frames();
        for index in 0..total {
            let result = source.frame(index);
            let failed = result.is_err();
            if tx.blocking_send(result).is_err() {
                log::debug!("output stream dropped after {index} of {total} frames");
                return;
            }
            if failed {
                return;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use descale_fast_types::{
        ClipInfo, FrameError, FrameFormat, FrameSource, Plane, VecSource,
    };
    use tokio_stream::StreamExt;

    use super::*;

    fn clip(len: usize) -> SharedSource {
        let frames = (0..len)
            .map(|i| {
                let plane = Plane::filled(2, 2, i as f32).unwrap();
                Frame::gray(FrameFormat::GRAY8, plane).unwrap()
            })
            .collect();
        VecSource::shared(frames).unwrap()
    }

    struct Failing;

    impl FrameSource for Failing {
        fn info(&self) -> ClipInfo {
            ClipInfo::new(FrameFormat::GRAY8, 2, 2, 3)
        }

        fn frame(&self, index: usize) -> FrameResult<Frame> {
            Err(FrameError::invalid_frame(format!("frame {index} is broken")))
        }
    }

    struct Counting {
        inner: SharedSource,
        pulled: Arc<AtomicUsize>,
    }

    impl FrameSource for Counting {
        fn info(&self) -> ClipInfo {
            self.inner.info()
        }

        fn frame(&self, index: usize) -> FrameResult<Frame> {
            self.pulled.fetch_add(1, Ordering::SeqCst);
            self.inner.frame(index)
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn spawn_stream_from_channel_pushes_values() {
        let mut stream = spawn_stream_from_channel(2, |tx| {
            let frame = Frame::gray(FrameFormat::GRAY8, Plane::filled(1, 1, 7.0).unwrap());
            tx.blocking_send(frame).unwrap();
        });
        let frame = stream.next().await.unwrap().unwrap();
        assert_eq!(frame.luma().data(), &[7.0]);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn frames_arrive_in_order() {
        let frames: Vec<_> = into_stream(clip(5), 2).collect().await;
        let values: Vec<_> = frames
            .into_iter()
            .map(|frame| frame.unwrap().luma().get(0, 0))
            .collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn first_error_ends_the_stream() {
        let results: Vec<_> = into_stream(Arc::new(Failing), 1).collect().await;
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn dropping_the_stream_stops_requests() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let source = Arc::new(Counting {
            inner: clip(64),
            pulled: pulled.clone(),
        });
        let mut stream = into_stream(source, 1);
        stream.next().await.unwrap().unwrap();
        drop(stream);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(pulled.load(Ordering::SeqCst) < 64);
    }
}
