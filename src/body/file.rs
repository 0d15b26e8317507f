use bytes::{Bytes, BytesMut};
use std::io::SeekFrom;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncSeekExt, ReadBuf};

use super::Frame;
use super::error::BodyError;

const READ_CHUNK: usize = 16 * 1024;

/// A `(file, offset, count)` region emitted as a response body.
///
/// HTTP/1.1 hands the region to the transport as large reads from the
/// already positioned file handle; transports without a zero-copy path
/// fall back to this read loop. Dropping the region closes the handle.
#[derive(Debug)]
pub struct FileRegion {
    file: File,
    remaining: u64,
    len: u64,
}

impl FileRegion {
    /// Open a whole file as a region.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<FileRegion> {
        let file = File::open(path).await?;
        let len = file.metadata().await?.len();
        Ok(Self {
            file,
            remaining: len,
            len,
        })
    }

    /// Open a `count` byte region starting at `offset`.
    pub async fn open_range(
        path: impl AsRef<Path>,
        offset: u64,
        count: u64,
    ) -> std::io::Result<FileRegion> {
        let mut file = File::open(path).await?;
        file.seek(SeekFrom::Start(offset)).await?;
        Ok(Self {
            file,
            remaining: count,
            len: count,
        })
    }

    /// Region size in bytes.
    #[inline]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` for an empty region.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn is_end_stream(&self) -> bool {
        self.remaining == 0
    }

    pub(crate) fn size_hint(&self) -> (u64, Option<u64>) {
        (self.remaining, Some(self.remaining))
    }

    pub(crate) fn poll_data(
        &mut self,
        cx: &mut Context,
    ) -> Poll<Option<Result<Frame<Bytes>, BodyError>>> {
        if self.remaining == 0 {
            return Poll::Ready(None);
        }

        let want = (self.remaining).min(READ_CHUNK as u64) as usize;
        let mut buffer = BytesMut::zeroed(want);
        let mut read_buf = ReadBuf::new(&mut buffer);

        ready!(Pin::new(&mut self.file).poll_read(cx, &mut read_buf))?;
        let read = read_buf.filled().len();
        if read == 0 {
            // file shrank under us, the declared length can no longer be met
            return Poll::Ready(Some(Err(BodyError::InvalidSizeHint)));
        }

        self.remaining -= read as u64;
        buffer.truncate(read);
        Poll::Ready(Some(Ok(Frame::data(buffer.freeze()))))
    }
}
