use bytes::{Buf, Bytes};
use std::{
    collections::VecDeque,
    io,
    pin::Pin,
    task::{Context, Poll},
};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use super::{CommandRx, EventTx, SocketCommand, SocketError, SocketEvent, SocketId};

/// Drives one connected stream.
///
/// Writes are queued in order and each queued buffer is answered with a drain once written,
/// reads are forwarded as they arrive. The task exits when the peer closes, on the first I/O
/// error, or when the engine stops the socket.
pub(super) struct SocketTask<IO> {
    id: SocketId,
    io: IO,
    rx: CommandRx,
    events: EventTx,
    writes: VecDeque<Bytes>,
    flushing: bool,
    read_buf: Box<[u8]>,
}

impl<IO> Unpin for SocketTask<IO> { }

impl<IO> SocketTask<IO>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    pub(super) fn new(id: SocketId, io: IO, chunk_size: usize, rx: CommandRx, events: EventTx) -> Self {
        Self {
            id,
            io,
            rx,
            events,
            writes: VecDeque::new(),
            flushing: false,
            read_buf: vec![0; chunk_size].into_boxed_slice(),
        }
    }

    fn send(&self, event: SocketEvent) {
        let _ = self.events.send((self.id, event));
    }

    fn fail(&self, err: io::Error) -> Poll<()> {
        self.send(SocketEvent::Error(SocketError::Io(err)));
        Poll::Ready(())
    }

    /// Returns `Ready` when the engine stopped this socket.
    fn poll_message(&mut self, cx: &mut Context) -> Poll<()> {
        loop {
            match self.rx.poll_recv(cx) {
                Poll::Ready(Some(SocketCommand::Send(bytes))) => {
                    if !bytes.is_empty() {
                        self.writes.push_back(bytes);
                    } else {
                        self.send(SocketEvent::Drain);
                    }
                }
                Poll::Ready(Some(SocketCommand::Stop) | None) => return Poll::Ready(()),
                Poll::Pending => return Poll::Pending,
            }
        }
    }

    fn poll_write(&mut self, cx: &mut Context) -> Poll<()> {
        while let Some(front) = self.writes.front_mut() {
            match Pin::new(&mut self.io).poll_write(cx, front) {
                Poll::Ready(Ok(0)) => return self.fail(io::ErrorKind::WriteZero.into()),
                Poll::Ready(Ok(n)) => {
                    let sent = front.split_to(n);
                    let drained = !front.has_remaining();
                    self.send(SocketEvent::Sent(sent));
                    if drained {
                        self.writes.pop_front();
                        self.flushing = true;
                        self.send(SocketEvent::Drain);
                    }
                }
                Poll::Ready(Err(err)) => return self.fail(err),
                Poll::Pending => return Poll::Pending,
            }
        }

        if self.flushing {
            match Pin::new(&mut self.io).poll_flush(cx) {
                Poll::Ready(Ok(())) => self.flushing = false,
                Poll::Ready(Err(err)) => return self.fail(err),
                Poll::Pending => {}
            }
        }
        Poll::Pending
    }

    fn poll_read(&mut self, cx: &mut Context) -> Poll<()> {
        loop {
            let mut buf = ReadBuf::new(&mut self.read_buf);
            match Pin::new(&mut self.io).poll_read(cx, &mut buf) {
                Poll::Ready(Ok(())) if buf.filled().is_empty() => {
                    self.send(SocketEvent::Closed);
                    return Poll::Ready(());
                }
                Poll::Ready(Ok(())) => {
                    let data = Bytes::copy_from_slice(buf.filled());
                    self.send(SocketEvent::Data(data));
                }
                Poll::Ready(Err(err)) => return self.fail(err),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}

impl<IO> Future for SocketTask<IO>
where
    IO: AsyncRead + AsyncWrite + Unpin,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let me = self.get_mut();

        if me.poll_message(cx).is_ready() {
            return Poll::Ready(());
        }
        if me.poll_write(cx).is_ready() {
            return Poll::Ready(());
        }
        if me.events.is_closed() {
            return Poll::Ready(());
        }
        me.poll_read(cx)
    }
}
