//! One peer connection with framed, independently usable read and write sides.

use std::{
    fmt, io,
    net::SocketAddr,
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use futures_util::{SinkExt, StreamExt};
use tokio::{
    io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf},
    sync::Mutex,
};
use tokio_util::{
    codec::{FramedRead, FramedWrite},
    sync::CancellationToken,
};
use uuid::Uuid;

use crate::{
    codec::{Frame, FrameCodec},
    error::{ConnectionError, MalformedMessage},
    message::Message,
};

/// Identity of a session: the remote endpoint, or a generated id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionKey(String);

impl SessionKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derive a key from the peer address, falling back to a random UUID
    pub fn from_peer(peer: Option<SocketAddr>) -> Self {
        match peer {
            Some(addr) => Self(addr.to_string()),
            None => Self(Uuid::new_v4().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Presentation-only form for log output. Never use it for lookups.
    pub fn redacted(&self) -> &'static str {
        "[REDACTED]"
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of [`Session::receive`] that is not a connection failure
#[derive(Debug)]
pub enum Received {
    Message(Message),
    /// The frame was dropped; the session is still usable
    Malformed(MalformedMessage),
    /// The peer closed its side of the stream
    EndOfStream,
    /// The session was closed locally or shutdown was requested
    Closed,
}

/// How a [`Session`] frames, bounds, and logs its traffic
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub codec: FrameCodec,
    /// Upper bound on every write and on the final shutdown
    pub send_timeout: Option<Duration>,
    /// Show the key as `[REDACTED]` in log output
    pub redact_key: bool,
}

type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;
type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// A framed connection to one peer.
///
/// Reads and writes lock separate halves, so a relay loop blocked in
/// [`receive`](Self::receive) never delays a broadcast [`send`](Self::send).
/// Writes are serialized per session, so frames from concurrent senders never
/// interleave.
pub struct Session {
    key: SessionKey,
    reader: Mutex<Option<FramedRead<BoxedReader, FrameCodec>>>,
    writer: Mutex<Option<FramedWrite<BoxedWriter, FrameCodec>>>,
    cancel: CancellationToken,
    closing: AtomicBool,
    send_timeout: Option<Duration>,
    redact_key: bool,
}

impl Session {
    /// Wrap a connected stream.
    ///
    /// `cancel` should be a child of the owner's shutdown token: cancelling it
    /// makes a pending `receive` return [`Received::Closed`].
    pub fn open<S>(stream: S, key: SessionKey, cancel: CancellationToken) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        Self::with_options(stream, key, cancel, SessionOptions::default())
    }

    pub fn with_codec<S>(
        stream: S,
        key: SessionKey,
        cancel: CancellationToken,
        codec: FrameCodec,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let options = SessionOptions {
            codec,
            ..SessionOptions::default()
        };
        Self::with_options(stream, key, cancel, options)
    }

    pub fn with_options<S>(
        stream: S,
        key: SessionKey,
        cancel: CancellationToken,
        options: SessionOptions,
    ) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
    {
        let (read_half, write_half): (ReadHalf<S>, WriteHalf<S>) = tokio::io::split(stream);
        let reader: BoxedReader = Box::new(read_half);
        let writer: BoxedWriter = Box::new(write_half);
        let SessionOptions {
            codec,
            send_timeout,
            redact_key,
        } = options;

        let session = Self {
            key,
            reader: Mutex::new(Some(FramedRead::new(reader, codec.clone()))),
            writer: Mutex::new(Some(FramedWrite::new(writer, codec))),
            cancel,
            closing: AtomicBool::new(false),
            send_timeout,
            redact_key,
        };
        tracing::info!(event = "session_opened", key = %session.log_key(), "Session opened");
        session
    }

    pub fn key(&self) -> &SessionKey {
        &self.key
    }

    /// The key as it may appear in log output
    pub fn log_key(&self) -> &str {
        if self.redact_key {
            self.key.redacted()
        } else {
            self.key.as_str()
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    /// Wait for the next frame from the peer.
    ///
    /// Intended for a single reader; concurrent callers queue on the read lock.
    pub async fn receive(&self) -> Result<Received, ConnectionError> {
        let mut guard = self.reader.lock().await;
        let Some(reader) = guard.as_mut() else {
            return Ok(Received::Closed);
        };

        let next = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            next = reader.next() => Some(next),
        };
        let Some(next) = next else {
            // Release the read half so the stream is gone once close() drops the writer.
            *guard = None;
            return Ok(Received::Closed);
        };

        match next {
            Some(Ok(Frame::Line(line))) => match Message::from_frame(&line) {
                Ok(message) => Ok(Received::Message(message)),
                Err(err) => Ok(Received::Malformed(err)),
            },
            Some(Ok(Frame::Malformed(err))) => Ok(Received::Malformed(err)),
            Some(Err(err)) => {
                *guard = None;
                Err(err.into())
            }
            None => {
                *guard = None;
                Ok(Received::EndOfStream)
            }
        }
    }

    /// Serialize and send one message
    pub async fn send(&self, message: &Message) -> Result<(), ConnectionError> {
        let frame = message.to_frame()?;
        self.send_line(&frame).await
    }

    /// Send an already serialized frame payload
    pub async fn send_line(&self, frame: &str) -> Result<(), ConnectionError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed);
        }

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(ConnectionError::Closed)?;

        match self.send_timeout {
            Some(limit) => tokio::time::timeout(limit, writer.send(frame))
                .await
                .map_err(|_| ConnectionError::Timeout(limit))??,
            None => writer.send(frame).await?,
        }
        Ok(())
    }

    /// Release the stream. Only the first call has any effect.
    pub async fn close(&self) {
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }
        self.cancel.cancel();

        if let Some(mut writer) = self.writer.lock().await.take() {
            // No flush: anything still buffered is left over from a failed
            // write, and the peer may have stopped reading.
            let shutdown = writer.get_mut().shutdown();
            let result = match self.send_timeout {
                Some(limit) => tokio::time::timeout(limit, shutdown)
                    .await
                    .unwrap_or_else(|_| Err(io::ErrorKind::TimedOut.into())),
                None => shutdown.await,
            };
            if let Err(e) = result {
                tracing::debug!(key = %self.log_key(), "Error while shutting down write half: {}", e);
            }
        }

        tracing::info!(event = "session_closed", key = %self.log_key(), "Session closed");
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("key", &self.key)
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream, duplex};

    use super::*;

    fn open_pair(key: &str) -> (Session, DuplexStream) {
        let (local, remote) = duplex(4096);
        let session = Session::open(local, SessionKey::new(key), CancellationToken::new());
        (session, remote)
    }

    fn sample(id: u64, content: &str) -> Message {
        Message::new(id, content.to_string(), "alice".to_string(), Utc::now())
    }

    #[test]
    fn test_key_from_peer_uses_address() {
        // テスト項目: ピアアドレスがあればそれがキーになる
        // given (前提条件):
        let addr: SocketAddr = "10.0.0.1:5555".parse().unwrap();

        // when (操作):
        let key = SessionKey::from_peer(Some(addr));

        // then (期待する結果):
        assert_eq!(key.as_str(), "10.0.0.1:5555");
    }

    #[test]
    fn test_key_from_missing_peer_is_generated_and_unique() {
        // テスト項目: ピアアドレスがない場合は一意な ID が生成される
        // when (操作):
        let first = SessionKey::from_peer(None);
        let second = SessionKey::from_peer(None);

        // then (期待する結果):
        assert_ne!(first, second);
        assert!(Uuid::parse_str(first.as_str()).is_ok());
    }

    #[test]
    fn test_redacted_key_does_not_leak_address() {
        // テスト項目: 伏字表示にはアドレスが含まれない
        // given (前提条件):
        let key = SessionKey::new("192.168.1.2:4000");

        // then (期待する結果):
        assert!(!key.redacted().contains("192.168"));
        assert_eq!(key.as_str(), "192.168.1.2:4000");
    }

    #[tokio::test]
    async fn test_send_writes_one_json_line() {
        // テスト項目: send は JSON 1 行として書き込む
        // given (前提条件):
        let (session, mut remote) = open_pair("a");
        let message = sample(1, "hello");

        // when (操作):
        session.send(&message).await.unwrap();
        session.close().await;
        let mut written = String::new();
        remote.read_to_string(&mut written).await.unwrap();

        // then (期待する結果):
        assert!(written.ends_with('\n'));
        assert_eq!(written.matches('\n').count(), 1);
        assert_eq!(Message::from_frame(written.trim_end()).unwrap(), message);
    }

    #[tokio::test]
    async fn test_receive_reports_malformed_and_keeps_going() {
        // テスト項目: 不正なフレームは Malformed として報告され、後続の正しいフレームは受信できる
        // given (前提条件):
        let (session, mut remote) = open_pair("a");
        let valid = sample(2, "after garbage");
        let payload = format!("garbage\n{}\n", valid.to_frame().unwrap());

        // when (操作):
        remote.write_all(payload.as_bytes()).await.unwrap();
        let first = session.receive().await.unwrap();
        let second = session.receive().await.unwrap();

        // then (期待する結果):
        assert!(matches!(first, Received::Malformed(MalformedMessage::InvalidPayload(_))));
        assert!(matches!(second, Received::Message(m) if m == valid));
        assert!(!session.is_closed());
    }

    #[tokio::test]
    async fn test_receive_returns_end_of_stream_when_peer_closes() {
        // テスト項目: ピアがストリームを閉じると EndOfStream が返される
        // given (前提条件):
        let (session, remote) = open_pair("a");

        // when (操作):
        drop(remote);
        let result = session.receive().await.unwrap();

        // then (期待する結果):
        assert!(matches!(result, Received::EndOfStream));
    }

    #[tokio::test]
    async fn test_close_unblocks_pending_receive() {
        // テスト項目: close すると待機中の receive が Closed で戻る
        // given (前提条件):
        let (session, _remote) = open_pair("a");
        let session = std::sync::Arc::new(session);
        let reader = session.clone();
        let pending = tokio::spawn(async move { reader.receive().await });
        tokio::task::yield_now().await;

        // when (操作):
        session.close().await;
        let result = pending.await.unwrap().unwrap();

        // then (期待する結果):
        assert!(matches!(result, Received::Closed));
    }

    #[tokio::test]
    async fn test_cancelled_token_unblocks_receive() {
        // テスト項目: 親トークンのキャンセルで receive が Closed で戻る
        // given (前提条件):
        let shutdown = CancellationToken::new();
        let (local, _remote) = duplex(64);
        let session = Session::open(local, SessionKey::new("a"), shutdown.child_token());

        // when (操作):
        shutdown.cancel();
        let result = session.receive().await.unwrap();

        // then (期待する結果):
        assert!(matches!(result, Received::Closed));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_rejects_later_sends() {
        // テスト項目: close は何度呼んでも安全で、以降の send は Closed で失敗する
        // given (前提条件):
        let (session, mut remote) = open_pair("a");

        // when (操作):
        session.close().await;
        session.close().await;
        let result = session.send(&sample(3, "too late")).await;
        let mut rest = Vec::new();
        let read = remote.read_to_end(&mut rest).await.unwrap();

        // then (期待する結果):
        assert!(session.is_closed());
        assert!(matches!(result, Err(ConnectionError::Closed)));
        assert_eq!(read, 0);
    }

    #[tokio::test]
    async fn test_send_times_out_when_peer_stops_reading() {
        // テスト項目: 相手が読み込まず書き込みが詰まると Timeout で失敗する
        // given (前提条件):
        let (local, _remote) = duplex(16);
        let options = SessionOptions {
            send_timeout: Some(Duration::from_millis(50)),
            ..SessionOptions::default()
        };
        let session =
            Session::with_options(local, SessionKey::new("slow"), CancellationToken::new(), options);

        // when (操作):
        let result = session.send(&sample(4, &"x".repeat(256))).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectionError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_close_after_timed_out_send_does_not_wait_for_peer() {
        // テスト項目: 書き込みがタイムアウトした後でも、相手が読み込まないまま close が完了する
        // given (前提条件):
        let (local, mut remote) = duplex(16);
        let options = SessionOptions {
            send_timeout: Some(Duration::from_millis(50)),
            ..SessionOptions::default()
        };
        let session =
            Session::with_options(local, SessionKey::new("slow"), CancellationToken::new(), options);
        let result = session.send(&sample(6, &"x".repeat(1024))).await;
        assert!(matches!(result, Err(ConnectionError::Timeout(_))));

        // when (操作):
        tokio::time::timeout(Duration::from_secs(1), session.close())
            .await
            .expect("close blocked on a peer that is not reading");

        // then (期待する結果): 書き込み済みの分を読み終えると EOF になる
        assert!(session.is_closed());
        let mut rest = Vec::new();
        remote.read_to_end(&mut rest).await.unwrap();
        assert!(rest.len() < 1024);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = CapturedLogs;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[tokio::test]
    async fn test_redacted_session_logs_hide_address() {
        // テスト項目: 伏字設定のセッションでは開始・終了ログにアドレスが出力されない
        // given (前提条件):
        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);
        let (local, _remote) = duplex(64);
        let options = SessionOptions {
            redact_key: true,
            ..SessionOptions::default()
        };

        // when (操作):
        let session = Session::with_options(
            local,
            SessionKey::new("192.168.1.2:4000"),
            CancellationToken::new(),
            options,
        );
        session.close().await;

        // then (期待する結果):
        let output = logs.contents();
        assert!(output.contains("session_opened"));
        assert!(output.contains("session_closed"));
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("192.168"));
        assert_eq!(session.key().as_str(), "192.168.1.2:4000");
        assert_eq!(session.log_key(), "[REDACTED]");
    }

    #[tokio::test]
    async fn test_send_to_dropped_peer_fails() {
        // テスト項目: ピアが切断済みの場合、send は接続エラーになる
        // given (前提条件):
        let (session, remote) = open_pair("gone");
        drop(remote);

        // when (操作):
        let result = session.send(&sample(5, "anyone?")).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ConnectionError::Io(_))));
    }
}
