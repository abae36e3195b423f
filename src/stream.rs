//! Discovery-and-fetch orchestration.
//!
//! [`get_entries`] resolves a root URI into a provider client and returns a
//! [`Traversal`]: a lazy stream of [`Entry`] items. Internally one generator
//! drives the provider's listing stream and a bounded [`FuturesUnordered`]
//! fetch pool together, emitting entries in fetch-completion order. The
//! generator only advances while the caller polls, so listing is paced by
//! consumption and dropping the stream abandons everything still in flight.

use crate::error::{ErrorKind, Result};
use crate::options::{ErrorMode, Options};
use async_stream::stream;
use exn::ResultExt;
use forage_client::{ClientHandle, Entry, EntryPointer, resolve};
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use glob::Pattern;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

/// Record of an entry omitted under [`ErrorMode::SkipAndReport`].
#[derive(Debug)]
pub struct Skipped {
    /// The pointer whose fetch failed, or `None` when the listing itself
    /// produced the error (the error names the prefix in that case).
    pub pointer: Option<EntryPointer>,
    /// The provider-level failure, full error tree attached.
    pub error: forage_client::Error,
}

/// Lazy stream of fetched entries for one [`get_entries`] call.
///
/// Entries arrive in fetch-completion order, which differs from listing
/// order whenever fetches overlap. Dropping the traversal cancels it:
/// in-flight fetches are abandoned and no further listing requests are made.
pub struct Traversal {
    inner: Pin<Box<dyn Stream<Item = Result<Entry>> + Send>>,
    skipped: Arc<Mutex<Vec<Skipped>>>,
}

impl Traversal {
    /// Drain the records accumulated under [`ErrorMode::SkipAndReport`].
    ///
    /// Meaningful once the stream is exhausted; calling it mid-iteration
    /// returns whatever has been recorded so far and resets the buffer.
    pub fn skipped(&self) -> Vec<Skipped> {
        let mut guard = self.skipped.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *guard)
    }
}

impl std::fmt::Debug for Traversal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Traversal")
            .field("skipped", &self.skipped.lock().unwrap_or_else(PoisonError::into_inner).len())
            .finish_non_exhaustive()
    }
}

impl Stream for Traversal {
    type Item = Result<Entry>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().inner.as_mut().poll_next(cx)
    }
}

/// Discovers and fetches every entry under `uri`.
///
/// Resolution happens up front: an unsupported scheme or a misconfigured
/// adapter fails here, before any listing request. The returned traversal
/// holds at most [`Options::max_concurrency`] fetches in flight and yields
/// `(pointer, contents)` pairs as fetches complete.
///
/// # Examples
///
/// ```no_run
/// use forage::{ErrorMode, Options, get_entries};
/// use futures::TryStreamExt;
///
/// # async fn example() -> forage::Result<()> {
/// let options = Options::default().with_anon(true).with_glob("**/*.csv");
/// let mut traversal = get_entries("s3://public-works/editions", options).await?;
/// while let Some(entry) = traversal.try_next().await? {
///     println!("{} ({} bytes)", entry.pointer.uri(), entry.contents.len());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn get_entries(uri: &str, options: Options) -> Result<Traversal> {
    let pattern = match &options.glob {
        Some(raw) => Some(Pattern::new(raw).or_raise(|| ErrorKind::Pattern(raw.clone()))?),
        None => None,
    };
    let config = options.client_config();
    let (client, prefix) = resolve(uri, &config)
        .await
        .or_raise(|| ErrorKind::Resolve(uri.to_string()))?;
    let skipped = Arc::new(Mutex::new(Vec::new()));
    let inner = traversal_stream(client, prefix, options, pattern, Arc::clone(&skipped));
    Ok(Traversal {
        inner: Box::pin(inner),
        skipped,
    })
}

enum Step {
    Discovered(Option<forage_client::Result<EntryPointer>>),
    Fetched(EntryPointer, forage_client::Result<Vec<u8>>),
}

fn traversal_stream(
    client: ClientHandle,
    prefix: String,
    options: Options,
    pattern: Option<Pattern>,
    skipped: Arc<Mutex<Vec<Skipped>>>,
) -> impl Stream<Item = Result<Entry>> + Send {
    // Parentheses so rustfmt still formats the macro body.
    stream!({
        let limit = options.effective_concurrency();
        let mode = options.on_error;
        let mut listing = client.list_stream(&prefix).fuse();
        let mut listing_done = false;
        let mut in_flight = FuturesUnordered::new();
        let mut emitted = 0usize;

        loop {
            // Completed fetches are drained before new pointers are pulled,
            // and discovery pauses while the pool is full. `yield` never
            // appears inside a select arm.
            let step = tokio::select! {
                biased;
                Some((pointer, result)) = in_flight.next() => Step::Fetched(pointer, result),
                item = listing.next(), if !listing_done && in_flight.len() < limit => Step::Discovered(item),
                else => break,
            };
            match step {
                Step::Discovered(None) => listing_done = true,
                Step::Discovered(Some(Ok(pointer))) => {
                    if let Some(pattern) = &pattern {
                        if !pattern.matches(&pointer.path) {
                            continue;
                        }
                    }
                    let client = Arc::clone(&client);
                    in_flight.push(async move {
                        let contents = client.read(&pointer.path, pointer.version.as_deref()).await;
                        (pointer, contents)
                    });
                }
                Step::Discovered(Some(Err(error))) => match mode {
                    ErrorMode::FailFast => {
                        yield Err(error.raise(ErrorKind::Listing(format!("{}/{prefix}", client.source()))));
                        return;
                    }
                    ErrorMode::SkipAndReport => {
                        tracing::warn!(source = %client.source(), prefix, %error, "recorded listing failure, continuing");
                        record(&skipped, Skipped { pointer: None, error });
                    }
                },
                Step::Fetched(pointer, Ok(contents)) => {
                    emitted += 1;
                    yield Ok(Entry::from_parts(pointer, contents));
                }
                Step::Fetched(pointer, Err(error)) => match mode {
                    ErrorMode::FailFast => {
                        yield Err(error.raise(ErrorKind::Fetch(pointer.uri())));
                        return;
                    }
                    ErrorMode::SkipAndReport => {
                        tracing::warn!(uri = %pointer.uri(), %error, "skipping entry after failed fetch");
                        record(&skipped, Skipped { pointer: Some(pointer), error });
                    }
                },
            }
        }
        tracing::debug!(source = %client.source(), prefix, emitted, "traversal complete");
    })
}

fn record(skipped: &Mutex<Vec<Skipped>>, entry: Skipped) {
    skipped.lock().unwrap_or_else(PoisonError::into_inner).push(entry);
}
