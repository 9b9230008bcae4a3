/// Typewriter engine: reveals a string one character per tick.
///
/// The engine never sleeps or spawns. The host drives it with `poll(now_ms)`
/// from its event loop; each poll reports the whole revealed prefix, not a
/// delta, so a consumer can always render the latest update verbatim.

use tracing::trace;

/// Identifies one reveal. Returned by `start`; updates carry it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RevealToken(u64);

/// Output of a poll. `P` is the completion payload handed to `start`.
#[derive(Debug, Clone, PartialEq)]
pub enum RevealUpdate<P> {
    /// More characters are visible; `text` is the full prefix so far.
    Progress { token: RevealToken, text: String },
    /// Every character is visible. Emitted exactly once per reveal.
    Complete {
        token: RevealToken,
        text: String,
        payload: P,
    },
}

#[derive(Debug)]
struct Reveal<P> {
    token: RevealToken,
    text: String,
    // Byte offset of the end of each char, so prefixes never split a code point.
    boundaries: Vec<usize>,
    revealed: usize,
    next_tick_at: u64,
    payload: P,
}

/// At most one reveal is live at a time; starting a new one drops the old
/// one before anything else happens.
#[derive(Debug)]
pub struct Typewriter<P> {
    interval_ms: u64,
    active: Option<Reveal<P>>,
    next_token: u64,
}

impl<P> Typewriter<P> {
    /// `interval_ms` is clamped to at least one millisecond.
    pub fn new(interval_ms: u64) -> Self {
        Self {
            interval_ms: interval_ms.max(1),
            active: None,
            next_token: 0,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// Begin revealing `text`, cancelling any reveal already in flight.
    /// The first character lands one interval after `now_ms`; empty text
    /// completes on the next poll.
    pub fn start(&mut self, text: impl Into<String>, payload: P, now_ms: u64) -> RevealToken {
        self.cancel();

        let text = text.into();
        let boundaries = text
            .char_indices()
            .map(|(offset, ch)| offset + ch.len_utf8())
            .collect();

        self.next_token += 1;
        let token = RevealToken(self.next_token);
        self.active = Some(Reveal {
            token,
            text,
            boundaries,
            revealed: 0,
            next_tick_at: now_ms.saturating_add(self.interval_ms),
            payload,
        });
        trace!(token = token.0, "reveal started");
        token
    }

    /// Stop the live reveal without completing it. Returns whether anything
    /// was cancelled; safe to call when idle.
    pub fn cancel(&mut self) -> bool {
        match self.active.take() {
            Some(reveal) => {
                trace!(token = reveal.token.0, "reveal cancelled");
                true
            }
            None => false,
        }
    }

    /// Whether `token` names the live reveal.
    pub fn is_current(&self, token: RevealToken) -> bool {
        self.active.as_ref().is_some_and(|r| r.token == token)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Advance by every tick that has elapsed up to `now_ms`.
    ///
    /// Returns `None` when nothing changed. A late poll reveals all the
    /// characters it missed in a single update.
    pub fn poll(&mut self, now_ms: u64) -> Option<RevealUpdate<P>> {
        let reveal = self.active.as_mut()?;
        let total = reveal.boundaries.len();

        if total > 0 {
            if now_ms < reveal.next_tick_at {
                return None;
            }
            let ticks = 1 + (now_ms - reveal.next_tick_at) / self.interval_ms;
            let remaining = (total - reveal.revealed) as u64;
            let step = ticks.min(remaining) as usize;
            reveal.revealed += step;
            reveal.next_tick_at = reveal
                .next_tick_at
                .saturating_add(ticks.saturating_mul(self.interval_ms));
        }

        if reveal.revealed < total {
            let end = reveal.boundaries[reveal.revealed - 1];
            trace!(token = reveal.token.0, chars = reveal.revealed, "reveal tick");
            return Some(RevealUpdate::Progress {
                token: reveal.token,
                text: reveal.text[..end].to_string(),
            });
        }

        let reveal = self.active.take()?;
        trace!(token = reveal.token.0, "reveal complete");
        Some(RevealUpdate::Complete {
            token: reveal.token,
            text: reveal.text,
            payload: reveal.payload,
        })
    }
}

impl<P> Drop for Typewriter<P> {
    fn drop(&mut self) {
        self.cancel();
    }
}
