//! Notification camouflage
//!
//! Sensitive events that arrive while disguised are shown as ordinary decoy
//! content. The decoy line is built only from the identity's vocabulary, and
//! every vocabulary entry showing a [`BannedTerms`] hit is struck out before
//! picking, so nothing of the sender or body can reach the screen.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use stealth_params::DecoyIdentity;
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};
use uuid::Uuid;
use zeroize::Zeroizing;

/// Shortest body fragment that counts as recognizable
pub const MIN_FRAGMENT_LEN: usize = 3;

/// Shortest sender word struck out wherever it appears, even inside a word
pub const MIN_SENDER_LEN: usize = 2;

/// Event pushed in by the messaging or data layer
#[derive(Clone)]
pub struct SensitiveEvent {
    /// Host identifier used to open the event after unlocking
    pub event_id: String,
    /// Sender identity
    pub sender: String,
    /// Message text
    pub body: String,
}

impl SensitiveEvent {
    /// Build an event
    pub fn new(
        event_id: impl Into<String>,
        sender: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            sender: sender.into(),
            body: body.into(),
        }
    }
}

impl fmt::Debug for SensitiveEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SensitiveEvent")
            .field("event_id", &self.event_id)
            .finish_non_exhaustive()
    }
}

/// Lowercased alphanumeric runs of at least [`MIN_FRAGMENT_LEN`] characters
pub fn fragments(text: &str) -> Vec<String> {
    words(text)
        .filter(|word| word.chars().count() >= MIN_FRAGMENT_LEN)
        .collect()
}

/// Whether `text` contains any fragment of `source`
pub fn contains_fragment_of(text: &str, source: &str) -> bool {
    let haystack = text.to_lowercase();
    fragments(source)
        .iter()
        .any(|fragment| haystack.contains(fragment.as_str()))
}

fn words(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
}

/// Everything a camouflaged line must not show of a sensitive event.
///
/// Sender words of [`MIN_SENDER_LEN`] or more and the whole sender are
/// struck as substrings, so even a two-letter name never reaches the screen.
/// A lone letter is only struck as a whole word. Body text is struck by
/// fragment.
#[derive(Debug, Clone, Default)]
pub struct BannedTerms {
    substrings: Vec<String>,
    words: Vec<String>,
}

impl BannedTerms {
    /// Terms for one event
    pub fn for_event(sender: &str, body: &str) -> Self {
        let mut terms = Self::default();
        for word in words(sender) {
            if word.chars().count() >= MIN_SENDER_LEN {
                terms.substrings.push(word);
            } else {
                terms.words.push(word);
            }
        }

        let whole = sender.trim().to_lowercase();
        if whole.chars().count() >= MIN_SENDER_LEN && whole.chars().any(char::is_alphanumeric) {
            terms.substrings.push(whole);
        }

        terms.substrings.extend(fragments(body));
        terms
    }

    /// Whether `text` shows any banned term
    pub fn hits(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.substrings
            .iter()
            .any(|term| lower.contains(term.as_str()))
            || words(&lower).any(|word| self.words.contains(&word))
    }
}

/// Deterministic content generator for one decoy identity
#[derive(Debug, Clone, Copy)]
pub struct DecoyWriter {
    identity: DecoyIdentity,
}

impl DecoyWriter {
    /// Writer for `identity`
    pub fn new(identity: DecoyIdentity) -> Self {
        Self { identity }
    }

    /// Identity this writer imitates
    pub fn identity(&self) -> DecoyIdentity {
        self.identity
    }

    /// Cover content for a given day: headlines or note titles
    pub fn feed(&self, day: NaiveDate, count: usize) -> Vec<String> {
        let none = BannedTerms::default();
        (0..count)
            .map(|index| {
                let mut hasher = Sha256::new();
                hasher.update(self.identity.as_str().as_bytes());
                hasher.update(day.to_string().as_bytes());
                hasher.update((index as u64).to_le_bytes());
                self.compose(&hasher.finalize().into(), &none)
            })
            .collect()
    }

    /// Decoy line standing in for a sensitive event
    pub fn camouflage(&self, sender: &str, body: &str) -> String {
        let banned = BannedTerms::for_event(sender, body);

        let mut hasher = Sha256::new();
        hasher.update(self.identity.as_str().as_bytes());
        hasher.update([0u8]);
        hasher.update(sender.as_bytes());
        hasher.update([0u8]);
        hasher.update(body.as_bytes());

        self.compose(&hasher.finalize().into(), &banned)
    }

    fn compose(&self, seed: &[u8; 32], banned: &BannedTerms) -> String {
        let vocab = self.identity.vocabulary();
        let mut line = String::new();

        for (slot_index, slot) in vocab.slots.iter().enumerate() {
            let candidates: Vec<&str> = slot
                .iter()
                .copied()
                .filter(|entry| !banned.hits(entry))
                .collect();
            if candidates.is_empty() {
                continue;
            }

            let pick = candidates[seed[slot_index] as usize % candidates.len()];
            if !line.is_empty() {
                line.push_str(vocab.joiners[slot_index - 1]);
            }
            line.push_str(pick);
        }

        // Joining can form a banned term across an entry boundary.
        if line.is_empty() || banned.hits(&line) {
            return self.fallback(seed, banned);
        }

        capitalize(&line)
    }

    /// Numbered line such as "Edition 07", used when the vocabulary is struck out
    fn fallback(&self, seed: &[u8; 32], banned: &BannedTerms) -> String {
        let labels = self.identity.vocabulary().fallbacks;
        let start = seed[30] as usize;
        for offset in 0..100 {
            let number = (seed[31] as usize + offset) % 100;
            for step in 0..labels.len() {
                let line = format!("{} {:02}", labels[(start + step) % labels.len()], number);
                if !banned.hits(&line) {
                    return line;
                }
            }
            let bare = format!("{:02}", number);
            if !banned.hits(&bare) {
                return bare;
            }
        }
        // Only reachable when the sender names every number.
        "\u{2026}".to_string()
    }
}

fn capitalize(line: &str) -> String {
    let mut chars = line.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Handle for one camouflaged notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationId(Uuid);

impl NotificationId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A sensitive event waiting behind its decoy text
pub struct PendingCamouflagedNotification {
    id: NotificationId,
    event_id: String,
    real_payload: Zeroizing<String>,
    decoy_text: String,
    expires_at: Instant,
}

impl PendingCamouflagedNotification {
    /// Handle
    pub fn id(&self) -> NotificationId {
        self.id
    }

    /// Host event to open once unlocked
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// Text safe to display while disguised
    pub fn decoy_text(&self) -> &str {
        &self.decoy_text
    }

    /// Display deadline
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    /// Whether the decoy text shows nothing of the sender or body
    pub fn is_clean(&self) -> bool {
        let (sender, body) = self
            .real_payload
            .split_once('\n')
            .unwrap_or((self.real_payload.as_str(), ""));
        !BannedTerms::for_event(sender, body).hits(&self.decoy_text)
    }
}

impl fmt::Debug for PendingCamouflagedNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingCamouflagedNotification")
            .field("id", &self.id)
            .field("decoy_text", &self.decoy_text)
            .field("real_payload", &format_args!("<{} bytes>", self.real_payload.len()))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Queue of camouflaged notifications, shown oldest first
#[derive(Debug)]
pub struct NotificationCamouflage {
    writer: DecoyWriter,
    display_for: Duration,
    queue: VecDeque<PendingCamouflagedNotification>,
}

impl NotificationCamouflage {
    /// Empty queue for `identity`
    pub fn new(identity: DecoyIdentity, display_for: Duration) -> Self {
        Self {
            writer: DecoyWriter::new(identity),
            display_for,
            queue: VecDeque::new(),
        }
    }

    /// Disguise `event` and queue it; returns its handle
    pub fn push(&mut self, event: SensitiveEvent, now: Instant) -> NotificationId {
        let decoy_text = self.writer.camouflage(&event.sender, &event.body);

        let mut real_payload = Zeroizing::new(String::with_capacity(
            event.sender.len() + event.body.len() + 1,
        ));
        real_payload.push_str(&event.sender);
        real_payload.push('\n');
        real_payload.push_str(&event.body);

        let pending = PendingCamouflagedNotification {
            id: NotificationId::new(),
            event_id: event.event_id,
            real_payload,
            decoy_text,
            expires_at: now + self.display_for,
        };
        debug_assert!(pending.is_clean());

        let id = pending.id;
        self.queue.push_back(pending);
        tracing::debug!("Camouflaged notification queued ({} pending)", self.queue.len());
        id
    }

    /// Notification currently on display
    pub fn current(&self) -> Option<&PendingCamouflagedNotification> {
        self.queue.front()
    }

    /// Drop every notification whose deadline has passed
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.queue.len();
        self.queue.retain(|pending| now < pending.expires_at);
        let dropped = before - self.queue.len();
        if dropped > 0 {
            tracing::debug!("{} camouflaged notification(s) expired", dropped);
        }
        dropped
    }

    /// Remove a notification the user acted on
    pub fn take(&mut self, id: NotificationId) -> Option<PendingCamouflagedNotification> {
        let index = self.queue.iter().position(|pending| pending.id == id)?;
        self.queue.remove(index)
    }

    /// Drop everything
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Earliest expiry
    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.iter().map(|pending| pending.expires_at).min()
    }

    /// Number of queued notifications
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Generator shared with the decoy feed
    pub fn writer(&self) -> &DecoyWriter {
        &self.writer
    }
}
